//! The translatable record façade.
//!
//! Composes the locale resolver, the attribute router and the translation
//! store around one host record, redirecting reads and writes of translatable
//! attributes to the translation matching the resolved locale.
//!
//! # Example
//!
//! ```rust,ignore
//! let mut vegetable = TranslatableRecord::new(&VEGETABLE, config, locales);
//! vegetable.set("name:fr", json!("Pomme de terre"));
//! assert_eq!(vegetable.get("name:fr"), Some(json!("Pomme de terre")));
//! ```

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::attr::AttributeRouter;
use crate::config::TranslatableConfig;
use crate::error::{Error, Result};
use crate::locales::Locales;
use crate::model::{HostRecord, ModelSchema, TranslationRecord};
use crate::resolver::LocaleResolver;
use crate::storage::TranslationStorage;
use crate::store::TranslationStore;

/// A host record with transparently translated attributes.
///
/// Persistence is an explicit unit of work: nothing here hooks into storage
/// implicitly. Call [`load_translations`](Self::load_translations) before
/// reading, and [`save_translations`](Self::save_translations) /
/// [`delete_translations`](Self::delete_translations) (or the [`save`](Self::save)
/// / [`delete`](Self::delete) conveniences) at the appropriate point of your
/// own persistence lifecycle.
#[derive(Debug, Clone)]
pub struct TranslatableRecord {
    host: HostRecord,
    store: TranslationStore,
    resolver: LocaleResolver,
    router: AttributeRouter,
}

impl TranslatableRecord {
    pub fn new(
        schema: &'static ModelSchema,
        config: Arc<TranslatableConfig>,
        locales: Arc<Locales>,
    ) -> Self {
        Self::from_host(HostRecord::new(schema), config, locales)
    }

    /// Wrap an already-loaded host record.
    pub fn from_host(
        host: HostRecord,
        config: Arc<TranslatableConfig>,
        locales: Arc<Locales>,
    ) -> Self {
        let router = AttributeRouter::new(host.schema());
        Self {
            host,
            store: TranslationStore::new(),
            resolver: LocaleResolver::new(config, locales),
            router,
        }
    }

    pub fn host(&self) -> &HostRecord {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut HostRecord {
        &mut self.host
    }

    /// The loaded translation records, in insertion order.
    pub fn translations(&self) -> &[TranslationRecord] {
        self.store.records()
    }

    pub fn store(&self) -> &TranslationStore {
        &self.store
    }

    /// Whether `key` names a translatable attribute.
    pub fn is_translation_attribute(&self, key: &str) -> bool {
        self.router.is_translatable(key)
    }

    pub fn default_locale(&self) -> Option<&str> {
        self.host.default_locale()
    }

    /// Set or clear the instance-level locale override.
    pub fn set_default_locale(&mut self, locale: Option<&str>) -> &mut Self {
        self.host.set_default_locale(locale);
        self
    }

    // ==================== Attribute access ====================

    /// Read an attribute; `key` may carry an explicit locale (`"name:fr"`).
    ///
    /// Native attributes pass through to the host unchanged. For translatable
    /// attributes the value comes from the translation matching the resolved
    /// locale (with fallback per configuration); a registered accessor runs
    /// on the resolved value, the same pipeline native reads use. A missing
    /// translation degrades to the host's own (empty) value.
    pub fn get(&self, key: &str) -> Option<Value> {
        let (attribute, explicit) = self.router.split(key);

        if !self.router.is_translatable(attribute) {
            return self.host.attribute_value(key);
        }

        let locale = match explicit {
            Some(locale) => locale.to_string(),
            None => self.resolver.effective_locale(&self.host),
        };

        if self.get_translation(Some(&locale), None).is_none() {
            return self.host.attribute_value(attribute);
        }

        let value = self.attribute_or_fallback(Some(&locale), attribute);
        match self.host.schema().accessor(attribute) {
            Some(accessor) => Some(accessor(value.as_ref().unwrap_or(&Value::Null))),
            None => value,
        }
    }

    /// Write an attribute; `key` may carry an explicit locale (`"name:fr"`).
    ///
    /// Translatable attributes land on the translation for the resolved
    /// locale, lazily creating it; the host's own attributes are never
    /// touched for translatable keys.
    pub fn set(&mut self, key: &str, value: Value) {
        let (attribute, explicit) = self.router.split(key);

        if !self.router.is_translatable(attribute) {
            self.host.set_attribute(key, value);
            return;
        }

        let locale = match explicit {
            Some(locale) => locale.to_string(),
            None => self.resolver.effective_locale(&self.host),
        };
        let attribute = attribute.to_string();

        self.get_translation_or_new(Some(&locale)).set(&attribute, value);
    }

    /// Bulk-assign attributes.
    ///
    /// An entry whose value is a mapping and whose key is a known locale is
    /// merged into that locale's translation. An `attribute:locale` key with
    /// a known locale and translatable attribute sets that single field.
    /// Everything else passes through to the host's native fill.
    pub fn fill(&mut self, attributes: Map<String, Value>) {
        let mut passthrough = Map::new();

        for (key, value) in attributes {
            if let Value::Object(values) = &value {
                if self.resolver.locales().has(&key) {
                    let translatable = self.host.schema().translatable;
                    self.get_translation_or_new(Some(&key)).fill(values, translatable);
                    continue;
                }
            }

            let (attribute, explicit) = self.router.split(&key);
            let locale = match explicit {
                Some(locale) => locale.to_string(),
                None => self.resolver.effective_locale(&self.host),
            };

            if self.resolver.locales().has(&locale) && self.router.is_translatable(attribute) {
                let attribute = attribute.to_string();
                self.get_translation_or_new(Some(&locale)).set(&attribute, value);
                continue;
            }

            passthrough.insert(key, value);
        }

        self.host.fill_native(passthrough);
    }

    // ==================== Translation resolution ====================

    /// The translation backing a lookup, or `None`.
    ///
    /// Resolution order: exact match, then (with fallback enabled) the
    /// fallback locale, then the configured global fallback when it differs,
    /// then, only when no global fallback is configured at all, a scan of the
    /// configured locales in order, skipping the two already tried.
    pub fn get_translation(
        &self,
        locale: Option<&str>,
        with_fallback: Option<bool>,
    ) -> Option<&TranslationRecord> {
        let config_fallback = self.resolver.fallback_locale(None);
        let locale = match locale {
            Some(locale) => locale.to_string(),
            None => self.resolver.effective_locale(&self.host),
        };
        let with_fallback = with_fallback.unwrap_or_else(|| self.resolver.use_fallback(&self.host));
        let fallback = self.resolver.fallback_locale(Some(&locale));
        let locale_key = self.resolver.locale_key(self.host.schema());

        if let Some(translation) = self.store.by_locale(locale_key, &locale) {
            return Some(translation);
        }

        if with_fallback {
            if let Some(fallback) = &fallback {
                if let Some(translation) = self.store.by_locale(locale_key, fallback) {
                    return Some(translation);
                }

                if let Some(config_fallback) = &config_fallback {
                    if config_fallback != fallback {
                        if let Some(translation) =
                            self.store.by_locale(locale_key, config_fallback)
                        {
                            return Some(translation);
                        }
                    }
                }
            }

            if config_fallback.is_none() {
                for configured in self.resolver.locales().all() {
                    if configured != &locale && Some(configured) != fallback.as_ref() {
                        if let Some(translation) = self.store.by_locale(locale_key, configured) {
                            return Some(translation);
                        }
                    }
                }
            }
        }

        None
    }

    /// The exact-locale translation, or a fresh unsaved one.
    pub fn get_translation_or_new(&mut self, locale: Option<&str>) -> &mut TranslationRecord {
        let locale = match locale {
            Some(locale) => locale.to_string(),
            None => self.resolver.effective_locale(&self.host),
        };
        let locale_key = self.resolver.locale_key(self.host.schema());
        self.store.get_or_new(locale_key, &locale)
    }

    /// Append a fresh unsaved translation for `locale`, unconditionally.
    pub fn new_translation(&mut self, locale: &str) -> &mut TranslationRecord {
        let locale_key = self.resolver.locale_key(self.host.schema());
        self.store.push(TranslationRecord::new(locale_key, locale));
        self.store.records_mut().last_mut().expect("just pushed")
    }

    /// Whether a loaded translation matches the given (or resolved) locale.
    pub fn has_translation(&self, locale: Option<&str>) -> bool {
        let locale = match locale {
            Some(locale) => locale.to_string(),
            None => self.resolver.effective_locale(&self.host),
        };
        let locale_key = self.resolver.locale_key(self.host.schema());

        self.store
            .records()
            .iter()
            .any(|translation| translation.locale(locale_key) == Some(locale.as_str()))
    }

    /// The exact-locale translation, fallback never applied.
    pub fn translate(&self, locale: Option<&str>) -> Option<&TranslationRecord> {
        self.get_translation(locale, Some(false))
    }

    /// The translation with fallback always applied.
    pub fn translate_or_default(&self, locale: Option<&str>) -> Option<&TranslationRecord> {
        self.get_translation(locale, Some(true))
    }

    /// The exact-locale translation, lazily created when missing.
    pub fn translate_or_new(&mut self, locale: Option<&str>) -> &mut TranslationRecord {
        self.get_translation_or_new(locale)
    }

    /// The exact-locale translation, or [`Error::TranslationNotFound`].
    ///
    /// Fallback is never applied here; this is the one read that fails fast.
    pub fn translate_or_fail(&self, locale: &str) -> Result<&TranslationRecord> {
        self.get_translation(Some(locale), Some(false))
            .ok_or_else(|| Error::TranslationNotFound {
                model: self.host.schema().translation_table.to_string(),
                locale: locale.to_string(),
            })
    }

    /// Resolve an attribute value, retrying the fallback locale when the
    /// primary translation is absent or holds an empty value and property
    /// fallback is enabled.
    fn attribute_or_fallback(&self, locale: Option<&str>, attribute: &str) -> Option<Value> {
        let mut translation = self.get_translation(locale, None);

        let empty = translation
            .map(|found| is_empty_attribute(found.get(attribute)))
            .unwrap_or(true);

        if empty && self.resolver.use_property_fallback(&self.host) {
            let fallback = self.resolver.fallback_locale(None);
            translation = self.get_translation(fallback.as_deref(), Some(false));
        }

        translation.and_then(|found| found.get(attribute)).cloned()
    }

    // ==================== Serialization ====================

    /// Serialize the record, injecting each translatable attribute's resolved
    /// value unless autoload is disabled (or unset while the relation is not
    /// loaded and loading on serialize is turned off).
    pub fn to_serializable(&self) -> Map<String, Value> {
        let mut attributes = self.host.attributes_to_array();

        let autoload = self.resolver.config().autoload_translations;
        let skip = autoload == Some(false)
            || (!self.store.is_loaded()
                && !self.resolver.config().load_translations_when_to_array
                && autoload.is_none());
        if skip {
            return attributes;
        }

        for field in self.host.schema().translatable {
            if self.host.schema().is_hidden(field) {
                continue;
            }
            let value = self.attribute_or_fallback(None, field).unwrap_or(Value::Null);
            attributes.insert((*field).to_string(), value);
        }

        attributes
    }

    /// Every loaded translation as `{locale: {attribute: value}}`.
    pub fn translations_map(&self) -> Map<String, Value> {
        let locale_key = self.resolver.locale_key(self.host.schema());
        let mut output = Map::new();

        for translation in self.store.records() {
            let Some(locale) = translation.locale(locale_key) else {
                continue;
            };

            let entry = output
                .entry(locale.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(fields) = entry {
                for attribute in self.host.schema().translatable {
                    fields.insert(
                        (*attribute).to_string(),
                        translation.get(attribute).cloned().unwrap_or(Value::Null),
                    );
                }
            }
        }

        output
    }

    /// A detached copy of the host and every translation, sharing no state
    /// with the original. Nothing on the copy is persisted until saved.
    pub fn replicate_with_translations(&self) -> Self {
        let mut host = self.host.clone();
        host.clear_key();

        let mut store = TranslationStore::new();
        for translation in self.store.records() {
            store.push(translation.replicate(self.host.schema().foreign_key));
        }

        Self {
            host,
            store,
            resolver: self.resolver.clone(),
            router: self.router,
        }
    }

    // ==================== Persistence ====================

    /// Load the translations relation from storage.
    ///
    /// Lookups treat an unloaded relation as empty rather than fetching
    /// implicitly; call this first for hosts that exist in storage.
    pub fn load_translations(&mut self, storage: &dyn TranslationStorage) -> Result<()> {
        let locale_key = self.resolver.locale_key(self.host.schema()).to_string();
        let current = self.resolver.effective_locale(&self.host);

        let records = match self.host.key() {
            Some(key) => storage.load_translations(self.host.schema(), key)?,
            None => Vec::new(),
        };

        debug!(
            count = records.len(),
            table = self.host.schema().translation_table,
            "Loaded translations"
        );
        self.store.set_loaded(records, &locale_key, Some(&current));

        Ok(())
    }

    /// Persist every translation with changes beyond the locale key.
    ///
    /// Returns the cascade's overall success flag; a record that fails to
    /// save flips it and stops further persist attempts without aborting the
    /// walk. An unloaded relation reports success trivially.
    pub fn save_translations(&mut self, storage: &dyn TranslationStorage) -> bool {
        let schema = self.host.schema();
        let locale_key = self.resolver.locale_key(schema).to_string();

        let Some(key) = self.host.key() else {
            let dirty = self
                .store
                .records()
                .iter()
                .any(|record| record.is_dirty_except(&locale_key));
            if dirty {
                warn!(
                    table = schema.translation_table,
                    "Cannot save translations before the host record has a key"
                );
            }
            return !dirty;
        };

        let connection = self.host.connection().map(|name| name.to_string());
        self.store
            .save_dirty(storage, schema, &locale_key, key, connection.as_deref())
    }

    /// Delete translations from storage, optionally only the given locales,
    /// then re-synchronize the in-memory collection.
    pub fn delete_translations(
        &mut self,
        storage: &dyn TranslationStorage,
        locales: Option<&[&str]>,
    ) -> Result<()> {
        let locale_key = self.resolver.locale_key(self.host.schema()).to_string();

        match self.host.key() {
            Some(key) => {
                self.store
                    .delete_all(storage, self.host.schema(), &locale_key, key, locales)
            }
            None => {
                // nothing persisted; re-sync resets the collection
                self.store.set_loaded(Vec::new(), &locale_key, None);
                Ok(())
            }
        }
    }

    /// Persist the host row, then cascade to its translations.
    ///
    /// The boolean is the translation cascade's result; host-row failures
    /// surface as errors.
    pub fn save(&mut self, storage: &dyn TranslationStorage) -> Result<bool> {
        match self.host.key() {
            Some(key) => storage.update_host(self.host.schema(), key, &self.host)?,
            None => {
                storage.insert_host(self.host.schema(), &mut self.host)?;
            }
        }

        Ok(self.save_translations(storage))
    }

    /// Delete the host row; translations go with it when the cascade flag is
    /// configured.
    pub fn delete(&mut self, storage: &dyn TranslationStorage) -> Result<()> {
        let Some(key) = self.host.key() else {
            return Ok(());
        };

        let cascade = self.resolver.config().delete_translations_cascade;
        let locale_key = self.resolver.locale_key(self.host.schema()).to_string();
        storage.delete_host(self.host.schema(), &locale_key, key, cascade)?;
        self.host.clear_key();

        Ok(())
    }
}

/// The emptiness test behind property fallback: absent, null, empty text or
/// empty containers count as empty, as do `false` and zero.
fn is_empty_attribute(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(text)) => text.is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(Value::Object(fields)) => fields.is_empty(),
        Some(Value::Bool(flag)) => !flag,
        Some(Value::Number(number)) => number.as_f64() == Some(0.0),
    }
}
