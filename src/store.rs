//! In-memory collection of translation records attached to one host.

use serde_json::Value;
use tracing::warn;

use crate::error::Result;
use crate::model::{ModelSchema, TranslationRecord};
use crate::storage::TranslationStorage;

/// The translations relation of a single host instance.
///
/// Lookups require the relation to have been loaded; an unloaded store is
/// treated as holding no translations rather than fetching implicitly, so a
/// forgotten load can never turn into a query storm. Writing through
/// [`TranslationStore::get_or_new`] materializes an empty loaded collection
/// first.
#[derive(Debug, Clone, Default)]
pub struct TranslationStore {
    records: Vec<TranslationRecord>,
    loaded: bool,
    /// Index of the single-translation convenience record, checked before
    /// the linear scan.
    eager: Option<usize>,
}

impl TranslationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Replace the collection with freshly loaded records.
    ///
    /// `eager_locale` marks the record backing the single-translation
    /// relation, if one matches.
    pub fn set_loaded(
        &mut self,
        records: Vec<TranslationRecord>,
        locale_key: &str,
        eager_locale: Option<&str>,
    ) {
        self.eager = eager_locale.and_then(|locale| {
            records
                .iter()
                .position(|record| record.locale(locale_key) == Some(locale))
        });
        self.records = records;
        self.loaded = true;
    }

    pub fn records(&self) -> &[TranslationRecord] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut [TranslationRecord] {
        &mut self.records
    }

    /// Exact-match lookup index; the eager record short-circuits the scan.
    pub fn index_of(&self, locale_key: &str, locale: &str) -> Option<usize> {
        if !self.loaded {
            return None;
        }

        if let Some(index) = self.eager {
            if let Some(record) = self.records.get(index) {
                if record.locale(locale_key) == Some(locale) {
                    return Some(index);
                }
            }
        }

        self.records
            .iter()
            .position(|record| record.locale(locale_key) == Some(locale))
    }

    /// Exact-match lookup; `None` for unloaded stores and unknown locales.
    pub fn by_locale(&self, locale_key: &str, locale: &str) -> Option<&TranslationRecord> {
        self.index_of(locale_key, locale).map(|i| &self.records[i])
    }

    pub fn by_locale_mut(
        &mut self,
        locale_key: &str,
        locale: &str,
    ) -> Option<&mut TranslationRecord> {
        self.index_of(locale_key, locale)
            .map(move |i| &mut self.records[i])
    }

    /// The existing record for `locale`, or a fresh unsaved one appended to
    /// the collection. Repeated calls return the same record until the
    /// collection is reloaded.
    pub fn get_or_new(&mut self, locale_key: &str, locale: &str) -> &mut TranslationRecord {
        self.loaded = true;

        match self.index_of(locale_key, locale) {
            Some(index) => &mut self.records[index],
            None => {
                self.records.push(TranslationRecord::new(locale_key, locale));
                self.records.last_mut().expect("just pushed")
            }
        }
    }

    /// Append an already-built record (used when replicating).
    pub fn push(&mut self, record: TranslationRecord) {
        self.loaded = true;
        self.records.push(record);
    }

    /// Persist every record with changes beyond the locale key.
    ///
    /// Records are visited in insertion order. Each save attempt is gated on
    /// the running success flag, so a failure stops further persist attempts
    /// while the loop still walks the remaining records; the flag is the
    /// overall result. An unloaded store reports success trivially.
    pub fn save_dirty(
        &mut self,
        storage: &dyn TranslationStorage,
        schema: &ModelSchema,
        locale_key: &str,
        host_key: i64,
        connection: Option<&str>,
    ) -> bool {
        if !self.loaded {
            return true;
        }

        let mut saved = true;

        for record in &mut self.records {
            if saved && record.is_dirty_except(locale_key) {
                if let Some(connection) = connection {
                    record.set_connection(connection);
                }
                record.set(schema.foreign_key, Value::from(host_key));

                if let Err(error) = storage.save_translation(schema, locale_key, record) {
                    warn!(
                        locale = record.locale(locale_key).unwrap_or("?"),
                        table = schema.translation_table,
                        "Failed to save translation: {error}"
                    );
                    saved = false;
                }
            }
        }

        saved
    }

    /// Delete translations from storage, then re-synchronize the collection
    /// so stale entries are never observed afterward.
    pub fn delete_all(
        &mut self,
        storage: &dyn TranslationStorage,
        schema: &ModelSchema,
        locale_key: &str,
        host_key: i64,
        locales: Option<&[&str]>,
    ) -> Result<()> {
        storage.delete_translations(schema, locale_key, host_key, locales)?;

        let records = storage.load_translations(schema, host_key)?;
        self.set_loaded(records, locale_key, None);

        Ok(())
    }
}
