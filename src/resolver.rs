//! Locale resolution: which locale(s) a lookup should try.
//!
//! Pure functions over record state, the shared configuration and the locale
//! list provider. The resolver never touches storage.

use std::sync::Arc;

use crate::config::TranslatableConfig;
use crate::locales::Locales;
use crate::model::{HostRecord, ModelSchema};

/// Computes the effective and fallback locales for a lookup.
#[derive(Debug, Clone)]
pub struct LocaleResolver {
    config: Arc<TranslatableConfig>,
    locales: Arc<Locales>,
}

impl LocaleResolver {
    pub fn new(config: Arc<TranslatableConfig>, locales: Arc<Locales>) -> Self {
        Self { config, locales }
    }

    pub fn config(&self) -> &TranslatableConfig {
        &self.config
    }

    pub fn locales(&self) -> &Locales {
        &self.locales
    }

    /// The locale a read/write targets when no explicit locale is given:
    /// the record's override if set, else the current locale.
    pub fn effective_locale(&self, record: &HostRecord) -> String {
        match record.default_locale() {
            Some(locale) => locale.to_string(),
            None => self.locales.current().to_string(),
        }
    }

    /// The fallback locale for a lookup.
    ///
    /// A country-based requested locale falls back to its language part when
    /// one can be derived; that derivation takes precedence over the
    /// configured global fallback locale.
    pub fn fallback_locale(&self, requested: Option<&str>) -> Option<String> {
        if let Some(locale) = requested {
            if self.locales.is_locale_country_based(locale) {
                if let Some(language) = self.locales.language_from_country_based_locale(locale) {
                    return Some(language);
                }
            }
        }

        self.config.fallback_locale.clone()
    }

    /// Whether fallback applies for this record: the instance flag when set,
    /// else the global default.
    pub fn use_fallback(&self, record: &HostRecord) -> bool {
        record
            .use_translation_fallback()
            .unwrap_or(self.config.use_fallback)
    }

    /// Per-attribute fallback only applies when per-locale fallback does.
    pub fn use_property_fallback(&self, record: &HostRecord) -> bool {
        self.use_fallback(record) && self.config.use_property_fallback
    }

    /// The locale column name for `schema` under the current configuration.
    pub fn locale_key<'a>(&'a self, schema: &ModelSchema) -> &'a str {
        schema.locale_key_or(&self.config.locale_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: ModelSchema = ModelSchema {
        table: "vegetables",
        primary_key: "id",
        translation_table: "vegetable_translations",
        foreign_key: "vegetable_id",
        locale_key: None,
        translatable: &["name"],
        native: &["quantity"],
        fillable: &[],
        hidden: &[],
        accessors: &[],
    };

    fn resolver_with(config: TranslatableConfig) -> LocaleResolver {
        let locales = Locales::new(&config).expect("Should build locales");
        LocaleResolver::new(Arc::new(config), Arc::new(locales))
    }

    fn base_config() -> TranslatableConfig {
        TranslatableConfig {
            locales: vec![
                "el".to_string(),
                "en".to_string(),
                "fr".to_string(),
                "de".to_string(),
                "en-GB".to_string(),
                "en-US".to_string(),
            ],
            ..TranslatableConfig::default()
        }
    }

    // ==================== Effective Locale Tests ====================

    #[test]
    fn test_effective_locale_uses_current_by_default() {
        let resolver = resolver_with(base_config());
        let record = HostRecord::new(&SCHEMA);
        assert_eq!(resolver.effective_locale(&record), "en");
    }

    #[test]
    fn test_effective_locale_prefers_record_override() {
        let resolver = resolver_with(base_config());
        let mut record = HostRecord::new(&SCHEMA);
        record.set_default_locale(Some("fr"));
        assert_eq!(resolver.effective_locale(&record), "fr");
    }

    #[test]
    fn test_clearing_the_override_restores_current_locale() {
        let resolver = resolver_with(base_config());
        let mut record = HostRecord::new(&SCHEMA);
        record.set_default_locale(Some("fr"));
        record.set_default_locale(None);
        assert_eq!(resolver.effective_locale(&record), "en");
    }

    // ==================== Fallback Locale Tests ====================

    #[test]
    fn test_fallback_locale_absent_without_configuration() {
        let resolver = resolver_with(base_config());
        assert_eq!(resolver.fallback_locale(Some("de")), None);
        assert_eq!(resolver.fallback_locale(None), None);
    }

    #[test]
    fn test_fallback_locale_uses_configured_global() {
        let mut config = base_config();
        config.fallback_locale = Some("en".to_string());
        let resolver = resolver_with(config);
        assert_eq!(resolver.fallback_locale(Some("de")), Some("en".to_string()));
    }

    #[test]
    fn test_country_derivation_beats_configured_global() {
        let mut config = base_config();
        config.fallback_locale = Some("el".to_string());
        let resolver = resolver_with(config);
        assert_eq!(
            resolver.fallback_locale(Some("en-US")),
            Some("en".to_string())
        );
    }

    #[test]
    fn test_country_derivation_applies_without_configured_global() {
        let resolver = resolver_with(base_config());
        assert_eq!(
            resolver.fallback_locale(Some("en-GB")),
            Some("en".to_string())
        );
    }

    // ==================== Fallback Flag Tests ====================

    #[test]
    fn test_use_fallback_defaults_to_config() {
        let mut config = base_config();
        config.use_fallback = true;
        let resolver = resolver_with(config);
        let record = HostRecord::new(&SCHEMA);
        assert!(resolver.use_fallback(&record));
    }

    #[test]
    fn test_instance_flag_overrides_config() {
        let mut config = base_config();
        config.use_fallback = true;
        let resolver = resolver_with(config);
        let mut record = HostRecord::new(&SCHEMA);
        record.set_use_translation_fallback(Some(false));
        assert!(!resolver.use_fallback(&record));

        record.set_use_translation_fallback(Some(true));
        assert!(resolver.use_fallback(&record));
    }

    #[test]
    fn test_property_fallback_requires_locale_fallback() {
        let mut config = base_config();
        config.use_property_fallback = true;
        config.use_fallback = false;
        let resolver = resolver_with(config);
        let record = HostRecord::new(&SCHEMA);
        assert!(!resolver.use_property_fallback(&record));
    }

    #[test]
    fn test_property_fallback_enabled_with_both_flags() {
        let mut config = base_config();
        config.use_property_fallback = true;
        config.use_fallback = true;
        let resolver = resolver_with(config);
        let record = HostRecord::new(&SCHEMA);
        assert!(resolver.use_property_fallback(&record));
    }

    // ==================== Locale Key Tests ====================

    #[test]
    fn test_locale_key_from_config() {
        let mut config = base_config();
        config.locale_key = "lang".to_string();
        let resolver = resolver_with(config);
        assert_eq!(resolver.locale_key(&SCHEMA), "lang");
    }

    #[test]
    fn test_locale_key_schema_override_wins() {
        const OVERRIDDEN: ModelSchema = ModelSchema {
            locale_key: Some("language"),
            ..SCHEMA
        };
        let resolver = resolver_with(base_config());
        assert_eq!(resolver.locale_key(&OVERRIDDEN), "language");
    }
}
