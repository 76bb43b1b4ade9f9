use serde::{Deserialize, Serialize};

use crate::model::DEFAULT_LOCALE_KEY;

/// Configuration for the translation layer.
///
/// One explicit object passed at construction time; nothing here is mutated
/// after a record has been built. `autoload_translations` replaces the usual
/// process-wide enable/disable toggle: `None` defers to
/// `load_translations_when_to_array`, `Some(bool)` forces the behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslatableConfig {
    /// Ordered list of locales translations may use (e.g. `["en", "fr", "en-US"]`).
    pub locales: Vec<String>,

    /// The application's current locale, used when a record has no override.
    pub locale: String,

    /// Column name holding the locale on translation records.
    pub locale_key: String,

    /// Global fallback locale consulted when the requested locale is missing.
    pub fallback_locale: Option<String>,

    /// Whether reads fall back to other locales at all.
    pub use_fallback: bool,

    /// Whether an empty attribute value on the found translation retries the
    /// fallback locale (per-attribute rather than per-locale fallback).
    pub use_property_fallback: bool,

    /// Whether serialization injects translated attributes when the
    /// translations relation was not explicitly loaded.
    pub load_translations_when_to_array: bool,

    /// Forced serialization behavior; `None` means "decide per the flag above".
    pub autoload_translations: Option<bool>,

    /// Whether deleting a host record also deletes its translations.
    pub delete_translations_cascade: bool,

    // Routing
    /// Locales exposed by the localized router; empty means "same as `locales`".
    pub supported_locales: Vec<String>,

    /// Locale registered at the URL root instead of under its own prefix.
    pub omit_url_prefix_for_locale: Option<String>,

    /// Whether localized route groups carry a current-locale extension.
    pub use_locale_middleware: bool,
}

impl Default for TranslatableConfig {
    fn default() -> Self {
        Self {
            locales: Vec::new(),
            locale: "en".to_string(),
            locale_key: DEFAULT_LOCALE_KEY.to_string(),
            fallback_locale: None,
            use_fallback: false,
            use_property_fallback: false,
            load_translations_when_to_array: true,
            autoload_translations: None,
            delete_translations_cascade: false,
            supported_locales: Vec::new(),
            omit_url_prefix_for_locale: None,
            use_locale_middleware: false,
        }
    }
}

impl TranslatableConfig {
    /// Build a configuration from `TRANSLATABLE_*` environment variables.
    ///
    /// Every key has a default, so this never fails; an empty locale list is
    /// only rejected later, when the locale provider is constructed.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            locales: std::env::var("TRANSLATABLE_LOCALES")
                .map(|v| split_csv(&v))
                .unwrap_or(defaults.locales),
            locale: std::env::var("TRANSLATABLE_LOCALE").unwrap_or(defaults.locale),
            locale_key: std::env::var("TRANSLATABLE_LOCALE_KEY").unwrap_or(defaults.locale_key),
            fallback_locale: std::env::var("TRANSLATABLE_FALLBACK_LOCALE")
                .ok()
                .filter(|v| !v.is_empty()),
            use_fallback: env_bool("TRANSLATABLE_USE_FALLBACK", defaults.use_fallback),
            use_property_fallback: env_bool(
                "TRANSLATABLE_USE_PROPERTY_FALLBACK",
                defaults.use_property_fallback,
            ),
            load_translations_when_to_array: env_bool(
                "TRANSLATABLE_LOAD_TRANSLATIONS_WHEN_TO_ARRAY",
                defaults.load_translations_when_to_array,
            ),
            autoload_translations: std::env::var("TRANSLATABLE_AUTOLOAD_TRANSLATIONS")
                .ok()
                .and_then(|v| parse_bool(&v)),
            delete_translations_cascade: env_bool(
                "TRANSLATABLE_DELETE_TRANSLATIONS_CASCADE",
                defaults.delete_translations_cascade,
            ),
            supported_locales: std::env::var("TRANSLATABLE_SUPPORTED_LOCALES")
                .map(|v| split_csv(&v))
                .unwrap_or(defaults.supported_locales),
            omit_url_prefix_for_locale: std::env::var("TRANSLATABLE_OMIT_URL_PREFIX_FOR_LOCALE")
                .ok()
                .filter(|v| !v.is_empty()),
            use_locale_middleware: env_bool(
                "TRANSLATABLE_USE_LOCALE_MIDDLEWARE",
                defaults.use_locale_middleware,
            ),
        }
    }
}

fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .and_then(|v| parse_bool(&v))
        .unwrap_or(default)
}
