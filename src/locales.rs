//! Locale list provider.
//!
//! The ordered set of configured locales plus the notion of a "current"
//! locale. Construction validates the configured list; an empty list is a
//! configuration error surfaced immediately rather than silently defaulted.

use std::sync::OnceLock;

use regex::Regex;
use tracing::warn;

use crate::config::TranslatableConfig;
use crate::error::{Error, Result};

/// Separator between the language and country parts of a locale (`en-US`).
const COUNTRY_SEPARATOR: char = '-';

/// Shape accepted for configured locales: a language code, optionally
/// followed by a region/script part (`en`, `en-US`, `zh-Hans`).
static LOCALE_SHAPE: OnceLock<Regex> = OnceLock::new();

fn locale_shape() -> &'static Regex {
    LOCALE_SHAPE.get_or_init(|| {
        Regex::new(r"^[A-Za-z]{2,3}(-[A-Za-z0-9]{2,8})?$").expect("locale pattern is valid")
    })
}

/// Ordered collection of configured locales with a current locale.
///
/// Immutable once built; use [`Locales::with_current`] to derive a provider
/// pointing at a different current locale instead of mutating shared state.
#[derive(Debug, Clone)]
pub struct Locales {
    supported: Vec<String>,
    current: String,
}

impl Locales {
    /// Build the provider from configuration.
    ///
    /// Malformed entries are skipped with a warning; duplicates keep their
    /// first position. Fails with [`Error::LocalesNotDefined`] when nothing
    /// usable remains.
    pub fn new(config: &TranslatableConfig) -> Result<Self> {
        let mut supported: Vec<String> = Vec::with_capacity(config.locales.len());

        for locale in &config.locales {
            if !locale_shape().is_match(locale) {
                warn!("Skipping malformed locale {:?} in configuration", locale);
                continue;
            }
            if !supported.iter().any(|known| known == locale) {
                supported.push(locale.clone());
            }
        }

        if supported.is_empty() {
            return Err(Error::LocalesNotDefined);
        }

        Ok(Self {
            supported,
            current: config.locale.clone(),
        })
    }

    /// All configured locales, in configuration order.
    pub fn all(&self) -> &[String] {
        &self.supported
    }

    /// The current locale.
    pub fn current(&self) -> &str {
        &self.current
    }

    /// A copy of this provider with a different current locale.
    pub fn with_current(&self, locale: &str) -> Self {
        Self {
            supported: self.supported.clone(),
            current: locale.to_string(),
        }
    }

    /// Whether `candidate` is one of the configured locales.
    pub fn has(&self, candidate: &str) -> bool {
        self.supported.iter().any(|locale| locale == candidate)
    }

    /// Whether `locale` carries a country/region part (e.g. `en-US`).
    pub fn is_locale_country_based(&self, locale: &str) -> bool {
        locale.contains(COUNTRY_SEPARATOR)
    }

    /// The language part of a country-based locale (`en-US` -> `en`).
    ///
    /// Returns `None` when the locale has no country part or the language
    /// part is empty.
    pub fn language_from_country_based_locale(&self, locale: &str) -> Option<String> {
        if !self.is_locale_country_based(locale) {
            return None;
        }

        locale
            .split(COUNTRY_SEPARATOR)
            .next()
            .filter(|language| !language.is_empty())
            .map(|language| language.to_string())
    }
}
