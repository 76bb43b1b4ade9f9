//! Locale-prefixed route registration and locale-aware URL generation.
//!
//! Thin sugar over the locale list: every supported locale gets its own
//! prefixed copy of the route tree, and URLs can be rewritten from one locale
//! prefix to another. Nothing here touches records or storage.

use axum::{Extension, Router};

use crate::config::TranslatableConfig;
use crate::locales::Locales;

/// The locale a localized route group was registered under.
///
/// Injected as a request extension when `use_locale_middleware` is on.
#[derive(Debug, Clone)]
pub struct CurrentLocale(String);

impl CurrentLocale {
    fn new(locale: &str) -> Self {
        Self(locale.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Per-call overrides for [`localized_routes`]; `None` defers to the
/// configuration.
#[derive(Debug, Clone, Default)]
pub struct LocalizedRoutesOptions {
    pub supported_locales: Option<Vec<String>>,
    pub omit_url_prefix_for_locale: Option<String>,
    pub use_locale_middleware: Option<bool>,
}

/// Register `base` once per supported locale, prefixed with that locale.
///
/// The omitted locale (if any) is registered last and merged at the root, so
/// root-level path placeholders cannot shadow the prefixed groups. With the
/// locale middleware enabled, each group carries a [`CurrentLocale`]
/// extension handlers can extract.
pub fn localized_routes(
    base: Router,
    config: &TranslatableConfig,
    locales: &Locales,
    options: &LocalizedRoutesOptions,
) -> Router {
    let supported = options
        .supported_locales
        .clone()
        .unwrap_or_else(|| supported_locales(config, locales));
    let omit = options
        .omit_url_prefix_for_locale
        .clone()
        .or_else(|| config.omit_url_prefix_for_locale.clone());
    let with_middleware = options
        .use_locale_middleware
        .unwrap_or(config.use_locale_middleware);

    let mut ordered = supported;
    if let Some(omit) = &omit {
        ordered.retain(|locale| locale != omit);
        ordered.push(omit.clone());
    }

    let mut app = Router::new();
    for locale in ordered {
        let mut group = base.clone();
        if with_middleware {
            group = group.layer(Extension(CurrentLocale::new(&locale)));
        }

        if Some(&locale) == omit.as_ref() {
            app = app.merge(group);
        } else {
            app = app.nest(&format!("/{locale}"), group);
        }
    }

    app
}

/// Builds URLs for a target locale and inspects locale prefixes.
#[derive(Debug, Clone)]
pub struct LocalizedUrlGenerator {
    supported: Vec<String>,
    omit: Option<String>,
}

impl LocalizedUrlGenerator {
    pub fn new(config: &TranslatableConfig, locales: &Locales) -> Self {
        Self {
            supported: supported_locales(config, locales),
            omit: config.omit_url_prefix_for_locale.clone(),
        }
    }

    /// The supported locale `path` is prefixed with, if any.
    pub fn locale_of<'p>(&self, path: &'p str) -> Option<&'p str> {
        let path = path.split('?').next().unwrap_or(path);
        let first = path.trim_start_matches('/').split('/').next().unwrap_or("");

        if !first.is_empty() && self.supported.iter().any(|locale| locale == first) {
            Some(first)
        } else {
            None
        }
    }

    /// Whether `path` starts with a supported locale prefix.
    pub fn is_localized(&self, path: &str) -> bool {
        self.locale_of(path).is_some()
    }

    /// Rewrite `path` for `locale`: any existing supported-locale prefix is
    /// stripped, then the target prefix applied. The omitted locale (and any
    /// unsupported target) yields the bare path. Query strings survive.
    pub fn localized_url(&self, locale: &str, path: &str) -> String {
        let (path, query) = match path.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (path, None),
        };

        let stripped = self.strip_locale_prefix(path);
        let prefixed = if self.supported.iter().any(|supported| supported == locale)
            && self.omit.as_deref() != Some(locale)
        {
            if stripped == "/" {
                format!("/{locale}")
            } else {
                format!("/{locale}{stripped}")
            }
        } else {
            stripped.to_string()
        };

        match query {
            Some(query) => format!("{prefixed}?{query}"),
            None => prefixed,
        }
    }

    fn strip_locale_prefix<'p>(&self, path: &'p str) -> &'p str {
        match self.locale_of(path) {
            Some(locale) => {
                let rest = &path.trim_start_matches('/')[locale.len()..];
                if rest.is_empty() {
                    "/"
                } else {
                    rest
                }
            }
            None if path.is_empty() => "/",
            None => path,
        }
    }
}

fn supported_locales(config: &TranslatableConfig, locales: &Locales) -> Vec<String> {
    if config.supported_locales.is_empty() {
        locales.all().to_vec()
    } else {
        config.supported_locales.clone()
    }
}
