use thiserror::Error;

/// Errors surfaced by the translation layer.
///
/// Plain attribute reads never produce these; a missing translation or an
/// unknown attribute degrades to an absent value instead. Errors are reserved
/// for missing configuration, fail-fast lookups and explicit storage calls.
#[derive(Debug, Error)]
pub enum Error {
    /// The locale list is wholly unconfigured.
    #[error(
        "no locales configured: set `TranslatableConfig::locales` \
         (or the TRANSLATABLE_LOCALES environment variable) before building records"
    )]
    LocalesNotDefined,

    /// Raised only by fail-fast lookups (`translate_or_fail`).
    #[error("no translation found for `{model}` and locale `{locale}`")]
    TranslationNotFound { model: String, locale: String },

    /// Underlying SQLite failure during an explicit load, save or delete.
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
