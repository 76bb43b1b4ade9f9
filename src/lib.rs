//! Per-locale attribute translation for SQLite-backed records.
//!
//! Each translatable record owns satellite translation rows (one per locale);
//! reads and writes of designated attributes are transparently redirected to
//! the translation matching the resolved locale, with configurable fallback
//! when the exact locale is missing. A thin routing layer registers
//! locale-prefixed route groups and builds locale-aware URLs.
//!
//! # Architecture
//!
//! - `config`: one explicit configuration object, never mutated after setup
//! - `locales`: the ordered locale list and the current locale
//! - `resolver`: effective/fallback locale computation
//! - `attr`: `attribute:locale` key splitting and classification
//! - `store`: the in-memory translation collection of one host
//! - `model`: schema descriptors plus host and translation records
//! - `translatable`: the record façade composing all of the above
//! - `storage`: the SQLite persistence layer
//! - `routing`: locale-prefixed axum route groups and URL generation
//!
//! # Example
//!
//! ```rust,ignore
//! use translatable::{Locales, TranslatableConfig, TranslatableRecord};
//!
//! let config = Arc::new(TranslatableConfig {
//!     locales: vec!["en".into(), "fr".into()],
//!     ..TranslatableConfig::default()
//! });
//! let locales = Arc::new(Locales::new(&config)?);
//!
//! let mut vegetable = TranslatableRecord::new(&VEGETABLE, config, locales);
//! vegetable.set("name:fr", json!("Pomme de terre"));
//! assert_eq!(vegetable.get("name:fr"), Some(json!("Pomme de terre")));
//! ```

pub mod attr;
pub mod config;
pub mod error;
pub mod locales;
pub mod model;
pub mod resolver;
pub mod routing;
pub mod storage;
pub mod store;
pub mod translatable;

pub use attr::AttributeRouter;
pub use config::TranslatableConfig;
pub use error::{Error, Result};
pub use locales::Locales;
pub use model::{Accessor, HostRecord, ModelSchema, TranslationRecord, DEFAULT_LOCALE_KEY};
pub use resolver::LocaleResolver;
pub use routing::{
    localized_routes, CurrentLocale, LocalizedRoutesOptions, LocalizedUrlGenerator,
};
pub use storage::{Database, TranslationStorage};
pub use store::TranslationStore;
pub use translatable::TranslatableRecord;
