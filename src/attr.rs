//! Attribute key classification and `attribute:locale` splitting.

use crate::model::ModelSchema;

/// Separator between an attribute name and an explicit locale in a key.
const LOCALE_SEPARATOR: char = ':';

/// Classifies attribute keys as translatable or native and splits
/// `attribute:locale` keys into their parts.
#[derive(Debug, Clone, Copy)]
pub struct AttributeRouter {
    translatable: &'static [&'static str],
}

impl AttributeRouter {
    pub fn new(schema: &ModelSchema) -> Self {
        Self {
            translatable: schema.translatable,
        }
    }

    /// Whether `attribute` is redirected to translation records.
    pub fn is_translatable(&self, attribute: &str) -> bool {
        self.translatable.contains(&attribute)
    }

    /// Split a key into `(attribute, explicit locale)`.
    ///
    /// A key without the separator is all attribute; the caller supplies the
    /// effective locale. Keys with more than one separator keep the first two
    /// parts (`"a:b:c"` -> `("a", Some("b"))`); extra parts are dropped, never
    /// reinterpreted.
    pub fn split<'k>(&self, key: &'k str) -> (&'k str, Option<&'k str>) {
        if !key.contains(LOCALE_SEPARATOR) {
            return (key, None);
        }

        let mut parts = key.split(LOCALE_SEPARATOR);
        let attribute = parts.next().unwrap_or(key);
        (attribute, parts.next())
    }
}
