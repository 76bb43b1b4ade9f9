//! Record types: the static per-model schema, the host record and its
//! satellite translation records.

use serde_json::{Map, Value};

/// Locale column name used when neither the schema nor the configuration
/// overrides it.
pub const DEFAULT_LOCALE_KEY: &str = "locale";

/// A get-accessor: runs a raw attribute value through the model's own
/// casting pipeline before it is handed back to the caller.
pub type Accessor = fn(&Value) -> Value;

/// Static descriptor of a translatable model type.
///
/// Declared once per host type, typically as a `const`. The `translatable`
/// attributes never live on the host table; they exist only as columns of
/// `translation_table`.
#[derive(Debug, Clone, Copy)]
pub struct ModelSchema {
    /// Host table name.
    pub table: &'static str,
    /// Host primary key column.
    pub primary_key: &'static str,
    /// Translation table name (one row per host/locale pair).
    pub translation_table: &'static str,
    /// Foreign key column on the translation table pointing at the host.
    pub foreign_key: &'static str,
    /// Per-model locale column override; `None` defers to configuration.
    pub locale_key: Option<&'static str>,
    /// Attribute names redirected to translation records.
    pub translatable: &'static [&'static str],
    /// Native (host table) attribute columns, excluding the primary key.
    pub native: &'static [&'static str],
    /// Attributes accepted by bulk fill; empty means no restriction.
    pub fillable: &'static [&'static str],
    /// Attributes omitted from serialization.
    pub hidden: &'static [&'static str],
    /// Get-accessors keyed by attribute name.
    pub accessors: &'static [(&'static str, Accessor)],
}

impl ModelSchema {
    /// The locale column for this model, given the configured default.
    pub fn locale_key_or<'a>(&self, configured: &'a str) -> &'a str {
        self.locale_key.unwrap_or(configured)
    }

    /// The get-accessor registered for `attribute`, if any.
    pub fn accessor(&self, attribute: &str) -> Option<Accessor> {
        self.accessors
            .iter()
            .find(|(name, _)| *name == attribute)
            .map(|(_, accessor)| *accessor)
    }

    pub fn is_hidden(&self, attribute: &str) -> bool {
        self.hidden.contains(&attribute)
    }

    pub fn is_fillable(&self, attribute: &str) -> bool {
        self.fillable.is_empty() || self.fillable.contains(&attribute)
    }
}

/// The primary entity being translated.
///
/// Holds only native attributes; translatable attributes are redirected to
/// the attached translation records by the façade.
#[derive(Debug, Clone)]
pub struct HostRecord {
    schema: &'static ModelSchema,
    attributes: Map<String, Value>,
    key: Option<i64>,
    exists: bool,
    default_locale: Option<String>,
    use_translation_fallback: Option<bool>,
    connection: Option<String>,
}

impl HostRecord {
    pub fn new(schema: &'static ModelSchema) -> Self {
        Self {
            schema,
            attributes: Map::new(),
            key: None,
            exists: false,
            default_locale: None,
            use_translation_fallback: None,
            connection: None,
        }
    }

    /// Rebuild a record from a stored row.
    pub fn from_row(schema: &'static ModelSchema, key: i64, attributes: Map<String, Value>) -> Self {
        Self {
            schema,
            attributes,
            key: Some(key),
            exists: true,
            default_locale: None,
            use_translation_fallback: None,
            connection: None,
        }
    }

    pub fn schema(&self) -> &'static ModelSchema {
        self.schema
    }

    pub fn key(&self) -> Option<i64> {
        self.key
    }

    /// Mark the record as persisted under `key`.
    pub fn set_key(&mut self, key: i64) {
        self.key = Some(key);
        self.exists = true;
    }

    pub fn exists(&self) -> bool {
        self.exists
    }

    /// Detach the record from storage (used when replicating).
    pub fn clear_key(&mut self) {
        self.key = None;
        self.exists = false;
    }

    /// Raw attribute value, without the accessor pipeline.
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Attribute value after the registered get-accessor, if any.
    pub fn attribute_value(&self, key: &str) -> Option<Value> {
        let raw = self.attributes.get(key);
        match self.schema.accessor(key) {
            Some(accessor) => Some(accessor(raw.unwrap_or(&Value::Null))),
            None => raw.cloned(),
        }
    }

    pub fn set_attribute(&mut self, key: &str, value: Value) {
        self.attributes.insert(key.to_string(), value);
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    /// Bulk-assign native attributes, honoring the fillable list.
    pub fn fill_native(&mut self, attributes: Map<String, Value>) {
        for (key, value) in attributes {
            if self.schema.is_fillable(&key) {
                self.attributes.insert(key, value);
            }
        }
    }

    /// Native serialization: attributes minus hidden ones, run through their
    /// accessors.
    pub fn attributes_to_array(&self) -> Map<String, Value> {
        let mut output = Map::new();

        for key in self.attributes.keys() {
            if self.schema.is_hidden(key) {
                continue;
            }
            if let Some(value) = self.attribute_value(key) {
                output.insert(key.clone(), value);
            }
        }

        output
    }

    pub fn default_locale(&self) -> Option<&str> {
        self.default_locale.as_deref()
    }

    /// Instance-level locale override consulted before the current locale.
    pub fn set_default_locale(&mut self, locale: Option<&str>) {
        self.default_locale = locale.map(|l| l.to_string());
    }

    pub fn use_translation_fallback(&self) -> Option<bool> {
        self.use_translation_fallback
    }

    /// Instance-level fallback override consulted before the global flag.
    pub fn set_use_translation_fallback(&mut self, use_fallback: Option<bool>) {
        self.use_translation_fallback = use_fallback;
    }

    pub fn connection(&self) -> Option<&str> {
        self.connection.as_deref()
    }

    pub fn set_connection(&mut self, connection: &str) {
        self.connection = Some(connection.to_string());
    }
}

/// Attribute values for one (host, locale) pair.
///
/// Tracks the values as loaded (`original`) alongside the current values, so
/// the persistence cascade can pick out records that actually changed.
#[derive(Debug, Clone)]
pub struct TranslationRecord {
    key: Option<i64>,
    exists: bool,
    attributes: Map<String, Value>,
    original: Map<String, Value>,
    connection: Option<String>,
}

impl TranslationRecord {
    /// A fresh, unsaved translation with its locale pre-set.
    pub fn new(locale_key: &str, locale: &str) -> Self {
        let mut attributes = Map::new();
        attributes.insert(locale_key.to_string(), Value::String(locale.to_string()));

        Self {
            key: None,
            exists: false,
            attributes,
            original: Map::new(),
            connection: None,
        }
    }

    /// Rebuild a translation from a stored row; the row is clean by
    /// definition.
    pub fn from_row(key: i64, attributes: Map<String, Value>) -> Self {
        Self {
            key: Some(key),
            exists: true,
            original: attributes.clone(),
            attributes,
            connection: None,
        }
    }

    pub fn key(&self) -> Option<i64> {
        self.key
    }

    pub fn set_key(&mut self, key: i64) {
        self.key = Some(key);
        self.exists = true;
    }

    pub fn exists(&self) -> bool {
        self.exists
    }

    /// The locale stored under `locale_key`, if set and a string.
    pub fn locale(&self, locale_key: &str) -> Option<&str> {
        self.attributes.get(locale_key).and_then(Value::as_str)
    }

    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.attributes.get(attribute)
    }

    pub fn set(&mut self, attribute: &str, value: Value) {
        self.attributes.insert(attribute.to_string(), value);
    }

    /// Merge a set of field values; `allowed` restricts which keys land.
    pub fn fill(&mut self, values: &Map<String, Value>, allowed: &[&str]) {
        for (key, value) in values {
            if allowed.contains(&key.as_str()) {
                self.attributes.insert(key.clone(), value.clone());
            }
        }
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    /// Attribute names whose value differs from the loaded state.
    pub fn dirty_attributes(&self) -> Vec<&str> {
        self.attributes
            .iter()
            .filter(|(key, value)| self.original.get(*key) != Some(*value))
            .map(|(key, _)| key.as_str())
            .collect()
    }

    /// Whether any attribute other than the locale key changed.
    pub fn is_dirty_except(&self, locale_key: &str) -> bool {
        self.dirty_attributes()
            .iter()
            .any(|attribute| *attribute != locale_key)
    }

    /// Mark the current values as the persisted state.
    pub fn sync_original(&mut self) {
        self.original = self.attributes.clone();
    }

    pub fn connection(&self) -> Option<&str> {
        self.connection.as_deref()
    }

    pub fn set_connection(&mut self, connection: &str) {
        self.connection = Some(connection.to_string());
    }

    /// A detached copy: unsaved, with the foreign key cleared and every
    /// field counted as a pending change.
    pub fn replicate(&self, foreign_key: &str) -> Self {
        let mut attributes = self.attributes.clone();
        attributes.remove(foreign_key);

        Self {
            key: None,
            exists: false,
            attributes,
            original: Map::new(),
            connection: None,
        }
    }
}
