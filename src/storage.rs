//! SQLite-backed persistence for host and translation records.
//!
//! [`TranslationStorage`] is the seam the in-memory layer talks through;
//! [`Database`] implements it over rusqlite. Column names come from static
//! [`ModelSchema`] declarations, never from runtime input.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use serde_json::{Map, Value};
use tracing::info;

use crate::error::Result;
use crate::model::{HostRecord, ModelSchema, TranslationRecord};

/// Storage operations the translation layer requires of its backend.
pub trait TranslationStorage {
    /// Insert a host row, assigning its new key.
    fn insert_host(&self, schema: &ModelSchema, host: &mut HostRecord) -> Result<i64>;

    /// Update an existing host row.
    fn update_host(&self, schema: &ModelSchema, key: i64, host: &HostRecord) -> Result<()>;

    /// Delete a host row; with `cascade`, its translations go first.
    fn delete_host(
        &self,
        schema: &ModelSchema,
        locale_key: &str,
        key: i64,
        cascade: bool,
    ) -> Result<()>;

    /// All translations of one host, in primary-key order.
    fn load_translations(
        &self,
        schema: &ModelSchema,
        host_key: i64,
    ) -> Result<Vec<TranslationRecord>>;

    /// Insert or update one translation; marks the record clean on success.
    fn save_translation(
        &self,
        schema: &ModelSchema,
        locale_key: &str,
        record: &mut TranslationRecord,
    ) -> Result<()>;

    /// Delete a host's translations, optionally only those in `locales`.
    /// Returns the number of rows removed.
    fn delete_translations(
        &self,
        schema: &ModelSchema,
        locale_key: &str,
        host_key: i64,
        locales: Option<&[&str]>,
    ) -> Result<usize>;
}

#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) a database file.
    pub fn new(database_path: &str) -> Result<Self> {
        let conn = Connection::open(database_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// An in-memory database, gone when the handle is dropped.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create the host and translation tables for `schema`.
    ///
    /// The translation table carries the unique `(foreign key, locale)`
    /// constraint that backs the one-translation-per-locale invariant.
    /// Attribute columns are declared without a type so values keep the
    /// representation they were bound with.
    pub fn create_tables(&self, schema: &ModelSchema, locale_key: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();

        let native_columns: String = schema
            .native
            .iter()
            .map(|column| format!("{}, ", quote(column)))
            .collect();

        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {} (
                    {} INTEGER PRIMARY KEY AUTOINCREMENT,
                    {}\"created_at\" TEXT,
                    \"updated_at\" TEXT
                )",
                quote(schema.table),
                quote(schema.primary_key),
                native_columns,
            ),
            [],
        )?;

        let translatable_columns: String = schema
            .translatable
            .iter()
            .map(|column| format!("{}, ", quote(column)))
            .collect();

        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {} (
                    \"id\" INTEGER PRIMARY KEY AUTOINCREMENT,
                    {} INTEGER NOT NULL,
                    {} TEXT NOT NULL,
                    {}UNIQUE ({}, {})
                )",
                quote(schema.translation_table),
                quote(schema.foreign_key),
                quote(locale_key),
                translatable_columns,
                quote(schema.foreign_key),
                quote(locale_key),
            ),
            [],
        )?;

        conn.execute(
            &format!(
                "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
                quote(&format!("{}_{}_index", schema.translation_table, locale_key)),
                quote(schema.translation_table),
                quote(locale_key),
            ),
            [],
        )?;

        info!(
            table = schema.table,
            translation_table = schema.translation_table,
            "Created translation tables"
        );

        Ok(())
    }

    /// Load a host row by primary key.
    pub fn find_host(&self, schema: &'static ModelSchema, key: i64) -> Result<Option<HostRecord>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare(&format!(
            "SELECT * FROM {} WHERE {} = ?1",
            quote(schema.table),
            quote(schema.primary_key),
        ))?;
        let names: Vec<String> = stmt.column_names().iter().map(|n| n.to_string()).collect();

        let host = stmt
            .query_row(params![key], |row| {
                let mut attributes = Map::new();
                for (index, name) in names.iter().enumerate() {
                    if name == schema.primary_key {
                        continue;
                    }
                    attributes.insert(name.clone(), from_sql_value(row.get_ref(index)?));
                }
                Ok(HostRecord::from_row(schema, key, attributes))
            })
            .optional()?;

        Ok(host)
    }

    /// Keys of hosts that have a translation in `locale`.
    pub fn host_ids_translated_in(
        &self,
        schema: &ModelSchema,
        locale_key: &str,
        locale: &str,
    ) -> Result<Vec<i64>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare(&format!(
            "SELECT DISTINCT {} FROM {} WHERE {} = ?1 ORDER BY {}",
            quote(schema.foreign_key),
            quote(schema.translation_table),
            quote(locale_key),
            quote(schema.foreign_key),
        ))?;

        let keys = stmt
            .query_map(params![locale], |row| row.get(0))?
            .collect::<std::result::Result<Vec<i64>, _>>()?;

        Ok(keys)
    }

    /// Keys of hosts whose translation has `attribute = value`, optionally
    /// restricted to one locale.
    pub fn host_ids_where_translation(
        &self,
        schema: &ModelSchema,
        locale_key: &str,
        attribute: &str,
        value: &Value,
        locale: Option<&str>,
    ) -> Result<Vec<i64>> {
        let conn = self.conn.lock().unwrap();

        let mut sql = format!(
            "SELECT DISTINCT {} FROM {} WHERE {} = ?1",
            quote(schema.foreign_key),
            quote(schema.translation_table),
            quote(attribute),
        );
        let mut values: Vec<SqlValue> = vec![to_sql_value(value)];

        if let Some(locale) = locale {
            sql.push_str(&format!(" AND {} = ?2", quote(locale_key)));
            values.push(SqlValue::Text(locale.to_string()));
        }
        sql.push_str(&format!(" ORDER BY {}", quote(schema.foreign_key)));

        let mut stmt = conn.prepare(&sql)?;
        let keys = stmt
            .query_map(params_from_iter(values), |row| row.get(0))?
            .collect::<std::result::Result<Vec<i64>, _>>()?;

        Ok(keys)
    }
}

impl TranslationStorage for Database {
    /// Insert a host row, stamping timestamps and assigning the new key.
    fn insert_host(&self, schema: &ModelSchema, host: &mut HostRecord) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();

        let mut columns: Vec<String> = Vec::new();
        let mut values: Vec<SqlValue> = Vec::new();

        for column in schema.native {
            columns.push(quote(column));
            values.push(to_sql_value(
                host.attribute(column).unwrap_or(&Value::Null),
            ));
        }
        columns.push(quote("created_at"));
        values.push(SqlValue::Text(now.clone()));
        columns.push(quote("updated_at"));
        values.push(SqlValue::Text(now));

        conn.execute(
            &format!(
                "INSERT INTO {} ({}) VALUES ({})",
                quote(schema.table),
                columns.join(", "),
                placeholders(columns.len()),
            ),
            params_from_iter(values),
        )?;

        let key = conn.last_insert_rowid();
        host.set_key(key);

        Ok(key)
    }

    /// Update a host row's native attributes and `updated_at`.
    fn update_host(&self, schema: &ModelSchema, key: i64, host: &HostRecord) -> Result<()> {
        let conn = self.conn.lock().unwrap();

        let mut assignments: Vec<String> = Vec::new();
        let mut values: Vec<SqlValue> = Vec::new();

        for column in schema.native {
            assignments.push(format!("{} = ?{}", quote(column), assignments.len() + 1));
            values.push(to_sql_value(
                host.attribute(column).unwrap_or(&Value::Null),
            ));
        }
        assignments.push(format!("\"updated_at\" = ?{}", assignments.len() + 1));
        values.push(SqlValue::Text(Utc::now().to_rfc3339()));
        values.push(SqlValue::Integer(key));

        conn.execute(
            &format!(
                "UPDATE {} SET {} WHERE {} = ?{}",
                quote(schema.table),
                assignments.join(", "),
                quote(schema.primary_key),
                values.len(),
            ),
            params_from_iter(values),
        )?;

        Ok(())
    }

    /// Delete a host row; with `cascade`, its translations go first.
    fn delete_host(
        &self,
        schema: &ModelSchema,
        locale_key: &str,
        key: i64,
        cascade: bool,
    ) -> Result<()> {
        if cascade {
            self.delete_translations(schema, locale_key, key, None)?;
        }

        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "DELETE FROM {} WHERE {} = ?1",
                quote(schema.table),
                quote(schema.primary_key),
            ),
            params![key],
        )?;

        Ok(())
    }

    fn load_translations(
        &self,
        schema: &ModelSchema,
        host_key: i64,
    ) -> Result<Vec<TranslationRecord>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare(&format!(
            "SELECT * FROM {} WHERE {} = ?1 ORDER BY \"id\"",
            quote(schema.translation_table),
            quote(schema.foreign_key),
        ))?;
        let names: Vec<String> = stmt.column_names().iter().map(|n| n.to_string()).collect();

        let records = stmt
            .query_map(params![host_key], |row| {
                let mut key = 0i64;
                let mut attributes = Map::new();
                for (index, name) in names.iter().enumerate() {
                    if name == "id" {
                        key = row.get(index)?;
                    } else {
                        attributes.insert(name.clone(), from_sql_value(row.get_ref(index)?));
                    }
                }
                Ok(TranslationRecord::from_row(key, attributes))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    fn save_translation(
        &self,
        schema: &ModelSchema,
        locale_key: &str,
        record: &mut TranslationRecord,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();

        let mut columns: Vec<&str> = vec![schema.foreign_key, locale_key];
        columns.extend(schema.translatable);
        columns.retain(|column| record.get(column).is_some());

        match record.key() {
            Some(key) if record.exists() => {
                let assignments: Vec<String> = columns
                    .iter()
                    .enumerate()
                    .map(|(index, column)| format!("{} = ?{}", quote(column), index + 1))
                    .collect();
                let mut values: Vec<SqlValue> = columns
                    .iter()
                    .map(|column| to_sql_value(record.get(column).unwrap_or(&Value::Null)))
                    .collect();
                values.push(SqlValue::Integer(key));

                conn.execute(
                    &format!(
                        "UPDATE {} SET {} WHERE \"id\" = ?{}",
                        quote(schema.translation_table),
                        assignments.join(", "),
                        values.len(),
                    ),
                    params_from_iter(values),
                )?;
            }
            _ => {
                let quoted: Vec<String> = columns.iter().map(|column| quote(column)).collect();
                let values: Vec<SqlValue> = columns
                    .iter()
                    .map(|column| to_sql_value(record.get(column).unwrap_or(&Value::Null)))
                    .collect();

                conn.execute(
                    &format!(
                        "INSERT INTO {} ({}) VALUES ({})",
                        quote(schema.translation_table),
                        quoted.join(", "),
                        placeholders(quoted.len()),
                    ),
                    params_from_iter(values),
                )?;

                record.set_key(conn.last_insert_rowid());
            }
        }

        record.sync_original();
        Ok(())
    }

    fn delete_translations(
        &self,
        schema: &ModelSchema,
        locale_key: &str,
        host_key: i64,
        locales: Option<&[&str]>,
    ) -> Result<usize> {
        let conn = self.conn.lock().unwrap();

        let deleted = match locales {
            None => conn.execute(
                &format!(
                    "DELETE FROM {} WHERE {} = ?1",
                    quote(schema.translation_table),
                    quote(schema.foreign_key),
                ),
                params![host_key],
            )?,
            Some(locales) => {
                let mut values: Vec<SqlValue> = vec![SqlValue::Integer(host_key)];
                let slots: Vec<String> = locales
                    .iter()
                    .enumerate()
                    .map(|(index, locale)| {
                        values.push(SqlValue::Text(locale.to_string()));
                        format!("?{}", index + 2)
                    })
                    .collect();

                conn.execute(
                    &format!(
                        "DELETE FROM {} WHERE {} = ?1 AND {} IN ({})",
                        quote(schema.translation_table),
                        quote(schema.foreign_key),
                        quote(locale_key),
                        slots.join(", "),
                    ),
                    params_from_iter(values),
                )?
            }
        };

        Ok(deleted)
    }
}

fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier)
}

fn placeholders(count: usize) -> String {
    (1..=count)
        .map(|index| format!("?{index}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// JSON value -> SQLite value. Booleans become 0/1, arrays and objects are
/// stored as JSON text.
fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(*b as i64),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or(0.0)),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

/// SQLite value -> JSON value. Text that looks like a JSON container is
/// decoded back; everything else stays a plain string.
fn from_sql_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(text) => {
            let text = String::from_utf8_lossy(text).to_string();
            match text.as_bytes().first() {
                Some(b'[') | Some(b'{') => {
                    serde_json::from_str(&text).unwrap_or(Value::String(text))
                }
                _ => Value::String(text),
            }
        }
        ValueRef::Blob(blob) => Value::String(String::from_utf8_lossy(blob).to_string()),
    }
}
