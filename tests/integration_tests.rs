//! Integration tests for the translatable record layer.
//!
//! These tests exercise the full path: records filled through the façade,
//! persisted to a real SQLite database, reloaded and resolved with fallback
//! rules, plus the localized routing layer on top of the same configuration.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::{json, Map, Value};
use tempfile::TempDir;

use translatable::{
    Database, Locales, ModelSchema, TranslatableConfig, TranslatableRecord, TranslationStorage,
};

// ==================== Test Helpers ====================

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

const VEGETABLE: ModelSchema = ModelSchema {
    table: "vegetables",
    primary_key: "identity",
    translation_table: "vegetable_translations",
    foreign_key: "vegetable_identity",
    locale_key: None,
    translatable: &["name"],
    native: &["quantity"],
    fillable: &["quantity"],
    hidden: &[],
    accessors: &[],
};

fn test_config() -> TranslatableConfig {
    TranslatableConfig {
        locales: ["el", "en", "fr", "de", "id", "en-GB", "en-US", "de-DE", "de-CH"]
            .iter()
            .map(|l| l.to_string())
            .collect(),
        ..TranslatableConfig::default()
    }
}

fn create_test_db(config: &TranslatableConfig) -> Result<(Database, TempDir)> {
    let temp_dir = TempDir::new().context("Failed to create temp dir")?;
    let db_path = temp_dir.path().join("vegetables.db");
    let db = Database::new(db_path.to_str().context("path is valid utf-8")?)
        .context("Failed to open database")?;
    db.create_tables(&VEGETABLE, &config.locale_key)
        .context("Failed to create tables")?;
    Ok((db, temp_dir))
}

fn vegetable(config: TranslatableConfig) -> TranslatableRecord {
    let locales = Locales::new(&config).expect("Should build locales");
    TranslatableRecord::new(&VEGETABLE, Arc::new(config), Arc::new(locales))
}

/// A saved vegetable with en and fr translations persisted.
fn saved_potato(db: &Database, config: TranslatableConfig) -> TranslatableRecord {
    let mut record = vegetable(config);
    let mut attributes = Map::new();
    attributes.insert("quantity".to_string(), json!(5));
    attributes.insert("name:en".to_string(), json!("Potato"));
    attributes.insert("name:fr".to_string(), json!("Pomme de terre"));
    record.fill(attributes);

    assert!(record.save(db).expect("Should save"), "Cascade should succeed");
    record
}

/// Reload a record from storage the way an application would.
fn reload(db: &Database, key: i64, config: TranslatableConfig) -> TranslatableRecord {
    let host = db
        .find_host(&VEGETABLE, key)
        .expect("Should query")
        .expect("Host row should exist");
    let locales = Locales::new(&config).expect("Should build locales");
    let mut record = TranslatableRecord::from_host(host, Arc::new(config), Arc::new(locales));
    record.load_translations(db).expect("Should load translations");
    record
}

// ==================== Lifecycle Tests ====================

#[test]
fn test_full_lifecycle_round_trip() {
    init_tracing();
    let config = test_config();
    let (db, _temp_dir) = create_test_db(&config).expect("setup");

    let record = saved_potato(&db, config.clone());
    let key = record.host().key().expect("Host should have a key");

    let reloaded = reload(&db, key, config);
    assert_eq!(reloaded.host().attribute("quantity"), Some(&json!(5)));
    assert_eq!(reloaded.get("name:en"), Some(json!("Potato")));
    assert_eq!(reloaded.get("name:fr"), Some(json!("Pomme de terre")));
    assert_eq!(reloaded.translations().len(), 2);
}

#[test]
fn test_unloaded_relation_reads_as_empty() {
    let config = test_config();
    let (db, _temp_dir) = create_test_db(&config).expect("setup");

    let record = saved_potato(&db, config.clone());
    let key = record.host().key().expect("key");

    // without load_translations the relation is treated as empty
    let host = db.find_host(&VEGETABLE, key).expect("query").expect("row");
    let locales = Locales::new(&config).expect("locales");
    let fresh = TranslatableRecord::from_host(host, Arc::new(config), Arc::new(locales));

    assert_eq!(fresh.get("name"), None);
    assert!(!fresh.has_translation(Some("en")));
}

#[test]
fn test_save_before_host_row_reports_failure_for_dirty_translations() {
    let config = test_config();
    let (db, _temp_dir) = create_test_db(&config).expect("setup");

    let mut record = vegetable(config);
    record.set("name", json!("Potato"));

    assert!(!record.save_translations(&db), "No host key yet");
}

// ==================== Dirty Cascade Tests ====================

#[test]
fn test_save_persists_only_dirty_translations() {
    let config = test_config();
    let (db, _temp_dir) = create_test_db(&config).expect("setup");

    let mut record = saved_potato(&db, config.clone());
    let key = record.host().key().expect("key");

    record.set("name:en", json!("Spud"));

    let locale_key = &config.locale_key;
    let fr = record.translate(Some("fr")).expect("fr loaded");
    assert!(!fr.is_dirty_except(locale_key), "fr was not touched");
    let en = record.translate(Some("en")).expect("en loaded");
    assert!(en.is_dirty_except(locale_key), "en was mutated");

    assert!(record.save(&db).expect("Should save"), "Cascade should succeed");

    let reloaded = reload(&db, key, config);
    assert_eq!(reloaded.get("name:en"), Some(json!("Spud")));
    assert_eq!(reloaded.get("name:fr"), Some(json!("Pomme de terre")));
}

#[test]
fn test_clean_cascade_is_a_noop_success() {
    let config = test_config();
    let (db, _temp_dir) = create_test_db(&config).expect("setup");

    let mut record = saved_potato(&db, config);
    assert!(record.save_translations(&db), "Nothing dirty still succeeds");
}

#[test]
fn test_partial_cascade_failure_reports_false_and_stops_saving() {
    let config = test_config();
    let (db, _temp_dir) = create_test_db(&config).expect("setup");

    let mut record = vegetable(config.clone());
    record.set("quantity", json!(1));
    assert!(record.save(&db).expect("host save"));
    let key = record.host().key().expect("key");

    // a duplicate en record trips the unique (host, locale) constraint
    record.translate_or_new(Some("en")).set("name", json!("Potato"));
    record.new_translation("en").set("name", json!("Duplicate"));
    record.translate_or_new(Some("fr")).set("name", json!("Pomme de terre"));

    assert!(!record.save_translations(&db), "Cascade should report failure");

    // earlier saves stay committed, later records were never attempted
    let rows = db.load_translations(&VEGETABLE, key).expect("load");
    let locales: Vec<&str> = rows.iter().filter_map(|r| r.locale(&config.locale_key)).collect();
    assert_eq!(locales, vec!["en"]);
}

// ==================== Deletion Tests ====================

#[test]
fn test_delete_translations_scoped_to_locale() {
    let config = test_config();
    let (db, _temp_dir) = create_test_db(&config).expect("setup");

    let mut record = saved_potato(&db, config);

    record
        .delete_translations(&db, Some(&["fr"]))
        .expect("Should delete");

    assert!(record.has_translation(Some("en")));
    assert!(!record.has_translation(Some("fr")));
    assert_eq!(record.translations().len(), 1);
}

#[test]
fn test_delete_all_translations_resyncs_collection() {
    let config = test_config();
    let (db, _temp_dir) = create_test_db(&config).expect("setup");

    let mut record = saved_potato(&db, config);

    record.delete_translations(&db, None).expect("Should delete");

    assert!(record.translations().is_empty());
    assert_eq!(record.get("name"), None);
}

#[test]
fn test_host_delete_cascades_when_configured() {
    let mut config = test_config();
    config.delete_translations_cascade = true;
    let (db, _temp_dir) = create_test_db(&config).expect("setup");

    let mut record = saved_potato(&db, config);
    let key = record.host().key().expect("key");

    record.delete(&db).expect("Should delete");

    assert!(db.find_host(&VEGETABLE, key).expect("query").is_none());
    assert!(db.load_translations(&VEGETABLE, key).expect("load").is_empty());
}

#[test]
fn test_host_delete_keeps_translations_without_cascade() {
    let config = test_config();
    let (db, _temp_dir) = create_test_db(&config).expect("setup");

    let mut record = saved_potato(&db, config);
    let key = record.host().key().expect("key");

    record.delete(&db).expect("Should delete");

    assert!(db.find_host(&VEGETABLE, key).expect("query").is_none());
    assert_eq!(db.load_translations(&VEGETABLE, key).expect("load").len(), 2);
}

// ==================== Fallback Over Storage Tests ====================

#[test]
fn test_fallback_read_after_reload() {
    let mut config = test_config();
    config.use_fallback = true;
    config.fallback_locale = Some("en".to_string());
    let (db, _temp_dir) = create_test_db(&config).expect("setup");

    let record = saved_potato(&db, config.clone());
    let key = record.host().key().expect("key");

    config.locale = "de".to_string();
    let reloaded = reload(&db, key, config);
    assert_eq!(reloaded.get("name"), Some(json!("Potato")));
}

#[test]
fn test_missing_locale_stays_absent_without_fallback() {
    let config = test_config();
    let (db, _temp_dir) = create_test_db(&config).expect("setup");

    let record = saved_potato(&db, config.clone());
    let key = record.host().key().expect("key");

    let mut read_config = config;
    read_config.locale = "de".to_string();
    let reloaded = reload(&db, key, read_config);
    assert_eq!(reloaded.get("name"), None);
}

#[test]
fn test_serialization_after_reload_includes_translations() {
    let config = test_config();
    let (db, _temp_dir) = create_test_db(&config).expect("setup");

    let record = saved_potato(&db, config.clone());
    let key = record.host().key().expect("key");

    let reloaded = reload(&db, key, config);
    let output = reloaded.to_serializable();

    assert_eq!(output.get("name"), Some(&json!("Potato")));
    assert_eq!(output.get("quantity"), Some(&json!(5)));
    assert!(output.contains_key("created_at"));
}

// ==================== Replication Tests ====================

#[test]
fn test_replicated_record_saves_as_new_rows() {
    let config = test_config();
    let (db, _temp_dir) = create_test_db(&config).expect("setup");

    let record = saved_potato(&db, config);
    let original_key = record.host().key().expect("key");

    let mut copy = record.replicate_with_translations();
    assert!(copy.save(&db).expect("Should save copy"), "Cascade should succeed");

    let copy_key = copy.host().key().expect("Copy should have a key");
    assert_ne!(copy_key, original_key);

    let copied_rows = db.load_translations(&VEGETABLE, copy_key).expect("load");
    assert_eq!(copied_rows.len(), 2);

    // the original rows are untouched
    let original_rows = db.load_translations(&VEGETABLE, original_key).expect("load");
    assert_eq!(original_rows.len(), 2);
}

// ==================== Query Helper Tests ====================

#[test]
fn test_translated_in_and_where_translation_queries() {
    let config = test_config();
    let (db, _temp_dir) = create_test_db(&config).expect("setup");

    let first = saved_potato(&db, config.clone());
    let mut second = vegetable(config.clone());
    second.set("name:de", json!("Kartoffel"));
    assert!(second.save(&db).expect("save"));

    let first_key = first.host().key().expect("key");
    let second_key = second.host().key().expect("key");

    let in_french = db
        .host_ids_translated_in(&VEGETABLE, &config.locale_key, "fr")
        .expect("query");
    assert_eq!(in_french, vec![first_key]);

    let in_german = db
        .host_ids_translated_in(&VEGETABLE, &config.locale_key, "de")
        .expect("query");
    assert_eq!(in_german, vec![second_key]);

    let named_potato = db
        .host_ids_where_translation(
            &VEGETABLE,
            &config.locale_key,
            "name",
            &json!("Potato"),
            Some("en"),
        )
        .expect("query");
    assert_eq!(named_potato, vec![first_key]);
}

// ==================== Value Shape Tests ====================

#[test]
fn test_translation_values_keep_their_shape_through_storage() {
    let config = test_config();
    let (db, _temp_dir) = create_test_db(&config).expect("setup");

    let mut record = vegetable(config.clone());
    record.set("quantity", json!(7));
    record.set("name:en", json!("Potato"));
    assert!(record.save(&db).expect("save"));
    let key = record.host().key().expect("key");

    let reloaded = reload(&db, key, config);
    assert_eq!(reloaded.host().attribute("quantity"), Some(&Value::from(7)));
    assert_eq!(reloaded.get("name:en"), Some(json!("Potato")));
}
