use settings_core::db::open_db_in_memory;
use settings_core::{
    cache_key, CacheEntry, DefaultsRegistry, InMemoryCache, NoopCache, Owner, RepoError,
    RepoResult, SettingFilter, SettingMap, SettingRecord, SettingRepository, SettingValue,
    SettingsCache, SettingsError, SettingsService, SqliteSettingRepository,
};
use std::sync::Arc;

fn map(pairs: &[(&str, SettingValue)]) -> SettingMap {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect()
}

/// Delegates reads to SQLite and rejects every write.
struct ReadOnlyRepository<'a> {
    inner: &'a SqliteSettingRepository<'a>,
}

impl SettingRepository for ReadOnlyRepository<'_> {
    fn find_one(
        &self,
        namespace: &str,
        key: &str,
        owner: Option<&Owner>,
    ) -> RepoResult<Option<SettingRecord>> {
        self.inner.find_one(namespace, key, owner)
    }

    fn find_all(&self, filter: &SettingFilter) -> RepoResult<Vec<SettingRecord>> {
        self.inner.find_all(filter)
    }

    fn create_or_update(&self, _record: &SettingRecord) -> RepoResult<SettingRecord> {
        Err(RepoError::InvalidData("store is read-only".to_string()))
    }

    fn delete(&self, _record: &SettingRecord) -> RepoResult<()> {
        Err(RepoError::InvalidData("store is read-only".to_string()))
    }
}

#[test]
fn greeting_lifecycle_set_update_destroy() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteSettingRepository::try_new(&conn).unwrap();
    let service = SettingsService::new(repo, InMemoryCache::new(), Arc::new(DefaultsRegistry::new()));

    service.set("en", "greeting", "hello", None).unwrap();
    assert_eq!(service.get("en", "greeting", None).unwrap(), SettingValue::from("hello"));

    service.set("en", "greeting", "hi", None).unwrap();
    assert_eq!(service.get("en", "greeting", None).unwrap(), SettingValue::from("hi"));

    assert!(service.destroy("en", "greeting", None).unwrap());
    assert_eq!(service.get("en", "greeting", None).unwrap(), SettingValue::Null);
}

#[test]
fn set_returns_written_value_and_keeps_types() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteSettingRepository::try_new(&conn).unwrap();
    let service = SettingsService::new(repo, InMemoryCache::new(), Arc::new(DefaultsRegistry::new()));

    let items = SettingValue::List(vec![
        SettingValue::Integer(1),
        SettingValue::Integer(3),
        SettingValue::Integer(5),
        SettingValue::from("as"),
    ]);
    let written = service.set("en", "items", items.clone(), None).unwrap();
    assert_eq!(written, items);

    service
        .set("be", "created_on", SettingValue::Timestamp(1_700_000_000_123), None)
        .unwrap();

    service.cache().clear();
    assert_eq!(service.get("en", "items", None).unwrap(), items);
    assert_eq!(
        service.get("be", "created_on", None).unwrap(),
        SettingValue::Timestamp(1_700_000_000_123)
    );
}

#[test]
fn reads_match_whether_served_from_cache_or_store() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteSettingRepository::try_new(&conn).unwrap();
    let service = SettingsService::new(repo, InMemoryCache::new(), Arc::new(DefaultsRegistry::new()));

    service.set("en", "limit", 30, None).unwrap();
    let key = cache_key("en", "limit", None);
    assert_eq!(
        service.cache().get(&key).unwrap(),
        Some(CacheEntry::Value(SettingValue::Integer(30)))
    );
    let cached = service.get("en", "limit", None).unwrap();

    service.cache().delete(&key).unwrap();
    let stored = service.get("en", "limit", None).unwrap();
    assert_eq!(cached, stored);

    // Store read repopulates the cache.
    assert!(service.cache().get(&key).unwrap().is_some());
}

#[test]
fn missing_record_falls_back_to_default_without_caching_it() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteSettingRepository::try_new(&conn).unwrap();
    let defaults = Arc::new(DefaultsRegistry::new());
    let service = SettingsService::new(repo, InMemoryCache::new(), Arc::clone(&defaults));

    assert_eq!(service.get("en", "bar", None).unwrap(), SettingValue::Null);

    defaults.set("bar", "Bar foo");
    assert_eq!(service.get("en", "bar", None).unwrap(), SettingValue::from("Bar foo"));
    assert!(service.cache().is_empty());

    defaults.set("bar", "changed");
    assert_eq!(service.get("en", "bar", None).unwrap(), SettingValue::from("changed"));
}

#[test]
fn explicit_value_beats_default_per_namespace() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteSettingRepository::try_new(&conn).unwrap();
    let defaults = Arc::new(DefaultsRegistry::with_defaults([("bar", "Bar foo")]));
    let service = SettingsService::new(repo, InMemoryCache::new(), Arc::clone(&defaults));

    service.set("en", "bar", "Foo bar", None).unwrap();
    assert_eq!(service.get("en", "bar", None).unwrap(), SettingValue::from("Foo bar"));
    assert_eq!(service.get("be", "bar", None).unwrap(), SettingValue::from("Bar foo"));

    defaults.set("bar", "new default");
    assert_eq!(service.get("en", "bar", None).unwrap(), SettingValue::from("Foo bar"));
}

#[test]
fn explicit_null_beats_later_default() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteSettingRepository::try_new(&conn).unwrap();
    let defaults = Arc::new(DefaultsRegistry::new());
    let service = SettingsService::new(repo, InMemoryCache::new(), Arc::clone(&defaults));

    service.set("en", "nil_key", SettingValue::Null, None).unwrap();
    assert_eq!(
        service.cache().get(&cache_key("en", "nil_key", None)).unwrap(),
        Some(CacheEntry::NoValue)
    );

    defaults.set("nil_key", "123");
    defaults.set("absent_key", "123");

    assert_eq!(service.get("en", "nil_key", None).unwrap(), SettingValue::Null);
    assert_eq!(service.get("en", "absent_key", None).unwrap(), SettingValue::from("123"));

    service.cache().clear();
    assert_eq!(service.get("en", "nil_key", None).unwrap(), SettingValue::Null);
}

#[test]
fn destroy_then_fallback_and_second_destroy_fails() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteSettingRepository::try_new(&conn).unwrap();
    let defaults = Arc::new(DefaultsRegistry::with_defaults([("foo", "fallback")]));
    let service = SettingsService::new(repo, InMemoryCache::new(), defaults);

    service.set("en", "foo", "Foo bar", None).unwrap();
    assert!(service.destroy("en", "foo", None).unwrap());
    assert_eq!(service.get("en", "foo", None).unwrap(), SettingValue::from("fallback"));
    assert!(service.cache().get(&cache_key("en", "foo", None)).unwrap().is_none());

    let err = service.destroy("en", "foo", None).unwrap_err();
    match err {
        SettingsError::SettingNotFound {
            namespace,
            key,
            owner,
        } => {
            assert_eq!(namespace, "en");
            assert_eq!(key, "foo");
            assert!(owner.is_none());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn merge_into_overlays_partial_maps() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteSettingRepository::try_new(&conn).unwrap();
    let service = SettingsService::new(repo, InMemoryCache::new(), Arc::new(DefaultsRegistry::new()));

    let first = service
        .merge_into("en", "prefs", map(&[("a", SettingValue::Integer(1))]), None)
        .unwrap();
    assert_eq!(first, map(&[("a", SettingValue::Integer(1))]));

    let second = service
        .merge_into("en", "prefs", map(&[("b", SettingValue::Integer(2))]), None)
        .unwrap();
    assert_eq!(
        second,
        map(&[("a", SettingValue::Integer(1)), ("b", SettingValue::Integer(2))])
    );

    let third = service
        .merge_into("en", "prefs", map(&[("a", SettingValue::Integer(3))]), None)
        .unwrap();
    let expected = map(&[("a", SettingValue::Integer(3)), ("b", SettingValue::Integer(2))]);
    assert_eq!(third, expected);

    service.cache().clear();
    assert_eq!(
        service.get("en", "prefs", None).unwrap(),
        SettingValue::Map(expected)
    );
}

#[test]
fn merge_into_unchanged_map_skips_write() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteSettingRepository::try_new(&conn).unwrap();
    let cache = InMemoryCache::new();
    let defaults = Arc::new(DefaultsRegistry::new());
    let writer = SettingsService::new(&repo, &cache, Arc::clone(&defaults));

    writer
        .set("en", "prefs", map(&[("a", SettingValue::Integer(1))]), None)
        .unwrap();

    let read_only = SettingsService::new(ReadOnlyRepository { inner: &repo }, &cache, defaults);
    let merged = read_only
        .merge_into("en", "prefs", map(&[("a", SettingValue::Integer(1))]), None)
        .unwrap();
    assert_eq!(merged, map(&[("a", SettingValue::Integer(1))]));
}

#[test]
fn merge_into_non_map_value_fails() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteSettingRepository::try_new(&conn).unwrap();
    let service = SettingsService::new(repo, InMemoryCache::new(), Arc::new(DefaultsRegistry::new()));

    service.set("en", "foo", "Foo bar", None).unwrap();
    let err = service
        .merge_into("en", "foo", map(&[("id", SettingValue::Integer(32))]), None)
        .unwrap_err();
    assert!(matches!(err, SettingsError::TypeMismatch { found: "text", .. }));
}

#[test]
fn all_lists_global_records_by_namespace() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteSettingRepository::try_new(&conn).unwrap();
    let service = SettingsService::new(repo, InMemoryCache::new(), Arc::new(DefaultsRegistry::new()));

    service.set("en", "foo", "Foo bar", None).unwrap();
    service.set("en", "items", vec![1i64, 3, 5], None).unwrap();
    service.set("be", "created_on", SettingValue::Timestamp(42), None).unwrap();
    let user = Owner::new("user", "7");
    service.set("en", "level", 30, Some(&user)).unwrap();

    let english = service.all(Some("en")).unwrap();
    assert_eq!(english.len(), 2);
    assert_eq!(english.get("foo"), Some(&SettingValue::from("Foo bar")));
    assert!(!english.contains_key("level"));

    assert_eq!(service.all(Some("be")).unwrap().len(), 1);
    assert_eq!(service.all(None).unwrap().len(), 3);
    assert_eq!(service.all(Some(" ")).unwrap().len(), 3);
}

#[test]
fn all_without_namespace_lets_later_record_win() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteSettingRepository::try_new(&conn).unwrap();
    let service = SettingsService::new(repo, NoopCache, Arc::new(DefaultsRegistry::new()));

    service.set("en", "title", "Hello", None).unwrap();
    service.set("be", "title", "Hallo", None).unwrap();

    let all = service.all(None).unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all.get("title"), Some(&SettingValue::from("Hallo")));
}

#[test]
fn save_default_only_writes_once() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteSettingRepository::try_new(&conn).unwrap();
    let service = SettingsService::new(repo, InMemoryCache::new(), Arc::new(DefaultsRegistry::new()));

    assert_eq!(
        service.get("en", "test_save_default_key", None).unwrap(),
        SettingValue::Null
    );
    assert!(service
        .save_default("en", "test_save_default_key", "321", None)
        .unwrap());
    assert!(!service
        .save_default("en", "test_save_default_key", "3211", None)
        .unwrap());

    assert_eq!(
        service.get("en", "test_save_default_key", None).unwrap(),
        SettingValue::from("321")
    );
    let rows = service
        .repository()
        .find_all(&SettingFilter::global(Some("en")))
        .unwrap();
    assert_eq!(rows.len(), 1);
}

#[test]
fn save_default_ignores_registered_defaults_and_fills_explicit_null() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteSettingRepository::try_new(&conn).unwrap();
    let defaults = Arc::new(DefaultsRegistry::with_defaults([("theme", "light")]));
    let service = SettingsService::new(repo, InMemoryCache::new(), defaults);

    assert!(service.save_default("en", "theme", "dark", None).unwrap());
    assert_eq!(service.get("en", "theme", None).unwrap(), SettingValue::from("dark"));

    service.set("en", "nil_key", SettingValue::Null, None).unwrap();
    assert!(service.save_default("en", "nil_key", "filled", None).unwrap());
    assert_eq!(service.get("en", "nil_key", None).unwrap(), SettingValue::from("filled"));
}

#[test]
fn entry_accessor_requires_namespace() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteSettingRepository::try_new(&conn).unwrap();
    let defaults = Arc::new(DefaultsRegistry::with_defaults([("bar", "Bar foo")]));
    let service = SettingsService::new(repo, InMemoryCache::new(), defaults);

    let bar = service.entry("bar");
    assert_eq!(bar.key(), "bar");
    assert!(matches!(bar.get(None), Err(SettingsError::NamespaceNotProvided)));
    assert!(matches!(bar.get(Some("")), Err(SettingsError::NamespaceNotProvided)));
    assert!(matches!(
        bar.set(None, "value"),
        Err(SettingsError::NamespaceNotProvided)
    ));

    assert_eq!(bar.get(Some("en")).unwrap(), SettingValue::from("Bar foo"));
    bar.set(Some("en"), "Foo bar").unwrap();
    assert_eq!(
        service.get("en", "bar", None).unwrap(),
        SettingValue::from("Foo bar")
    );

    let merged = service
        .entry("hashes")
        .merge(Some("en"), map(&[("id", SettingValue::Integer(32))]))
        .unwrap();
    assert_eq!(merged.len(), 1);
    assert!(service.entry("bar").destroy(Some("en")).unwrap());
}

#[test]
fn blank_namespace_and_key_are_rejected() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteSettingRepository::try_new(&conn).unwrap();
    let service = SettingsService::new(repo, InMemoryCache::new(), Arc::new(DefaultsRegistry::new()));

    assert!(matches!(
        service.get("", "foo", None),
        Err(SettingsError::NamespaceNotProvided)
    ));
    assert!(matches!(
        service.set("en", " ", 1, None),
        Err(SettingsError::InvalidKey)
    ));
}

#[test]
fn persist_failure_leaves_cache_untouched() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteSettingRepository::try_new(&conn).unwrap();
    let cache = InMemoryCache::new();
    let defaults = Arc::new(DefaultsRegistry::new());

    let writer = SettingsService::new(&repo, &cache, Arc::clone(&defaults));
    writer.set("en", "greeting", "hello", None).unwrap();

    let failing = SettingsService::new(ReadOnlyRepository { inner: &repo }, &cache, defaults);
    let err = failing.set("en", "greeting", "hi", None).unwrap_err();
    assert!(matches!(err, SettingsError::Persist(_)));
    let err = failing.set("en", "fresh", "value", None).unwrap_err();
    assert!(matches!(err, SettingsError::Persist(_)));

    assert_eq!(
        cache.get(&cache_key("en", "greeting", None)).unwrap(),
        Some(CacheEntry::Value(SettingValue::from("hello")))
    );
    assert!(cache.get(&cache_key("en", "fresh", None)).unwrap().is_none());
    assert_eq!(
        writer.get("en", "greeting", None).unwrap(),
        SettingValue::from("hello")
    );
}

#[test]
fn unavailable_cache_degrades_to_store() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteSettingRepository::try_new(&conn).unwrap();
    let service = SettingsService::new(repo, InMemoryCache::new(), Arc::new(DefaultsRegistry::new()));

    service.cache().set_available(false);
    service.set("en", "greeting", "hello", None).unwrap();
    assert_eq!(
        service.get("en", "greeting", None).unwrap(),
        SettingValue::from("hello")
    );
    assert!(service.destroy("en", "greeting", None).unwrap());

    service.cache().set_available(true);
    assert!(service.cache().is_empty());
}

#[test]
fn corrupted_value_surfaces_codec_error() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO settings (uuid, namespace, key, value)
         VALUES ('5f0c1d8e-8d1f-4a53-9d4b-2f6c2a1e9a10', 'en', 'broken', '--- !ruby/object');",
        [],
    )
    .unwrap();
    let repo = SqliteSettingRepository::try_new(&conn).unwrap();
    let defaults = Arc::new(DefaultsRegistry::with_defaults([("broken", "fallback")]));
    let service = SettingsService::new(repo, InMemoryCache::new(), defaults);

    let err = service.get("en", "broken", None).unwrap_err();
    assert!(matches!(err, SettingsError::Codec(_)));
    assert!(service.all(Some("en")).is_err());
}

#[test]
fn non_finite_float_is_rejected_before_store_write() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteSettingRepository::try_new(&conn).unwrap();
    let service = SettingsService::new(repo, InMemoryCache::new(), Arc::new(DefaultsRegistry::new()));

    let err = service.set("en", "ratio", f64::NAN, None).unwrap_err();
    assert!(matches!(err, SettingsError::Codec(_)));
    assert!(service.all(None).unwrap().is_empty());
}
