mod common;

use common::*;
use std::sync::Arc;

use cde_forms::store::ClinicalDataStore;
use cde_forms::*;

fn value_map(pairs: &[(&str, CdeValue)]) -> ValueMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[tokio::test]
async fn load_miss_is_none_not_an_error() {
    let store = MemoryDataStore::new();
    let key = DocumentKey::cdes(&patient());
    assert_eq!(store.load(&key).await.unwrap(), None);
}

#[tokio::test]
async fn save_merges_instead_of_overwriting() {
    let store = MemoryDataStore::new();
    let key = DocumentKey::cdes(&patient());

    store
        .save(&key, &value_map(&[("AGE", CdeValue::Integer(40))]))
        .await
        .unwrap();
    store
        .save(&key, &value_map(&[("NOTES", CdeValue::Text("stable".into()))]))
        .await
        .unwrap();

    let doc = store.load(&key).await.unwrap().unwrap();
    assert_eq!(doc.get("AGE"), Some(&CdeValue::Integer(40)));
    assert_eq!(doc.get("NOTES"), Some(&CdeValue::Text("stable".into())));
    assert_eq!(doc.version, 2);
}

#[tokio::test]
async fn save_then_load_returns_the_named_fields() {
    let store = MemoryDataStore::new();
    let key = DocumentKey::cdes(&patient());

    let fields = value_map(&[
        ("AGE", CdeValue::Integer(45)),
        ("SEX", CdeValue::Code("F".into())),
    ]);
    let saved = store.save(&key, &fields).await.unwrap();
    let loaded = store.load(&key).await.unwrap().unwrap();
    assert_eq!(saved, loaded);
    assert_eq!(loaded.get("SEX"), Some(&CdeValue::Code("F".into())));
}

#[tokio::test]
async fn history_is_append_only_in_insertion_order() {
    let store = MemoryDataStore::new();
    let key = DocumentKey::history(&patient());

    for age in [40i64, 41, 42] {
        let snapshot = HistorySnapshot::new(
            "demographics",
            value_map(&[("AGE", CdeValue::Integer(age))]),
        );
        store.append_history(&key, snapshot).await.unwrap();
    }

    let history = store.history(&key).await.unwrap();
    assert_eq!(history.len(), 3);
    let ages: Vec<_> = history
        .iter()
        .map(|s| s.fields.get("AGE").cloned().unwrap())
        .collect();
    assert_eq!(
        ages,
        [
            CdeValue::Integer(40),
            CdeValue::Integer(41),
            CdeValue::Integer(42)
        ]
    );
    assert!(history[0].recorded_at <= history[2].recorded_at);
}

#[tokio::test]
async fn concurrent_saves_to_one_key_lose_no_updates() {
    let store = Arc::new(MemoryDataStore::new());
    let key = DocumentKey::cdes(&patient());

    let mut tasks = Vec::new();
    for i in 0..16i64 {
        let store = Arc::clone(&store);
        let key = key.clone();
        tasks.push(tokio::spawn(async move {
            let name = format!("CDE_{i}");
            let fields = value_map(&[(name.as_str(), CdeValue::Integer(i))]);
            store.save(&key, &fields).await.unwrap();
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let doc = store.load(&key).await.unwrap().unwrap();
    assert_eq!(doc.fields.len(), 16);
    assert_eq!(doc.version, 16);
    for i in 0..16i64 {
        assert_eq!(doc.get(&format!("CDE_{i}")), Some(&CdeValue::Integer(i)));
    }
}

#[tokio::test]
async fn collections_are_isolated_per_key() {
    let store = MemoryDataStore::new();
    let cdes = DocumentKey::cdes(&patient());
    let progress = DocumentKey::progress(&patient());

    store
        .save(&cdes, &value_map(&[("AGE", CdeValue::Integer(40))]))
        .await
        .unwrap();
    store
        .save(&progress, &value_map(&[("demographics/progress", CdeValue::Decimal(0.5))]))
        .await
        .unwrap();

    let doc = store.load(&cdes).await.unwrap().unwrap();
    assert_eq!(doc.fields.len(), 1);
    assert!(doc.get("demographics/progress").is_none());
}

#[tokio::test]
async fn delete_removes_the_document() {
    let store = MemoryDataStore::new();
    let key = DocumentKey::cdes(&patient());

    store
        .save(&key, &value_map(&[("AGE", CdeValue::Integer(40))]))
        .await
        .unwrap();
    assert!(store.delete(&key).await.unwrap());
    assert!(!store.delete(&key).await.unwrap());
    assert_eq!(store.load(&key).await.unwrap(), None);
}
