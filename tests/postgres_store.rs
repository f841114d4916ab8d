//! PostgreSQL Backend Tests
//!
//! Need a database with ICU support; run with
//! `DATABASE_URL=postgresql://... cargo test --test postgres_store -- --ignored`.

mod common;

use common::*;
use punishments_core::cache::{EntityStore, ReasonStore};
use punishments_core::config::DatabaseConfig;
use punishments_core::database::DatabaseConnection;
use punishments_core::models::PunishmentReason;
use punishments_core::store::{Collation, DocumentCollection, Filter, PgDocumentCollection};
use std::sync::Arc;
use uuid::Uuid;

async fn connect() -> DatabaseConnection {
    let config = DatabaseConfig {
        url: std::env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
        ..DatabaseConfig::default()
    };
    DatabaseConnection::connect(&config)
        .await
        .expect("database should be reachable")
}

/// A throwaway reasons table with the default collation in place
async fn scratch_reasons(db: &DatabaseConnection) -> PgDocumentCollection<PunishmentReason> {
    let table = format!("reasons_{}", &Uuid::new_v4().simple().to_string()[..12]);
    let collection = PgDocumentCollection::new(db.pool().clone(), table).unwrap();
    collection.ensure_schema().await.unwrap();
    collection.ensure_collation(&Collation::default()).await.unwrap();
    collection
}

async fn drop_table(db: &DatabaseConnection, name: &str) {
    sqlx::query(&format!("DROP TABLE IF EXISTS {name}"))
        .execute(db.pool())
        .await
        .unwrap();
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn collated_name_lookup_ignores_case() {
    let db = connect().await;
    let collection = scratch_reasons(&db).await;
    collection.insert_one(&spam()).await.unwrap();

    let by_name = collection
        .find_one(&Filter::collated("name", "SPAM", Collation::default()))
        .await
        .unwrap();
    let by_string_id = collection.find_one(&Filter::eq("id", "7")).await.unwrap();
    let by_id = collection.find_one(&Filter::eq("id", 7)).await.unwrap();

    assert_eq!(by_name, Some(spam()));
    assert_eq!(by_string_id, None);
    assert_eq!(by_id, Some(spam()));

    drop_table(&db, collection.name()).await;
    db.close().await;
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn reason_store_round_trip() {
    let db = connect().await;
    let collection = Arc::new(scratch_reasons(&db).await);
    let table = collection.name().to_string();
    let store = ReasonStore::new(collection.clone(), Collation::default());

    store.set("spam".to_string(), spam()).await;
    store.set("hacking".to_string(), hacking()).await;
    store.flush().await.unwrap();
    assert_eq!(collection.find_all().await.unwrap().len(), 2);

    store.delete("SPAM").await;
    store.flush().await.unwrap();

    let remaining = collection.find_all().await.unwrap();
    assert_eq!(remaining, vec![hacking()]);

    let fresh = ReasonStore::new(collection.clone(), Collation::default());
    assert_eq!(fresh.load_all_into_cache().await.unwrap(), 1);
    assert!(fresh.is_cached("HACKING").await);

    drop_table(&db, &table).await;
    db.close().await;
}
