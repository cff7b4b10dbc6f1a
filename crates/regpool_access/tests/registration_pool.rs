use regpool_access::schema::*;
use regpool_access::{parse_rp_key, DeviceEntry, RegistrationPool, RegistrationState, RegistryError};
use regpool_config::{AppConfig, DatabaseConfig, StoreBackend};
use regpool_db::{
    CallContext, MemoryRowStore, Mutation, Row, RowFilter, RowStoreGateway, StoreError,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Rows written by the provisioning tooling for aid-1 and aid-2, plus the
/// registered test device.
async fn seeded_store() -> MemoryRowStore {
    regpool_common::logging::init_with_level(tracing::Level::DEBUG);
    let store = MemoryRowStore::new();
    let ctx = CallContext::background();

    for device in [
        DeviceEntry::new("aid-1", "qid-1", "did-1", "fcm-1"),
        DeviceEntry::new("aid-2", "qid-2", "did-2", "fcm-2"),
    ] {
        store
            .apply(
                &ctx,
                &device.key(),
                &Mutation::new()
                    .delete_row()
                    .set(DEVICE_PROPERTIES, COLUMN_CREATED_DATE, "Mon Oct 19 08:30:00 UTC 2026"),
            )
            .await
            .unwrap();
        store
            .apply(
                &ctx,
                &device.main_key(),
                &Mutation::new()
                    .set(FIREBASE_PROPERTIES, COLUMN_FCM_TOKEN, device.fcm.as_str())
                    .set(DEVICE_PROPERTIES, COLUMN_DEVICE_ID, device.did.as_str()),
            )
            .await
            .unwrap();
    }

    store
        .apply(
            &ctx,
            "aid-test#qid-test#did-test",
            &Mutation::new()
                .delete_row()
                .set(DEVICE_PROPERTIES, COLUMN_APPLIANCE_KEY, "appk-test"),
        )
        .await
        .unwrap();

    store
}

#[tokio::test]
async fn test_paired_device_without_appk_is_eligible() {
    let pool = RegistrationPool::new(seeded_store().await);
    let ctx = CallContext::background();

    let key = pool.resolve_aid(&ctx, "aid-1").await.unwrap();
    assert_eq!(key, "aid-1#qid-1#did-1");
    assert_eq!(parse_rp_key(&key).unwrap(), "qid-1#did-1");

    let err = pool.get_appk(&ctx, &key).await.unwrap_err();
    assert!(matches!(err, RegistryError::NoAppK { ref key } if key == "aid-1#qid-1#did-1"));
    assert!(err.is_business_outcome());

    let (ready, key, error) = pool.classify_aid(&ctx, "aid-1").await.into_parts();
    assert!(ready);
    assert_eq!(key, "aid-1#qid-1#did-1");
    assert!(error.is_none());

    let state = pool.registration_state(&ctx, "aid-1").await;
    assert!(state.is_eligible());
}

#[tokio::test]
async fn test_unknown_aid_is_not_paired() {
    let pool = RegistrationPool::new(seeded_store().await);
    let ctx = CallContext::background();

    let err = pool.resolve_aid(&ctx, "aid-3").await.unwrap_err();
    assert!(matches!(err, RegistryError::NotPaired { ref aid } if aid == "aid-3"));

    let (ready, key, error) = pool.classify_aid(&ctx, "aid-3").await.into_parts();
    assert!(!ready);
    assert_eq!(key, "");
    assert!(matches!(error, Some(RegistryError::NotPaired { .. })));

    assert!(matches!(
        pool.registration_state(&ctx, "aid-3").await,
        RegistrationState::NotPaired { ref aid } if aid == "aid-3"
    ));
}

#[tokio::test]
async fn test_device_with_appk_is_refused() {
    let pool = RegistrationPool::new(seeded_store().await);
    let ctx = CallContext::background();

    let key = pool.resolve_aid(&ctx, "aid-test").await.unwrap();
    assert_eq!(key, "aid-test#qid-test#did-test");

    let appk = pool.get_appk(&ctx, &key).await.unwrap();
    assert_eq!(appk, b"appk-test".to_vec());

    let classification = pool.classify_aid(&ctx, "aid-test").await;
    assert!(!classification.paired_unregistered());
    assert_eq!(classification.key(), "aid-test#qid-test#did-test");
    assert!(matches!(
        classification.error(),
        Some(RegistryError::UnexpectedAppK { .. })
    ));

    let state = pool.registration_state(&ctx, "aid-test").await;
    assert!(matches!(state, RegistrationState::PairedWithKey { .. }));
    assert_eq!(state.key(), Some("aid-test#qid-test#did-test"));
}

#[tokio::test]
async fn test_classification_is_repeatable() {
    let pool = RegistrationPool::new(seeded_store().await);
    let ctx = CallContext::background();

    for aid in ["aid-1", "aid-3", "aid-test"] {
        let first = pool.classify_aid(&ctx, aid).await;
        let second = pool.classify_aid(&ctx, aid).await;
        assert_eq!(first.paired_unregistered(), second.paired_unregistered());
        assert_eq!(first.key(), second.key());
        assert_eq!(
            first.error().map(|e| e.to_string()),
            second.error().map(|e| e.to_string())
        );
    }
}

#[tokio::test]
async fn test_classification_follows_appk_writes() {
    let store = seeded_store().await;
    let pool = RegistrationPool::new(store.clone());
    let ctx = CallContext::background();
    assert!(pool.registration_state(&ctx, "aid-2").await.is_eligible());

    store
        .apply(
            &ctx,
            "aid-2#qid-2#did-2",
            &Mutation::new().set(DEVICE_PROPERTIES, COLUMN_APPLIANCE_KEY, "appk-2"),
        )
        .await
        .unwrap();

    assert!(matches!(
        pool.registration_state(&ctx, "aid-2").await,
        RegistrationState::PairedWithKey { .. }
    ));
}

#[tokio::test]
async fn test_device_record_of_provisioned_row() {
    let pool = RegistrationPool::new(seeded_store().await);
    let ctx = CallContext::background();

    let record = pool.device_record(&ctx, "aid-1#qid-1#did-1").await.unwrap();
    assert_eq!(record.key.did(), "did-1");
    assert!(record.created.is_some());
    assert!(!record.has_appk());

    let fcm = pool
        .read_all_values(&ctx, FIREBASE_PROPERTIES, COLUMN_FCM_TOKEN)
        .await
        .unwrap();
    let keys: Vec<&str> = fcm.iter().map(|(key, _)| key.as_str()).collect();
    assert_eq!(keys, vec!["qid-1#did-1", "qid-2#did-2"]);
}

/// Gateway whose every call fails, counting the calls it receives.
#[derive(Default)]
struct FailingGateway {
    calls: AtomicUsize,
}

impl RowStoreGateway for FailingGateway {
    async fn read_rows_by_prefix(
        &self,
        _ctx: &CallContext,
        _prefix: &str,
        _filter: &RowFilter,
        _limit: usize,
    ) -> Result<Vec<Row>, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn read_row(
        &self,
        _ctx: &CallContext,
        _key: &str,
        _filter: &RowFilter,
    ) -> Result<Option<Row>, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn apply(
        &self,
        _ctx: &CallContext,
        _key: &str,
        _mutation: &Mutation,
    ) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("read only".to_string()))
    }
}

#[tokio::test]
async fn test_store_failure_is_not_a_missing_pairing() {
    let pool = RegistrationPool::new(FailingGateway::default());
    let ctx = CallContext::background();

    let err = pool.resolve_aid(&ctx, "aid-1").await.unwrap_err();
    assert!(err.is_store_error());
    assert!(!err.is_business_outcome());
    assert_eq!(err.key(), "aid-1");

    let err = pool.get_appk(&ctx, "aid-1#qid-1#did-1").await.unwrap_err();
    assert!(matches!(
        err,
        RegistryError::Store { source: StoreError::Unavailable(_), .. }
    ));

    let state = pool.registration_state(&ctx, "aid-1").await;
    assert!(matches!(state, RegistrationState::Indeterminate { key: None, .. }));

    // One attempt per call, never retried
    assert_eq!(pool.gateway().calls.load(Ordering::SeqCst), 3);
}

/// Gateway that serves the resolve scan but fails the AppK read.
struct FlakyAppKGateway {
    inner: MemoryRowStore,
}

impl RowStoreGateway for FlakyAppKGateway {
    async fn read_rows_by_prefix(
        &self,
        ctx: &CallContext,
        prefix: &str,
        filter: &RowFilter,
        limit: usize,
    ) -> Result<Vec<Row>, StoreError> {
        self.inner.read_rows_by_prefix(ctx, prefix, filter, limit).await
    }

    async fn read_row(
        &self,
        _ctx: &CallContext,
        _key: &str,
        _filter: &RowFilter,
    ) -> Result<Option<Row>, StoreError> {
        Err(StoreError::QueryError("tablet moved".to_string()))
    }

    async fn apply(
        &self,
        ctx: &CallContext,
        key: &str,
        mutation: &Mutation,
    ) -> Result<(), StoreError> {
        self.inner.apply(ctx, key, mutation).await
    }
}

#[tokio::test]
async fn test_appk_read_failure_keeps_resolved_key() {
    let pool = RegistrationPool::new(FlakyAppKGateway {
        inner: seeded_store().await,
    });
    let ctx = CallContext::background();

    let (ready, key, error) = pool.classify_aid(&ctx, "aid-1").await.into_parts();
    assert!(!ready);
    assert_eq!(key, "aid-1#qid-1#did-1");
    let error = error.unwrap();
    assert!(error.is_store_error());
    assert_eq!(error.key(), "aid-1#qid-1#did-1");

    match pool.registration_state(&ctx, "aid-1").await {
        RegistrationState::Indeterminate { key, error } => {
            assert_eq!(key.as_deref(), Some("aid-1#qid-1#did-1"));
            assert!(error.is_store_error());
        }
        other => panic!("expected indeterminate state, got {:?}", other),
    }
}

/// Gateway that takes longer than any reasonable deadline.
struct SlowGateway {
    inner: MemoryRowStore,
    delay: Duration,
}

impl RowStoreGateway for SlowGateway {
    async fn read_rows_by_prefix(
        &self,
        ctx: &CallContext,
        prefix: &str,
        filter: &RowFilter,
        limit: usize,
    ) -> Result<Vec<Row>, StoreError> {
        ctx.run(async {
            tokio::time::sleep(self.delay).await;
            self.inner.read_rows_by_prefix(ctx, prefix, filter, limit).await
        })
        .await
    }

    async fn read_row(
        &self,
        ctx: &CallContext,
        key: &str,
        filter: &RowFilter,
    ) -> Result<Option<Row>, StoreError> {
        ctx.run(async {
            tokio::time::sleep(self.delay).await;
            self.inner.read_row(ctx, key, filter).await
        })
        .await
    }

    async fn apply(
        &self,
        ctx: &CallContext,
        key: &str,
        mutation: &Mutation,
    ) -> Result<(), StoreError> {
        self.inner.apply(ctx, key, mutation).await
    }
}

#[tokio::test(start_paused = true)]
async fn test_deadline_bounds_the_whole_classification() {
    let pool = RegistrationPool::new(SlowGateway {
        inner: seeded_store().await,
        delay: Duration::from_millis(300),
    });

    // Enough for the resolve scan, not for the AppK read that follows.
    let ctx = CallContext::with_timeout(Duration::from_millis(500));
    let (ready, key, error) = pool.classify_aid(&ctx, "aid-1").await.into_parts();
    assert!(!ready);
    assert_eq!(key, "aid-1#qid-1#did-1");
    assert!(matches!(
        error,
        Some(RegistryError::Store { source: StoreError::DeadlineExceeded, .. })
    ));

    let relaxed = CallContext::with_timeout(Duration::from_secs(5));
    assert!(pool.registration_state(&relaxed, "aid-1").await.is_eligible());
}

#[tokio::test]
async fn test_pool_from_configuration() {
    let config = Arc::new(AppConfig::default());
    let pool = RegistrationPool::from_app_config(&config).await.unwrap();
    assert_eq!(pool.gateway().backend_name(), "memory");

    let mut sql = AppConfig::default();
    sql.store.backend = StoreBackend::Sql;
    sql.database = Some(DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: Some(1),
        acquire_timeout_secs: Some(3),
    });
    sql.store.request_timeout_ms = Some(5_000);
    let sql = Arc::new(sql);
    let pool = RegistrationPool::from_app_config(&sql).await.unwrap();
    assert_eq!(pool.gateway().backend_name(), "sql");

    let ctx = CallContext::for_store(&sql.store);
    let device = DeviceEntry::new("aid-5", "qid-5", "did-5", "fcm-5");
    pool.gateway()
        .apply(
            &ctx,
            &device.key(),
            &Mutation::new().set(DEVICE_PROPERTIES, COLUMN_DEVICE_ID, device.did.as_str()),
        )
        .await
        .unwrap();
    assert!(pool.registration_state(&ctx, "aid-5").await.is_eligible());

    let mut missing_database = AppConfig::default();
    missing_database.store.backend = StoreBackend::Sql;
    assert!(RegistrationPool::from_app_config(&Arc::new(missing_database))
        .await
        .is_err());
}
