//! Integration tests for state management

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use relval_errors::{Error, PackageError, StateError};
    use relval_events::{channel, AppEvent, CatalogEvent};
    use relval_state::*;
    use relval_types::{PackageRecord, PolledStatus, Timestamp, ValidationStatus};
    use tempfile::{tempdir, TempDir};

    const TARBALL: &str = "aliroot-v5-05-Rev-01-Linux-x86_64-2.6-gnu-4.1.2.tar.gz";

    fn package(tarball: &str, version: &str) -> PackageRecord {
        PackageRecord::from_catalog_line(&format!(
            "{tarball} AliRoot {version} Linux-x86_64-2.6-gnu-4.1.2 VO_ALICE@AliRoot::{version} VO_ALICE@ROOT::v5-34-08"
        ))
        .unwrap()
    }

    fn at(secs: i64) -> Timestamp {
        let base = Utc.with_ymd_and_hms(2014, 7, 30, 21, 0, 0).unwrap();
        Timestamp::from_datetime(base + Duration::seconds(secs))
    }

    async fn setup_store() -> (ValidationStore, TempDir) {
        let temp_dir = tempdir().unwrap();
        let (tx, _rx) = channel();
        let store = ValidationStore::open(&temp_dir.path().join("relval.sqlite"), tx)
            .await
            .unwrap();
        (store, temp_dir)
    }

    async fn cached(store: &ValidationStore, record: PackageRecord) -> PackageRecord {
        let tarball = record.tarball.clone();
        store
            .cache_package_or_lookup(&tarball, || async move { Ok(vec![record]) })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_cache_package_or_lookup() {
        let temp_dir = tempdir().unwrap();
        let (tx, mut rx) = channel();
        let store = ValidationStore::open(&temp_dir.path().join("relval.sqlite"), tx)
            .await
            .unwrap();

        let record = package(TARBALL, "v5-05-Rev-01");
        let stored = cached(&store, record.clone()).await;
        assert_eq!(stored, record);

        // Cached now: the candidate source must not be consulted
        let again = store
            .cache_package_or_lookup(TARBALL, || async {
                Err(Error::internal("catalog should not be fetched"))
            })
            .await
            .unwrap();
        assert_eq!(again, record);

        let cached_events = std::iter::from_fn(|| rx.try_recv().ok())
            .filter(|m| matches!(m.event, AppEvent::Catalog(CatalogEvent::PackageCached { .. })))
            .count();
        assert_eq!(cached_events, 1);

        let err = store
            .cache_package_or_lookup("missing.tar.gz", || async { Ok(vec![record.clone()]) })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Package(PackageError::NotFound { .. })));
        assert_eq!(store.list_packages().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_enqueue_dedup_and_requeue_after_terminal() {
        let (store, _dir) = setup_store().await;
        let pkg = cached(&store, package(TARBALL, "v5-05-Rev-01")).await;

        let first = store.enqueue(&pkg).await.unwrap();
        let EnqueueOutcome::Enqueued(id) = first else {
            panic!("expected a new validation, got {first:?}");
        };
        assert_eq!(
            store.enqueue(&pkg).await.unwrap(),
            EnqueueOutcome::AlreadyQueued
        );

        // Still blocked while running
        let mut validation = store.get_validation(id).await.unwrap().unwrap();
        validation.start(Timestamp::now()).unwrap();
        store.update_validation(&validation).await.unwrap();
        assert_eq!(
            store.enqueue(&pkg).await.unwrap(),
            EnqueueOutcome::AlreadyQueued
        );

        validation
            .apply_poll(PolledStatus::DoneOk, Timestamp::now())
            .unwrap();
        store.update_validation(&validation).await.unwrap();

        let third = store.enqueue(&pkg).await.unwrap();
        assert!(matches!(third, EnqueueOutcome::Enqueued(new_id) if new_id != id));

        let all = store.list_validations(None).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].status, ValidationStatus::DoneOk);
        assert_eq!(all[1].status, ValidationStatus::Queued);
    }

    #[tokio::test]
    async fn test_enqueue_uncached_package_fails() {
        let (store, _dir) = setup_store().await;
        let err = store
            .enqueue(&package(TARBALL, "v5-05-Rev-01"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::State(StateError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_two_handles_enqueue_once() {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("relval.sqlite");
        let (tx, _rx) = channel();

        let first = ValidationStore::open(&db_path, tx.clone()).await.unwrap();
        let second = ValidationStore::open(&db_path, tx).await.unwrap();

        let pkg = cached(&first, package(TARBALL, "v5-05-Rev-01")).await;
        let pkg_again = cached(&second, package(TARBALL, "v5-05-Rev-01")).await;
        assert_eq!(pkg, pkg_again);

        let a = first.enqueue(&pkg).await.unwrap();
        let b = second.enqueue(&pkg_again).await.unwrap();
        assert!(matches!(a, EnqueueOutcome::Enqueued(_)));
        assert_eq!(b, EnqueueOutcome::AlreadyQueued);

        let queued = second
            .list_validations(Some(ValidationStatus::Queued))
            .await
            .unwrap();
        assert_eq!(queued.len(), 1);
    }

    #[tokio::test]
    async fn test_oldest_queued_follows_inserted() {
        let (store, _dir) = setup_store().await;
        let rev1 = cached(&store, package(TARBALL, "v5-05-Rev-01")).await;
        let rev2 = cached(
            &store,
            package(
                "aliroot-v5-05-Rev-02-Linux-x86_64-2.6-gnu-4.1.2.tar.gz",
                "v5-05-Rev-02",
            ),
        )
        .await;
        let rev3 = cached(
            &store,
            package(
                "aliroot-v5-05-Rev-03-Linux-x86_64-2.6-gnu-4.1.2.tar.gz",
                "v5-05-Rev-03",
            ),
        )
        .await;

        assert!(store.oldest_queued().await.unwrap().is_none());

        store.enqueue_at(&rev1, at(100)).await.unwrap();
        store.enqueue_at(&rev2, at(200)).await.unwrap();
        let oldest = store.oldest_queued().await.unwrap().unwrap();
        assert_eq!(oldest.package.tarball, rev1.tarball);
        assert_eq!(oldest.inserted, at(100));

        // A synthetic earlier timestamp jumps the queue
        store.enqueue_at(&rev3, at(50)).await.unwrap();
        let oldest = store.oldest_queued().await.unwrap().unwrap();
        assert_eq!(oldest.package.tarball, rev3.tarball);

        let listed: Vec<_> = store
            .list_validations(None)
            .await
            .unwrap()
            .into_iter()
            .map(|v| v.package.version)
            .collect();
        assert_eq!(listed, vec!["v5-05-Rev-03", "v5-05-Rev-01", "v5-05-Rev-02"]);
    }

    #[tokio::test]
    async fn test_ties_break_by_id() {
        let (store, _dir) = setup_store().await;
        let rev1 = cached(&store, package(TARBALL, "v5-05-Rev-01")).await;
        let rev2 = cached(
            &store,
            package(
                "aliroot-v5-05-Rev-02-Linux-x86_64-2.6-gnu-4.1.2.tar.gz",
                "v5-05-Rev-02",
            ),
        )
        .await;

        store.enqueue_at(&rev2, at(10)).await.unwrap();
        store.enqueue_at(&rev1, at(10)).await.unwrap();
        let oldest = store.oldest_queued().await.unwrap().unwrap();
        assert_eq!(oldest.package.tarball, rev2.tarball);
    }

    #[tokio::test]
    async fn test_updates_persist_and_missing_rows_fail() {
        let (store, _dir) = setup_store().await;
        let mut pkg = cached(&store, package(TARBALL, "v5-05-Rev-01")).await;

        pkg.fetched = true;
        store.update_package(&pkg).await.unwrap();
        assert!(store.find_package(TARBALL).await.unwrap().unwrap().fetched);

        let EnqueueOutcome::Enqueued(id) = store.enqueue_at(&pkg, at(0)).await.unwrap() else {
            panic!("expected a new validation");
        };
        let mut validation = store.get_validation(id).await.unwrap().unwrap();
        validation.start(at(60)).unwrap();
        store.update_validation(&validation).await.unwrap();

        let reloaded = store.get_validation(id).await.unwrap().unwrap();
        assert_eq!(reloaded, validation);
        assert_eq!(reloaded.started, Some(at(60)));

        let mut ghost = validation.clone();
        ghost.id = 999;
        let err = store.update_validation(&ghost).await.unwrap_err();
        assert!(matches!(err, Error::State(StateError::NotFound { .. })));

        let mut stranger = pkg.clone();
        stranger.tarball = "never-cached.tar.gz".to_string();
        let err = store.update_package(&stranger).await.unwrap_err();
        assert!(matches!(err, Error::State(StateError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_fractional_timestamps_survive_storage() {
        let (store, _dir) = setup_store().await;
        let pkg = cached(&store, package(TARBALL, "v5-05-Rev-01")).await;

        let inserted = Timestamp::from_epoch_secs(1_406_754_375.6).unwrap();
        store.enqueue_at(&pkg, inserted).await.unwrap();

        let oldest = store.oldest_queued().await.unwrap().unwrap();
        assert_eq!(oldest.inserted, inserted);
        assert_eq!(oldest.inserted.to_string(), "2014-07-30 21:06:15.600000");
    }

    #[tokio::test]
    async fn test_every_pooled_connection_uses_normal_sync() {
        let temp_dir = tempdir().unwrap();
        let pool = create_pool(&temp_dir.path().join("relval.sqlite"))
            .await
            .unwrap();

        // Hold two connections at once so both come from separate opens
        let mut first = pool.acquire().await.unwrap();
        let mut second = pool.acquire().await.unwrap();
        for conn in [&mut first, &mut second] {
            let (mode,): (i64,) = sqlx::query_as("PRAGMA synchronous")
                .fetch_one(&mut **conn)
                .await
                .unwrap();
            // 1 = NORMAL
            assert_eq!(mode, 1);
        }
    }
}
