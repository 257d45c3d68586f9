//! Integration tests for config

#[cfg(test)]
mod tests {
    use relval_config::*;
    use std::io::Write;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    // Mutex to ensure env var tests don't run concurrently
    static ENV_TEST_MUTEX: Mutex<()> = Mutex::new(());

    #[tokio::test]
    async fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[general]
db_path = "/srv/relval/queue.sqlite"
catalog_url = "http://packages.example.org/tarballs"
results_url = "http://results.example.org/$SESSIONTAG/"

[validation]
unpack_cmd = "curl -s $URL | tar -xz -C $DESTDIR"
status_cmd = "relval-status $SESSIONTAG"

[status_codes]
running = 10
not_running = 11
done_ok = 12
done_fail = 13

[mail]
enabled = false
recipients = ["release-team@example.org"]
        "#
        )
        .unwrap();

        let config = Config::load_from_file(temp_file.path()).await.unwrap();
        assert_eq!(
            config.general.db_path,
            PathBuf::from("/srv/relval/queue.sqlite")
        );
        assert_eq!(
            config.general.catalog_url,
            "http://packages.example.org/tarballs"
        );
        assert_eq!(config.validation.status_cmd, "relval-status $SESSIONTAG");
        // Unset keys fall back to defaults
        assert_eq!(config.validation.run_cmd, constants::RUN_CMD);
        assert_eq!(config.status_codes.done_fail, 13);
        assert!(!config.mail.enabled);
        assert_eq!(config.mail.recipients, vec!["release-team@example.org"]);
        assert_eq!(config.lock.attempts, 10);
        assert_eq!(config.network.retries, 3);
        config.validate().unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_status_codes_rejected() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r"
[status_codes]
running = 0
not_running = 0
        "
        )
        .unwrap();

        let config = Config::load_from_file(temp_file.path()).await.unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("0"));
    }

    #[tokio::test]
    async fn test_invalid_toml() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "[general\ndb_path = ").unwrap();

        let result = Config::load_from_file(temp_file.path()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_explicit_missing_path_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");

        let result = Config::load_or_create(Some(&missing)).await;
        assert!(result.is_err());
        assert!(!missing.exists());
    }

    #[tokio::test]
    async fn test_write_then_load_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("relval.toml");

        let config = Config::default();
        config.write_to_file(&path).await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("# relval configuration"));
        assert!(contents.contains("[status_codes]"));

        let reloaded = Config::load_from_file(&path).await.unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_merge_env() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();

        // Clean up any existing env vars first
        std::env::remove_var("RELVAL_DB_PATH");
        std::env::remove_var("RELVAL_DRY_RUN");
        std::env::remove_var("RELVAL_CATALOG_URL");
        std::env::remove_var("RELVAL_LOG_DIR");

        std::env::set_var("RELVAL_DB_PATH", "/tmp/relval-env.sqlite");
        std::env::set_var("RELVAL_DRY_RUN", "yes");

        let mut config = Config::default();
        config.merge_env().unwrap();

        assert_eq!(
            config.general.db_path,
            PathBuf::from("/tmp/relval-env.sqlite")
        );
        assert!(config.general.dry_run);

        // Clean up
        std::env::remove_var("RELVAL_DB_PATH");
        std::env::remove_var("RELVAL_DRY_RUN");
    }

    #[test]
    fn test_merge_env_invalid_value() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();

        std::env::remove_var("RELVAL_DB_PATH");
        std::env::remove_var("RELVAL_CATALOG_URL");
        std::env::remove_var("RELVAL_LOG_DIR");
        std::env::set_var("RELVAL_DRY_RUN", "sometimes");

        let mut config = Config::default();
        let result = config.merge_env();
        assert!(result.is_err());

        std::env::remove_var("RELVAL_DRY_RUN");
    }
}
