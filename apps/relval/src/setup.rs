//! System setup and initialization

use crate::error::CliError;
use relval_config::Config;
use relval_events::EventSender;
use relval_index::{catalog_for, CatalogSource};
use relval_net::{NetClient, NetConfig};
use relval_ops::{MailNotifier, Notifier, NullNotifier};
use relval_platform::{PidLock, ProcessRunner, ShellRunner};
use relval_state::ValidationStore;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// System setup and component initialization
///
/// Holds the single-instance lock for as long as it lives.
pub struct SystemSetup {
    config: Config,
    tx: EventSender,
    lock: Option<PidLock>,
    store: Option<ValidationStore>,
    net: Option<NetClient>,
    runner: Option<Arc<dyn ProcessRunner>>,
}

impl SystemSetup {
    /// Create new system setup
    pub fn new(config: Config, tx: EventSender) -> Self {
        Self {
            config,
            tx,
            lock: None,
            store: None,
            net: None,
            runner: None,
        }
    }

    /// Initialize all system components
    pub async fn initialize(&mut self) -> Result<(), CliError> {
        info!("Initializing relval components");

        self.ensure_directories().await?;
        self.acquire_lock().await?;
        self.init_store().await?;
        self.init_net()?;
        self.runner = Some(Arc::new(ShellRunner::new(self.tx.clone())));

        info!("System initialization completed");
        Ok(())
    }

    /// Get the queue store
    pub fn store(&self) -> Result<&ValidationStore, CliError> {
        self.store
            .as_ref()
            .ok_or_else(|| CliError::Setup("store not initialized".to_string()))
    }

    /// Get the command runner
    pub fn runner(&self) -> Result<Arc<dyn ProcessRunner>, CliError> {
        self.runner
            .clone()
            .ok_or_else(|| CliError::Setup("runner not initialized".to_string()))
    }

    /// Catalog source for the configured base URL
    pub fn catalog(&self) -> Result<Box<dyn CatalogSource>, CliError> {
        let net = self
            .net
            .clone()
            .ok_or_else(|| CliError::Setup("network client not initialized".to_string()))?;
        Ok(catalog_for(
            &self.config.general.catalog_url,
            net,
            self.tx.clone(),
        ))
    }

    /// Notifier matching the mail configuration
    pub fn notifier(&self) -> Result<Box<dyn Notifier>, CliError> {
        let mail = &self.config.mail;
        if !mail.enabled {
            debug!("Mail notifications disabled");
            return Ok(Box::new(NullNotifier));
        }
        Ok(Box::new(MailNotifier::new(
            mail.sender.clone(),
            mail.command.clone(),
            self.runner()?,
        )))
    }

    /// Close the store and release the lock
    pub async fn shutdown(&mut self) {
        if let Some(store) = self.store.take() {
            store.close().await;
        }
        if let Some(lock) = self.lock.take() {
            debug!(path = %lock.path().display(), "Releasing lock");
            drop(lock);
        }
    }

    /// Create the log directory and the parent directories of the
    /// database and pid file
    async fn ensure_directories(&self) -> Result<(), CliError> {
        let log_dir = self.config.log_dir()?;
        let db_path = self.config.db_path()?;
        let pid_file = self.config.pid_file()?;

        let parents = [db_path.parent(), pid_file.parent()];
        let dirs = std::iter::once(log_dir.as_path()).chain(parents.into_iter().flatten());
        for dir in dirs {
            create_dir(dir).await?;
        }
        Ok(())
    }

    async fn acquire_lock(&mut self) -> Result<(), CliError> {
        let pid_file = self.config.pid_file()?;
        debug!(path = %pid_file.display(), "Acquiring lock");
        let lock = PidLock::acquire(
            &pid_file,
            self.config.lock.attempts,
            Duration::from_millis(self.config.lock.retry_delay_ms),
            self.tx.clone(),
        )
        .await?;
        self.lock = Some(lock);
        Ok(())
    }

    async fn init_store(&mut self) -> Result<(), CliError> {
        let db_path = self.config.db_path()?;
        debug!(path = %db_path.display(), "Opening queue store");
        let store = ValidationStore::open(&db_path, self.tx.clone()).await?;
        self.store = Some(store);
        Ok(())
    }

    fn init_net(&mut self) -> Result<(), CliError> {
        debug!("Initializing network client");
        let network = &self.config.network;
        let net_config = NetConfig {
            timeout: Duration::from_secs(network.timeout),
            retry_count: network.retries,
            retry_delay: Duration::from_secs(network.retry_delay),
            ..NetConfig::default()
        };
        self.net = Some(NetClient::new(net_config)?);
        Ok(())
    }
}

async fn create_dir(dir: &Path) -> Result<(), CliError> {
    if dir.as_os_str().is_empty() || relval_platform::fs::is_dir(dir).await {
        return Ok(());
    }
    debug!("Creating directory: {}", dir.display());
    relval_platform::fs::create_dir_all(dir)
        .await
        .map_err(|e| CliError::Setup(format!("Failed to create {}: {e}", dir.display())))
}
