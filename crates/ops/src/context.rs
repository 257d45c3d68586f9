//! Operations context for dependency injection

use crate::notify::Notifier;
use crate::template::{self, render, Vars};
use relval_config::Config;
use relval_errors::{Error, OpsError};
use relval_events::{AppEvent, EventEmitter, EventSender, ValidationEvent};
use relval_index::CatalogSource;
use relval_platform::ProcessRunner;
use relval_state::ValidationStore;
use relval_types::{PackageRecord, StatusCodeMap, Timestamp, Validation, ValidationStatus};
use std::sync::Arc;

/// Operations context providing access to all system components
pub struct OpsCtx {
    /// Queue store
    pub store: ValidationStore,
    /// Remote package listings
    pub catalog: Box<dyn CatalogSource>,
    /// Runs unpack, run and status commands
    pub runner: Arc<dyn ProcessRunner>,
    /// Delivers started/finished notifications
    pub notifier: Box<dyn Notifier>,
    /// Event sender for progress reporting
    pub tx: EventSender,
    /// System configuration
    pub config: Config,
    /// Status command exit code table, validated from `config`
    pub status_codes: StatusCodeMap,
    /// Skip every side effect, only report what would happen
    pub dry_run: bool,
}

impl EventEmitter for OpsCtx {
    fn event_sender(&self) -> Option<&EventSender> {
        Some(&self.tx)
    }
}

impl OpsCtx {
    // No public constructor - use OpsContextBuilder instead

    /// Base URL of the configured catalog
    #[must_use]
    pub fn baseurl(&self) -> &str {
        self.catalog.baseurl()
    }

    /// Substitution variables describing `validation`
    ///
    /// `PLATFORM` and `ARCH` are only defined when the package carries them,
    /// so templates using them fail to resolve for such packages. `DESTDIR`
    /// is added by [`OpsCtx::resolve_paths`].
    #[must_use]
    pub fn template_vars(&self, validation: &Validation) -> Vars {
        let package = &validation.package;
        let mut vars = Vars::new();
        vars.set_opt(template::PLATFORM, package.platform.as_deref())
            .set_opt(template::ARCH, package.arch.as_deref())
            .set(template::VERSION, package.version.as_str())
            .set(template::URL, package.url(self.baseurl()))
            .set(template::MODULEFILE_DEPS, package.modulefile_deps())
            .set(template::SESSIONTAG, validation.session_tag());

        let results_url = render(&self.config.general.results_url, &vars).text;
        vars.set(template::RESULTS_URL, results_url);
        vars
    }

    /// Resolve the unpack directory and module file path
    ///
    /// Both must resolve completely. `DESTDIR` is added to `vars` so the
    /// module file path and later commands can refer to it.
    ///
    /// # Errors
    ///
    /// Returns `OpsError::UnresolvedPlaceholders` naming the first path
    /// template that cannot be resolved.
    pub fn resolve_paths(&self, vars: &mut Vars) -> Result<(String, String), OpsError> {
        let settings = &self.config.validation;
        let destdir = render(&settings.unpack_dir, vars).require("validation.unpack_dir")?;
        vars.set(template::DESTDIR, destdir.as_str());
        let module_file = render(&settings.module_file, vars).require("validation.module_file")?;
        Ok((destdir, module_file))
    }

    /// Check that a validation of `package` queued now could be dispatched
    ///
    /// # Errors
    ///
    /// Returns `OpsError::UnresolvedPlaceholders` if the package lacks a
    /// variable the path templates need.
    pub fn check_dispatchable(&self, package: &PackageRecord) -> Result<(), OpsError> {
        let candidate = Validation {
            id: 0,
            package: package.clone(),
            inserted: Timestamp::now(),
            started: None,
            ended: None,
            status: ValidationStatus::Queued,
        };
        let mut vars = self.template_vars(&candidate);
        self.resolve_paths(&mut vars).map(|_| ())
    }

    /// Render a command line, warning about variables left unresolved
    pub fn render_command(&self, name: &str, template: &str, vars: &Vars) -> String {
        let rendered = render(template, vars);
        if !rendered.is_complete() {
            self.emit(AppEvent::Validation(ValidationEvent::UnresolvedVariables {
                template: name.to_string(),
                keys: rendered.unresolved.clone(),
            }));
        }
        rendered.text
    }
}

/// Builder for operations context
pub struct OpsContextBuilder {
    store: Option<ValidationStore>,
    catalog: Option<Box<dyn CatalogSource>>,
    runner: Option<Arc<dyn ProcessRunner>>,
    notifier: Option<Box<dyn Notifier>>,
    tx: Option<EventSender>,
    config: Option<Config>,
    dry_run: Option<bool>,
}

impl OpsContextBuilder {
    /// Create new context builder
    #[must_use]
    pub fn new() -> Self {
        Self {
            store: None,
            catalog: None,
            runner: None,
            notifier: None,
            tx: None,
            config: None,
            dry_run: None,
        }
    }

    #[must_use]
    pub fn with_store(mut self, store: ValidationStore) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn with_catalog(mut self, catalog: Box<dyn CatalogSource>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    #[must_use]
    pub fn with_runner(mut self, runner: Arc<dyn ProcessRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    #[must_use]
    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    #[must_use]
    pub fn with_event_sender(mut self, tx: EventSender) -> Self {
        self.tx = Some(tx);
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Override `general.dry_run` from the configuration
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = Some(dry_run);
        self
    }

    /// Build the context
    ///
    /// # Errors
    ///
    /// Returns an error if any required component is missing or the status
    /// code table in the configuration is invalid.
    pub fn build(self) -> Result<OpsCtx, Error> {
        let store = self.store.ok_or_else(|| missing("store"))?;
        let catalog = self.catalog.ok_or_else(|| missing("catalog"))?;
        let runner = self.runner.ok_or_else(|| missing("runner"))?;
        let notifier = self.notifier.ok_or_else(|| missing("notifier"))?;
        let tx = self.tx.ok_or_else(|| missing("event_sender"))?;
        let config = self.config.ok_or_else(|| missing("config"))?;

        let status_codes = config.status_code_map()?;
        let dry_run = self.dry_run.unwrap_or(config.general.dry_run);

        Ok(OpsCtx {
            store,
            catalog,
            runner,
            notifier,
            tx,
            config,
            status_codes,
            dry_run,
        })
    }
}

impl Default for OpsContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn missing(component: &str) -> Error {
    OpsError::MissingComponent {
        component: component.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::NullNotifier;
    use relval_events::channel;
    use relval_index::FileCatalog;
    use relval_platform::ShellRunner;
    use relval_types::{PackageRecord, Timestamp, ValidationStatus};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_build_requires_every_component() {
        let (tx, _rx) = channel();
        let err = OpsContextBuilder::new()
            .with_event_sender(tx)
            .with_config(Config::default())
            .build()
            .err()
            .unwrap();
        assert!(matches!(
            err,
            Error::Ops(OpsError::MissingComponent { ref component }) if component == "store"
        ));
    }

    #[tokio::test]
    async fn test_dry_run_flag_overrides_config() {
        let temp_dir = TempDir::new().unwrap();
        let (tx, _rx) = channel();
        let store = ValidationStore::open(&temp_dir.path().join("db.sqlite"), tx.clone())
            .await
            .unwrap();

        let mut config = Config::default();
        config.general.dry_run = false;

        let ctx = OpsContextBuilder::new()
            .with_store(store)
            .with_catalog(Box::new(FileCatalog::new(temp_dir.path(), tx.clone())))
            .with_runner(Arc::new(ShellRunner::new(tx.clone())))
            .with_notifier(Box::new(NullNotifier))
            .with_event_sender(tx)
            .with_config(config)
            .with_dry_run(true)
            .build()
            .unwrap();

        assert!(ctx.dry_run);
        assert!(ctx.baseurl().starts_with("file://"));

        let validation = Validation {
            id: 3,
            package: PackageRecord::from_catalog_line(
                "odd-name.tgz AliRoot v1 Linux-x86_64 VO_ALICE@AliRoot::v1 VO_ALICE@ROOT::v5-34-08",
            )
            .unwrap(),
            inserted: Timestamp::from_epoch_secs(1_406_754_375.0).unwrap(),
            started: None,
            ended: None,
            status: ValidationStatus::Queued,
        };
        let vars = ctx.template_vars(&validation);
        assert_eq!(vars.get(template::PLATFORM), None);
        assert_eq!(vars.get(template::ARCH), None);
        assert_eq!(vars.get(template::MODULEFILE_DEPS), Some("ROOT/v5-34-08"));
        assert_eq!(
            vars.get(template::RESULTS_URL),
            Some("http://localhost/v1-unknown-unknown-20140730210615")
        );

        let command = ctx.render_command("validation.run_cmd", "start $ARCH $VERSION", &vars);
        assert_eq!(command, "start $ARCH v1");
    }
}
