//! Benchmark registration
//!
//! [`Faceoff`] owns the registered versions, the config stack and the
//! benchmark definitions. Registration only records what to run; nothing
//! executes until [`Faceoff::run`].

use crate::error::{BoxError, ConfigError, FaceoffError};
use crate::hooks::{Body, BoxFuture, Setup, Teardown};
use crate::options::{Options, TuningOptions, TuningOverrides};
use crate::provision::{NoProvisioner, Provisioner, VersionSource};
use crate::runner::Runner;
use crate::scope::ConfigStack;
use faceoff_report::{ResultSet, SEPARATOR};
use fxhash::FxHashMap;
use std::ops::{Deref, DerefMut};
use tracing::{debug, warn};

/// One logical benchmark, bound to every version it runs against
pub struct BenchmarkDefinition<M, C> {
    /// Heading: suite path and name joined by the separator
    pub id: String,
    /// Display name as passed to `add`
    pub name: String,
    /// Enclosing suite names
    pub path: Vec<String>,
    pub body: Body<M, C>,
    pub setup: Option<Setup<M, C>>,
    pub teardown: Option<Teardown<M, C>>,
    /// Tuning merged from every enclosing scope and the `add` call
    pub tuning: TuningOverrides,
    /// Effective version labels; the first one is the baseline
    pub versions: Vec<String>,
}

impl<M, C> BenchmarkDefinition<M, C> {
    /// Fully-qualified name of one execution unit
    pub fn fqn(&self, version: &str) -> String {
        format!("{}{SEPARATOR}{version}", self.id)
    }

    /// Label of the baseline version
    pub fn baseline(&self) -> Option<&str> {
        self.versions.first().map(String::as_str)
    }
}

impl<M, C> std::fmt::Debug for BenchmarkDefinition<M, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BenchmarkDefinition")
            .field("id", &self.id)
            .field("versions", &self.versions)
            .field("tuning", &self.tuning)
            .finish_non_exhaustive()
    }
}

/// Benchmark suite comparing several versions of a module of type `M`.
///
/// `C` is the context produced by `setup` and handed to every call of the
/// benchmark body; it defaults to `C::default()` when no setup is configured.
pub struct Faceoff<M, C = ()> {
    versions: Vec<(String, VersionSource<M>)>,
    stack: ConfigStack<M, C>,
    definitions: Vec<BenchmarkDefinition<M, C>>,
    index: FxHashMap<String, usize>,
    provisioner: Box<dyn Provisioner<M>>,
}

impl<M: 'static, C: 'static> Faceoff<M, C> {
    /// Create a suite over `versions`, in baseline-first order.
    ///
    /// Labels must be non-empty, unique, and must not contain the separator.
    pub fn new<I, L>(versions: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (L, VersionSource<M>)>,
        L: Into<String>,
    {
        let mut seen = Vec::new();
        let mut registered = Vec::new();
        for (label, source) in versions {
            let label = label.into();
            if label.is_empty() {
                return Err(ConfigError::InvalidVersionLabel {
                    label,
                    reason: "must not be empty".to_string(),
                });
            }
            if label.contains(SEPARATOR) {
                return Err(ConfigError::InvalidVersionLabel {
                    reason: format!("must not contain {SEPARATOR:?}"),
                    label,
                });
            }
            if seen.contains(&label) {
                return Err(ConfigError::InvalidVersionLabel {
                    label,
                    reason: "registered twice".to_string(),
                });
            }
            seen.push(label.clone());
            registered.push((label, source));
        }

        Ok(Self {
            versions: registered,
            stack: ConfigStack::new(Options::default()),
            definitions: Vec::new(),
            index: FxHashMap::default(),
            provisioner: Box::new(NoProvisioner),
        })
    }

    /// Root defaults applied to every benchmark registered afterwards
    pub fn with_defaults(mut self, defaults: Options<M, C>) -> Result<Self, ConfigError> {
        defaults.check()?;
        self.stack.set_root_defaults(defaults);
        Ok(self)
    }

    /// Provisioner used for `Install` versions and modules that are not preloaded
    pub fn with_provisioner(mut self, provisioner: impl Provisioner<M> + 'static) -> Self {
        self.provisioner = Box::new(provisioner);
        self
    }

    /// Register a synchronous benchmark body
    pub fn add(
        &mut self,
        name: &str,
        body: impl Fn(&M, &mut C) -> Result<(), BoxError> + 'static,
        options: Options<M, C>,
    ) -> Result<(), ConfigError> {
        self.register(name, Body::sync(body), options)
    }

    /// Register an asynchronous benchmark body; every call is awaited before the next
    pub fn add_async(
        &mut self,
        name: &str,
        body: impl for<'a> Fn(&'a M, &'a mut C) -> BoxFuture<'a, Result<(), BoxError>> + 'static,
        options: Options<M, C>,
    ) -> Result<(), ConfigError> {
        self.register(name, Body::future(body), options)
    }

    /// Open a nested suite.
    ///
    /// `defaults` are merged over the enclosing scope for everything
    /// registered inside `body`. The scope is closed on every exit path,
    /// including errors and panics raised by `body`.
    pub fn suite<E>(
        &mut self,
        name: &str,
        defaults: Options<M, C>,
        body: impl FnOnce(&mut Self) -> Result<(), E>,
    ) -> Result<(), E>
    where
        E: From<ConfigError>,
    {
        if name.is_empty() {
            return Err(ConfigError::EmptySuiteName.into());
        }
        defaults.check()?;

        self.stack.enter_scope(name, &defaults);
        let mut scope = ScopeGuard { faceoff: self };
        body(&mut *scope)
    }

    fn register(
        &mut self,
        name: &str,
        body: Body<M, C>,
        options: Options<M, C>,
    ) -> Result<(), ConfigError> {
        if name.is_empty() {
            return Err(ConfigError::EmptyName);
        }
        options.check()?;

        let effective = Options::merge(self.stack.current_defaults(), &options);
        effective.tuning.resolve(&TuningOptions::default()).validate()?;

        let path = self.stack.current_path().to_vec();
        let id = if path.is_empty() {
            name.to_string()
        } else {
            format!("{}{SEPARATOR}{name}", self.stack.current_prefix())
        };
        if self.index.contains_key(&id) {
            return Err(ConfigError::DuplicateName(id));
        }

        let skip = effective.skip.as_deref().unwrap_or_default();
        for label in skip {
            if !self.versions.iter().any(|(registered, _)| registered == label) {
                debug!(benchmark = %id, version = %label, "skip names an unregistered version");
            }
        }
        let versions: Vec<String> = self
            .versions
            .iter()
            .map(|(label, _)| label)
            .filter(|label| !skip.contains(*label))
            .cloned()
            .collect();

        if versions.is_empty() {
            warn!(benchmark = %id, "every version is skipped; nothing registered");
            return Ok(());
        }

        debug!(benchmark = %id, versions = ?versions, "registered");
        self.index.insert(id.clone(), self.definitions.len());
        self.definitions.push(BenchmarkDefinition {
            id,
            name: name.to_string(),
            path,
            body,
            setup: effective.setup,
            teardown: effective.teardown,
            tuning: effective.tuning,
            versions,
        });
        Ok(())
    }
}

impl<M, C> Faceoff<M, C> {
    /// Registered definitions in registration order
    pub fn definitions(&self) -> &[BenchmarkDefinition<M, C>] {
        &self.definitions
    }

    /// Look a definition up by heading
    pub fn definition(&self, id: &str) -> Option<&BenchmarkDefinition<M, C>> {
        self.index.get(id).map(|&i| &self.definitions[i])
    }

    /// Registered versions in baseline-first order
    pub fn versions(&self) -> &[(String, VersionSource<M>)] {
        &self.versions
    }

    /// Version labels in baseline-first order
    pub fn version_labels(&self) -> impl Iterator<Item = &str> {
        self.versions.iter().map(|(label, _)| label.as_str())
    }

    /// Source of one version
    pub fn version(&self, label: &str) -> Option<&VersionSource<M>> {
        self.versions
            .iter()
            .find(|(registered, _)| registered == label)
            .map(|(_, source)| source)
    }

    pub fn provisioner(&self) -> &dyn Provisioner<M> {
        self.provisioner.as_ref()
    }

    /// Number of open suites
    pub fn depth(&self) -> usize {
        self.stack.depth()
    }

    /// Path of the innermost open suite
    pub fn current_path(&self) -> &[String] {
        self.stack.current_path()
    }

    /// Defaults in effect at the current scope
    pub fn current_defaults(&self) -> &Options<M, C> {
        self.stack.current_defaults()
    }

    /// Number of execution units (benchmark, version pairs)
    pub fn unit_count(&self) -> usize {
        self.definitions.iter().map(|d| d.versions.len()).sum()
    }

    /// Run every registered benchmark with the default runner
    pub fn run(&self) -> Result<ResultSet, FaceoffError>
    where
        C: Default,
    {
        Runner::default().run(self)
    }
}

/// Closes the suite scope when dropped
struct ScopeGuard<'f, M, C> {
    faceoff: &'f mut Faceoff<M, C>,
}

impl<M, C> Deref for ScopeGuard<'_, M, C> {
    type Target = Faceoff<M, C>;

    fn deref(&self) -> &Self::Target {
        self.faceoff
    }
}

impl<M, C> DerefMut for ScopeGuard<'_, M, C> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.faceoff
    }
}

impl<M, C> Drop for ScopeGuard<'_, M, C> {
    fn drop(&mut self) {
        self.faceoff.stack.leave_scope();
    }
}
