//! Version provisioning
//!
//! Turns each registered version into a loaded module and an absolute
//! location, once per run.

use crate::error::{BoxError, FaceoffError};
use std::path::{Component, Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use tracing::{debug, info};

/// Where a version comes from
pub enum VersionSource<M> {
    /// Install specifier handed to the [`Provisioner`]
    Install(String),
    /// Already available on disk, optionally with a loaded module
    Resolved {
        module: Option<Arc<M>>,
        location: PathBuf,
    },
}

impl<M> VersionSource<M> {
    /// Installable version
    pub fn install(spec: impl Into<String>) -> Self {
        VersionSource::Install(spec.into())
    }

    /// Version at `location`, loaded by the provisioner
    pub fn location(location: impl Into<PathBuf>) -> Self {
        VersionSource::Resolved {
            module: None,
            location: location.into(),
        }
    }

    /// Version with an already-loaded module
    pub fn module(module: M, location: impl Into<PathBuf>) -> Self {
        VersionSource::Resolved {
            module: Some(Arc::new(module)),
            location: location.into(),
        }
    }
}

impl<M> Clone for VersionSource<M> {
    fn clone(&self) -> Self {
        match self {
            VersionSource::Install(spec) => VersionSource::Install(spec.clone()),
            VersionSource::Resolved { module, location } => VersionSource::Resolved {
                module: module.clone(),
                location: location.clone(),
            },
        }
    }
}

impl<M> std::fmt::Debug for VersionSource<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VersionSource::Install(spec) => f.debug_tuple("Install").field(spec).finish(),
            VersionSource::Resolved { module, location } => f
                .debug_struct("Resolved")
                .field("module", &module.as_ref().map(|_| ".."))
                .field("location", location)
                .finish(),
        }
    }
}

/// Installs and loads versions
pub trait Provisioner<M> {
    /// Install `spec` and return the directory it was installed to
    fn install(&self, label: &str, spec: &str) -> Result<PathBuf, BoxError>;

    /// Load the module found at `location`
    fn load(&self, label: &str, location: &Path) -> Result<M, BoxError>;
}

/// Provisioner for runs where every version is already resolved
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProvisioner;

impl<M> Provisioner<M> for NoProvisioner {
    fn install(&self, _label: &str, spec: &str) -> Result<PathBuf, BoxError> {
        Err(format!("no provisioner configured to install {spec:?}").into())
    }

    fn load(&self, _label: &str, location: &Path) -> Result<M, BoxError> {
        Err(format!("no provisioner configured to load {}", location.display()).into())
    }
}

type Loader<M> = dyn Fn(&str, &Path) -> Result<M, BoxError>;

/// Installs by running a shell command in a fresh scratch directory.
///
/// The command template may reference `{spec}` and `{dir}`. Modules are
/// loaded from `{dir}/{subdir}` by the user-supplied loader.
pub struct CommandProvisioner<M> {
    command: Option<String>,
    subdir: Option<PathBuf>,
    loader: Box<Loader<M>>,
}

impl<M> CommandProvisioner<M> {
    /// Provisioner that only loads; installs fail until a command is set
    pub fn new(loader: impl Fn(&str, &Path) -> Result<M, BoxError> + 'static) -> Self {
        Self {
            command: None,
            subdir: None,
            loader: Box::new(loader),
        }
    }

    /// Shell command template used to install a spec
    pub fn command(mut self, template: impl Into<String>) -> Self {
        self.command = Some(template.into());
        self
    }

    /// Subdirectory of the scratch directory holding the installed module
    pub fn subdir(mut self, subdir: impl Into<PathBuf>) -> Self {
        self.subdir = Some(subdir.into());
        self
    }
}

impl<M> Provisioner<M> for CommandProvisioner<M> {
    fn install(&self, label: &str, spec: &str) -> Result<PathBuf, BoxError> {
        let template = self
            .command
            .as_deref()
            .ok_or_else(|| format!("no install command configured for {spec:?}"))?;

        let dir = tempfile::Builder::new().prefix("faceoff-").tempdir()?;
        let script = template
            .replace("{spec}", spec)
            .replace("{dir}", &dir.path().to_string_lossy());

        info!("Installing [{label}]: {spec}");
        debug!(command = %script, "running install command");

        let output = Command::new("sh")
            .arg("-c")
            .arg(&script)
            .current_dir(dir.path())
            .output()?;
        if !output.status.success() {
            return Err(format!(
                "install command exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )
            .into());
        }

        // The installed module must outlive this call
        let root = dir.keep();
        Ok(match &self.subdir {
            Some(subdir) => root.join(subdir),
            None => root,
        })
    }

    fn load(&self, label: &str, location: &Path) -> Result<M, BoxError> {
        (self.loader)(label, location)
    }
}

/// A version ready to run
pub struct ResolvedVersion<M> {
    pub label: String,
    pub module: Arc<M>,
    pub location: PathBuf,
}

impl<M> Clone for ResolvedVersion<M> {
    fn clone(&self) -> Self {
        Self {
            label: self.label.clone(),
            module: Arc::clone(&self.module),
            location: self.location.clone(),
        }
    }
}

/// Resolve every version in registration order
pub fn resolve_versions<M>(
    versions: &[(String, VersionSource<M>)],
    provisioner: &dyn Provisioner<M>,
) -> Result<Vec<ResolvedVersion<M>>, FaceoffError> {
    let cwd = std::env::current_dir().map_err(|e| FaceoffError::Provision {
        label: String::new(),
        source: Box::new(e),
    })?;

    versions
        .iter()
        .map(|(label, source)| {
            let provision_err = |source: BoxError| FaceoffError::Provision {
                label: label.clone(),
                source,
            };

            let (module, location) = match source {
                VersionSource::Install(spec) => {
                    let location = provisioner.install(label, spec).map_err(provision_err)?;
                    (None, location)
                }
                VersionSource::Resolved { module, location } => {
                    (module.clone(), absolute_location(&cwd, location))
                }
            };

            let module = match module {
                Some(module) => module,
                None => Arc::new(provisioner.load(label, &location).map_err(provision_err)?),
            };

            debug!(version = %label, location = %location.display(), "resolved version");
            Ok(ResolvedVersion {
                label: label.clone(),
                module,
                location,
            })
        })
        .collect()
}

/// Join `path` onto `base` when relative, then drop `.` and `..` components
pub fn absolute_location(base: &Path, path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_location() {
        let base = Path::new("/work/project");
        assert_eq!(absolute_location(base, Path::new(".")), PathBuf::from("/work/project"));
        assert_eq!(
            absolute_location(base, Path::new("./vendor/../lib")),
            PathBuf::from("/work/project/lib")
        );
        assert_eq!(absolute_location(base, Path::new("/opt/lib")), PathBuf::from("/opt/lib"));
    }

    #[test]
    fn test_resolve_with_preloaded_modules() {
        let versions = vec![
            ("v1".to_string(), VersionSource::module(1u32, "/opt/v1")),
            ("v2".to_string(), VersionSource::module(2u32, "/opt/v2")),
        ];
        let resolved = resolve_versions(&versions, &NoProvisioner).unwrap();

        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].label, "v1");
        assert_eq!(*resolved[1].module, 2);
        assert_eq!(resolved[1].location, PathBuf::from("/opt/v2"));
    }

    #[test]
    fn test_no_provisioner_fails_install() {
        let versions = vec![("lib@2.0".to_string(), VersionSource::<u32>::install("lib@2.0"))];
        let err = resolve_versions(&versions, &NoProvisioner).err().unwrap();
        assert!(matches!(err, FaceoffError::Provision { ref label, .. } if label == "lib@2.0"));
    }

    #[test]
    fn test_loader_receives_location() {
        let provisioner = CommandProvisioner::new(|label, location| {
            Ok(format!("{label}@{}", location.display()))
        });
        let versions = vec![("local".to_string(), VersionSource::location("/srv/lib"))];
        let resolved = resolve_versions(&versions, &provisioner).unwrap();
        assert_eq!(*resolved[0].module, "local@/srv/lib");
    }

    #[cfg(unix)]
    #[test]
    fn test_command_install_runs_in_scratch_dir() {
        let provisioner = CommandProvisioner::new(|_, location: &Path| {
            Ok(std::fs::read_to_string(location.join("spec.txt"))?)
        })
        .command("printf '%s' '{spec}' > '{dir}/spec.txt'");

        let versions = vec![("next".to_string(), VersionSource::install("lib@3.0"))];
        let resolved = resolve_versions(&versions, &provisioner).unwrap();

        assert_eq!(*resolved[0].module, "lib@3.0");
        assert!(resolved[0]
            .location
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("faceoff-")));
        std::fs::remove_dir_all(&resolved[0].location).unwrap();
    }
}
