//! Lockfile store.
//!
//! The lockfile records the exact cookbook set last resolved, keyed by
//! name, together with a fingerprint (`sha`) of the spec file it was
//! resolved from. The on-disk format is a pretty-printed JSON object
//! `{"sha": ..., "sources": {name: options}}` with a trailing newline.
//! Content in the deprecated free-text format is migrated transparently on
//! load by the legacy shim and rewritten in the structured format on the
//! next save.

pub(crate) mod legacy;

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use semver::VersionReq;
use serde::{Deserialize, Serialize};

use crate::core::{CookbookKey, Dependency, SourceOptions};
use crate::errors::Error;
use crate::util::fs::{read_to_string, write_atomic};
use crate::util::report::Reporter;

/// The serialized shape of the lock file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct LockfilePayload {
    /// Fingerprint of the spec file at resolution time. Absent means the
    /// lockfile is currently in sync. The legacy shim produces the empty
    /// string, which no real fingerprint can equal, forcing a recompute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) sha: Option<String>,

    /// Cookbook name to persisted source options.
    #[serde(default)]
    pub(crate) sources: BTreeMap<String, SourceOptions>,
}

/// Persisted record of the resolved dependency set.
///
/// Bound to one spec file; the lock path is derived as `<spec file>.lock`
/// next to it. Existing on-disk state is loaded at construction.
pub struct Lockfile {
    lock_path: PathBuf,
    sha: Option<String>,

    /// Name-keyed table. Last write wins: `add` silently overwrites an
    /// existing entry of the same name.
    dependencies: BTreeMap<String, Dependency>,

    reporter: Arc<dyn Reporter>,
}

impl Lockfile {
    /// Bind to a spec file and load any existing lock state.
    ///
    /// `declared` is the spec's currently declared dependency set; it is
    /// consulted only during legacy migration, where a declared `path`
    /// wins over the path stored in the legacy file.
    pub fn load(
        spec_path: &Path,
        declared: &[Dependency],
        reporter: Arc<dyn Reporter>,
    ) -> Result<Self> {
        let lock_path = derive_lock_path(spec_path)?;

        let mut lockfile = Lockfile {
            lock_path,
            sha: None,
            dependencies: BTreeMap::new(),
            reporter,
        };

        if lockfile.lock_path.exists() {
            let raw = read_to_string(&lockfile.lock_path)?;
            let payload = lockfile.parse(&raw, declared)?;
            lockfile.sha = payload.sha;
            for (name, options) in payload.sources {
                // Same constructor path as a fresh declaration, so options
                // normalize identically.
                lockfile
                    .dependencies
                    .insert(name.clone(), Dependency::new(name, VersionReq::STAR, options));
            }
        }

        Ok(lockfile)
    }

    fn parse(&self, raw: &str, declared: &[Dependency]) -> Result<LockfilePayload> {
        match serde_json::from_str::<LockfilePayload>(raw) {
            Ok(payload) => Ok(payload),
            Err(json_err) => {
                if legacy::looks_legacy(raw) {
                    self.reporter.warn(&format!(
                        "{} uses the deprecated lockfile format; it will be rewritten \
                         in the structured format on the next save",
                        self.lock_path.display()
                    ));
                    legacy::parse(raw, declared)
                } else {
                    Err(json_err).with_context(|| {
                        format!("failed to parse lockfile: {}", self.lock_path.display())
                    })
                }
            }
        }
    }

    /// Path of the lock file on disk.
    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    /// The stored spec fingerprint. `None` means in sync.
    pub fn sha(&self) -> Option<&str> {
        self.sha.as_deref()
    }

    /// All locked dependencies, sorted by name.
    pub fn dependencies(&self) -> impl Iterator<Item = &Dependency> {
        self.dependencies.values()
    }

    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }

    /// Look up an entry by name or by dependency.
    pub fn find(&self, key: &(impl CookbookKey + ?Sized)) -> Option<&Dependency> {
        self.dependencies.get(key.cookbook_name())
    }

    pub fn has_dependency(&self, key: &(impl CookbookKey + ?Sized)) -> bool {
        self.find(key).is_some()
    }

    /// Record a dependency, silently overwriting an entry of the same
    /// name. Does not persist; call [`save`](Self::save) when done.
    pub fn add(&mut self, dep: Dependency) {
        self.dependencies.insert(dep.name().to_string(), dep);
    }

    /// Alias for [`add`](Self::add).
    pub fn append(&mut self, dep: Dependency) {
        self.add(dep);
    }

    /// Delete an entry. Fails with [`Error::CookbookNotFound`] when the
    /// key is absent; the table is left unchanged in that case. Does not
    /// persist.
    pub fn remove(&mut self, key: &(impl CookbookKey + ?Sized)) -> Result<Dependency> {
        let name = key.cookbook_name();
        self.dependencies
            .remove(name)
            .ok_or_else(|| {
                Error::CookbookNotFound {
                    name: name.to_string(),
                }
                .into()
            })
    }

    /// Alias for [`remove`](Self::remove).
    pub fn unlock(&mut self, key: &(impl CookbookKey + ?Sized)) -> Result<Dependency> {
        self.remove(key)
    }

    /// Replace the whole table and fingerprint, then persist immediately.
    /// Later duplicates in the input win. This is the only operation that
    /// saves implicitly.
    pub fn update(
        &mut self,
        dependencies: impl IntoIterator<Item = Dependency>,
        sha: Option<String>,
    ) -> Result<()> {
        self.dependencies.clear();
        for dep in dependencies {
            self.add(dep);
        }
        self.sha = sha;
        self.save()
    }

    /// Mark the lockfile as in sync with its spec. In-memory only.
    pub fn reset_sha(&mut self) {
        self.sha = None;
    }

    pub(crate) fn to_payload(&self) -> LockfilePayload {
        LockfilePayload {
            sha: self.sha.clone(),
            sources: self
                .dependencies
                .iter()
                .map(|(name, dep)| (name.clone(), dep.lock_options()))
                .collect(),
        }
    }

    /// Serialize the table: pretty-printed JSON plus a trailing newline.
    pub fn to_json(&self) -> Result<String> {
        let mut out = serde_json::to_string_pretty(&self.to_payload())
            .context("failed to serialize lockfile")?;
        out.push('\n');
        Ok(out)
    }

    /// Overwrite the lock file atomically (temp file, then rename).
    pub fn save(&self) -> Result<()> {
        write_atomic(&self.lock_path, &self.to_json()?)
    }
}

impl fmt::Debug for Lockfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lockfile")
            .field("lock_path", &self.lock_path)
            .field("sha", &self.sha)
            .field("dependencies", &self.dependencies)
            .finish()
    }
}

/// `<spec file>.lock`, next to the spec file.
fn derive_lock_path(spec_path: &Path) -> Result<PathBuf> {
    let file_name = spec_path
        .file_name()
        .with_context(|| format!("spec path has no file name: {}", spec_path.display()))?;
    let mut lock_name = file_name.to_os_string();
    lock_name.push(".lock");
    Ok(spec_path.with_file_name(lock_name))
}
