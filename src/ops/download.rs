//! Cascading cookbook download.
//!
//! The downloader resolves a dependency to a concrete artifact. A
//! dependency pinned to an explicit location goes straight to that
//! location, no fallback. Everything else cascades through the configured
//! locations in priority order, stopping at the first success.
//!
//! Fallback policy: `NotFound` is the only error that moves the cascade
//! along, because it means the location simply does not carry the
//! cookbook. Any other failure stops the cascade where it happened.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;

use crate::core::{Artifact, Dependency};
use crate::errors::Error;
use crate::sources::descriptor::{LocationDescriptor, LocationSet, SourceKind};
use crate::sources::location::{FetchError, Location};
use crate::sources::registry::LocationRegistry;
use crate::util::fs::remove_dir_all_if_exists;
use crate::util::report::Reporter;

/// Resolves dependencies to artifacts via configured source locations.
pub struct Downloader {
    /// Root directory cookbooks are installed under.
    storage_path: PathBuf,

    /// Configured locations, in cascade priority order.
    locations: LocationSet,

    /// Builders for transient cascade locations.
    registry: LocationRegistry,

    reporter: Arc<dyn Reporter>,
}

impl Downloader {
    pub fn new(
        storage_path: impl Into<PathBuf>,
        registry: LocationRegistry,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Downloader {
            storage_path: storage_path.into(),
            locations: LocationSet::new(),
            registry,
            reporter,
        }
    }

    /// Register a configured source location.
    ///
    /// Order of successful calls is the cascade search order. Fails with
    /// [`Error::DuplicateLocation`] when the same `(kind, value)` pair is
    /// already registered, regardless of differing options.
    pub fn add_location(
        &mut self,
        kind: SourceKind,
        value: impl Into<String>,
        options: BTreeMap<String, String>,
    ) -> Result<()> {
        let descriptor = LocationDescriptor::new(kind, value, options)?;
        self.locations.push(descriptor)
    }

    /// The locations the cascade will search.
    ///
    /// With no explicit configuration this is exactly one descriptor for
    /// the public community site. Any explicit configuration fully replaces
    /// the default; it is never appended.
    pub fn locations(&self) -> Vec<LocationDescriptor> {
        if self.locations.is_empty() {
            vec![LocationDescriptor::default_site()]
        } else {
            self.locations.iter().cloned().collect()
        }
    }

    /// Root directory cookbooks are installed under.
    pub fn storage_path(&self) -> &Path {
        &self.storage_path
    }

    /// Resolve a dependency to a downloaded artifact.
    ///
    /// Returns the artifact together with the location that produced it,
    /// and records the artifact on the dependency.
    pub fn download(&self, dep: &mut Dependency) -> Result<(Artifact, Arc<dyn Location>)> {
        let target = self.storage_path.join(dep.name());

        let (artifact, location) = match dep.location().cloned() {
            Some(location) => {
                let artifact = self.download_pinned(dep.name(), &location, &target)?;
                (artifact, location)
            }
            None => self.download_cascading(dep, &target)?,
        };

        dep.set_cached_artifact(artifact.clone());
        Ok((artifact, location))
    }

    /// Fetch from the dependency's own pinned location. A pin is a
    /// promise: no fallback, every failure surfaces unchanged.
    fn download_pinned(
        &self,
        name: &str,
        location: &Arc<dyn Location>,
        target: &Path,
    ) -> Result<Artifact> {
        match location.download(target) {
            Ok(artifact) => Ok(artifact),
            Err(err) => {
                // Validation failures carry their own story and are never
                // reported as a generic download failure.
                if !err.is_validation() {
                    self.reporter.error(&format!(
                        "failed to download `{}` from {}: {}",
                        name,
                        location.name(),
                        err
                    ));
                }
                Err(err.into())
            }
        }
    }

    /// Walk the configured locations in order, stopping at the first
    /// success or the first non-`NotFound` failure.
    fn download_cascading(
        &self,
        dep: &Dependency,
        target: &Path,
    ) -> Result<(Artifact, Arc<dyn Location>)> {
        for descriptor in self.locations() {
            let location = self.registry.build(&descriptor, dep)?;

            match location.download(target) {
                Ok(artifact) => return Ok((artifact, location)),
                Err(FetchError::NotFound { .. }) => {
                    tracing::debug!(
                        "cookbook `{}` not found at {}, trying next location",
                        dep.name(),
                        location.name()
                    );
                    // Discard anything a failed attempt may have left at
                    // the target before the next location writes there.
                    remove_dir_all_if_exists(target)?;
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(Error::CookbookNotFound {
            name: dep.name().to_string(),
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use semver::{Version, VersionReq};

    use crate::core::SourceOptions;
    use crate::util::report::CapturingReporter;

    /// Scripted location for exercising the cascade rules.
    #[derive(Debug)]
    struct MockLocation {
        display: String,
        behavior: Behavior,
        attempts: AtomicUsize,
    }

    #[derive(Debug, Clone)]
    enum Behavior {
        Succeed(Version),
        NotFound,
        Validation,
        Other,
    }

    impl MockLocation {
        fn new(display: &str, behavior: Behavior) -> Arc<Self> {
            Arc::new(MockLocation {
                display: display.to_string(),
                behavior,
                attempts: AtomicUsize::new(0),
            })
        }

        fn attempts(&self) -> usize {
            self.attempts.load(Ordering::SeqCst)
        }
    }

    impl Location for MockLocation {
        fn name(&self) -> &str {
            &self.display
        }

        fn download(&self, target: &Path) -> Result<Artifact, FetchError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            match &self.behavior {
                Behavior::Succeed(version) => {
                    Ok(Artifact::new("apt", version.clone(), target))
                }
                Behavior::NotFound => Err(FetchError::NotFound {
                    name: "apt".to_string(),
                    location: self.display.clone(),
                }),
                Behavior::Validation => Err(FetchError::Validation {
                    name: "apt".to_string(),
                    reason: "checksum mismatch".to_string(),
                }),
                Behavior::Other => Err(FetchError::Other(anyhow::anyhow!("connection reset"))),
            }
        }
    }

    /// Registry whose site builder hands out pre-scripted locations keyed
    /// by descriptor value.
    fn scripted_registry(locations: Vec<(&str, Arc<MockLocation>)>) -> LocationRegistry {
        let table: Mutex<HashMap<String, Arc<MockLocation>>> = Mutex::new(
            locations
                .into_iter()
                .map(|(value, loc)| (value.to_string(), loc))
                .collect(),
        );

        let mut registry = LocationRegistry::new();
        registry.register(SourceKind::Site, move |descriptor, _dep| {
            let table = table.lock().unwrap();
            let location = table
                .get(descriptor.value())
                .unwrap_or_else(|| panic!("no script for {}", descriptor.value()))
                .clone();
            Ok(location as Arc<dyn Location>)
        });
        registry
    }

    fn dep(name: &str) -> Dependency {
        Dependency::new(name, VersionReq::STAR, SourceOptions::default())
    }

    fn downloader_with(
        tmp: &tempfile::TempDir,
        registry: LocationRegistry,
        sites: &[&str],
    ) -> Downloader {
        let reporter = CapturingReporter::new();
        let mut downloader = Downloader::new(tmp.path().join("cookbooks"), registry, reporter);
        for site in sites {
            downloader
                .add_location(SourceKind::Site, *site, BTreeMap::new())
                .unwrap();
        }
        downloader
    }

    #[test]
    fn default_location_is_substituted_not_merged() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut downloader = Downloader::new(
            tmp.path().join("cookbooks"),
            LocationRegistry::new(),
            CapturingReporter::new(),
        );

        let defaults = downloader.locations();
        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults[0].value(), crate::sources::DEFAULT_SITE_URL);

        downloader
            .add_location(
                SourceKind::Site,
                "https://mirror.example/api/v1",
                BTreeMap::new(),
            )
            .unwrap();

        let configured = downloader.locations();
        assert_eq!(configured.len(), 1);
        assert_eq!(configured[0].value(), "https://mirror.example/api/v1");
    }

    #[test]
    fn duplicate_location_rejected() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut downloader = Downloader::new(
            tmp.path().join("cookbooks"),
            LocationRegistry::new(),
            CapturingReporter::new(),
        );

        downloader
            .add_location(SourceKind::Site, "https://a.example/api/v1", BTreeMap::new())
            .unwrap();

        let mut options = BTreeMap::new();
        options.insert("timeout".to_string(), "5".to_string());
        let err = downloader
            .add_location(SourceKind::Site, "https://a.example/api/v1", options)
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::DuplicateLocation { .. })
        ));
    }

    #[test]
    fn cascade_falls_through_not_found_and_stops_on_success() {
        let tmp = tempfile::TempDir::new().unwrap();
        let a = MockLocation::new("site+a", Behavior::NotFound);
        let b = MockLocation::new("site+b", Behavior::NotFound);
        let c = MockLocation::new("site+c", Behavior::Succeed(Version::new(2, 4, 0)));

        let registry = scripted_registry(vec![
            ("https://a.example/api/v1", a.clone()),
            ("https://b.example/api/v1", b.clone()),
            ("https://c.example/api/v1", c.clone()),
        ]);
        let downloader = downloader_with(
            &tmp,
            registry,
            &[
                "https://a.example/api/v1",
                "https://b.example/api/v1",
                "https://c.example/api/v1",
            ],
        );

        let mut dependency = dep("apt");
        let (artifact, location) = downloader.download(&mut dependency).unwrap();

        assert_eq!(artifact.version(), &Version::new(2, 4, 0));
        assert_eq!(location.name(), "site+c");
        assert_eq!(a.attempts(), 1);
        assert_eq!(b.attempts(), 1);
        assert_eq!(c.attempts(), 1);
        assert_eq!(
            dependency.cached_artifact().unwrap().version(),
            &Version::new(2, 4, 0)
        );
    }

    #[test]
    fn cascade_fails_fast_on_validation_failure() {
        let tmp = tempfile::TempDir::new().unwrap();
        let a = MockLocation::new("site+a", Behavior::NotFound);
        let b = MockLocation::new("site+b", Behavior::Validation);
        let c = MockLocation::new("site+c", Behavior::Succeed(Version::new(1, 0, 0)));

        let registry = scripted_registry(vec![
            ("https://a.example/api/v1", a.clone()),
            ("https://b.example/api/v1", b.clone()),
            ("https://c.example/api/v1", c.clone()),
        ]);
        let downloader = downloader_with(
            &tmp,
            registry,
            &[
                "https://a.example/api/v1",
                "https://b.example/api/v1",
                "https://c.example/api/v1",
            ],
        );

        let mut dependency = dep("apt");
        let err = downloader.download(&mut dependency).unwrap_err();

        assert!(err
            .downcast_ref::<FetchError>()
            .is_some_and(FetchError::is_validation));
        assert_eq!(b.attempts(), 1);
        assert_eq!(c.attempts(), 0, "locations after the failure are never tried");
        assert!(dependency.cached_artifact().is_none());
    }

    #[test]
    fn cascade_fails_fast_on_other_errors() {
        let tmp = tempfile::TempDir::new().unwrap();
        let a = MockLocation::new("site+a", Behavior::Other);
        let b = MockLocation::new("site+b", Behavior::Succeed(Version::new(1, 0, 0)));

        let registry = scripted_registry(vec![
            ("https://a.example/api/v1", a.clone()),
            ("https://b.example/api/v1", b.clone()),
        ]);
        let downloader = downloader_with(
            &tmp,
            registry,
            &["https://a.example/api/v1", "https://b.example/api/v1"],
        );

        let err = downloader.download(&mut dep("apt")).unwrap_err();
        assert!(err.to_string().contains("connection reset"));
        assert_eq!(b.attempts(), 0);
    }

    #[test]
    fn exhausted_cascade_raises_cookbook_not_found() {
        let tmp = tempfile::TempDir::new().unwrap();
        let a = MockLocation::new("site+a", Behavior::NotFound);
        let b = MockLocation::new("site+b", Behavior::NotFound);

        let registry = scripted_registry(vec![
            ("https://a.example/api/v1", a.clone()),
            ("https://b.example/api/v1", b.clone()),
        ]);
        let downloader = downloader_with(
            &tmp,
            registry,
            &["https://a.example/api/v1", "https://b.example/api/v1"],
        );

        let err = downloader.download(&mut dep("apt")).unwrap_err();
        match err.downcast_ref::<Error>() {
            Some(Error::CookbookNotFound { name }) => assert_eq!(name, "apt"),
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(err.to_string(), "cookbook `apt` not found");
        assert_eq!(a.attempts(), 1);
        assert_eq!(b.attempts(), 1);
    }

    #[test]
    fn pinned_location_does_not_fall_back() {
        let tmp = tempfile::TempDir::new().unwrap();
        let fallback = MockLocation::new("site+a", Behavior::Succeed(Version::new(9, 9, 9)));
        let registry = scripted_registry(vec![("https://a.example/api/v1", fallback.clone())]);
        let downloader =
            downloader_with(&tmp, registry, &["https://a.example/api/v1"]);

        let pin = MockLocation::new("git+pinned", Behavior::NotFound);
        let mut dependency = dep("apt").with_location(pin.clone() as Arc<dyn Location>);

        let err = downloader.download(&mut dependency).unwrap_err();
        assert!(err
            .downcast_ref::<FetchError>()
            .is_some_and(FetchError::is_not_found));
        assert_eq!(pin.attempts(), 1);
        assert_eq!(fallback.attempts(), 0, "pin failure must not trigger the cascade");
    }

    #[test]
    fn pinned_failure_is_reported_except_validation() {
        let tmp = tempfile::TempDir::new().unwrap();
        let reporter = CapturingReporter::new();
        let downloader = Downloader::new(
            tmp.path().join("cookbooks"),
            LocationRegistry::new(),
            reporter.clone(),
        );

        let pin = MockLocation::new("git+pinned", Behavior::Other);
        let mut dependency = dep("apt").with_location(pin as Arc<dyn Location>);
        downloader.download(&mut dependency).unwrap_err();
        assert_eq!(reporter.errors().len(), 1);
        assert!(reporter.errors()[0].contains("git+pinned"));

        let reporter2 = CapturingReporter::new();
        let downloader2 = Downloader::new(
            tmp.path().join("cookbooks"),
            LocationRegistry::new(),
            reporter2.clone(),
        );
        let pin2 = MockLocation::new("git+pinned", Behavior::Validation);
        let mut dependency2 = dep("apt").with_location(pin2 as Arc<dyn Location>);
        let err = downloader2.download(&mut dependency2).unwrap_err();

        assert!(err
            .downcast_ref::<FetchError>()
            .is_some_and(FetchError::is_validation));
        assert!(
            reporter2.is_empty(),
            "validation failures are not logged as generic failures"
        );
    }

    #[test]
    fn cascade_downloads_from_a_real_path_location() {
        let tmp = tempfile::TempDir::new().unwrap();
        let vendor = tmp.path().join("vendor");
        let cookbook = vendor.join("apt");
        std::fs::create_dir_all(&cookbook).unwrap();
        std::fs::write(cookbook.join("metadata.rb"), "version '2.4.0'\n").unwrap();

        let reporter = CapturingReporter::new();
        let mut downloader = Downloader::new(
            tmp.path().join("cookbooks"),
            LocationRegistry::new(),
            reporter,
        );
        downloader
            .add_location(
                SourceKind::Path,
                vendor.to_string_lossy().to_string(),
                BTreeMap::new(),
            )
            .unwrap();

        let mut dependency = dep("apt");
        let (artifact, _) = downloader.download(&mut dependency).unwrap();

        assert_eq!(artifact.version(), &Version::new(2, 4, 0));
        assert!(tmp.path().join("cookbooks/apt/metadata.rb").exists());
    }
}
