//! Fixture loading for stubbed requests.

use crate::{Error, Result};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Loads named fixture files.
///
/// A missing fixture is a test-setup error ([`Error::FixtureNotFound`]);
/// whether the content is usable is decided later, by the stub.
pub trait FixtureLoader: Send + Sync {
    /// Reads the raw bytes of the fixture called `name`.
    fn load(&self, name: &str) -> Result<Vec<u8>>;

    /// Describes where fixtures are looked up, for error messages.
    fn location(&self) -> String;
}

/// Loads fixtures from files in a directory.
///
/// # Examples
///
/// ```no_run
/// use outcall::fixture::{FixtureDir, FixtureLoader};
///
/// let fixtures = FixtureDir::new(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures"));
/// let bytes = fixtures.load("user.json").unwrap();
/// assert!(!bytes.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct FixtureDir {
    root: PathBuf,
}

impl FixtureDir {
    /// Creates a loader rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The directory fixtures are read from.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl FixtureLoader for FixtureDir {
    fn load(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.root.join(name);
        tracing::debug!(fixture = name, path = %path.display(), "Loading fixture");
        std::fs::read(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => Error::FixtureNotFound {
                name: name.to_string(),
                location: self.location(),
            },
            _ => Error::Io(e),
        })
    }

    fn location(&self) -> String {
        self.root.display().to_string()
    }
}
