//! Durable profile storage.
//!
//! Provides the `ProfilePersistence` trait, a JSON Lines file backend and
//! an in-memory backend for tests.

use std::io::Write;
use std::path::{Path, PathBuf};

use triad_types::AlignmentProfile;

use crate::error::{AlignmentError, AlignmentResult};

/// Full-set save and load of alignment profiles.
///
/// `save` always receives the complete profile set and must replace the
/// previous state atomically: after a crash either the old or the new set
/// is readable, never a mix.
pub trait ProfilePersistence: Send + Sync {
    fn save(&self, profiles: &[AlignmentProfile]) -> AlignmentResult<()>;

    /// Load all profiles. Returns an empty list if nothing was persisted yet.
    fn load(&self) -> AlignmentResult<Vec<AlignmentProfile>>;
}

/// One profile per line, sorted by user id, so the file diffs cleanly.
///
/// Writes go to a sibling `.tmp` file which is synced, renamed over the
/// target, and followed by a sync of the parent directory.
pub struct JsonLinesProfileFile {
    path: PathBuf,
}

impl JsonLinesProfileFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parent_dir(&self) -> &Path {
        self.path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl ProfilePersistence for JsonLinesProfileFile {
    fn save(&self, profiles: &[AlignmentProfile]) -> AlignmentResult<()> {
        let mut sorted: Vec<&AlignmentProfile> = profiles.iter().collect();
        sorted.sort_by(|a, b| a.user_id.cmp(&b.user_id));

        let mut buf = Vec::new();
        for profile in sorted {
            serde_json::to_writer(&mut buf, profile)?;
            buf.push(b'\n');
        }

        let parent = self.parent_dir();
        std::fs::create_dir_all(parent)?;

        let tmp_path = self.tmp_path();
        let mut file = std::fs::File::create(&tmp_path)?;
        file.write_all(&buf)?;
        file.sync_all()?;
        std::fs::rename(&tmp_path, &self.path)?;
        sync_dir(parent)?;
        Ok(())
    }

    fn load(&self) -> AlignmentResult<Vec<AlignmentProfile>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let contents = std::fs::read_to_string(&self.path)?;
        contents
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(n, line)| {
                serde_json::from_str(line).map_err(|e| {
                    AlignmentError::Persistence(format!(
                        "{} line {}: {}",
                        self.path.display(),
                        n + 1,
                        e
                    ))
                })
            })
            .collect()
    }
}

/// Make a completed rename durable.
#[cfg(unix)]
fn sync_dir(dir: &Path) -> std::io::Result<()> {
    std::fs::File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}

/// In-memory profile persistence (for testing).
#[derive(Default)]
pub struct InMemoryProfiles {
    data: std::sync::Mutex<Vec<AlignmentProfile>>,
}

impl InMemoryProfiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profiles(profiles: Vec<AlignmentProfile>) -> Self {
        Self {
            data: std::sync::Mutex::new(profiles),
        }
    }
}

impl ProfilePersistence for InMemoryProfiles {
    fn save(&self, profiles: &[AlignmentProfile]) -> AlignmentResult<()> {
        let mut data = self.data.lock().map_err(|_| AlignmentError::LockError)?;
        *data = profiles.to_vec();
        Ok(())
    }

    fn load(&self) -> AlignmentResult<Vec<AlignmentProfile>> {
        let data = self.data.lock().map_err(|_| AlignmentError::LockError)?;
        Ok(data.clone())
    }
}
