use std::path::{Path, PathBuf};

use ruleengine_common::{EncodeError, PromRules};

/// Writes one rule file per instance into the Prometheus rules directory.
///
/// Files are named `<prom_id><suffix>`. Only files matching that pattern
/// are considered managed; anything else in the directory is left alone.
pub struct RuleFileWriter {
    dir: PathBuf,
    suffix: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    Unchanged,
}

#[derive(Debug)]
pub enum WriteError {
    Io(std::io::Error),
    Encode(EncodeError),
}

impl std::fmt::Display for WriteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io: {e}"),
            Self::Encode(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for WriteError {}

impl From<std::io::Error> for WriteError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<EncodeError> for WriteError {
    fn from(e: EncodeError) -> Self {
        Self::Encode(e)
    }
}

impl RuleFileWriter {
    pub fn new(dir: impl Into<PathBuf>, suffix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            suffix: suffix.into(),
        }
    }

    pub fn path_for(&self, prom_id: i64) -> PathBuf {
        self.dir.join(format!("{prom_id}{}", self.suffix))
    }

    pub fn write(&self, part: &PromRules) -> Result<WriteOutcome, WriteError> {
        let content = part.rules.content()?;
        let path = self.path_for(part.prom.id);

        if let Ok(existing) = std::fs::read(&path) {
            if existing == content {
                tracing::debug!(prom_id = part.prom.id, "rule file unchanged");
                return Ok(WriteOutcome::Unchanged);
            }
        }

        std::fs::create_dir_all(&self.dir)?;
        write_atomic(&path, &content)?;
        tracing::info!(
            prom_id = part.prom.id,
            rules = part.rules.len(),
            path = %path.display(),
            "rule file written"
        );
        Ok(WriteOutcome::Written)
    }

    /// Instance ids that currently have a managed file on disk.
    pub fn managed_ids(&self) -> Result<Vec<i64>, WriteError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Some(id) = name
                .strip_suffix(self.suffix.as_str())
                .and_then(canonical_id)
            {
                ids.push(id);
            }
        }
        ids.sort_unstable();
        Ok(ids)
    }

    /// Deletes managed files for instances not in `keep`. With `scope` set,
    /// only files of instances inside it are candidates. Returns the removed
    /// ids.
    pub fn remove_stale(&self, keep: &[i64], scope: Option<&[i64]>) -> Result<Vec<i64>, WriteError> {
        let mut removed = Vec::new();
        for id in self.managed_ids()? {
            if keep.contains(&id) || scope.is_some_and(|s| !s.contains(&id)) {
                continue;
            }
            match std::fs::remove_file(self.path_for(id)) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
            tracing::info!(prom_id = id, "stale rule file removed");
            removed.push(id);
        }
        Ok(removed)
    }
}

/// Parses a file stem as an instance id only when it is exactly the form
/// `path_for` writes, so `07` or `+7` never map onto `7`.
fn canonical_id(stem: &str) -> Option<i64> {
    let id = stem.parse::<i64>().ok()?;
    (id.to_string() == stem).then_some(id)
}

fn write_atomic(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(".{file_name}.tmp"));
    std::fs::write(&tmp, content)?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e);
    }
    Ok(())
}
