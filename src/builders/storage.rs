use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Destination for finished output documents.
///
/// `write_with` hands the caller a writer; the output only becomes visible
/// once the closure has returned successfully.
pub trait OutputSink {
    fn write_with(
        &mut self,
        path: &Path,
        write: &mut dyn FnMut(&mut dyn Write) -> Result<()>,
    ) -> Result<()>;
}

/// Writes through a temporary file in the destination directory and renames
/// it over the target, so an interrupted run never leaves a half-written file.
#[derive(Debug, Default)]
pub struct AtomicFileSink;

impl AtomicFileSink {
    pub fn new() -> Self {
        Self
    }
}

impl OutputSink for AtomicFileSink {
    fn write_with(
        &mut self,
        path: &Path,
        write: &mut dyn FnMut(&mut dyn Write) -> Result<()>,
    ) -> Result<()> {
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)
            .with_context(|| format!("Failed to create output directory {}", parent.display()))?;

        let temp = NamedTempFile::new_in(&parent).context("Failed to create temporary output file")?;
        {
            let mut writer = BufWriter::new(temp.as_file());
            write(&mut writer)?;
            writer.flush().context("Failed to flush output")?;
        }

        // Temporary files are created owner-only; give the output the mode of
        // the file it replaces, or the usual default for a new file.
        let permissions = match fs::metadata(path) {
            Ok(metadata) => Some(metadata.permissions()),
            Err(_) => default_output_permissions(),
        };
        if let Some(permissions) = permissions {
            temp.as_file()
                .set_permissions(permissions)
                .context("Failed to set output permissions")?;
        }

        temp.persist(path)
            .with_context(|| format!("Failed to move output into place at {}", path.display()))?;
        Ok(())
    }
}

#[cfg(unix)]
fn default_output_permissions() -> Option<fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn default_output_permissions() -> Option<fs::Permissions> {
    None
}

/// Keeps outputs in memory, keyed by path.
#[derive(Debug, Default)]
pub struct MemorySink {
    outputs: HashMap<PathBuf, Vec<u8>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &Path) -> Option<&[u8]> {
        self.outputs.get(path).map(Vec::as_slice)
    }

    pub fn get_str(&self, path: &Path) -> Option<&str> {
        self.get(path).and_then(|bytes| std::str::from_utf8(bytes).ok())
    }
}

impl OutputSink for MemorySink {
    fn write_with(
        &mut self,
        path: &Path,
        write: &mut dyn FnMut(&mut dyn Write) -> Result<()>,
    ) -> Result<()> {
        let mut buffer = Vec::new();
        write(&mut buffer)?;
        self.outputs.insert(path.to_path_buf(), buffer);
        Ok(())
    }
}

/// Serializes `value` as pretty-printed JSON with a trailing newline.
pub fn write_json<T: Serialize>(sink: &mut dyn OutputSink, path: &Path, value: &T) -> Result<()> {
    sink.write_with(path, &mut |writer: &mut dyn Write| {
        serde_json::to_writer_pretty(&mut *writer, value).context("Failed to serialize JSON output")?;
        writer.write_all(b"\n")?;
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_atomic_sink_replaces_target() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("out/dataset.json");

        let mut sink = AtomicFileSink::new();
        write_json(&mut sink, &target, &vec![1, 2]).unwrap();
        write_json(&mut sink, &target, &vec![3]).unwrap();

        let written = fs::read_to_string(&target).unwrap();
        assert_eq!(written, "[\n  3\n]\n");
        // Only the target remains; no stray temporaries.
        assert_eq!(fs::read_dir(dir.path().join("out")).unwrap().count(), 1);
    }

    #[test]
    fn test_failed_write_leaves_previous_output() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("recipes.csv");
        fs::write(&target, "previous").unwrap();

        let mut sink = AtomicFileSink::new();
        let result = sink.write_with(&target, &mut |writer: &mut dyn Write| {
            writer.write_all(b"partial")?;
            anyhow::bail!("interrupted")
        });

        assert!(result.is_err());
        assert_eq!(fs::read_to_string(&target).unwrap(), "previous");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_atomic_sink_output_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let fresh = dir.path().join("fresh.json");
        let mut sink = AtomicFileSink::new();
        write_json(&mut sink, &fresh, &vec![1]).unwrap();
        let mode = fs::metadata(&fresh).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);

        let existing = dir.path().join("existing.json");
        fs::write(&existing, "[]").unwrap();
        fs::set_permissions(&existing, fs::Permissions::from_mode(0o640)).unwrap();
        write_json(&mut sink, &existing, &vec![2]).unwrap();
        let mode = fs::metadata(&existing).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o640);
    }

    #[test]
    fn test_memory_sink() {
        let mut sink = MemorySink::new();
        let path = Path::new("summary.json");
        write_json(&mut sink, path, &serde_json::json!({"totalRecipes": 2})).unwrap();
        assert_eq!(sink.get_str(path).unwrap(), "{\n  \"totalRecipes\": 2\n}\n");
        assert!(sink.get(Path::new("other.json")).is_none());
    }
}
