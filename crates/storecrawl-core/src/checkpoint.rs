//! Resumable progress checkpoints.
//!
//! A checkpoint is any serializable value written as indented JSON. Writes go
//! to a temp file in the target's directory and are renamed over the target,
//! so the file on disk is always either the previous complete checkpoint or
//! the new one.

use std::io::{BufWriter, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("failed to create checkpoint directory {path}: {source}")]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize checkpoint {path}: {source}")]
    Serialize {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write checkpoint {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read checkpoint {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Atomically write `data` as indented JSON to `path`.
///
/// Missing parent directories are created. On any failure the temp file is
/// removed and `path` is left untouched.
///
/// # Errors
///
/// Returns [`CheckpointError`] when the directory cannot be created, the value
/// fails to serialize, or the write/rename fails.
pub fn save_checkpoint<T>(data: &T, path: &Path) -> Result<(), CheckpointError>
where
    T: Serialize + ?Sized,
{
    let result = write_atomically(data, path);
    match &result {
        Ok(()) => tracing::info!(path = %path.display(), "checkpoint saved"),
        Err(e) => tracing::error!(path = %path.display(), error = %e, "failed to save checkpoint"),
    }
    result
}

fn write_atomically<T>(data: &T, path: &Path) -> Result<(), CheckpointError>
where
    T: Serialize + ?Sized,
{
    let shown = path.display().to_string();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|e| CheckpointError::CreateDir {
        path: dir.display().to_string(),
        source: e,
    })?;

    let write_err = |source: std::io::Error| CheckpointError::Write {
        path: shown.clone(),
        source,
    };

    // Same directory as the target so the rename never crosses filesystems.
    let prefix = format!(
        "{}.",
        path.file_name()
            .map_or_else(|| "checkpoint".into(), |n| n.to_string_lossy())
    );
    let mut temp = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(write_err)?;

    {
        let mut writer = BufWriter::new(temp.as_file_mut());
        serde_json::to_writer_pretty(&mut writer, data).map_err(|e| {
            CheckpointError::Serialize {
                path: shown.clone(),
                source: e,
            }
        })?;
        writer.flush().map_err(write_err)?;
    }
    temp.as_file().sync_all().map_err(write_err)?;

    // A failed persist hands the temp file back inside the error; dropping it
    // deletes it.
    temp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

/// Load a checkpoint previously written by [`save_checkpoint`].
///
/// Returns `Ok(None)` when the file does not exist or does not decode as `T`;
/// a malformed file is logged and treated as "start from scratch".
///
/// # Errors
///
/// Returns [`CheckpointError::Read`] for I/O failures other than a missing
/// file (e.g. permission denied).
pub fn load_checkpoint<T>(path: &Path) -> Result<Option<T>, CheckpointError>
where
    T: DeserializeOwned,
{
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(CheckpointError::Read {
                path: path.display().to_string(),
                source: e,
            })
        }
    };

    match serde_json::from_slice(&bytes) {
        Ok(data) => {
            tracing::info!(path = %path.display(), "checkpoint loaded");
            Ok(Some(data))
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to load checkpoint");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde::ser::{Error as _, SerializeSeq, Serializer};
    use serde::Deserialize;
    use tempfile::TempDir;

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Progress {
        completed_states: Vec<String>,
        store_urls: BTreeMap<String, u32>,
        last_page: Option<u32>,
    }

    fn sample_progress() -> Progress {
        Progress {
            completed_states: vec!["wa".to_string(), "or".to_string()],
            store_urls: BTreeMap::from([("https://example.com/s/1".to_string(), 1)]),
            last_page: Some(7),
        }
    }

    /// Serializes a few elements, then fails, leaving a partial document in
    /// the writer.
    struct FailsMidway;

    impl Serialize for FailsMidway {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let mut seq = serializer.serialize_seq(None)?;
            seq.serialize_element("first")?;
            seq.serialize_element("second")?;
            Err(S::Error::custom("simulated crash mid-write"))
        }
    }

    fn dir_entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("verizon_checkpoint.json");

        save_checkpoint(&sample_progress(), &path).unwrap();
        let loaded: Option<Progress> = load_checkpoint(&path).unwrap();

        assert_eq!(loaded, Some(sample_progress()));
    }

    #[test]
    fn save_round_trips_untyped_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("raw.json");
        let data = serde_json::json!({"phase": "cities", "done": [1, 2, 3], "nested": {"ok": true}});

        save_checkpoint(&data, &path).unwrap();
        let loaded: Option<serde_json::Value> = load_checkpoint(&path).unwrap();

        assert_eq!(loaded, Some(data));
    }

    #[test]
    fn save_writes_indented_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cp.json");
        save_checkpoint(&serde_json::json!({"a": 1}), &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "{\n  \"a\": 1\n}");
    }

    #[test]
    fn save_creates_missing_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data").join("att").join("checkpoint.json");
        save_checkpoint(&sample_progress(), &path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn save_leaves_no_temp_files_behind() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cp.json");
        save_checkpoint(&sample_progress(), &path).unwrap();
        save_checkpoint(&sample_progress(), &path).unwrap();
        assert_eq!(dir_entries(dir.path()), vec!["cp.json".to_string()]);
    }

    #[test]
    fn interrupted_save_keeps_previous_checkpoint_intact() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cp.json");
        save_checkpoint(&sample_progress(), &path).unwrap();
        let before = std::fs::read(&path).unwrap();

        let result = save_checkpoint(&FailsMidway, &path);

        assert!(
            matches!(result, Err(CheckpointError::Serialize { .. })),
            "expected Serialize error, got: {result:?}"
        );
        assert_eq!(std::fs::read(&path).unwrap(), before);
        assert_eq!(dir_entries(dir.path()), vec!["cp.json".to_string()]);
    }

    #[test]
    fn interrupted_first_save_creates_no_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cp.json");
        assert!(save_checkpoint(&FailsMidway, &path).is_err());
        assert!(dir_entries(dir.path()).is_empty());
    }

    #[test]
    fn load_missing_file_returns_none() {
        let dir = TempDir::new().unwrap();
        let loaded: Option<Progress> = load_checkpoint(&dir.path().join("nope.json")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn load_malformed_json_returns_none() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cp.json");
        std::fs::write(&path, "{\"completed_states\": [\"wa\"").unwrap();
        let loaded: Option<Progress> = load_checkpoint(&path).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn load_wrong_shape_returns_none() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cp.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();
        let loaded: Option<Progress> = load_checkpoint(&path).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn load_directory_is_a_read_error() {
        let dir = TempDir::new().unwrap();
        let result: Result<Option<Progress>, _> = load_checkpoint(dir.path());
        assert!(
            matches!(result, Err(CheckpointError::Read { .. })),
            "expected Read error, got: {result:?}"
        );
    }

    #[test]
    fn save_into_directory_path_fails_and_cleans_up() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("occupied");
        std::fs::create_dir(&target).unwrap();
        std::fs::write(target.join("keep.txt"), "x").unwrap();

        let result = save_checkpoint(&sample_progress(), &target);

        assert!(
            matches!(result, Err(CheckpointError::Write { .. })),
            "expected Write error, got: {result:?}"
        );
        assert_eq!(dir_entries(dir.path()), vec!["occupied".to_string()]);
    }
}
