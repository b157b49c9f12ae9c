//! On-disk memoisation of expensive preprocessing steps.
//!
//! Results are stored as JSON. A present-but-unreadable cache file is an
//! error, never a silent recompute: delete the file to force a rebuild.

use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::model::Result;

/// Returns the value cached at `path`, or computes it with `f`, stores it at
/// `path` (creating parent directories) and returns it.
pub fn with_json_cache<T, F>(path: &Path, f: F) -> Result<T>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Result<T>,
{
    if path.is_file() {
        tracing::debug!(path = %path.display(), "reading cached result");
        let reader = BufReader::new(fs::File::open(path)?);
        return Ok(serde_json::from_reader(reader)?);
    }

    let value = f()?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    // only a complete file ever appears at `path`
    let tmp = path.with_extension("part");
    if let Err(e) = write_json(&tmp, &value) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    fs::rename(&tmp, path)?;
    tracing::debug!(path = %path.display(), "cached result written");
    Ok(value)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut writer = BufWriter::new(fs::File::create(path)?);
    serde_json::to_writer(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::WindUpError;
    use std::cell::Cell;
    use std::collections::BTreeMap;

    #[test]
    fn test_second_call_reads_cache_instead_of_computing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("values.json");
        let calls = Cell::new(0);

        let compute = || {
            calls.set(calls.get() + 1);
            Ok(vec![1.5, 2.5])
        };
        let first: Vec<f64> = with_json_cache(&path, compute).unwrap();
        let second: Vec<f64> = with_json_cache(&path, || {
            calls.set(calls.get() + 1);
            Ok(vec![9.9])
        })
        .unwrap();

        assert_eq!(first, vec![1.5, 2.5]);
        assert_eq!(second, first, "cached value should be returned");
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_compute_error_leaves_no_cache_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fail.json");
        let result: Result<Vec<f64>> =
            with_json_cache(&path, || Err(WindUpError::EmptyData("nothing".into())));
        assert!(result.is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_failed_serialization_leaves_no_partial_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("values.json");

        // tuple-like keys cannot be JSON object keys
        let bad: Result<BTreeMap<Vec<i32>, i32>> =
            with_json_cache(&path, || Ok(BTreeMap::from([(vec![1, 2], 3)])));
        assert!(matches!(bad, Err(WindUpError::Json(_))));
        assert!(!path.exists());
        assert!(!path.with_extension("part").exists());

        let good: Vec<i32> = with_json_cache(&path, || Ok(vec![4, 5])).unwrap();
        assert_eq!(good, vec![4, 5]);
        let cached: Vec<i32> = with_json_cache(&path, || Ok(vec![])).unwrap();
        assert_eq!(cached, vec![4, 5]);
    }

    #[test]
    fn test_corrupt_cache_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{not json").unwrap();
        let result: Result<Vec<f64>> = with_json_cache(&path, || Ok(vec![]));
        assert!(matches!(result, Err(WindUpError::Json(_))));
    }
}
