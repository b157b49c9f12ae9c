/// Zenodo open-data downloads
///
/// Fetches files attached to a published Zenodo record. Files already in
/// the output directory are not downloaded again.
///
/// API Documentation: https://developers.zenodo.org/#records
use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::logging::{self, Stage};
use crate::model::{Result, WindUpError};

const ZENODO_BASE_URL: &str = "https://zenodo.org";

// ============================================================================
// Zenodo API Response Structures
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ZenodoRecord {
    pub files: Vec<ZenodoFile>,
}

#[derive(Debug, Deserialize)]
pub struct ZenodoFile {
    pub key: String,
    #[serde(default)]
    pub size: Option<u64>,
    pub links: ZenodoLinks,
}

#[derive(Debug, Deserialize)]
pub struct ZenodoLinks {
    #[serde(rename = "self")]
    pub self_url: String,
}

// ============================================================================
// API Client Functions
// ============================================================================

pub fn record_url(record_id: &str) -> String {
    format!("{}/api/records/{}", ZENODO_BASE_URL, record_id)
}

/// Picks the requested files out of a record, in name order.
///
/// Every requested name must be attached to the record.
pub fn select_files<'a>(
    record: &'a ZenodoRecord,
    filenames: &BTreeSet<String>,
) -> Result<Vec<&'a ZenodoFile>> {
    let mut selected = Vec::new();
    for name in filenames {
        let missing = || WindUpError::EmptyData(format!("'{}' not in Zenodo record", name));
        let file = record
            .files
            .iter()
            .find(|f| &f.key == name)
            .ok_or_else(missing)?;
        selected.push(file);
    }
    Ok(selected)
}

fn get_checked(
    client: &reqwest::blocking::Client,
    url: &str,
) -> Result<reqwest::blocking::Response> {
    let response = client.get(url).send()?;
    if !response.status().is_success() {
        return Err(WindUpError::Http(response.status().as_u16()));
    }
    Ok(response)
}

/// Downloads `filenames` from Zenodo record `record_id` into `output_dir`.
///
/// Returns the local paths of all requested files. A file whose size on
/// disk differs from the record's size is treated as a partial download and
/// fetched again.
pub fn download_zenodo_data(
    record_id: &str,
    output_dir: &Path,
    filenames: &BTreeSet<String>,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(output_dir)?;

    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(3600))
        .build()?;

    let record: ZenodoRecord = get_checked(&client, &record_url(record_id))?.json()?;
    let files = select_files(&record, filenames)?;

    let mut paths = Vec::new();
    for file in files {
        let dest = output_dir.join(&file.key);
        if is_complete(&dest, file.size) {
            let message = format!("{} already exists, skipping", file.key);
            logging::info(Stage::Download, None, &message);
            paths.push(dest);
            continue;
        }

        let message = format!("downloading {}", file.key);
        logging::info(Stage::Download, None, &message);
        let result = get_checked(&client, &file.links.self_url).and_then(|mut response| {
            let tmp = dest.with_extension("part");
            let mut out = fs::File::create(&tmp)?;
            response.copy_to(&mut out)?;
            out.flush()?;
            fs::rename(&tmp, &dest)?;
            Ok(())
        });
        if let Err(e) = result {
            let operation = format!("download of {}", file.key);
            logging::log_failure(Stage::Download, None, &operation, &e);
            return Err(e);
        }
        paths.push(dest);
    }
    Ok(paths)
}

fn is_complete(path: &Path, expected_size: Option<u64>) -> bool {
    match (fs::metadata(path), expected_size) {
        (Ok(meta), Some(size)) => meta.is_file() && meta.len() == size,
        (Ok(meta), None) => meta.is_file(),
        (Err(_), _) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECORD_JSON: &str = r#"{
        "id": 7342466,
        "files": [
            {"key": "SMARTEOLE-WFC-open-dataset.zip", "size": 12,
             "links": {"self": "https://zenodo.org/api/records/7342466/files/x/content"}},
            {"key": "README.md", "links": {"self": "https://zenodo.org/x/README.md"}}
        ]
    }"#;

    #[test]
    fn test_record_url() {
        let url = record_url("7342466");
        assert_eq!(url, "https://zenodo.org/api/records/7342466");
    }

    #[test]
    fn test_select_requested_files() {
        let record: ZenodoRecord = serde_json::from_str(RECORD_JSON).unwrap();
        let wanted: BTreeSet<String> = ["SMARTEOLE-WFC-open-dataset.zip".to_string()].into();
        let files = select_files(&record, &wanted).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].size, Some(12));
        assert!(files[0].links.self_url.ends_with("/content"));
    }

    #[test]
    fn test_missing_file_in_record_is_error() {
        let record: ZenodoRecord = serde_json::from_str(RECORD_JSON).unwrap();
        let wanted: BTreeSet<String> = ["other.zip".to_string()].into();
        let selected = select_files(&record, &wanted);
        assert!(matches!(selected, Err(WindUpError::EmptyData(_))));
    }

    #[test]
    fn test_is_complete_checks_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.zip");
        assert!(!is_complete(&path, Some(3)));
        std::fs::write(&path, b"abc").unwrap();
        assert!(is_complete(&path, Some(3)));
        assert!(!is_complete(&path, Some(4)));
        assert!(is_complete(&path, None));
    }

    #[test]
    #[ignore] // Don't run in CI - depends on external API
    fn zenodo_api_smarteole_record_lists_archive() {
        let client = reqwest::blocking::Client::new();
        let record: ZenodoRecord = get_checked(&client, &record_url("7342466"))
            .expect("Zenodo API should respond")
            .json()
            .expect("record JSON should parse");
        let archive = "SMARTEOLE-WFC-open-dataset.zip";
        assert!(record.files.iter().any(|f| f.key == archive));
    }
}
