//! Session archive reader

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::warn;

use crate::error::{RecorderError, Result};
use crate::models::{SessionRecord, COLUMNS};

/// Entry name for the live, not yet flushed session
pub const CURRENT_SESSION: &str = "current_session";

/// One archived session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveEntry {
    /// Artifact file name, or `current_session`
    pub name: String,
    pub records: Vec<SessionRecord>,
}

/// Parse one artifact; short rows and missing columns read as empty cells
pub fn read_archive(path: &Path) -> Result<Vec<SessionRecord>> {
    let parse_error = |source: csv::Error| RecorderError::ArtifactParse {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(parse_error)?;

    // Position of each known column in this file's header, if present
    let headers = reader.headers().map_err(parse_error)?.clone();
    if headers.is_empty() {
        let missing = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "no header row");
        return Err(parse_error(csv::Error::from(missing)));
    }
    let positions: Vec<Option<usize>> = COLUMNS
        .iter()
        .map(|column| headers.iter().position(|header| header == *column))
        .collect();

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(parse_error)?;
        let cells: Vec<String> = positions
            .iter()
            .map(|position| {
                position
                    .and_then(|p| row.get(p))
                    .unwrap_or_default()
                    .to_string()
            })
            .collect();
        records.push(SessionRecord::from_cells(cells));
    }

    Ok(records)
}

/// Every `*.csv` in `directory`, sorted by file name
fn artifact_paths(directory: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for entry in std::fs::read_dir(directory)? {
        let path = entry?.path();
        if path.is_file() && path.extension().map_or(false, |ext| ext == "csv") {
            paths.push(path);
        }
    }

    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(paths)
}

/// Read every flushed artifact in lexical order
///
/// Unreadable artifacts are logged and skipped.
pub fn list_artifacts(directory: &Path) -> Vec<ArchiveEntry> {
    let paths = match artifact_paths(directory) {
        Ok(paths) => paths,
        Err(e) => {
            warn!("Cannot list recordings in {}: {}", directory.display(), e);
            return Vec::new();
        }
    };

    paths
        .into_iter()
        .filter_map(|path| {
            let name = path.file_name()?.to_string_lossy().into_owned();
            match read_archive(&path) {
                Ok(records) => Some(ArchiveEntry { name, records }),
                Err(e) => {
                    warn!("Skipping artifact: {}", e);
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const HEADER: &str = "received_timestamp,cardIndex,currentReward,finalKontostand,klickZeiten,timestamp,,values\n";

    #[test]
    fn test_read_normalizes_missing_cells() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("20240101_000000.csv");
        fs::write(
            &path,
            format!("{}r1,3,10,,0.1;0.2,t1,,\nr2\n", HEADER),
        )
        .unwrap();

        let records = read_archive(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].card_index, "3");
        assert_eq!(records[0].final_kontostand, "");
        assert_eq!(records[0].klick_zeiten, "0.1;0.2");
        assert_eq!(records[1].received_timestamp, "r2");
        assert_eq!(records[1].values, "");
    }

    #[test]
    fn test_list_sorted_and_skips_non_csv() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("20240102_000000_3D.csv"), format!("{}b,,,,,,,\n", HEADER)).unwrap();
        fs::write(dir.path().join("20240101_000000_2D.csv"), format!("{}a,,,,,,,\n", HEADER)).unwrap();
        fs::write(dir.path().join("notes.txt"), "not an artifact").unwrap();

        let entries = list_artifacts(dir.path());
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["20240101_000000_2D.csv", "20240102_000000_3D.csv"]);
        assert_eq!(entries[0].records[0].received_timestamp, "a");
    }

    #[test]
    fn test_unreadable_artifact_is_skipped() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("20240101_000000.csv"), format!("{}a,,,,,,,\n", HEADER)).unwrap();
        // Invalid UTF-8 cannot be read into string cells
        fs::write(dir.path().join("20240102_000000.csv"), [HEADER.as_bytes(), &[0xffu8, 0xfe, b'\n'][..]].concat()).unwrap();
        fs::write(dir.path().join("20240103_000000.csv"), format!("{}c,,,,,,,\n", HEADER)).unwrap();

        let names: Vec<String> = list_artifacts(dir.path()).into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["20240101_000000.csv", "20240103_000000.csv"]);

        assert!(matches!(
            read_archive(&dir.path().join("20240102_000000.csv")),
            Err(RecorderError::ArtifactParse { .. })
        ));
    }

    #[test]
    fn test_empty_artifact_is_rejected() {
        let dir = tempdir().unwrap();
        let empty = dir.path().join("20240101_000000.csv");
        fs::write(&empty, "").unwrap();
        fs::write(dir.path().join("20240102_000000.csv"), format!("{}b,,,,,,,\n", HEADER)).unwrap();

        let err = read_archive(&empty).unwrap_err();
        assert_eq!(err.kind(), "ArtifactParseError");

        let names: Vec<String> = list_artifacts(dir.path()).into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["20240102_000000.csv"]);
    }

    #[test]
    fn test_missing_directory_lists_nothing() {
        let dir = tempdir().unwrap();
        assert!(list_artifacts(&dir.path().join("absent")).is_empty());
    }
}
