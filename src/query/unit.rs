//! Query units: discovering and loading the `.sql` files of a batch.

use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Result, SqlRunError};

/// File extension that marks a query unit.
pub const SQL_EXTENSION: &str = ".sql";

/// One SQL file and its full text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryUnit {
    /// Path the text was read from.
    pub path: PathBuf,
    /// File name, used in reports and to name the artifact.
    pub file_name: String,
    /// Raw file content, sent to the database verbatim.
    pub sql: String,
}

impl QueryUnit {
    /// Reads a query unit from disk.
    ///
    /// An unreadable file is a batch-level failure and is returned as an error.
    pub async fn load(path: &Path) -> Result<Self> {
        let sql = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| SqlRunError::io(path, e))?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self {
            path: path.to_path_buf(),
            file_name,
            sql,
        })
    }

    /// Name of the CSV artifact for this unit: the file stem plus `.csv`.
    pub fn csv_file_name(&self) -> String {
        let stem = self
            .file_name
            .strip_suffix(SQL_EXTENSION)
            .unwrap_or(&self.file_name);
        format!("{stem}.csv")
    }
}

/// Lists the `.sql` files directly inside `dir`, sorted by file name.
///
/// Other files and entries that are not regular files are ignored. Order is
/// byte-wise on the file name; nothing else about execution order is implied.
pub async fn discover_sql_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| SqlRunError::io(dir, e))?;

    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| SqlRunError::io(dir, e))?
    {
        let path = entry.path();
        if !entry.file_name().to_string_lossy().ends_with(SQL_EXTENSION) {
            continue;
        }

        // Follows links; a dangling one is not a regular file.
        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Skipping dangling entry {}", path.display());
                continue;
            }
            Err(e) => return Err(SqlRunError::io(&path, e)),
        };
        if metadata.is_file() {
            files.push(path);
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}
