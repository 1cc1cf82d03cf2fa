use crate::PathExtension;
use std::path::Path;

/// Represents the extension of a previewable file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileExtension {
    /// CSV file extension.
    Csv,
    /// Json file extension.
    Json,
    /// Parquet file extension.
    Parquet,
    /// Unknown file extension, storing the extension as a string.
    Unknown(String),
    /// Missing file extension, when no extension is present in the name.
    Missing,
}

impl FileExtension {
    /// Determines the file extension from a local filesystem path.
    pub fn from_path(path: &Path) -> Self {
        Self::from_extension(path.extension_as_lowercase().as_deref())
    }

    /// Determines the file extension from an object name (the last path segment).
    ///
    /// The extension is whatever follows the last `.`; a name without a dot,
    /// or one whose only dot is the first character, has no extension.
    pub fn from_name(name: &str) -> Self {
        let extension = match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => Some(ext.to_lowercase()),
            _ => None,
        };
        Self::from_extension(extension.as_deref())
    }

    fn from_extension(extension: Option<&str>) -> Self {
        match extension {
            Some("csv") => FileExtension::Csv,
            Some("json") => FileExtension::Json,
            Some("parquet") => FileExtension::Parquet,
            Some(ext) => FileExtension::Unknown(ext.to_owned()),
            None => FileExtension::Missing,
        }
    }

    /// Only these formats trigger a preview query when their tree leaf is activated.
    pub fn is_queryable(&self) -> bool {
        matches!(
            self,
            FileExtension::Csv | FileExtension::Json | FileExtension::Parquet
        )
    }
}

#[cfg(test)]
mod tests_file_extension {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_from_name_known_formats() {
        assert_eq!(FileExtension::from_name("x.csv"), FileExtension::Csv);
        assert_eq!(FileExtension::from_name("y.PARQUET"), FileExtension::Parquet);
        assert_eq!(FileExtension::from_name("z.Json"), FileExtension::Json);
    }

    #[test]
    fn test_from_name_unknown_and_missing() {
        assert_eq!(
            FileExtension::from_name("notes.txt"),
            FileExtension::Unknown("txt".to_string())
        );
        assert_eq!(FileExtension::from_name("README"), FileExtension::Missing);
        assert_eq!(FileExtension::from_name(".hidden"), FileExtension::Missing);
    }

    #[test]
    fn test_only_data_files_are_queryable() {
        let queried: Vec<&str> = ["a.csv", "b.parquet", "c.json", "d.txt"]
            .into_iter()
            .filter(|name| FileExtension::from_name(name).is_queryable())
            .collect();
        assert_eq!(queried, vec!["a.csv", "b.parquet", "c.json"]);
    }

    #[test]
    fn test_from_path_uses_last_extension() {
        let path = PathBuf::from("/tmp/data.backup.CSV");
        assert_eq!(FileExtension::from_path(&path), FileExtension::Csv);
    }
}
