use std::collections::HashMap;
use std::path::Path;
use tracing::warn;

use crate::error::{Gene2TraitError, Result};
use crate::parsers::{find_column, tsv_reader};

const KEY_ALIASES: &[&str] = &["file", "file_name", "filename"];
const TRAIT_ALIASES: &[&str] = &["phenotype"];

/// Column the shared phenotype table is conventionally keyed by when no
/// file-name header is present
const DEFAULT_KEY_COLUMN: usize = 1;

/// Lookup table from dataset file names to trait descriptions
#[derive(Debug)]
pub struct PhenotypeTable {
    traits_by_file: HashMap<String, String>,
}

impl PhenotypeTable {
    pub fn load(path: &Path) -> Result<Self> {
        let mut reader = tsv_reader(path)?;
        let headers = reader.headers()?.clone();

        let trait_column = find_column(&headers, TRAIT_ALIASES).ok_or_else(|| {
            Gene2TraitError::MissingColumn {
                path: path.to_path_buf(),
                column: "Phenotype",
            }
        })?;
        let key_column = find_column(&headers, KEY_ALIASES).unwrap_or(DEFAULT_KEY_COLUMN);

        let mut traits_by_file = HashMap::new();
        for record in reader.records() {
            let record = record?;

            let key = record.get(key_column).unwrap_or("").trim();
            let description = record.get(trait_column).unwrap_or("").trim();
            if key.is_empty() || description.is_empty() {
                continue;
            }

            if traits_by_file.contains_key(key) {
                warn!("duplicate phenotype key '{key}', keeping the first entry");
                continue;
            }
            traits_by_file.insert(key.to_string(), description.to_string());
        }

        Ok(Self { traits_by_file })
    }

    pub fn len(&self) -> usize {
        self.traits_by_file.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traits_by_file.is_empty()
    }

    /// Resolve the trait description for a dataset key
    pub fn trait_for(&self, key: &str) -> Result<&str> {
        self.traits_by_file
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| Gene2TraitError::TraitNotFound {
                key: key.to_string(),
            })
    }
}

/// Derive the phenotype lookup key from a dataset path.
///
/// Filtered datasets are named after the original compressed file with the
/// trailing "filtered.txt" swapped in, so the swap is undone here; any
/// other file name is used as the key verbatim.
pub fn trait_key(path: &Path) -> String {
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();

    match name.strip_suffix("filtered.txt") {
        Some(stem) => format!("{stem}txt.gz"),
        None => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    fn write_tsv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_trait_key_undoes_filtered_suffix() {
        let key = trait_key(&PathBuf::from(
            "/data/gwas/UKB_20002_1223_self_reported_type_2_diabetes.filtered.txt",
        ));
        assert_eq!(key, "UKB_20002_1223_self_reported_type_2_diabetes.txt.gz");
    }

    #[test]
    fn test_trait_key_passes_other_names_through() {
        let key = trait_key(&PathBuf::from("/data/gwas/height.tsv"));
        assert_eq!(key, "height.tsv");
    }

    #[test]
    fn test_lookup_by_second_column() {
        let file = write_tsv(
            "Tag\tFile\tPhenotype\n\
             UKB_1\tUKB_1.txt.gz\tType 2 diabetes\n\
             UKB_2\tUKB_2.txt.gz\tStanding height\n",
        );

        let table = PhenotypeTable::load(file.path()).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.trait_for("UKB_2.txt.gz").unwrap(), "Standing height");
    }

    #[test]
    fn test_missing_key_is_trait_not_found() {
        let file = write_tsv("Tag\tFile\tPhenotype\nUKB_1\tUKB_1.txt.gz\tType 2 diabetes\n");

        let table = PhenotypeTable::load(file.path()).unwrap();
        let err = table.trait_for("absent.txt.gz").unwrap_err();

        assert!(matches!(err, Gene2TraitError::TraitNotFound { .. }));
    }

    #[test]
    fn test_first_duplicate_key_wins() {
        let file = write_tsv(
            "Tag\tFile\tPhenotype\n\
             A\tsame.txt.gz\tFirst trait\n\
             B\tsame.txt.gz\tSecond trait\n",
        );

        let table = PhenotypeTable::load(file.path()).unwrap();

        assert_eq!(table.trait_for("same.txt.gz").unwrap(), "First trait");
    }

    #[test]
    fn test_missing_phenotype_column_is_fatal() {
        let file = write_tsv("Tag\tFile\tDescription\nA\ta.txt.gz\tsomething\n");

        let err = PhenotypeTable::load(file.path()).unwrap_err();

        assert!(matches!(err, Gene2TraitError::MissingColumn { .. }));
    }
}
