use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::read::MultiGzDecoder;

use crate::error::Result;

mod genes;
mod gwas;
mod phenotypes;

pub use genes::GeneCatalogParser;
pub use gwas::GwasParser;
pub use phenotypes::{trait_key, PhenotypeTable};

/// Open a possibly gzip-compressed file for buffered reading
pub fn open_file(path: &Path) -> Result<Box<dyn BufRead>> {
    let file = File::open(path)?;

    if path.extension().map(|e| e == "gz").unwrap_or(false) {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Normalize a chromosome label so catalog and dataset entries join.
///
/// Strips surrounding whitespace and an optional leading "chr" prefix,
/// so "chr17" and "17" refer to the same partition.
pub fn normalize_chromosome(raw: &str) -> String {
    let trimmed = raw.trim();

    let stripped = match trimmed.get(..3) {
        Some(prefix) if prefix.eq_ignore_ascii_case("chr") => &trimmed[3..],
        _ => trimmed,
    };

    stripped.to_string()
}

/// Find the index of the header matching one of the aliases
/// (case-insensitive). Earlier aliases take precedence over later ones.
pub(crate) fn find_column(headers: &csv::StringRecord, aliases: &[&str]) -> Option<usize> {
    aliases.iter().find_map(|alias| {
        headers
            .iter()
            .position(|header| header.trim().eq_ignore_ascii_case(alias))
    })
}

/// Tab-delimited reader over a possibly gzip-compressed file
pub(crate) fn tsv_reader(path: &Path) -> Result<csv::Reader<Box<dyn BufRead>>> {
    Ok(csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(true)
        .from_reader(open_file(path)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_chromosome() {
        assert_eq!(normalize_chromosome("chr17"), "17");
        assert_eq!(normalize_chromosome("Chr17"), "17");
        assert_eq!(normalize_chromosome("CHRX"), "X");
        assert_eq!(normalize_chromosome(" 17 "), "17");
        assert_eq!(normalize_chromosome("17"), "17");
        assert_eq!(normalize_chromosome(""), "");
    }

    #[test]
    fn test_find_column_is_case_insensitive() {
        let headers = csv::StringRecord::from(vec!["gencodeId", "Chromosome", "tss"]);
        assert_eq!(find_column(&headers, &["gencodeid", "gene_id"]), Some(0));
        assert_eq!(find_column(&headers, &["chromosome", "chr"]), Some(1));
        assert_eq!(find_column(&headers, &["pvalue"]), None);
    }
}
