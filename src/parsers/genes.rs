use csv::StringRecord;
use std::path::Path;
use tracing::warn;

use crate::error::{Gene2TraitError, Result};
use crate::parsers::{find_column, normalize_chromosome, tsv_reader};
use crate::types::Gene;

const CHROMOSOME_ALIASES: &[&str] = &["chromosome", "chr", "chrom"];
const TSS_ALIASES: &[&str] = &["tss", "position", "pos"];
const GENCODE_ID_ALIASES: &[&str] = &["gencodeid", "gencode_id", "gene_id", "geneid"];

/// Parser for the static gene catalog
pub struct GeneCatalogParser {
    skip_malformed: bool,
}

struct GeneColumns {
    chromosome: usize,
    tss: usize,
    gencode_id: usize,
}

impl GeneCatalogParser {
    pub fn new(skip_malformed: bool) -> Self {
        Self { skip_malformed }
    }

    pub fn parse(&self, path: &Path) -> Result<Vec<Gene>> {
        let mut reader = tsv_reader(path)?;
        let headers = reader.headers()?.clone();
        let columns = self.map_columns(&headers, path)?;

        let mut genes = Vec::new();
        for record in reader.records() {
            let record = record?;

            match self.parse_record(&record, &columns, path) {
                Ok(gene) => genes.push(gene),
                Err(err) if self.skip_malformed => warn!("skipping catalog row: {err}"),
                Err(err) => return Err(err),
            }
        }

        Ok(genes)
    }

    fn map_columns(&self, headers: &StringRecord, path: &Path) -> Result<GeneColumns> {
        let require = |aliases: &[&str], column: &'static str| {
            find_column(headers, aliases).ok_or_else(|| Gene2TraitError::MissingColumn {
                path: path.to_path_buf(),
                column,
            })
        };

        Ok(GeneColumns {
            chromosome: require(CHROMOSOME_ALIASES, "chromosome")?,
            tss: require(TSS_ALIASES, "tss")?,
            gencode_id: require(GENCODE_ID_ALIASES, "gencodeId")?,
        })
    }

    fn parse_record(
        &self,
        record: &StringRecord,
        columns: &GeneColumns,
        path: &Path,
    ) -> Result<Gene> {
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let malformed = |message: String| Gene2TraitError::InputParse {
            path: path.to_path_buf(),
            line,
            message,
        };

        let chromosome = normalize_chromosome(record.get(columns.chromosome).unwrap_or(""));
        if chromosome.is_empty() {
            return Err(malformed("empty chromosome label".to_string()));
        }

        let tss_text = record.get(columns.tss).unwrap_or("").trim();
        let tss: u64 = tss_text
            .parse()
            .map_err(|_| malformed(format!("invalid tss '{tss_text}'")))?;

        let gencode_id = record.get(columns.gencode_id).unwrap_or("").trim();
        if gencode_id.is_empty() {
            return Err(malformed("empty gencode id".to_string()));
        }

        Ok(Gene::new(chromosome, tss, gencode_id))
    }
}
