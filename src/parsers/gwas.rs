use csv::StringRecord;
use std::path::Path;
use tracing::warn;

use crate::error::{Gene2TraitError, Result};
use crate::parsers::{find_column, normalize_chromosome, tsv_reader};
use crate::types::Variant;

const CHROMOSOME_ALIASES: &[&str] = &["chromosome", "chr", "chrom"];
const POSITION_ALIASES: &[&str] = &["position", "pos", "bp"];
const PVALUE_ALIASES: &[&str] = &["pvalue", "p_value", "pval", "p"];
const VARIANT_ID_ALIASES: &[&str] = &["panel_variant_id", "variant_id", "variant", "rsid"];

/// Parser for the filtered GWAS association table (one trait per file)
pub struct GwasParser {
    skip_malformed: bool,
}

struct GwasColumns {
    chromosome: usize,
    position: usize,
    pvalue: usize,
    variant_id: usize,
}

impl GwasParser {
    pub fn new(skip_malformed: bool) -> Self {
        Self { skip_malformed }
    }

    pub fn parse(&self, path: &Path) -> Result<Vec<Variant>> {
        let mut reader = tsv_reader(path)?;
        let headers = reader.headers()?.clone();
        let columns = self.map_columns(&headers, path)?;

        let mut variants = Vec::new();
        for record in reader.records() {
            let record = record?;

            match self.parse_record(&record, &columns, path) {
                Ok(variant) => variants.push(variant),
                Err(err) if self.skip_malformed => warn!("skipping variant row: {err}"),
                Err(err) => return Err(err),
            }
        }

        Ok(variants)
    }

    fn map_columns(&self, headers: &StringRecord, path: &Path) -> Result<GwasColumns> {
        let require = |aliases: &[&str], column: &'static str| {
            find_column(headers, aliases).ok_or_else(|| Gene2TraitError::MissingColumn {
                path: path.to_path_buf(),
                column,
            })
        };

        Ok(GwasColumns {
            chromosome: require(CHROMOSOME_ALIASES, "chromosome")?,
            position: require(POSITION_ALIASES, "position")?,
            pvalue: require(PVALUE_ALIASES, "pvalue")?,
            variant_id: require(VARIANT_ID_ALIASES, "panel_variant_id")?,
        })
    }

    fn parse_record(
        &self,
        record: &StringRecord,
        columns: &GwasColumns,
        path: &Path,
    ) -> Result<Variant> {
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

        let position_text = record.get(columns.position).unwrap_or("").trim();
        let position: u64 = position_text
            .parse()
            .map_err(|_| malformed(format!("invalid position '{position_text}'")))?;

        let pvalue_text = record.get(columns.pvalue).unwrap_or("").trim();
        let pvalue: f64 = pvalue_text
            .parse()
            .map_err(|_| malformed(format!("invalid p-value '{pvalue_text}'")))?;
        if !(pvalue > 0.0 && pvalue <= 1.0) {
            return Err(malformed(format!("p-value {pvalue} outside (0, 1]")));
        }

        let variant_id = record.get(columns.variant_id).unwrap_or("").trim();
        if variant_id.is_empty() {
            return Err(malformed("empty variant id".to_string()));
        }

        Ok(Variant::new(
            chromosome,
            position,
            pvalue,
            pvalue_text,
            variant_id,
        ))
    }
}
