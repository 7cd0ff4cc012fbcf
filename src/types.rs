use serde::{Deserialize, Serialize};

/// A variant significantly associated with the trait under study
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    pub chromosome: String,
    pub position: u64,
    /// Parsed p-value, used for all comparisons
    pub pvalue: f64,
    /// Verbatim p-value token from the input, used for emission
    pub pvalue_text: String,
    pub variant_id: String,
}

impl Variant {
    pub fn new(
        chromosome: impl Into<String>,
        position: u64,
        pvalue: f64,
        pvalue_text: impl Into<String>,
        variant_id: impl Into<String>,
    ) -> Self {
        Self {
            chromosome: chromosome.into(),
            position,
            pvalue,
            pvalue_text: pvalue_text.into(),
            variant_id: variant_id.into(),
        }
    }
}

/// A gene from the static catalog, identified by its GENCODE id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gene {
    pub chromosome: String,
    /// Transcription start site position
    pub tss: u64,
    pub gencode_id: String,
}

impl Gene {
    pub fn new(chromosome: impl Into<String>, tss: u64, gencode_id: impl Into<String>) -> Self {
        Self {
            chromosome: chromosome.into(),
            tss,
            gencode_id: gencode_id.into(),
        }
    }

    /// Absolute distance between this gene's tss and a variant position
    pub fn distance_to(&self, position: u64) -> u64 {
        self.tss.abs_diff(position)
    }
}

/// Final output unit: one best-supported variant per gene, trait attached
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappedGene {
    pub gencode_id: String,
    pub best_variant: Variant,
    pub trait_name: String,
}
