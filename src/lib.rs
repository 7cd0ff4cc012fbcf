//! # gene2trait
//!
//! Links GWAS-significant variants to the genes they most plausibly
//! regulate and reports one best-supported association per gene,
//! annotated with the trait under study.
//!
//! ## Pipeline
//!
//! - Parse the filtered GWAS association table, the gene catalog and the
//!   phenotype lookup table (tab-separated, optionally gzip-compressed)
//! - Partition the catalog by chromosome into a tss-sorted gene index
//! - Resolve each variant to its single nearest gene within a
//!   configurable window (default 1 Mb)
//! - Keep the variant with the smallest p-value per gene
//! - Emit one `gencode_id<TAB>pvalue<TAB>variant_id<TAB>trait` line per
//!   mapped gene, in gene first-insertion order

pub mod analysis;
pub mod error;
pub mod output;
pub mod parsers;
pub mod types;

// Re-export key types
pub use analysis::{GeneIndex, GeneMap, MappingStats, NearestOutcome, VariantGeneMapper};
pub use error::{Gene2TraitError, Result};
pub use output::MappingWriter;
pub use parsers::{trait_key, GeneCatalogParser, GwasParser, PhenotypeTable};
pub use types::{Gene, MappedGene, Variant};
