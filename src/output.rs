use csv::WriterBuilder;
use std::io::Write;

use crate::analysis::GeneMap;
use crate::error::Result;
use crate::types::MappedGene;

/// Emits one tab-separated line per mapped gene:
/// `gencode_id<TAB>pvalue<TAB>variant_id<TAB>trait`
pub struct MappingWriter;

impl MappingWriter {
    pub fn new() -> Self {
        Self
    }

    /// Attach the trait to each mapped gene, in gene first-insertion order
    pub fn finalize(&self, mappings: &GeneMap, trait_name: &str) -> Vec<MappedGene> {
        mappings
            .iter()
            .map(|(gencode_id, variant)| MappedGene {
                gencode_id: gencode_id.to_string(),
                best_variant: variant.clone(),
                trait_name: trait_name.to_string(),
            })
            .collect()
    }

    pub fn write<W: Write>(&self, out: W, mappings: &GeneMap, trait_name: &str) -> Result<()> {
        let mut wtr = WriterBuilder::new().delimiter(b'\t').from_writer(out);

        for record in self.finalize(mappings, trait_name) {
            wtr.write_record([
                record.gencode_id.as_str(),
                record.best_variant.pvalue_text.as_str(),
                record.best_variant.variant_id.as_str(),
                record.trait_name.as_str(),
            ])?;
        }

        wtr.flush()?;
        Ok(())
    }
}
