use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

use crate::error::{Gene2TraitError, Result};
use crate::types::{Gene, Variant};

/// Gene catalog partitioned by chromosome, each partition sorted by tss.
///
/// The per-chromosome order fixes the candidate enumeration order the
/// nearest-gene tie-break depends on: on an exact distance tie the
/// lower-tss gene wins.
pub struct GeneIndex {
    genes_by_chromosome: HashMap<String, Vec<Gene>>,
    num_genes: usize,
}

impl GeneIndex {
    pub fn build(genes: Vec<Gene>) -> Result<Self> {
        if genes.is_empty() {
            return Err(Gene2TraitError::EmptyGeneCatalog);
        }

        let num_genes = genes.len();
        let mut genes_by_chromosome: HashMap<String, Vec<Gene>> = HashMap::new();
        for gene in genes {
            genes_by_chromosome
                .entry(gene.chromosome.clone())
                .or_default()
                .push(gene);
        }

        // stable sort keeps catalog order for genes sharing a tss
        for partition in genes_by_chromosome.values_mut() {
            partition.sort_by_key(|gene| gene.tss);
        }

        Ok(Self {
            genes_by_chromosome,
            num_genes,
        })
    }

    pub fn num_genes(&self) -> usize {
        self.num_genes
    }

    pub fn num_chromosomes(&self) -> usize {
        self.genes_by_chromosome.len()
    }

    pub fn contains_chromosome(&self, chromosome: &str) -> bool {
        self.genes_by_chromosome.contains_key(chromosome)
    }

    /// Genes on `chromosome` whose tss lies in the closed interval
    /// `[position - window, position + window]`, in index order.
    ///
    /// An absent chromosome yields an empty slice.
    pub fn candidates_in_window(&self, chromosome: &str, position: u64, window: u64) -> &[Gene] {
        let Some(partition) = self.genes_by_chromosome.get(chromosome) else {
            return &[];
        };

        let low = position.saturating_sub(window);
        let high = position.saturating_add(window);

        let start = partition.partition_point(|gene| gene.tss < low);
        let end = partition.partition_point(|gene| gene.tss <= high);
        &partition[start..end]
    }
}

/// Outcome of resolving a single variant against the index
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NearestOutcome<'a> {
    Mapped { gene: &'a Gene, distance: u64 },
    NoGeneInWindow,
    ChromosomeNotIndexed,
}

/// Per-variant counters, reported at the end of a run
#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct MappingStats {
    pub total_variants: usize,
    pub mapped: usize,
    pub no_gene_in_window: usize,
    pub chromosome_not_indexed: usize,
}

impl MappingStats {
    pub fn skipped(&self) -> usize {
        self.no_gene_in_window + self.chromosome_not_indexed
    }

    pub fn skip_rate(&self) -> f64 {
        if self.total_variants == 0 {
            0.0
        } else {
            self.skipped() as f64 / self.total_variants as f64
        }
    }
}

/// Best variant seen so far per gene, in gene first-insertion order
#[derive(Debug, Default)]
pub struct GeneMap {
    best_by_gene: HashMap<String, Variant>,
    insertion_order: Vec<String>,
}

impl GeneMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a resolved (variant, gene) pair.
    ///
    /// A stored variant is replaced only by a strictly smaller p-value, so
    /// the first-seen variant wins exact ties.
    pub fn record(&mut self, gencode_id: &str, variant: &Variant) {
        match self.best_by_gene.get_mut(gencode_id) {
            Some(best) => {
                if variant.pvalue < best.pvalue {
                    *best = variant.clone();
                }
            }
            None => {
                self.insertion_order.push(gencode_id.to_string());
                self.best_by_gene
                    .insert(gencode_id.to_string(), variant.clone());
            }
        }
    }

    pub fn len(&self) -> usize {
        self.insertion_order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.insertion_order.is_empty()
    }

    pub fn get(&self, gencode_id: &str) -> Option<&Variant> {
        self.best_by_gene.get(gencode_id)
    }

    /// Iterate records in gene first-insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Variant)> {
        self.insertion_order
            .iter()
            .map(|id| (id.as_str(), &self.best_by_gene[id]))
    }
}

/// Resolves each variant to its nearest in-window gene and keeps the
/// best-supported variant per gene
pub struct VariantGeneMapper {
    window: u64,
}

impl VariantGeneMapper {
    pub fn new(window: u64) -> Self {
        Self { window }
    }

    /// Closest candidate by absolute tss distance.
    ///
    /// Strict less-than against the running minimum keeps the first
    /// candidate in index order on equal distances.
    pub fn nearest_gene<'a>(&self, index: &'a GeneIndex, variant: &Variant) -> NearestOutcome<'a> {
        if !index.contains_chromosome(&variant.chromosome) {
            return NearestOutcome::ChromosomeNotIndexed;
        }

        let candidates =
            index.candidates_in_window(&variant.chromosome, variant.position, self.window);

        let mut nearest: Option<(&Gene, u64)> = None;
        for gene in candidates {
            let distance = gene.distance_to(variant.position);
            if nearest.map_or(true, |(_, best)| distance < best) {
                nearest = Some((gene, distance));
            }
        }

        match nearest {
            Some((gene, distance)) => NearestOutcome::Mapped { gene, distance },
            None => NearestOutcome::NoGeneInWindow,
        }
    }

    /// Resolve all variants and aggregate to one best variant per gene.
    ///
    /// The per-variant phase is pure and runs in parallel; the
    /// order-sensitive aggregation folds the outcomes sequentially in
    /// input row order.
    pub fn map_all(&self, index: &GeneIndex, variants: &[Variant]) -> (GeneMap, MappingStats) {
        let outcomes: Vec<NearestOutcome> = variants
            .par_iter()
            .map(|variant| self.nearest_gene(index, variant))
            .collect();

        let mut mappings = GeneMap::new();
        let mut stats = MappingStats {
            total_variants: variants.len(),
            ..Default::default()
        };

        for (variant, outcome) in variants.iter().zip(outcomes) {
            match outcome {
                NearestOutcome::Mapped { gene, distance } => {
                    debug!(
                        "{} -> {} (distance {})",
                        variant.variant_id, gene.gencode_id, distance
                    );
                    mappings.record(&gene.gencode_id, variant);
                    stats.mapped += 1;
                }
                NearestOutcome::NoGeneInWindow => {
                    debug!("{}: no gene within window", variant.variant_id);
                    stats.no_gene_in_window += 1;
                }
                NearestOutcome::ChromosomeNotIndexed => {
                    debug!(
                        "{}: chromosome {} has no genes in the catalog",
                        variant.variant_id, variant.chromosome
                    );
                    stats.chromosome_not_indexed += 1;
                }
            }
        }

        (mappings, stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variant(chromosome: &str, position: u64, pvalue: f64, id: &str) -> Variant {
        Variant::new(chromosome, position, pvalue, format!("{pvalue:e}"), id)
    }

    fn small_index() -> GeneIndex {
        GeneIndex::build(vec![
            Gene::new("1", 2_000_000, "ENSG_B"),
            Gene::new("1", 1_000_000, "ENSG_A"),
            Gene::new("2", 500_000, "ENSG_C"),
        ])
        .unwrap()
    }

    #[test]
    fn test_build_partitions_and_sorts_by_tss() {
        let index = small_index();

        assert_eq!(index.num_genes(), 3);
        assert_eq!(index.num_chromosomes(), 2);

        let chr1 = index.candidates_in_window("1", 1_500_000, 1_000_000);
        assert_eq!(chr1.len(), 2);
        assert_eq!(chr1[0].gencode_id, "ENSG_A");
        assert_eq!(chr1[1].gencode_id, "ENSG_B");
    }

    #[test]
    fn test_build_rejects_empty_catalog() {
        assert!(matches!(
            GeneIndex::build(Vec::new()),
            Err(Gene2TraitError::EmptyGeneCatalog)
        ));
    }

    #[test]
    fn test_window_bounds_are_inclusive() {
        let index = small_index();

        // tss exactly at position + window
        let hits = index.candidates_in_window("1", 0, 1_000_000);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].gencode_id, "ENSG_A");

        // tss exactly at position - window
        let hits = index.candidates_in_window("1", 3_000_000, 1_000_000);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].gencode_id, "ENSG_B");

        // one base outside on either side
        assert!(index.candidates_in_window("1", 0, 999_999).is_empty());
        assert!(index.candidates_in_window("1", 3_000_001, 1_000_000).is_empty());
    }

    #[test]
    fn test_absent_chromosome_yields_no_candidates() {
        let index = small_index();
        assert!(index.candidates_in_window("X", 1_000_000, 1_000_000).is_empty());
    }

    #[test]
    fn test_nearest_gene_minimizes_distance() {
        let index = small_index();
        let mapper = VariantGeneMapper::new(1_000_000);

        let outcome = mapper.nearest_gene(&index, &variant("1", 1_200_000, 1e-9, "v1"));
        match outcome {
            NearestOutcome::Mapped { gene, distance } => {
                assert_eq!(gene.gencode_id, "ENSG_A");
                assert_eq!(distance, 200_000);
            }
            other => panic!("expected a mapped outcome, got {other:?}"),
        }
    }

    #[test]
    fn test_nearest_gene_tie_keeps_first_in_index_order() {
        // equidistant genes at 1 Mb and 2 Mb from a variant at 1.5 Mb
        let index = small_index();
        let mapper = VariantGeneMapper::new(1_000_000);

        let outcome = mapper.nearest_gene(&index, &variant("1", 1_500_000, 1e-9, "v1"));
        match outcome {
            NearestOutcome::Mapped { gene, distance } => {
                assert_eq!(gene.gencode_id, "ENSG_A");
                assert_eq!(distance, 500_000);
            }
            other => panic!("expected a mapped outcome, got {other:?}"),
        }
    }

    #[test]
    fn test_gene_exactly_at_window_edge_maps() {
        let index = small_index();
        let mapper = VariantGeneMapper::new(1_000_000);

        let outcome = mapper.nearest_gene(&index, &variant("1", 0, 1e-9, "v1"));
        assert!(matches!(
            outcome,
            NearestOutcome::Mapped { distance: 1_000_000, .. }
        ));
    }

    #[test]
    fn test_empty_window_is_explicit_outcome() {
        let index = small_index();
        let mapper = VariantGeneMapper::new(100);

        let outcome = mapper.nearest_gene(&index, &variant("1", 5_000_000, 1e-9, "v1"));
        assert_eq!(outcome, NearestOutcome::NoGeneInWindow);

        let outcome = mapper.nearest_gene(&index, &variant("X", 5_000_000, 1e-9, "v1"));
        assert_eq!(outcome, NearestOutcome::ChromosomeNotIndexed);
    }

    #[test]
    fn test_gene_map_keeps_smallest_pvalue() {
        let mut mappings = GeneMap::new();

        mappings.record("ENSG_A", &variant("1", 100, 1e-9, "v1"));
        mappings.record("ENSG_A", &variant("1", 200, 1e-12, "v2"));
        mappings.record("ENSG_A", &variant("1", 300, 1e-6, "v3"));

        assert_eq!(mappings.len(), 1);
        assert_eq!(mappings.get("ENSG_A").unwrap().variant_id, "v2");
    }

    #[test]
    fn test_gene_map_pvalue_tie_keeps_first_seen() {
        let mut mappings = GeneMap::new();

        mappings.record("ENSG_A", &variant("1", 100, 1e-9, "first"));
        mappings.record("ENSG_A", &variant("1", 200, 1e-9, "second"));

        assert_eq!(mappings.get("ENSG_A").unwrap().variant_id, "first");
    }

    #[test]
    fn test_gene_map_iterates_in_insertion_order() {
        let mut mappings = GeneMap::new();

        mappings.record("ENSG_C", &variant("1", 100, 1e-9, "v1"));
        mappings.record("ENSG_A", &variant("1", 200, 1e-9, "v2"));
        mappings.record("ENSG_B", &variant("1", 300, 1e-9, "v3"));
        mappings.record("ENSG_A", &variant("1", 400, 1e-12, "v4"));

        let order: Vec<&str> = mappings.iter().map(|(id, _)| id).collect();
        assert_eq!(order, vec!["ENSG_C", "ENSG_A", "ENSG_B"]);
    }

    #[test]
    fn test_map_all_counts_skips_per_reason() {
        let index = small_index();
        let mapper = VariantGeneMapper::new(1_000_000);

        let variants = vec![
            variant("1", 999_500, 1e-9, "v1"),
            variant("1", 500_000_000, 1e-9, "v2"),
            variant("MT", 100, 1e-9, "v3"),
        ];

        let (mappings, stats) = mapper.map_all(&index, &variants);

        assert_eq!(mappings.len(), 1);
        assert_eq!(stats.total_variants, 3);
        assert_eq!(stats.mapped, 1);
        assert_eq!(stats.no_gene_in_window, 1);
        assert_eq!(stats.chromosome_not_indexed, 1);
        assert!((stats.skip_rate() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_map_all_nearest_distance_is_minimal() {
        let index = GeneIndex::build(
            (0..50)
                .map(|i| Gene::new("1", 100_000 * i as u64, format!("ENSG_{i:03}")))
                .collect(),
        )
        .unwrap();
        let mapper = VariantGeneMapper::new(1_000_000);

        let probe = variant("1", 1_234_567, 1e-9, "v1");
        let outcome = mapper.nearest_gene(&index, &probe);

        let NearestOutcome::Mapped { gene, distance } = outcome else {
            panic!("expected a mapped outcome");
        };
        assert_eq!(gene.gencode_id, "ENSG_012");
        for candidate in index.candidates_in_window("1", probe.position, 1_000_000) {
            assert!(distance <= candidate.distance_to(probe.position));
        }
    }
}
