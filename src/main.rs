use anyhow::{bail, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueHint};
use clap_complete::{generate, Shell};
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;
use tracing::{info, warn};

mod analysis;
mod error;
mod output;
mod parsers;
mod types;

use analysis::{GeneIndex, VariantGeneMapper};
use output::MappingWriter;
use parsers::{trait_key, GeneCatalogParser, GwasParser, PhenotypeTable};

/// Maps GWAS trait-associated variants to their nearest genes
#[derive(Parser, Debug)]
#[command(
    name = "gene2trait",
    version,
    about = "Link GWAS trait-associated variants to their nearest genes",
    long_about = r#"
Links genes to a GWAS trait from a filtered association file of variants
significantly associated with that trait. Each variant is linked to the
single nearest gene whose transcription start site lies within a
configurable window (default 1 Mb); when several variants link to the same
gene, the one with the smallest p-value is kept.

Writes one tab-separated line per mapped gene:
gencode_id, p-value, variant id, trait description.
"#
)]
#[command(arg_required_else_help = true)]
struct Cli {
    /// Filtered GWAS association file (significant variants for one trait)
    #[arg(value_name = "GWAS_FILE", value_hint = ValueHint::FilePath)]
    gwas: Option<PathBuf>,

    /// Gene catalog with chromosome, tss and gencodeId columns
    #[arg(short, long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    genes: Option<PathBuf>,

    /// Phenotype lookup table mapping dataset file names to trait descriptions
    #[arg(short, long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    phenotypes: Option<PathBuf>,

    /// Window half-width in base pairs around each variant
    #[arg(short, long, default_value_t = 1_000_000)]
    window: u64,

    /// Write output to this file instead of stdout
    #[arg(short, long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,

    /// Skip malformed input rows instead of aborting
    #[arg(long)]
    skip_malformed: bool,

    /// Number of threads (0 = auto-detect)
    #[arg(short, long, default_value = "0", help = "Number of threads (0 = auto)")]
    threads: usize,

    /// Enable verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Subcommands
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate shell completions
    Completions { shell: Shell },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(Commands::Completions { shell }) = cli.command {
        generate_completions(shell);
        return Ok(());
    }

    init_logging(cli.verbose);
    init_thread_pool(cli.threads)?;

    let config = MapperConfig::from_cli(&cli)?;

    info!("Starting gene-to-trait mapping...");
    info!("Using {} threads", rayon::current_num_threads());

    run_mapping(config)?;

    Ok(())
}

fn generate_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(format!("gene2trait={}", level))
        .with_writer(io::stderr)
        .init();
}

fn init_thread_pool(threads: usize) -> Result<()> {
    let num_threads = if threads == 0 {
        num_cpus::get()
    } else {
        threads
    };

    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()
        .map_err(|e| anyhow::anyhow!("Failed to initialize thread pool: {}", e))?;

    Ok(())
}

fn run_mapping(config: MapperConfig) -> Result<()> {
    let catalog = GeneCatalogParser::new(config.skip_malformed).parse(&config.genes)?;
    let index = GeneIndex::build(catalog)?;
    info!(
        "Indexed {} genes across {} chromosomes",
        index.num_genes(),
        index.num_chromosomes()
    );

    // resolve the trait before mapping so a bad lookup aborts the run
    // without producing output
    let phenotypes = PhenotypeTable::load(&config.phenotypes)?;
    let key = trait_key(&config.gwas);
    let trait_name = phenotypes.trait_for(&key)?.to_string();
    info!("Resolved trait '{}' for dataset key '{}'", trait_name, key);

    let variants = GwasParser::new(config.skip_malformed).parse(&config.gwas)?;
    info!("Loaded {} significant variants", variants.len());

    let mapper = VariantGeneMapper::new(config.window);
    let (mappings, stats) = mapper.map_all(&index, &variants);

    if stats.skipped() > 0 {
        warn!(
            "Skipped {} of {} variants ({:.1}%): {} with no gene in window, {} on chromosomes absent from the catalog",
            stats.skipped(),
            stats.total_variants,
            stats.skip_rate() * 100.0,
            stats.no_gene_in_window,
            stats.chromosome_not_indexed
        );
    }

    let writer = MappingWriter::new();
    match &config.output {
        Some(path) => {
            let file = File::create(path)?;
            writer.write(BufWriter::new(file), &mappings, &trait_name)?;
        }
        None => {
            let stdout = io::stdout();
            writer.write(stdout.lock(), &mappings, &trait_name)?;
        }
    }

    info!(
        "Wrote {} mapped genes for trait '{}'",
        mappings.len(),
        trait_name
    );

    Ok(())
}

#[derive(Debug)]
struct MapperConfig {
    gwas: PathBuf,
    genes: PathBuf,
    phenotypes: PathBuf,
    window: u64,
    output: Option<PathBuf>,
    skip_malformed: bool,
}

impl MapperConfig {
    fn from_cli(cli: &Cli) -> Result<Self> {
        let Some(gwas) = cli.gwas.clone() else {
            bail!("a GWAS association file is required");
        };
        let Some(genes) = cli.genes.clone() else {
            bail!("a gene catalog is required (--genes)");
        };
        let Some(phenotypes) = cli.phenotypes.clone() else {
            bail!("a phenotype lookup table is required (--phenotypes)");
        };

        Ok(Self {
            gwas,
            genes,
            phenotypes,
            window: cli.window,
            output: cli.output.clone(),
            skip_malformed: cli.skip_malformed,
        })
    }
}
