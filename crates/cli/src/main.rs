use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use ibd_dendrogram_core as dendro;
use dendro::data::{
    read_networks, read_pairwise, write_json, write_network_files, NetworkRow, NetworkSchema,
    PairwiseRow, PairwiseSchema, SharingMetric, DEFAULT_GENOME_LENGTH_CM,
};
use dendro::distance::DistanceMatrix;
use dendro::pipeline::{build_partitioner, build_store};
use dendro::{
    build_dendrograms, DendrogramConfig, DendrogramRequest, DistanceTransform, DuplicatePolicy,
    Linkage, MissingDistance, RunOutput,
};

#[derive(Parser)]
#[command(name = "ibd-dendrogram")]
#[command(version)]
#[command(about = "Build dendrograms of individuals from IBD sharing within detected networks")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Cluster every network and report its dendrogram
    Build {
        #[command(flatten)]
        input: InputArgs,

        /// Output format: "text" (default), "json" or "newick"
        #[arg(long, default_value = "text")]
        format: String,

        /// Directory for per-network linkage, leaf order and Newick files
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Cluster networks one at a time
        #[arg(long)]
        serial: bool,
    },

    /// Write the distance matrix of one network as TSV
    Matrix {
        #[command(flatten)]
        input: InputArgs,

        /// Network ID
        #[arg(long)]
        network: String,

        /// Output path (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args)]
struct InputArgs {
    /// Pairwise sharing table (columns: pair_1, pair_2, length)
    #[arg(short, long)]
    pairs: PathBuf,

    /// Network membership table (columns: individual, network)
    #[arg(short, long)]
    networks: PathBuf,

    /// Field delimiter of both tables
    #[arg(long, default_value = "\t")]
    delimiter: char,

    /// What the pairwise value column holds: "cm" (default) or "fraction"
    #[arg(long, default_value = "cm")]
    metric: String,

    /// Genome length in cM used to turn lengths into fractions
    #[arg(long, default_value_t = DEFAULT_GENOME_LENGTH_CM)]
    genome_length: f64,

    /// Minimum detectable segment length in cM; missing pairs are given
    /// half of it
    #[arg(long)]
    min_cm: Option<f64>,

    /// Linkage: "single", "complete", "average" or "ward"
    #[arg(long)]
    linkage: Option<String>,

    /// Distance transform: "linear", "neglog" or "reciprocal"
    #[arg(long)]
    transform: Option<String>,

    /// Duplicate pair policy: "reject", "last" or "max"
    #[arg(long)]
    duplicates: Option<String>,

    /// JSON configuration file; command-line options override it
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            input,
            format,
            out_dir,
            serial,
        } => cmd_build(&input, &format, out_dir.as_deref(), serial),
        Commands::Matrix {
            input,
            network,
            output,
        } => cmd_matrix(&input, &network, output.as_deref()),
    }
}

fn delimiter_byte(input: &InputArgs) -> Result<u8> {
    u8::try_from(input.delimiter)
        .ok()
        .filter(|b| b.is_ascii())
        .with_context(|| format!("Delimiter '{}' must be a single ASCII character", input.delimiter))
}

fn sharing_metric(input: &InputArgs) -> Result<SharingMetric> {
    match input.metric.to_lowercase().as_str() {
        "cm" | "length" => Ok(SharingMetric::LengthCm {
            genome_length_cm: input.genome_length,
        }),
        "fraction" => Ok(SharingMetric::Fraction),
        other => anyhow::bail!(
            "Unknown metric '{}'. Use 'cm' (default) or 'fraction'.",
            other
        ),
    }
}

fn load_config(input: &InputArgs) -> Result<DendrogramConfig> {
    let mut config = match &input.config {
        Some(path) => DendrogramConfig::from_json_file(path)
            .with_context(|| format!("Failed to load configuration from '{}'", path.display()))?,
        None => DendrogramConfig::default(),
    };

    if let Some(name) = &input.linkage {
        let linkage: Linkage = name.parse().context("Invalid --linkage")?;
        config = config.linkage(linkage);
    }
    if let Some(name) = &input.transform {
        let transform: DistanceTransform = name.parse().context("Invalid --transform")?;
        config = config.transform(transform);
    }
    if let Some(name) = &input.duplicates {
        let policy: DuplicatePolicy = name.parse().context("Invalid --duplicates")?;
        config = config.duplicate_policy(policy);
    }
    if let Some(min_cm) = input.min_cm {
        if min_cm <= 0.0 || min_cm > input.genome_length {
            anyhow::bail!(
                "--min-cm must lie in (0, {}], got {}",
                input.genome_length,
                min_cm
            );
        }
        config = config.missing(MissingDistance::HalfThreshold {
            threshold: min_cm / input.genome_length,
        });
    }

    config.validate().context("Invalid configuration")?;
    log::debug!("configuration: {:?}", config);
    Ok(config)
}

fn load_tables(input: &InputArgs) -> Result<(Vec<PairwiseRow>, Vec<NetworkRow>)> {
    let delimiter = delimiter_byte(input)?;

    let pair_schema = PairwiseSchema {
        delimiter,
        metric: sharing_metric(input)?,
        ..PairwiseSchema::default()
    };
    let pairwise = read_pairwise(&input.pairs, &pair_schema)
        .with_context(|| format!("Failed to load pairs from '{}'", input.pairs.display()))?;
    eprintln!(
        "Loaded {} pairs from '{}'",
        pairwise.len(),
        input.pairs.display()
    );

    let network_schema = NetworkSchema {
        delimiter,
        ..NetworkSchema::default()
    };
    let networks = read_networks(&input.networks, &network_schema).with_context(|| {
        format!(
            "Failed to load networks from '{}'",
            input.networks.display()
        )
    })?;
    eprintln!(
        "Loaded {} network assignments from '{}'",
        networks.len(),
        input.networks.display()
    );

    Ok((pairwise, networks))
}

fn cmd_build(
    input: &InputArgs,
    output_format: &str,
    out_dir: Option<&Path>,
    serial: bool,
) -> Result<()> {
    let mut config = load_config(input)?;
    if serial {
        config = config.parallel(false);
    }
    let (pairwise, networks) = load_tables(input)?;

    eprintln!(
        "Clustering with linkage={}, transform={}",
        config.linkage, config.transform
    );
    let request = DendrogramRequest::new(pairwise, networks).config(config);
    let output = build_dendrograms(&request).context("Failed to build dendrograms")?;

    report_problems(&output);

    if let Some(dir) = out_dir {
        let written = write_network_files(dir, &output.set)
            .with_context(|| format!("Failed to write results to '{}'", dir.display()))?;
        eprintln!("Wrote {} files to '{}'", written.len(), dir.display());
    }

    match output_format.to_lowercase().as_str() {
        "json" => write_json(&output, std::io::stdout().lock())
            .context("Failed to write JSON output")?,
        "newick" => {
            for (network_id, result) in output.set.iter() {
                println!("{}\t{}", network_id, result.layout.to_newick());
            }
        }
        "text" => println!("{}", output.summary()),
        other => anyhow::bail!(
            "Unknown format '{}'. Use 'text' (default), 'json' or 'newick'.",
            other
        ),
    }

    Ok(())
}

fn report_problems(output: &RunOutput) {
    if !output.anomalies.is_empty() {
        eprintln!(
            "Warning: {} edge(s) excluded from clustering:",
            output.anomalies.len()
        );
        for anomaly in &output.anomalies {
            eprintln!("  {}", anomaly);
        }
    }
    for failure in &output.failures {
        eprintln!(
            "Warning: network '{}' ({} members) was not clustered: {}",
            failure.network_id,
            failure.members.len(),
            failure.reason
        );
    }
}

fn cmd_matrix(input: &InputArgs, network: &str, output: Option<&Path>) -> Result<()> {
    let config = load_config(input)?;
    let (pairwise, networks) = load_tables(input)?;

    let store = build_store(&pairwise, config.duplicate_policy)
        .context("Failed to load pairwise sharing")?;
    let partitioner = build_partitioner(&networks).context("Invalid network assignments")?;
    let subset = partitioner
        .subset_for(network, &store)
        .with_context(|| format!("Network '{}' not found in '{}'", network, input.networks.display()))?;

    let matrix = DistanceMatrix::from_store(
        network,
        &subset.members,
        &subset.store,
        &config.transform,
        &config.missing,
    )
    .with_context(|| format!("Failed to build distance matrix for network '{}'", network))?;

    eprintln!(
        "Network '{}': {} individuals, {} of {} pairs missing",
        network,
        matrix.len(),
        matrix.n_missing(),
        matrix.condensed().len()
    );

    match output {
        Some(path) => matrix
            .write_tsv_file(path)
            .with_context(|| format!("Failed to write matrix to '{}'", path.display()))?,
        None => matrix
            .write_tsv(std::io::stdout().lock())
            .context("Failed to write matrix")?,
    }

    Ok(())
}
