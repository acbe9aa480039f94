use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueHint};
use tracing::{error, info};

use renum::{parse_spare_numbers, DelimitedFile, RenumConfig, Renumberer, TOPOLOGY_DELIMITER};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Reallocate signage numbers 1..=99 after a node network changed"
)]
struct Cli {
    /// Node file (`;`-delimited, header first)
    #[arg(short = 'k', long = "knoop", value_hint = ValueHint::FilePath)]
    knoop: PathBuf,

    /// Link file (`;`-delimited, header first)
    #[arg(short = 'l', long = "link", value_hint = ValueHint::FilePath)]
    link: PathBuf,

    /// Directory receiving the reports
    #[arg(short = 'o', long = "output", value_hint = ValueHint::DirPath)]
    output: Option<PathBuf>,

    /// Last code of the existing range
    #[arg(short = 'c', long = "cutoff")]
    cutoff: Option<String>,

    /// Shortest accepted link, km
    #[arg(long)]
    min_link_km: Option<f64>,

    /// Longest accepted link (exclusive), km
    #[arg(long)]
    max_link_km: Option<f64>,

    /// Comma-separated numbers withheld from normal allocation
    #[arg(short = 's', long = "spare")]
    spare: Option<String>,

    /// Multiplier on the derived reuse distance
    #[arg(long)]
    grace: Option<f64>,

    /// Fixed minimum reuse distance, km (replaces the derived one)
    #[arg(long)]
    min_reuse_km: Option<f64>,

    /// JSON configuration; flags override its values
    #[arg(long, value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,
}

impl Cli {
    fn into_config(self) -> renum::Result<(RenumConfig, PathBuf, PathBuf)> {
        let mut config = match &self.config {
            Some(path) => RenumConfig::from_json_file(path)?,
            None => RenumConfig::default(),
        };
        if let Some(dir) = self.output {
            config.output_dir = dir;
        }
        if let Some(cutoff) = self.cutoff {
            config.cutoff = cutoff;
        }
        if let Some(km) = self.min_link_km {
            config.min_link_km = km;
        }
        if let Some(km) = self.max_link_km {
            config.max_link_km = km;
        }
        if let Some(raw) = self.spare {
            config.spare_numbers = parse_spare_numbers(&raw)?;
        }
        if let Some(grace) = self.grace {
            config.grace_factor = grace;
        }
        if self.min_reuse_km.is_some() {
            config.min_reuse_km = self.min_reuse_km;
        }
        Ok((config, self.knoop, self.link))
    }
}

async fn run(cli: Cli) -> renum::Result<()> {
    let (config, knoop, link) = cli.into_config()?;
    info!(
        knoop = %knoop.display(),
        link = %link.display(),
        output = %config.output_dir.display(),
        cutoff = %config.cutoff,
        "workset"
    );

    let mut renumberer = Renumberer::new(config)?;
    let mut nodes = DelimitedFile::open(&knoop, TOPOLOGY_DELIMITER).await?;
    let mut links = DelimitedFile::open(&link, TOPOLOGY_DELIMITER).await?;
    renumberer.load(&mut nodes, &mut links).await?;

    let outcome = renumberer.run();
    outcome.write_reports(&outcome.config.output_dir)?;

    let summary = outcome.summary();
    info!(
        nodes = summary.nodes,
        links = summary.links,
        node_issues = summary.issues.nodes,
        link_issues = summary.issues.links,
        failed = outcome.allocation.failed.len(),
        "done"
    );
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
