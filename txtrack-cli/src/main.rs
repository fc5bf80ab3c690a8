use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

mod commands;
mod config;
mod error;

use config::Config;
use error::{print_error_and_exit, CliError};

#[derive(Parser)]
#[command(name = "txtrack")]
#[command(about = "txtrack - Gene/transcript annotation track engine")]
#[command(version)]
#[command(long_about = "
txtrack lays out gene/transcript annotations in non-overlapping rows, resolves
label collisions and translates coding sequence into amino-acid codons tile by
tile, for genome browsers that draw annotations on a tiled axis.

Examples:
  txtrack layout --transcripts genes.tsv.gz --chromsizes hg38.chrom.sizes --region 'chr17:43M-43.2M'
  txtrack translate --transcripts genes.tsv.gz --reference hg38.fa.gz --region 'chr17:43044295-43125483'
  txtrack translate --transcripts genes.tsv --reference ref.fa --format tsv --out codons.tsv
  txtrack config --example > txtrack.toml
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Number of threads to use
    #[arg(short, long, global = true)]
    pub threads: Option<usize>,

    /// Verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Pack transcripts into rows and resolve label overlaps (JSON output)
    #[cfg(feature = "layout")]
    Layout {
        /// Transcript record file (tab separated, optionally gzipped)
        #[arg(long, required = true)]
        transcripts: PathBuf,

        /// Chromosome sizes file (name, length)
        #[arg(long)]
        chromsizes: Option<PathBuf>,

        /// Reference FASTA, used for chromosome sizes when --chromsizes is absent
        #[arg(long)]
        reference: Option<PathBuf>,

        /// Region to lay out (e.g., 'chr1:1M-2M'); the whole genome when absent
        #[arg(long)]
        region: Option<String>,

        /// Zoom level; the deepest level whose tiles cover the region by default
        #[arg(long)]
        zoom: Option<u32>,

        /// Track width in pixels
        #[arg(long, default_value = "1200")]
        width: f64,

        /// Output file (stdout when absent)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Translate coding transcripts into codons over a region
    #[cfg(feature = "translate")]
    Translate {
        /// Transcript record file (tab separated, optionally gzipped)
        #[arg(long, required = true)]
        transcripts: PathBuf,

        /// Reference FASTA (optionally gzipped)
        #[arg(long, required = true)]
        reference: PathBuf,

        /// Chromosome sizes file; taken from the reference when absent
        #[arg(long)]
        chromsizes: Option<PathBuf>,

        /// Region to translate (e.g., 'chr1:1M-2M'); the whole genome when absent
        #[arg(long)]
        region: Option<String>,

        /// Zoom level; codons exist only at the deepest level (the default)
        #[arg(long)]
        zoom: Option<u32>,

        /// Output format
        #[arg(long, default_value = "json")]
        format: OutputFormat,

        /// Output file (stdout when absent)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Show or generate configuration
    Config {
        /// Print an example txtrack.toml with every default
        #[arg(long)]
        example: bool,

        /// Write the example configuration to this file instead of stdout
        #[arg(long, requires = "example")]
        write: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Tsv,
}

fn setup_logging(verbose: u8, quiet: bool) -> Result<()> {
    if quiet {
        std::env::set_var("RUST_LOG", "error");
    } else {
        let level = match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        };
        std::env::set_var("RUST_LOG", level);
    }

    env_logger::Builder::from_default_env()
        .format_timestamp_secs()
        .init();

    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;

    if let Some(threads) = cli.threads {
        config.general.threads = threads;
    }
    log::debug!("Using {} threads", config.general.threads);

    match cli.command {
        #[cfg(feature = "layout")]
        Commands::Layout {
            transcripts,
            chromsizes,
            reference,
            region,
            zoom,
            width,
            out,
        } => {
            commands::layout::execute(
                &config,
                transcripts,
                chromsizes,
                reference,
                region,
                zoom,
                width,
                out,
            )?;
        }

        #[cfg(feature = "translate")]
        Commands::Translate {
            transcripts,
            reference,
            chromsizes,
            region,
            zoom,
            format,
            out,
        } => {
            commands::translate::execute(
                &config,
                transcripts,
                reference,
                chromsizes,
                region,
                zoom,
                format,
                out,
            )?;
        }

        Commands::Config { example, write } => {
            if !example {
                print!("{}", toml::to_string_pretty(&config)?);
            } else if let Some(path) = write {
                Config::default().save_to_file(&path)?;
                log::info!("Example configuration written to {}", path.display());
            } else {
                print!("{}", Config::example_toml()?);
            }
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet)?;

    if let Err(err) = run(cli) {
        if let Some(cli_err) = err.downcast_ref::<CliError>() {
            print_error_and_exit(cli_err);
        }
        return Err(err);
    }

    Ok(())
}
