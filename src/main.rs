use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use granary::clip::ClipCutter;
use granary::config::{Config, ErrorPolicy};
use granary::manifest::ManifestWriter;
use granary::{print_summary, BatchOrchestrator};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "granary")]
#[command(version, about = "Build a speech corpus from captioned long-form audio")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Slice a channel's audio into per-cue segments with segments.json records
    Slice {
        /// Channel directory name under the output root
        #[arg(short, long)]
        channel: Option<String>,

        /// Target sample rate for sliced clips
        #[arg(long)]
        sample_rate: Option<u32>,

        /// Compute segment metadata without writing wav clips
        #[arg(long)]
        no_audio: bool,
    },
    /// Cut clips from a JSONL manifest of offset/duration records
    Cut {
        /// Path to the JSONL manifest
        #[arg(short, long)]
        manifest: PathBuf,

        /// Directory for the cut clips
        #[arg(short, long)]
        out_dir: PathBuf,

        /// Failure policy: fail-fast or skip
        #[arg(long)]
        error_policy: Option<String>,
    },
    /// Compile filtered split manifests into per-basename transcript files
    Compile {
        /// Root containing the work/<mode>/<channel> trees
        #[arg(short, long)]
        work_root: PathBuf,

        /// Root to mirror mode/channel transcript files under
        #[arg(short, long)]
        out_root: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let mut config = Config::load().context("Failed to load configuration")?;

    match cli.command {
        Command::Slice {
            channel,
            sample_rate,
            no_audio,
        } => {
            if let Some(rate) = sample_rate {
                config.slice_sample_rate = rate;
            }
            if no_audio {
                config.slice_save_audio = false;
            }
            config.validate().context("Configuration validation failed")?;

            let channel = channel
                .or_else(|| config.channel.clone())
                .context("No channel given; pass --channel or set it in the config")?;

            info!("Channel:       {channel}");
            info!("Sample rate:   {}", config.slice_sample_rate);
            info!("Save audio:    {}", config.slice_save_audio);

            let stats = BatchOrchestrator::new(&config, &channel).run()?;
            print_summary(&stats);
        }
        Command::Cut {
            manifest,
            out_dir,
            error_policy,
        } => {
            let policy = match error_policy {
                Some(s) => s
                    .parse::<ErrorPolicy>()
                    .map_err(|e| anyhow::anyhow!(e))?,
                None => config.error_policy,
            };

            info!("Manifest:  {}", manifest.display());
            info!("Output:    {}", out_dir.display());
            info!("Policy:    {policy}");

            let stats = ClipCutter::new(policy).run(&manifest, &out_dir)?;
            if !stats.failed.is_empty() {
                eprintln!("{} entries failed extraction:", stats.failed.len());
                for name in &stats.failed {
                    eprintln!("  {name}");
                }
            }
            println!(
                "Cut {} clips ({} already present)",
                stats.cut, stats.skipped_existing
            );
        }
        Command::Compile { work_root, out_root } => {
            info!("Work root:  {}", work_root.display());
            info!("Out root:   {}", out_root.display());

            let written = ManifestWriter::new(&out_root).compile(&work_root)?;
            println!("Compiled {written} utterances");
        }
    }

    Ok(())
}
