use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context};
use beatmap_schema::{Beatmap, SkinConfiguration};
use clap::{Parser, Subcommand};
use osu_codec::DecodeOptions;
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::{filter::LevelFilter, EnvFilter, FmtSubscriber};

#[derive(Debug, Parser)]
#[command(name = "osu")]
#[command(about = "Legacy .osu beatmap codec", long_about = None)]
struct Cli {
    /// Debug logging on stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Decode a beatmap into JSON
    Decode {
        input: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Keep the timing of pre-v5 files as written
        #[arg(long)]
        no_offsets: bool,
    },
    /// Decode and write the beatmap back as legacy text
    Reencode {
        input: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        no_offsets: bool,
    },
    /// Check that decode → encode → decode is stable
    Verify {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },
}

#[derive(Serialize)]
struct DecodedJson<'a> {
    beatmap: &'a Beatmap,
    skin: &'a SkinConfiguration,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    match cli.command {
        Command::Decode {
            input,
            output,
            no_offsets,
        } => {
            let decoded = osu_codec::decode_file(&input, options(no_offsets))
                .with_context(|| format!("decode failed: {}", input.display()))?;

            let json = serde_json::to_string_pretty(&DecodedJson {
                beatmap: &decoded.beatmap,
                skin: &decoded.skin,
            })
            .context("failed to serialize beatmap")?;
            let out_path = output.unwrap_or_else(|| default_output_path(&input, "json"));
            fs::write(&out_path, json)
                .with_context(|| format!("failed to write: {}", out_path.display()))?;
            info!(output = %out_path.display(), "wrote beatmap json");
        }
        Command::Reencode {
            input,
            output,
            no_offsets,
        } => {
            let decoded = osu_codec::decode_file(&input, options(no_offsets))
                .with_context(|| format!("decode failed: {}", input.display()))?;
            let bytes = osu_codec::encode(&decoded.beatmap, &decoded.skin)
                .with_context(|| format!("encode failed: {}", input.display()))?;

            let out_path = output.unwrap_or_else(|| default_output_path(&input, "reencoded.osu"));
            fs::write(&out_path, bytes)
                .with_context(|| format!("failed to write: {}", out_path.display()))?;
            info!(output = %out_path.display(), "wrote beatmap");
        }
        Command::Verify { inputs } => {
            let mut failed = 0usize;
            for input in &inputs {
                match roundtrip_runner::check_file(input) {
                    Ok(report) => println!(
                        "ok {} (v{}, {} control point groups, {} hit objects)",
                        input.display(),
                        report.format_version,
                        report.control_point_groups,
                        report.hit_objects
                    ),
                    Err(e) => {
                        failed += 1;
                        error!(input = %input.display(), "round trip failed");
                        eprintln!("FAIL {}: {e:#}", input.display());
                    }
                }
            }
            if failed > 0 {
                bail!("{failed} of {} beatmaps are not round-trip stable", inputs.len());
            }
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) -> anyhow::Result<()> {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("failed to install logger")?;
    Ok(())
}

fn options(no_offsets: bool) -> DecodeOptions {
    DecodeOptions {
        apply_offsets: !no_offsets,
    }
}

fn default_output_path(input: &Path, extension: &str) -> PathBuf {
    let mut out = input.to_path_buf();
    out.set_extension(extension);
    out
}
