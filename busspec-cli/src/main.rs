mod decode;
mod info;
mod validate;

use anyhow::{Context, Result, bail};
use busspec_ir::{BusSpec, SystemSpec};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "busspec", about = "Inspect, validate and decode bus communication specifications")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Display information about a system or bus document
    Info {
        /// Input file (.yml/.yaml)
        input: PathBuf,
    },

    /// Build a document and lint the result
    Validate {
        /// Input file (.yml/.yaml)
        input: PathBuf,

        /// Suppress individual issue output
        #[arg(short, long)]
        quiet: bool,

        /// Print summary count only
        #[arg(short, long)]
        summary: bool,
    },

    /// Decode candump-style frames (`ADDR#HEXDATA`)
    Decode {
        /// System or bus document (.yml/.yaml)
        input: PathBuf,

        /// Protocol to decode with; required when a system declares several
        #[arg(short, long)]
        protocol: Option<String>,

        /// Frame to decode, may be repeated
        #[arg(short, long = "frame")]
        frame: Vec<String>,

        /// File with one frame per line
        #[arg(long = "frames")]
        frames_file: Option<PathBuf>,

        /// Emit one JSON object per frame
        #[arg(long)]
        json: bool,
    },
}

/// A loaded document: either a full system or a single bus.
pub enum Document {
    System(SystemSpec),
    Bus(BusSpec),
}

/// System documents carry a top-level scalar `name`; in a bus document every
/// top-level value is a message mapping.
fn is_system_document(doc: &serde_yaml::Value) -> bool {
    doc.get("name").is_some_and(|name| !name.is_mapping())
}

pub fn load_document(input: &Path) -> Result<Document> {
    match input.extension().and_then(|e| e.to_str()) {
        Some("yml" | "yaml") => {}
        Some(ext) => bail!("Unknown file extension: .{ext}"),
        None => bail!("Cannot detect format: file has no extension"),
    }

    let text = std::fs::read_to_string(input)
        .with_context(|| format!("reading {}", input.display()))?;
    let doc: serde_yaml::Value = serde_yaml::from_str(&text)
        .with_context(|| format!("parsing YAML from {}", input.display()))?;

    if is_system_document(&doc) {
        let system = busspec_yaml::parse_system_with(&text, input.parent())
            .with_context(|| format!("building system from {}", input.display()))?;
        log::info!("Loaded system '{}' from {}", system.name(), input.display());
        Ok(Document::System(system))
    } else {
        let bus = busspec_yaml::bus_from_value(&doc, &input.display().to_string())
            .with_context(|| format!("building bus from {}", input.display()))?;
        log::info!("Loaded bus with {} messages from {}", bus.len(), input.display());
        Ok(Document::Bus(bus))
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match cli.command {
        Command::Info { input } => info::run_info(&input),

        Command::Validate {
            input,
            quiet,
            summary,
        } => validate::run_validate(&input, quiet, summary),

        Command::Decode {
            input,
            protocol,
            frame,
            frames_file,
            json,
        } => {
            let mut lines = frame;
            if let Some(path) = &frames_file {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                lines.extend(text.lines().map(str::to_string));
            }
            decode::run_decode(&input, protocol.as_deref(), &lines, json)
        }
    }
}
