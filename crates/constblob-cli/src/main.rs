use std::{io::Write, path::PathBuf, process::ExitCode};

use clap::{ArgAction, Parser};
use constblob::{CacheStats, ConstObject, ConstantsRuntime, FileBlob, HostVersion, RuntimeConfig, global};
use serde::Serialize;
use tracing::Level;

/// Inspect the constants blob of a compiled program.
///
/// - `constblob app.constants --list` lists the segment names
/// - `constblob app.constants` decodes every segment and prints the constants
/// - `constblob app.constants --segment mymod --json` decodes one segment as JSON
///
/// A blob that fails its checksum or contains corrupt data aborts the process,
/// exactly as a compiled program loading it would.
#[derive(Parser)]
#[command(version)]
struct Cli {
    /// Blob file to read.
    file: PathBuf,

    /// Segment to decode; may be repeated. Defaults to every segment.
    #[arg(short, long = "segment", value_name = "NAME")]
    segments: Vec<String>,

    /// Only list segment names.
    #[arg(short, long)]
    list: bool,

    /// Print decoded constants as JSON.
    #[arg(long)]
    json: bool,

    /// Print dedup cache statistics after decoding.
    #[arg(long)]
    stats: bool,

    /// Host version the blob was compiled for.
    #[arg(long = "python", value_name = "X.Y", default_value_t = HostVersion::default())]
    python: HostVersion,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Serialize)]
struct DecodedSegment {
    name: String,
    constants: Vec<ConstObject>,
}

#[derive(Serialize)]
struct Report {
    segments: Vec<DecodedSegment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stats: Option<Vec<CacheStats>>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = RuntimeConfig::new(cli.python);
    let mut runtime = ConstantsRuntime::new(FileBlob::new(&cli.file), config);
    let names = global::or_abort(runtime.segment_names());

    if cli.list {
        let mut out = std::io::stdout().lock();
        for name in &names {
            if writeln!(out, "{name}").is_err() {
                return ExitCode::FAILURE;
            }
        }
        return ExitCode::SUCCESS;
    }

    let selected = if cli.segments.is_empty() { names } else { cli.segments };
    let mut segments = Vec::with_capacity(selected.len());
    for name in selected {
        let values = global::or_abort(runtime.load_segment(&name));
        let constants = values.into_iter().map(|v| runtime.to_object(v)).collect();
        segments.push(DecodedSegment { name, constants });
    }
    let report = Report {
        segments,
        stats: cli.stats.then(|| runtime.cache_stats()),
    };

    let written = if cli.json {
        print_json(&report)
    } else {
        print_text(&report)
    };
    match written {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn print_json(report: &Report) -> std::io::Result<()> {
    let mut out = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, report)?;
    writeln!(out)
}

fn print_text(report: &Report) -> std::io::Result<()> {
    let mut out = std::io::stdout().lock();
    for segment in &report.segments {
        writeln!(out, "{} ({} constants)", segment.name, segment.constants.len())?;
        for (index, constant) in segment.constants.iter().enumerate() {
            writeln!(out, "  [{index}] {constant}")?;
        }
    }
    if let Some(stats) = &report.stats {
        writeln!(out, "cache       entries      hits")?;
        for s in stats {
            writeln!(out, "{:<10} {:>8} {:>9}", s.kind.to_string(), s.entries, s.hits)?;
        }
    }
    Ok(())
}
