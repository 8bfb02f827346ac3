use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;

use re_inspect::{parse, render, Snapshot};

/// Print the inspection form of a regular expression.
#[derive(Parser, Debug)]
#[command(name = "re-inspect", version)]
struct Args {
    /// Pattern to parse and render
    pattern: Option<String>,

    /// Print the compact pattern form instead of the inspection form
    #[arg(long)]
    compact: bool,

    /// Render the root of a snapshot file instead of a pattern
    #[arg(long, value_name = "FILE", conflicts_with_all = ["pattern", "write_snapshot"])]
    snapshot: Option<PathBuf>,

    /// Also write a snapshot of the parsed pattern to FILE
    #[arg(long, value_name = "FILE")]
    write_snapshot: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).init();
}

// Usage: re-inspect <PATTERN> | re-inspect --snapshot <FILE>
fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Some(path) = &args.snapshot {
        let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        let snapshot = Snapshot::from_bytes(bytes)
            .with_context(|| format!("loading snapshot {}", path.display()))?;
        info!("loaded snapshot {} ({} bytes)", path.display(), snapshot.as_bytes().len());
        println!("{}", snapshot.render());
        return Ok(());
    }

    let Some(pattern) = &args.pattern else {
        bail!("expected a pattern or --snapshot <FILE>");
    };
    let re = parse(pattern).with_context(|| format!("parsing {pattern:?}"))?;
    info!("parsed {} nodes, depth {}", re.node_count(), re.depth());

    if let Some(path) = &args.write_snapshot {
        let snapshot = Snapshot::capture(&re);
        fs::write(path, snapshot.as_bytes())
            .with_context(|| format!("writing {}", path.display()))?;
        info!("wrote snapshot to {}", path.display());
    }

    if args.compact {
        println!("{}", re.to_pattern());
    } else {
        println!("{}", render(&re));
    }
    Ok(())
}
