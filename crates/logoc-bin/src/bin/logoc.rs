use std::io::{Read, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::Level;

const HEADER: &str = "#--------------------------";

/// Compiles a LogoASM program into a LogoVM instruction listing.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Debug output level; repeat for more (-d info, -dd debug, -ddd trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    debug: u8,

    /// Write the listing here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Source file; read from stdin when omitted
    filename: Option<PathBuf>,
}

fn log_level(debug: u8) -> Level {
    match debug {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

fn read_source(filename: &Option<PathBuf>) -> anyhow::Result<String> {
    let mut source = String::new();
    match filename {
        Some(path) => {
            source = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
        }
        None => {
            std::io::stdin()
                .read_to_string(&mut source)
                .context("failed to read stdin")?;
        }
    }
    Ok(source)
}

fn write_listing(output: &Option<PathBuf>, listing: &logoc::Listing) -> anyhow::Result<()> {
    let text = format!("{}\n{}", HEADER, listing);
    match output {
        Some(path) => std::fs::write(path, text)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(text.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(log_level(args.debug))
        .init();

    let source = read_source(&args.filename)?;
    let listing = match logoc::compile(&source) {
        Ok(listing) => listing,
        Err(err) => {
            tracing::debug!("compilation failed ({:?})", err.kind());
            eprintln!("{}", err);
            std::process::exit(1);
        }
    };

    write_listing(&args.output, &listing)
}
