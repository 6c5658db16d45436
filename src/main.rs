//! Vader CLI
//!
//! Compiles a manifest's shader headlessly, renders the requested frames and
//! reports warnings. Exits non-zero on any compile or render error.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use vader::Session;

const USAGE: &str = "usage: vader <manifest.toml> [--frames N] [--print-source] [--dump]";

#[derive(Debug, Default, PartialEq)]
struct Args {
    manifest: PathBuf,
    frames: Option<u32>,
    print_source: bool,
    dump: bool,
    help: bool,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Args> {
    let mut parsed = Args::default();
    let mut manifest = None;
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--frames" | "-n" => {
                let value = args.next().context("--frames needs a value")?;
                let frames = value
                    .parse()
                    .with_context(|| format!("Invalid frame count '{}'", value))?;
                parsed.frames = Some(frames);
            }
            "--print-source" => parsed.print_source = true,
            "--dump" => parsed.dump = true,
            "--help" | "-h" => parsed.help = true,
            flag if flag.starts_with('-') => bail!("Unknown option '{}'\n{}", flag, USAGE),
            path => {
                if manifest.replace(PathBuf::from(path)).is_some() {
                    bail!("Only one manifest may be given\n{}", USAGE);
                }
            }
        }
    }

    match manifest {
        Some(path) => parsed.manifest = path,
        None if parsed.help => {}
        None => bail!("Missing manifest path\n{}", USAGE),
    }
    Ok(parsed)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = parse_args(std::env::args().skip(1))?;
    if args.help {
        println!("{}", USAGE);
        return Ok(());
    }

    let mut session = Session::load(&args.manifest)
        .with_context(|| format!("Failed to start {:?}", args.manifest))?;

    for diagnostic in session.diagnostics() {
        eprintln!("warning: {}", diagnostic);
    }

    if args.print_source {
        println!("{}", session.processed_source());
    }

    let report = session.run(args.frames)?;
    log::info!(
        "{} frames, {} draw calls, {} uniform uploads, {} textures",
        report.frames,
        report.draw_calls,
        report.uploads,
        report.textures
    );

    if args.dump {
        print!("{}", session.dump());
    }

    Ok(())
}
