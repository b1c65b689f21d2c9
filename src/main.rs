#[cfg(not(feature = "cli"))]
compile_error!("The `ubiscan` binary requires the `cli` feature. Build with `--features cli`.");

use clap::Parser;
use std::fs::File;
use std::io::Write;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use ubifs::cli;
use ubifs::cli::app::{Cli, ColorMode, Commands};
use ubifs::UbifsError;

fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise only warnings, or debug events under --verbose
    let default_level = if cli.scan.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.color {
        ColorMode::Always => colored::control::set_override(true),
        ColorMode::Never => colored::control::set_override(false),
        ColorMode::Auto => {} // colored auto-detects tty
    }

    let writer_result: Result<Box<dyn Write>, UbifsError> = match &cli.output {
        Some(path) => File::create(path)
            .map(|f| Box::new(f) as Box<dyn Write>)
            .map_err(|e| UbifsError::Io(format!("Cannot create {}: {}", path, e))),
        None => Ok(Box::new(std::io::stdout()) as Box<dyn Write>),
    };

    let mut writer = match writer_result {
        Ok(w) => w,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Dump {
            image,
            offset,
            length,
            layout,
            json,
        }) => cli::dump::execute(
            &cli::dump::DumpOptions {
                file: image,
                offset,
                length,
                layout: layout.into(),
                json,
                mmap: cli.mmap,
            },
            &mut writer,
        ),

        Some(Commands::Completions { shell }) => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            clap_complete::generate(shell, &mut cmd, "ubiscan", &mut writer);
            Ok(())
        }

        None => {
            // First Ctrl-C stops the scan before its next position, a second one exits
            let interrupt = Arc::new(AtomicBool::new(false));
            let flag = interrupt.clone();
            if let Err(e) = ctrlc::set_handler(move || {
                if flag.swap(true, Ordering::SeqCst) {
                    process::exit(130);
                }
            }) {
                tracing::warn!(error = %e, "cannot install Ctrl-C handler");
            }

            let args = cli.scan;
            match args.image {
                Some(file) => cli::scan::execute(
                    &cli::scan::ScanOptions {
                        file,
                        layout: args.layout.into(),
                        length_policy: args.degenerate.into(),
                        start: args.start,
                        limit: args.limit,
                        filter_type: args.filter_type,
                        verbose: args.verbose,
                        json: args.json,
                        summary: !args.no_summary,
                        mmap: cli.mmap,
                        interrupt: Some(interrupt),
                    },
                    &mut writer,
                ),
                None => Err(UbifsError::Argument("missing image path".to_string())),
            }
        }
    };

    if let Err(e) = writer.flush() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
