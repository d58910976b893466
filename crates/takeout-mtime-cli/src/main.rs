use std::path::PathBuf;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use takeout_mtime_core::{CancellationToken, FileStatus, ProcessControl, ProcessOptions};

#[derive(Parser)]
#[command(name = "takeout-mtime", version, about = "Restore capture timestamps on Google Photos Takeout folders from their JSON sidecars")]
struct Cli {
    /// Extracted Takeout folders (e.g. "Photos from 2021"), processed in order
    #[arg(required = true)]
    directories: Vec<PathBuf>,

    /// Do not rename sidecars whose "(N)" index sits after the media extension
    #[arg(long)]
    no_normalize: bool,

    /// Hide the progress bar
    #[arg(long)]
    no_progress: bool,

    /// Increase verbosity (-v=INFO, -vv=DEBUG, -vvv=TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);
    let t_total = std::time::Instant::now();

    let token = CancellationToken::new();
    let handler_token = token.clone();
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupted, stopping after the current file");
        handler_token.cancel();
    })?;

    let options = ProcessOptions {
        directories: cli.directories,
        no_normalize: cli.no_normalize,
    };
    let control = ProcessControl::new().with_cancel_token(token);
    info!("Processing {} directories", options.directories.len());

    let pb = if cli.no_progress {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(0)
    };
    pb.set_style(ProgressStyle::default_bar().template("[{bar:40}] {pos}/{len} {msg}")?);

    let bar = pb.clone();
    let result = takeout_mtime_core::process_with_control(&options, &control, &move |stage, current, total, message| {
        bar.set_length(total);
        bar.set_position(current + 1);
        bar.set_message(format!("{} {}", stage, message));
    });
    pb.finish_and_clear();
    let result = result?;

    for report in &result.directories {
        if let Some(err) = &report.error {
            eprintln!("{}: skipped ({})", report.directory.display(), err);
            continue;
        }
        for warning in &report.warnings {
            eprintln!("  warning: {}", warning);
        }
        for outcome in &report.outcomes {
            match &outcome.status {
                FileStatus::Skipped { reason } => eprintln!("  skipped {}: {}", outcome.filename, reason),
                FileStatus::Failed { reason } => eprintln!("  error {}: {}", outcome.filename, reason),
                FileStatus::Updated { .. } => {}
            }
        }
        if report.cancelled {
            eprintln!("Interrupted in {}", report.directory.display());
        }
        eprintln!(
            "Finished with {}: {} renamed, {} updated, {} skipped, {} errors",
            report.directory.display(),
            report.renamed,
            report.updated,
            report.skipped,
            report.failed
        );
    }

    if result.cancelled {
        eprintln!("Cancelled: remaining files and directories were left untouched");
    }
    eprintln!(
        "Done! {} updated, {} skipped, {} errors in {} directories ({:.2}s)",
        result.files_updated(),
        result.files_skipped(),
        result.files_failed(),
        result.directories.len(),
        t_total.elapsed().as_secs_f64()
    );

    Ok(())
}

fn setup_logging(verbosity: u8) {
    let level = match verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();
}
