use std::{
    io::{self, Write},
    path::PathBuf,
};

use clap::{Parser, Subcommand};
use phytopulse_core::{
    DEFAULT_WINDOW_SIZE, LogSettings, ReplayEngine, ReplayOptions, TraceStore,
    fixtures::write_demo_dataset, init_tracing,
};

#[derive(Debug, Parser)]
#[command(name = "phytopulse-cli")]
#[command(about = "Headless tools for PhytoPulse trace replay and demo data")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Write a small labelled trace set to disk.
    DemoData {
        #[arg(long, default_value = "data")]
        output_dir: PathBuf,
    },
    /// Replay traces and print packets as JSON lines.
    Replay {
        #[arg(long, default_value = "data/wav_files")]
        trace_dir: PathBuf,

        #[arg(long, default_value = "data/json_labels")]
        label_dir: PathBuf,

        #[arg(long, default_value_t = 10)]
        count: usize,

        #[arg(long, default_value_t = DEFAULT_WINDOW_SIZE)]
        window_size: usize,

        #[arg(long)]
        seed: Option<u64>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _telemetry = init_tracing(&LogSettings::new(&cli.log_dir))?;

    match cli.command {
        Commands::DemoData { output_dir } => {
            let store = write_demo_dataset(&output_dir)?;
            tracing::info!(
                trace_dir = %store.trace_dir().display(),
                label_dir = %store.label_dir().display(),
                "demo data generated"
            );
        }
        Commands::Replay {
            trace_dir,
            label_dir,
            count,
            window_size,
            seed,
        } => {
            let mut engine = ReplayEngine::open(
                TraceStore::new(trace_dir, label_dir),
                ReplayOptions { window_size, seed },
            );

            let stdout = io::stdout();
            let mut out = stdout.lock();
            for _ in 0..count {
                let packet = engine.next_packet_or_simulated();
                serde_json::to_writer(&mut out, &packet)?;
                writeln!(out)?;
            }
            out.flush()?;
        }
    }

    Ok(())
}
