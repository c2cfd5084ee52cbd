use anyhow::Context;
use clap::Parser;
use gui_bridge::bridge::{gui_bind_address, GuiBridge};
use std::path::PathBuf;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use workflow::config::SessionConfig;
use workflow::runner::{RunReport, Runner};

mod generator;
mod gui_bridge;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Ultrasonic scan simulator and filter comparison driver")]
struct Args {
    /// Load a session config from YAML
    #[arg(long)]
    config: Option<PathBuf>,
    /// clean_wall, noisy_wall, very_noisy, moving_obstacle or realistic_room
    #[arg(long, default_value = "realistic_room")]
    scenario: String,
    /// none, light, standard, heavy, kalman or custom
    #[arg(long, default_value = "standard")]
    preset: String,
    /// Start with the filter chain disabled
    #[arg(long, default_value_t = false)]
    no_filter: bool,
    #[arg(long, default_value_t = workflow::config::SWEEP_READINGS * 5)]
    samples: usize,
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Replay a recorded `angle,distance` log instead of generating readings
    #[arg(long)]
    replay: Option<PathBuf>,
    /// Stream the live mock sensor and keep the HTTP bridge alive
    #[arg(long, default_value_t = false)]
    serve: bool,
}

fn print_report(label: &str, report: &RunReport) -> anyhow::Result<()> {
    println!(
        "{} ({}) -> readings {}, spikes {}, angles {}, avg reduction {}",
        label,
        report.preset,
        report.stats.readings_processed,
        report.stats.spikes_detected,
        report.angles_covered,
        report
            .average_noise_reduction
            .map(|value| format!("{value:.2}cm"))
            .unwrap_or_else(|| "n/a".into())
    );
    let json = serde_json::to_string_pretty(report).context("serializing run report")?;
    println!("{json}");
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut session_config = if let Some(path) = args.config {
        SessionConfig::load(path)?
    } else {
        SessionConfig::from_args(&args.scenario, &args.preset, args.samples, args.seed)
    };
    if args.no_filter {
        session_config.filter.enabled = false;
    }

    let runner = Runner::new(session_config);

    if args.serve {
        let bridge = GuiBridge::spawn(runner.clone(), gui_bind_address())?;
        runner.start_live()?;
        bridge.publish_status(&format!(
            "HTTP bridge on http://{} (Ctrl+C to stop)...",
            bridge.address()
        ));

        let runtime = TokioBuilder::new_current_thread()
            .enable_all()
            .build()
            .context("creating runtime for signal handling")?;
        runtime.block_on(async {
            signal::ctrl_c().await.context("awaiting Ctrl+C to exit")?;
            Ok::<(), anyhow::Error>(())
        })?;

        runner.stop();
        if !bridge.is_running() {
            log::warn!("bridge exited before shutdown");
        }
        return print_report("Live session", &runner.report());
    }

    if let Some(path) = args.replay {
        let report = runner
            .run_replay(&path)
            .with_context(|| format!("replaying {}", path.display()))?;
        return print_report("Replay", &report);
    }

    let report = runner.run_offline()?;
    print_report("Offline run", &report)
}
