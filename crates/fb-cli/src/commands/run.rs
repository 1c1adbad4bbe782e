use std::path::{Path, PathBuf};

use colored::Colorize;
use fb_engine::{Command, HeadlessRunner, RunnerConfig};
use serde::Deserialize;
use tracing::info;

/// A headless scenario file.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Scenario {
    /// Act files, relative to the scenario file.
    acts: Vec<PathBuf>,
    #[serde(default)]
    config: RunnerConfig,
    /// Call `start` before the first command.
    #[serde(default = "autostart")]
    autostart: bool,
    commands: Vec<Command>,
}

fn autostart() -> bool {
    true
}

pub fn run(path: &Path, show_events: bool, as_json: bool) -> Result<(), String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    let scenario: Scenario = serde_json::from_str(&text)
        .map_err(|e| format!("invalid scenario {}: {e}", path.display()))?;

    let base = path.parent().unwrap_or_else(|| Path::new("."));
    let acts: Vec<PathBuf> = scenario.acts.iter().map(|act| base.join(act)).collect();
    let mut runner = super::load_runner(&acts, scenario.config)?;
    if scenario.autostart {
        runner.start().map_err(|e| e.to_string())?;
    }

    info!(commands = scenario.commands.len(), "running scenario");
    let mut headless = HeadlessRunner::new(runner);
    let report = headless.run(&scenario.commands);

    if as_json {
        let json = serde_json::to_string_pretty(&report).map_err(|e| e.to_string())?;
        println!("{json}");
    } else {
        for failure in &report.failures {
            println!(
                "  {} #{} {}: {}",
                "FAIL".red().bold(),
                failure.index + 1,
                failure.command,
                failure.message
            );
        }
        if show_events {
            let json = serde_json::to_string_pretty(&report.events).map_err(|e| e.to_string())?;
            println!("{json}");
        }
        if report.passed {
            println!(
                "  {} {} commands, {} events",
                "PASS".green().bold(),
                report.commands,
                report.events.len()
            );
        }
    }

    if report.passed {
        Ok(())
    } else {
        Err(format!(
            "{} of {} commands failed",
            report.failures.len(),
            report.commands
        ))
    }
}
