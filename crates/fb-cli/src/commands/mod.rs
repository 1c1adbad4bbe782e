pub mod check;
pub mod play;
pub mod run;

use std::path::{Path, PathBuf};

use fb_engine::{GameRunner, RunnerConfig};

/// Read a story file.
fn read_story(path: &Path) -> Result<String, String> {
    std::fs::read_to_string(path).map_err(|e| format!("cannot read {}: {e}", path.display()))
}

/// Read act files and build a runner over them.
fn load_runner(acts: &[PathBuf], config: RunnerConfig) -> Result<GameRunner, String> {
    let texts = acts
        .iter()
        .map(PathBuf::as_path)
        .map(read_story)
        .collect::<Result<Vec<_>, _>>()?;
    GameRunner::with_config(texts, config).map_err(|e| e.to_string())
}
