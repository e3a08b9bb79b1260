use std::path::PathBuf;

use anyhow::Result;
use renderer::{
    run_playground, DiagnosticsSink, PlaygroundConfig, StageKind, WatchedFile,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::defaults;

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

pub fn run(cli: Cli) -> Result<()> {
    let shader_path = cli
        .shader
        .unwrap_or_else(|| PathBuf::from("playground.frag"));
    defaults::materialise_starter(&shader_path)?;

    let defaults = PlaygroundConfig::default();
    let config = PlaygroundConfig {
        surface_size: cli.size.unwrap_or(defaults.surface_size),
        capture_size: cli.capture_size.unwrap_or(defaults.capture_size),
        gif_path: cli.gif.unwrap_or(defaults.gif_path),
        target_fps: cli.fps,
        capture: defaults.capture,
    };

    info!(
        shader = %shader_path.display(),
        gif = %config.gif_path.display(),
        "starting playground; press `g` in the preview window to export a GIF"
    );

    run_playground(
        config,
        Box::new(WatchedFile::new(shader_path)),
        Box::new(ConsoleSink::default()),
    )
}

/// Terminal stand-in for the error panes: prints stage compiler logs to
/// stderr, and notes recoveries so a cleared slot is visible on a
/// scrolling terminal too.
#[derive(Debug, Default)]
pub struct ConsoleSink {
    vertex_failed: bool,
    fragment_failed: bool,
}

impl ConsoleSink {
    fn slot_mut(&mut self, stage: StageKind) -> &mut bool {
        match stage {
            StageKind::Vertex => &mut self.vertex_failed,
            StageKind::Fragment => &mut self.fragment_failed,
        }
    }
}

impl DiagnosticsSink for ConsoleSink {
    fn publish(&mut self, stage: StageKind, message: &str) {
        let failed = self.slot_mut(stage);
        if message.is_empty() {
            if *failed {
                info!("{stage} shader compiles cleanly again");
            }
            *failed = false;
        } else {
            *failed = true;
            eprintln!("{message}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn console_sink_tracks_recovery_per_stage() {
        let mut sink = ConsoleSink::default();
        sink.publish(StageKind::Fragment, "Error in fragment shader.\nbad");
        assert!(sink.fragment_failed);
        assert!(!sink.vertex_failed);

        sink.publish(StageKind::Fragment, "");
        assert!(!sink.fragment_failed);
    }
}
