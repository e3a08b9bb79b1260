use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "fraglab",
    author,
    version,
    about = "Live GLSL fragment-shader playground with GIF capture"
)]
pub struct Cli {
    /// Fragment shader file to watch. Created with a starter shader when
    /// it does not exist yet.
    #[arg(value_name = "SHADER")]
    pub shader: Option<PathBuf>,

    /// Preview window size, e.g. `1280x720`.
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size)]
    pub size: Option<(u32, u32)>,

    /// Capture surface size used for exported GIF frames.
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size)]
    pub capture_size: Option<(u32, u32)>,

    /// Output path for exported GIFs.
    #[arg(long, value_name = "PATH")]
    pub gif: Option<PathBuf>,

    /// Optional FPS cap for the preview window (uncapped by default).
    #[arg(long, value_name = "FPS")]
    pub fps: Option<f32>,
}

pub fn parse() -> Cli {
    Cli::parse()
}

fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let (width, height) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got `{value}`"))?;
    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| format!("invalid width in `{value}`"))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| format!("invalid height in `{value}`"))?;
    if width == 0 || height == 0 {
        return Err(format!("size must be non-zero, got `{value}`"));
    }
    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_sizes() {
        assert_eq!(parse_size("1280x720").unwrap(), (1280, 720));
        assert_eq!(parse_size("200X200").unwrap(), (200, 200));
        assert_eq!(parse_size(" 64 x 64 ").unwrap(), (64, 64));
    }

    #[test]
    fn rejects_malformed_sizes() {
        assert!(parse_size("1280").is_err());
        assert!(parse_size("axb").is_err());
        assert!(parse_size("0x100").is_err());
    }

    #[test]
    fn cli_assembles() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
