use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

/// Shader written to a fresh playground file so the window shows movement
/// immediately. `time` is wall-clock milliseconds wrapped at ten seconds;
/// the 0.000628 factor makes one full pulse per wrap.
pub const STARTER_FRAGMENT: &str = r"// fraglab starter shader
// Inputs: `time` (milliseconds, wraps at 10s) and `resolution` (pixels).
void main() {
    vec2 uv = gl_FragCoord.xy / resolution;
    float pulse = abs(sin(time * 0.000628));
    gl_FragColor = vec4(uv * pulse, 1.0 - pulse, 1.0);
}
";

/// Writes the starter shader to `path` unless the file already exists.
pub fn materialise_starter(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    fs::write(path, STARTER_FRAGMENT)
        .with_context(|| format!("failed to write starter shader to {}", path.display()))?;
    info!(path = %path.display(), "created starter shader");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_starter_when_missing() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("playground.frag");
        materialise_starter(&path).expect("materialise");
        let text = fs::read_to_string(&path).expect("read back");
        assert!(text.contains("void main()"));
        assert!(text.contains("gl_FragColor"));
    }

    #[test]
    fn leaves_existing_shader_untouched() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("mine.frag");
        fs::write(&path, "void main() {}").expect("seed file");
        materialise_starter(&path).expect("materialise");
        assert_eq!(fs::read_to_string(&path).expect("read back"), "void main() {}");
    }

    #[test]
    fn creates_missing_parent_directories() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("shaders/deep/playground.frag");
        materialise_starter(&path).expect("materialise");
        assert!(path.exists());
    }
}
