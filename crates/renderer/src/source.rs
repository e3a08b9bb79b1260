use std::fs;
use std::path::PathBuf;
use std::time::SystemTime;

use anyhow::{Context, Result};

/// The editor collaborator as seen by the core.
///
/// The core never caches shader text: it asks for [`current`] at the moment
/// of recompilation and subscribes to edits by polling [`poll_changed`] at
/// its cooperative scheduling point.
///
/// [`current`]: FragmentSource::current
/// [`poll_changed`]: FragmentSource::poll_changed
pub trait FragmentSource {
    /// Reads the fragment source as it is right now.
    fn current(&mut self) -> Result<String>;

    /// Returns true when the source changed since the last `current` or
    /// `poll_changed` call.
    fn poll_changed(&mut self) -> Result<bool>;
}

/// File-backed fragment source: the user edits the file in their own
/// editor, the playground watches its metadata.
///
/// Change detection compares (mtime, length) so it stays cheap enough to
/// run every scheduling tick; content is only re-read when the stamp moves.
#[derive(Debug)]
pub struct WatchedFile {
    path: PathBuf,
    last_seen: Option<(SystemTime, u64)>,
}

impl WatchedFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            last_seen: None,
        }
    }

    fn stamp(&self) -> Result<(SystemTime, u64)> {
        let metadata = fs::metadata(&self.path)
            .with_context(|| format!("failed to stat shader at {}", self.path.display()))?;
        let modified = metadata
            .modified()
            .with_context(|| format!("no modification time for {}", self.path.display()))?;
        Ok((modified, metadata.len()))
    }
}

impl FragmentSource for WatchedFile {
    fn current(&mut self) -> Result<String> {
        self.last_seen = Some(self.stamp()?);
        fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read shader at {}", self.path.display()))
    }

    fn poll_changed(&mut self) -> Result<bool> {
        let stamp = self.stamp()?;
        let changed = self.last_seen.is_some_and(|seen| seen != stamp);
        self.last_seen = Some(stamp);
        Ok(changed)
    }
}

/// In-memory source that never changes; used by tests and headless runs.
#[derive(Debug, Clone)]
pub struct StaticSource {
    text: String,
}

impl StaticSource {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl FragmentSource for StaticSource {
    fn current(&mut self) -> Result<String> {
        Ok(self.text.clone())
    }

    fn poll_changed(&mut self) -> Result<bool> {
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn watched_file_reads_current_text() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, "void main() {{}}").expect("write shader");

        let mut source = WatchedFile::new(file.path());
        assert_eq!(source.current().expect("read"), "void main() {}");
    }

    #[test]
    fn watched_file_detects_growth() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, "void main() {{}}").expect("write shader");

        let mut source = WatchedFile::new(file.path());
        source.current().expect("initial read");
        assert!(!source.poll_changed().expect("poll"));

        // A length change is detected even when mtime granularity hides the
        // rewrite.
        write!(file, " // edited").expect("append");
        file.flush().expect("flush");
        assert!(source.poll_changed().expect("poll after edit"));
        assert!(!source.poll_changed().expect("steady state"));
    }

    #[test]
    fn watched_file_errors_on_missing_path() {
        let mut source = WatchedFile::new("/nonexistent/fraglab-shader.frag");
        assert!(source.current().is_err());
        assert!(source.poll_changed().is_err());
    }

    #[test]
    fn static_source_never_changes() {
        let mut source = StaticSource::new("void main() {}");
        assert!(!source.poll_changed().expect("poll"));
        assert_eq!(source.current().expect("read"), "void main() {}");
    }
}
