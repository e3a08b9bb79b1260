use crate::types::StageKind;

/// Formats a stage compiler log the way the error panes display it.
pub fn format_stage_error(stage: StageKind, log: &str) -> String {
    format!("Error in {stage} shader.\n{log}")
}

/// Per-stage diagnostic slots for one surface's most recent compile attempt.
///
/// Both slots are overwritten on every recompilation, whether it succeeded
/// or not: a clean compile clears its slot, a failed one replaces it with
/// the formatted log. Vertex and fragment slots never touch each other.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CompileDiagnostics {
    vertex: String,
    fragment: String,
}

impl CompileDiagnostics {
    pub(crate) fn record(&mut self, stage: StageKind, log: Option<&str>) {
        let slot = self.slot_mut(stage);
        match log {
            Some(log) => *slot = format_stage_error(stage, log),
            None => slot.clear(),
        }
    }

    /// The display text for a stage: empty when the last compile was clean.
    pub fn message(&self, stage: StageKind) -> &str {
        match stage {
            StageKind::Vertex => &self.vertex,
            StageKind::Fragment => &self.fragment,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.vertex.is_empty() && self.fragment.is_empty()
    }

    fn slot_mut(&mut self, stage: StageKind) -> &mut String {
        match stage {
            StageKind::Vertex => &mut self.vertex,
            StageKind::Fragment => &mut self.fragment,
        }
    }
}

/// Where stage diagnostics are displayed.
///
/// The playground publishes to one sink with two independent slots, one per
/// stage; an empty message means "clear the slot". Link-stage failures do
/// not pass through here, they are logged only.
pub trait DiagnosticsSink {
    fn publish(&mut self, stage: StageKind, message: &str);
}

/// Sink that discards everything; useful for headless runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DiagnosticsSink for NullSink {
    fn publish(&mut self, _stage: StageKind, _message: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_with_stage_label_and_log() {
        let message = format_stage_error(StageKind::Fragment, "0:3: syntax error");
        assert_eq!(message, "Error in fragment shader.\n0:3: syntax error");
    }

    #[test]
    fn success_clears_previous_error() {
        let mut diagnostics = CompileDiagnostics::default();
        diagnostics.record(StageKind::Fragment, Some("bad token"));
        assert!(!diagnostics.message(StageKind::Fragment).is_empty());

        diagnostics.record(StageKind::Fragment, None);
        assert!(diagnostics.message(StageKind::Fragment).is_empty());
        assert!(diagnostics.is_clean());
    }

    #[test]
    fn stages_do_not_clobber_each_other() {
        let mut diagnostics = CompileDiagnostics::default();
        diagnostics.record(StageKind::Vertex, None);
        diagnostics.record(StageKind::Fragment, Some("unexpected `;`"));

        assert!(diagnostics.message(StageKind::Vertex).is_empty());
        assert!(diagnostics
            .message(StageKind::Fragment)
            .starts_with("Error in fragment shader.\n"));

        // A later vertex failure leaves the fragment slot alone.
        diagnostics.record(StageKind::Vertex, Some("bad attribute"));
        assert!(diagnostics
            .message(StageKind::Fragment)
            .contains("unexpected `;`"));
        assert!(diagnostics
            .message(StageKind::Vertex)
            .starts_with("Error in vertex shader.\n"));
    }

    #[test]
    fn every_attempt_overwrites_the_slot() {
        let mut diagnostics = CompileDiagnostics::default();
        diagnostics.record(StageKind::Fragment, Some("first failure"));
        diagnostics.record(StageKind::Fragment, Some("second failure"));
        let message = diagnostics.message(StageKind::Fragment);
        assert!(message.contains("second failure"));
        assert!(!message.contains("first failure"));
    }
}
