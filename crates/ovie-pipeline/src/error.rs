use ovie_core::diagnostics::{emit, Diagnostic, DiagnosticDisplayOptions, DiagnosticSet};
use ovie_core::SourceError;

/// Diagnostics accumulated for a single compilation unit.
///
/// Append-only while the unit is in flight; rendered once when the unit
/// finishes. An error here halts this unit only — sibling units in the same
/// batch are unaffected.
#[derive(Debug, Clone)]
pub struct UnitDiagnostics {
    unit: String,
    items: DiagnosticSet,
}

impl UnitDiagnostics {
    pub fn new(unit: impl Into<String>) -> Self {
        Self {
            unit: unit.into(),
            items: DiagnosticSet::new(),
        }
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.items.extend(diagnostics);
    }

    pub fn has_errors(&self) -> bool {
        self.items.has_errors()
    }

    pub fn set(&self) -> &DiagnosticSet {
        &self.items
    }

    /// Render everything collected so far.
    pub fn emit(&self, options: &DiagnosticDisplayOptions) {
        emit(&self.items, Some(&self.unit), options);
    }

    /// Consume the accumulator into the unit-level source error.
    pub fn into_source_error(self) -> SourceError {
        SourceError::new(self.unit, self.items)
    }

    pub fn into_set(self) -> DiagnosticSet {
        self.items
    }
}
