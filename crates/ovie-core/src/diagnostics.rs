use crate::span::Location;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Context provided to diagnostic template renderers while producing output lines.
pub struct DiagnosticRenderContext<'a> {
    pub context: &'a str,
    pub verbose: bool,
}

/// Trait for converting a diagnostic into human-readable output according to a template.
pub trait DiagnosticTemplateRenderer: Send + Sync {
    fn render(
        &self,
        diagnostic: &Diagnostic,
        ctx: &DiagnosticRenderContext<'_>,
    ) -> Option<Vec<String>>;
}

/// Built-in templates supported by the emitter.
#[derive(Clone)]
pub enum DiagnosticTemplate {
    Pretty,
    Plain,
    Custom(Arc<dyn DiagnosticTemplateRenderer>),
}

impl DiagnosticTemplate {
    fn render(
        &self,
        diagnostic: &Diagnostic,
        ctx: &DiagnosticRenderContext<'_>,
    ) -> Option<Vec<String>> {
        match self {
            DiagnosticTemplate::Pretty => render_pretty(diagnostic, ctx),
            DiagnosticTemplate::Plain => render_plain(diagnostic, ctx),
            DiagnosticTemplate::Custom(renderer) => renderer.render(diagnostic, ctx),
        }
    }
}

/// Runtime configuration for emitting diagnostics.
#[derive(Clone)]
pub struct DiagnosticDisplayOptions {
    pub template: DiagnosticTemplate,
    pub verbose: bool,
}

impl DiagnosticDisplayOptions {
    pub fn with_template(template: DiagnosticTemplate, verbose: bool) -> Self {
        Self { template, verbose }
    }

    pub fn pretty(verbose: bool) -> Self {
        Self::with_template(DiagnosticTemplate::Pretty, verbose)
    }

    pub fn plain(verbose: bool) -> Self {
        Self::with_template(DiagnosticTemplate::Plain, verbose)
    }
}

impl Default for DiagnosticDisplayOptions {
    fn default() -> Self {
        DiagnosticDisplayOptions::pretty(false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
    Info,
    Hint,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
            Severity::Hint => "hint",
        }
    }
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single structured finding. Immutable once constructed; accumulate into a
/// [`DiagnosticSet`] rather than editing in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: String,
    pub severity: Severity,
    pub location: Option<Location>,
    pub message: String,
    pub explanation: Option<String>,
    pub suggested_fix: Option<String>,
}

impl Diagnostic {
    pub fn new(severity: Severity, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            severity,
            location: None,
            message: message.into(),
            explanation: None,
            suggested_fix: None,
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, code, message)
    }

    pub fn warning(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, code, message)
    }

    pub fn info(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, code, message)
    }

    pub fn hint(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Hint, code, message)
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }

    /// Attach a fix. Only fixes that were independently re-verified to produce
    /// valid output may be attached; a candidate that was not verified must be
    /// omitted rather than offered.
    pub fn with_suggested_fix(mut self, fix: impl Into<String>) -> Self {
        self.suggested_fix = Some(fix.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{}]: {}", self.severity, self.code, self.message)?;
        if let Some(location) = &self.location {
            write!(f, " at {}", location)?;
        }
        Ok(())
    }
}

/// Per-compilation accumulation of diagnostics. Append-only, insertion order
/// preserved, codes not required to be unique.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiagnosticSet {
    items: Vec<Diagnostic>,
}

impl DiagnosticSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.items.extend(diagnostics);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(Diagnostic::is_error)
    }

    pub fn error_count(&self) -> usize {
        self.items.iter().filter(|d| d.is_error()).count()
    }
}

impl IntoIterator for DiagnosticSet {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

/// Emit diagnostics using the provided template and options. The fallback
/// context labels findings that carry no location of their own.
pub fn emit(
    diagnostics: &DiagnosticSet,
    fallback_context: Option<&str>,
    options: &DiagnosticDisplayOptions,
) {
    if diagnostics.is_empty() {
        return;
    }

    let context = fallback_context.unwrap_or("pipeline");
    for diagnostic in diagnostics.iter() {
        let render_ctx = DiagnosticRenderContext {
            context,
            verbose: options.verbose,
        };
        if let Some(lines) = options.template.render(diagnostic, &render_ctx) {
            for line in lines {
                eprintln!("{}", line);
            }
        }
    }
}

fn render_pretty(diagnostic: &Diagnostic, ctx: &DiagnosticRenderContext<'_>) -> Option<Vec<String>> {
    if matches!(diagnostic.severity, Severity::Info | Severity::Hint) && !ctx.verbose {
        return None;
    }

    let prefix = match diagnostic.severity {
        Severity::Error => "❌",
        Severity::Warning => "⚠️ ",
        Severity::Info => "ℹ️ ",
        Severity::Hint => "💡",
    };

    let mut lines = vec![format!(
        "{} [{}] {} ({})",
        prefix, ctx.context, diagnostic.message, diagnostic.code
    )];

    if let Some(location) = &diagnostic.location {
        lines.push(format!("   at {}", location));
    }
    if let Some(explanation) = &diagnostic.explanation {
        lines.push(format!("   {}", explanation));
    }
    if let Some(fix) = &diagnostic.suggested_fix {
        lines.push(format!("   💡 {}", fix));
    }

    Some(lines)
}

fn render_plain(diagnostic: &Diagnostic, ctx: &DiagnosticRenderContext<'_>) -> Option<Vec<String>> {
    if matches!(diagnostic.severity, Severity::Info | Severity::Hint) && !ctx.verbose {
        return None;
    }

    let level = match diagnostic.severity {
        Severity::Error => "ERROR",
        Severity::Warning => "WARNING",
        Severity::Info => "INFO",
        Severity::Hint => "HINT",
    };

    let mut lines = vec![format!(
        "[{}] {}: {} ({})",
        ctx.context, level, diagnostic.message, diagnostic.code
    )];

    if let Some(location) = &diagnostic.location {
        lines.push(format!("   at {}", location));
    }
    if let Some(explanation) = &diagnostic.explanation {
        lines.push(format!("   {}", explanation));
    }
    if let Some(fix) = &diagnostic.suggested_fix {
        lines.push(format!("   suggestion: {}", fix));
    }

    Some(lines)
}
