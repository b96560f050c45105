//! Diagnostic and error reporting utilities.

use crate::Result;
use ovie_core::InvariantViolation;

/// Set up enhanced error reporting with miette.
pub fn setup_error_reporting() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .map_err(|e| crate::CliError::Config(format!("Failed to setup error reporting: {}", e)))?;

    Ok(())
}

/// Print the invariant-violation bug-report dump. Always to stderr, always
/// the full template — there is no quiet mode for compiler defects.
pub fn render_violation(violation: &InvariantViolation) {
    eprintln!("{}", violation.bug_report());
}
