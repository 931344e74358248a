use std::io::Write;

use owo_colors::OwoColorize;
use paperloc_core::PaperResult;

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

/// Running totals for a `localize` run.
#[derive(Debug, Clone, Default)]
pub struct LocalizeSummary {
    pub written: usize,
    pub skipped: usize,
    pub failed: usize,
    pub diagnostics: usize,
    pub entities: usize,
    pub located: usize,
    pub locations: usize,
}

impl LocalizeSummary {
    pub fn record(&mut self, result: &PaperResult) {
        self.written += 1;
        self.entities += result.localized_entities.len();
        self.located += result.located_count();
        self.locations += result.location_count();
    }
}

/// Print the end-of-run summary.
pub fn print_summary(
    w: &mut dyn Write,
    summary: &LocalizeSummary,
    color: ColorMode,
) -> std::io::Result<()> {
    let papers = format!(
        "{} paper(s) written, {} skipped, {} failed",
        summary.written, summary.skipped, summary.failed
    );
    let entities = format!(
        "{} entities, {} with locations, {} locations total",
        summary.entities, summary.located, summary.locations
    );

    if color.enabled() {
        if summary.failed > 0 {
            writeln!(w, "{}", papers.red().bold())?;
        } else {
            writeln!(w, "{}", papers.green().bold())?;
        }
        writeln!(w, "{}", entities.dimmed())?;
        if summary.diagnostics > 0 {
            writeln!(
                w,
                "{}",
                format!("{} warning(s); see log above", summary.diagnostics).yellow()
            )?;
        }
    } else {
        writeln!(w, "{}", papers)?;
        writeln!(w, "{}", entities)?;
        if summary.diagnostics > 0 {
            writeln!(w, "{} warning(s); see log above", summary.diagnostics)?;
        }
    }
    Ok(())
}
