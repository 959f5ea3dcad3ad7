use anyhow::{Result, bail};
use busspec_ir::{Severity, lint_bus, lint_system};
use std::path::Path;

use crate::{Document, load_document};

fn plural(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}

pub fn run_validate(input: &Path, quiet: bool, summary: bool) -> Result<()> {
    // Construction failures abort here; everything after is lint.
    let doc = load_document(input)?;
    let issues = match &doc {
        Document::System(system) => lint_system(system),
        Document::Bus(bus) => lint_bus(bus),
    };

    if issues.is_empty() {
        if !quiet {
            println!("{}: valid", input.display());
        }
        return Ok(());
    }

    let errors = issues
        .iter()
        .filter(|i| i.severity == Severity::Error)
        .count();
    let warnings = issues.len() - errors;

    if !quiet && !summary {
        for issue in &issues {
            eprintln!("{}: {issue}", input.display());
        }
    }

    if summary || !quiet {
        println!(
            "{}: {errors} error{}, {warnings} warning{}",
            input.display(),
            plural(errors),
            plural(warnings)
        );
    }

    if errors > 0 {
        bail!("{errors} validation error{} in {}", plural(errors), input.display());
    }
    Ok(())
}
