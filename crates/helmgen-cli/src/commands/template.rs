//! Template command - render a template file with merged values

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use console::style;
use helmgen_engine::{Engine, EngineError, Values};
use miette::{IntoDiagnostic, Result, WrapErr};

pub fn run(
    template_path: &Path,
    data_files: &[PathBuf],
    out: Option<&Path>,
    debug: bool,
) -> Result<()> {
    // Merge value files in order; later files win on key conflicts.
    let mut values = Values::new();
    for data_file in data_files {
        let file_values = Values::from_file(data_file).map_err(|e| {
            into_report(e).wrap_err(format!(
                "Failed to load values from {}",
                data_file.display()
            ))
        })?;
        values.merge(&file_values);

        if debug {
            eprintln!(
                "{} merged values from {}",
                style("DEBUG").dim(),
                data_file.display()
            );
        }
    }

    let engine = Engine::new();
    let rendered = engine
        .render_file(template_path, &values)
        .map_err(into_report)?;

    match out {
        Some(path) => {
            // With an output path, nothing reaches stdout.
            fs::write(path, &rendered)
                .into_diagnostic()
                .wrap_err_with(|| format!("Failed to write {}", path.display()))?;

            if debug {
                eprintln!("{} wrote {}", style("DEBUG").dim(), path.display());
            }
        }
        None => {
            print!("{rendered}");
            std::io::stdout().flush().into_diagnostic()?;
        }
    }

    Ok(())
}

/// Keep template diagnostics (source spans, suggestions) intact when
/// converting to a report.
fn into_report(error: EngineError) -> miette::Report {
    match error {
        EngineError::Compile(e) => miette::Report::new(e),
        EngineError::Eval(e) => miette::Report::new(e),
        other => miette::miette!("{}", other),
    }
}
