//! Generator discovery and execution over a chart

use std::path::Path;

use tracing::debug;

use crate::chart::Chart;
use crate::env::{ExecutionContext, GenerateConfig};
use crate::error::{CoreError, Result};
use crate::exec;
use crate::header;
use crate::resolve;

/// Summary of a fully successful generation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Number of directives executed.
    pub directives_run: usize,
}

/// Walk a chart and execute every generator directive it carries.
///
/// Files are visited in lexicographic path order and directives run
/// strictly in sequence: a generator may rely on filesystem state left by
/// earlier generators in the same run. The run stops at the first failing
/// directive (non-zero exit, resolution failure or launch failure) and
/// the error names the directive that failed. Side effects of completed
/// directives are left in place; re-run idempotence is each generator's
/// own responsibility.
pub fn run(chart: &Chart, config: &GenerateConfig) -> Result<RunSummary> {
    let mut directives_run = 0;

    for file in chart.walk_files()? {
        let Some(directive) = header::scan_file(&file)? else {
            continue;
        };

        debug!(
            file = %file.display(),
            command = %directive.command,
            "found generator directive"
        );

        // Fresh context per directive: HELM_GENERATE_FILE and
        // HELM_GENERATE_DIR are never reused across files.
        let ctx = ExecutionContext::build(chart.root(), &file, config);
        let command = ctx.expand(&directive.command);
        let args: Vec<String> = directive.args.iter().map(|a| ctx.expand(a)).collect();

        let program = match resolve::resolve_command(&command, &ctx) {
            Ok(program) => program,
            Err(source) => return Err(directive_failed(&file, &command, &args, source)),
        };

        let result = match exec::execute(&program, &args, &ctx) {
            Ok(result) => result,
            Err(source) => return Err(directive_failed(&file, &command, &args, source)),
        };

        directives_run += 1;

        if !result.success() {
            let source = CoreError::NonZeroExit {
                command: command.clone(),
                code: result.code(),
                stderr: result.stderr,
            };
            return Err(directive_failed(&file, &command, &args, source));
        }
    }

    Ok(RunSummary { directives_run })
}

fn directive_failed(file: &Path, command: &str, args: &[String], source: CoreError) -> CoreError {
    CoreError::DirectiveFailed {
        file: file.to_path_buf(),
        command: command.to_string(),
        args: args.join(" "),
        source: Box::new(source),
    }
}
