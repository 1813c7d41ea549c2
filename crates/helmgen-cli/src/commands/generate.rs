//! Generate command - run every generator directive in a chart

use std::path::{Path, PathBuf};

use console::style;
use helmgen_core::{Chart, GenerateConfig, generate};
use miette::{IntoDiagnostic, Result, WrapErr};

pub fn run(chart_path: &Path, home: Option<&Path>, debug: bool) -> Result<()> {
    let chart = Chart::open(chart_path)
        .into_diagnostic()
        .wrap_err_with(|| format!("Failed to open chart at {}", chart_path.display()))?;

    let home = match home {
        Some(home) => home.to_path_buf(),
        None => default_home(),
    };
    let default_repo =
        std::env::var("HELM_DEFAULT_REPO").unwrap_or_else(|_| "charts".to_string());
    let config = GenerateConfig::new(home, default_repo);

    if debug {
        eprintln!(
            "{} chart root: {}",
            style("DEBUG").dim(),
            chart.root().display()
        );
        eprintln!(
            "{} HELM_HOME={} HELM_DEFAULT_REPO={}",
            style("DEBUG").dim(),
            config.home.display(),
            config.default_repo
        );
    }

    let summary = generate::run(&chart, &config).into_diagnostic()?;

    println!(
        "{} {} generator directive(s)",
        style("ran").green(),
        summary.directives_run
    );

    Ok(())
}

fn default_home() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".helm"))
        .unwrap_or_else(|| PathBuf::from(".helm"))
}
