//! helmgen CLI - chart code generation and template rendering

use clap::{Parser, Subcommand};
use miette::Result;
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "helmgen")]
#[command(author = "Helmgen Contributors")]
#[command(version)]
#[command(about = "Run chart generators and render templates", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every generator directive in a chart
    Generate {
        /// Chart path
        #[arg(default_value = ".")]
        chart: PathBuf,

        /// Home directory, exported to generators as HELM_HOME
        #[arg(long, env = "HELM_HOME")]
        home: Option<PathBuf>,
    },

    /// Render a template with merged values
    Template {
        /// Template source file
        template: PathBuf,

        /// Value file(s) to merge; later files win on conflicts
        #[arg(short = 'd', long = "data")]
        data: Vec<PathBuf>,

        /// Output file (if not set, outputs to stdout)
        #[arg(short = 'o', long = "out")]
        out: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate { chart, home } => {
            commands::generate::run(&chart, home.as_deref(), cli.debug)
        }

        Commands::Template { template, data, out } => {
            commands::template::run(&template, &data, out.as_deref(), cli.debug)
        }
    }
}
