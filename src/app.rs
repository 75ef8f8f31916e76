//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - sets up logging and parses the command line
//! - loads and validates the configuration
//! - loads inputs (FRED or a local CSV), aligns them and computes NIV
//! - prints the run summary and plot, then writes exports and charts

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::app::pipeline::{Loaded, Pipeline};
use crate::config::Config;
use crate::data::{EnvCredentials, FredClient};
use crate::error::AppError;
use crate::io::{OutputPaths, run_stamp};
use crate::plot::render_ascii_series;
use crate::report::format_run_summary;

pub mod pipeline;

/// Entry point for the `niv` binary.
pub fn run() -> Result<(), AppError> {
    init_tracing();
    let cli = crate::cli::Cli::parse();

    let config = Config::load(cli.config.as_deref())?;
    let p = &config.params;
    info!(
        formula = config.formula.display_name(),
        alpha1 = p.alpha1,
        alpha2 = p.alpha2,
        alpha3 = p.alpha3,
        lambda = p.lambda,
        eta = p.eta,
        "loaded configuration"
    );

    let pipeline = Pipeline::new(config);
    let loaded = load_inputs(&pipeline)?;
    let run = pipeline.process(loaded)?;

    let out = &pipeline.config().output;
    let paths = OutputPaths::new(&out.dir, run_stamp());
    let exported = pipeline.export(&run, &paths)?;

    println!("{}", format_run_summary(&exported.summary));
    if out.ascii_plot {
        println!(
            "{}",
            render_ascii_series(run.output.niv.indicator(), out.ascii_width, out.ascii_height)
        );
    }
    println!("Wrote {}", exported.niv_csv.display());

    if out.plots {
        pipeline.visualize(&run.output, &paths)?;
    }

    Ok(())
}

fn load_inputs(pipeline: &Pipeline) -> Result<Loaded, AppError> {
    match &pipeline.config().source.input_csv {
        Some(path) => pipeline.load_csv(path),
        None => {
            let client = FredClient::from_config(pipeline.config(), &EnvCredentials)?;
            Ok(pipeline.fetch(&client))
        }
    }
}

/// `RUST_LOG` wins; otherwise log at `info`.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
