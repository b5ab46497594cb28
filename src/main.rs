//! Command-line stress estimation for a single image.

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use std::path::Path;
use std::process::ExitCode;
use stress_estimation::cli::{failure_report, Args, EXIT_SUCCESS};
use stress_estimation::config::{Config, EXAMPLE_CONFIG};
use stress_estimation::{Error, StressAssessment, StressPipeline};

fn main() -> ExitCode {
    let args = Args::parse();

    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    if args.print_config {
        print!("{EXAMPLE_CONFIG}");
        return ExitCode::from(EXIT_SUCCESS);
    }

    match run(&args) {
        Ok(assessment) => match render(&assessment, args.pretty) {
            Ok(json) => {
                println!("{json}");
                ExitCode::from(EXIT_SUCCESS)
            }
            Err(e) => report_failure(&e),
        },
        Err(e) => report_failure(&e),
    }
}

fn run(args: &Args) -> Result<StressAssessment> {
    let image = args.image.as_deref().context("No image file given")?;

    let mut config = load_config(args.config.as_deref());
    args.apply_overrides(&mut config);
    config.validate()?;

    let pipeline = StressPipeline::from_config(&config).context("Failed to load models")?;
    info!("Models loaded, face selection: {}", pipeline.selection());

    let bytes = std::fs::read(image)
        .map_err(Error::from)
        .with_context(|| format!("Failed to read {}", image.display()))?;

    let assessment = pipeline.assess_stress(&bytes)?;
    info!(
        "{}: {} ({}), emotion {}",
        image.display(),
        assessment.stress_label,
        assessment.stress_value,
        assessment.emotion
    );

    Ok(assessment)
}

fn load_config(path: Option<&Path>) -> Config {
    let Some(path) = path else {
        return Config::default();
    };

    info!("Loading configuration from: {}", path.display());
    match Config::from_file(path) {
        Ok(config) => config,
        Err(e) => {
            warn!("Failed to load config file: {e}. Using defaults.");
            Config::default()
        }
    }
}

fn render(assessment: &StressAssessment, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(assessment)?
    } else {
        serde_json::to_string(assessment)?
    };
    Ok(json)
}

/// Print the error body on stdout and map the fault to an exit status
fn report_failure(error: &anyhow::Error) -> ExitCode {
    let (message, code) = failure_report(error);

    log::error!("{error:#}");
    println!("{}", serde_json::json!({ "error": message }));
    ExitCode::from(code)
}
