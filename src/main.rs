//! depguard - npm dependency update agent CLI
//!
//! Checks the package.json of one GitHub repository against the npm
//! registry and opens a pull request with the upgrades, either once
//! (`--once`) or on a fixed interval until interrupted.

use anyhow::Context;
use clap::Parser;
use depguard::cli::CliArgs;
use depguard::config::AgentConfig;
use depguard::domain::CycleOutcome;
use depguard::output::{create_formatter, OutputConfig, OutputFormat, OutputFormatter, Verbosity};
use depguard::progress::Progress;
use depguard::session::{Agent, RunOnceResponse};
use std::io::{self, Write};
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(args.log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    // Run the main logic and handle errors
    match run(args).await {
        Ok(exit_code) => exit_code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Main application logic
async fn run(args: CliArgs) -> anyhow::Result<ExitCode> {
    let mut config = match &args.config {
        Some(path) => AgentConfig::from_file(path)?,
        None => AgentConfig::from_env()?,
    };
    args.apply_to(&mut config);
    config.validate()?;

    if args.verbose {
        eprintln!("depguard v{}", env!("CARGO_PKG_VERSION"));
        eprintln!("Repository: {}", config.github.repo_url);
        eprintln!("Workflow: {}", config.agent.workflow);
    }

    let agent = Agent::new(config.cycle_settings());
    agent
        .configure(
            &config.github.repo_url,
            &config.github.token,
            config.check_interval(),
        )
        .context("invalid agent configuration")?;

    let output_config = OutputConfig::from_cli(args.json, args.verbose, args.quiet);
    let show_progress =
        output_config.format == OutputFormat::Text && output_config.verbosity != Verbosity::Quiet;
    let formatter = create_formatter(output_config);

    if args.once {
        let response = run_cycle(&agent, formatter.as_ref(), show_progress).await?;
        return Ok(exit_code_for(&response));
    }

    watch(&agent, formatter.as_ref(), show_progress).await
}

/// Run one cycle and print its result
async fn run_cycle(
    agent: &Agent,
    formatter: &dyn OutputFormatter,
    show_progress: bool,
) -> anyhow::Result<RunOnceResponse> {
    let mut progress = Progress::new(show_progress);
    progress.spinner("Checking dependencies...");
    let result = agent.run_once().await;
    progress.finish_and_clear();
    let response = result?;

    let mut stdout = io::stdout().lock();
    formatter.format(&response, &mut stdout)?;
    stdout.flush()?;
    Ok(response)
}

/// Run a cycle every interval until Ctrl-C
async fn watch(
    agent: &Agent,
    formatter: &dyn OutputFormatter,
    show_progress: bool,
) -> anyhow::Result<ExitCode> {
    let interval = Duration::from_secs(agent.check_interval());
    tracing::info!(seconds = interval.as_secs(), "watching repository");

    loop {
        tokio::select! {
            result = run_cycle(agent, formatter, show_progress) => {
                // a failed cycle is reported and retried on the next tick
                if let Err(e) = result {
                    tracing::error!(error = %e, "cycle could not run");
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    tracing::info!("interrupted, stopping");
    let mut stdout = io::stdout().lock();
    formatter.format_status(&agent.status(), &mut stdout)?;
    stdout.flush()?;
    Ok(ExitCode::SUCCESS)
}

/// 0 for success, 2 when the repository has no manifest, 1 otherwise
fn exit_code_for(response: &RunOnceResponse) -> ExitCode {
    match &response.report.outcome {
        CycleOutcome::Upgraded { .. } | CycleOutcome::UpToDate => ExitCode::SUCCESS,
        CycleOutcome::NotApplicable { .. } => ExitCode::from(2),
        CycleOutcome::Failed(_) => ExitCode::FAILURE,
    }
}
