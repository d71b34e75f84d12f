mod ecs;

use {
    clap::{Parser, Subcommand},
    geomatch_cli::{
        batch::BatchRunner,
        dataset::load_dataset,
        errors::CliArgumentError,
        report::write_reports,
    },
    std::{
        fs::File,
        io::{BufWriter, Write},
        path::PathBuf,
    },
    tracing::info,
    tracing_forest::ForestLayer,
    tracing_log::LogTracer,
    tracing_subscriber::layer::SubscriberExt,
    tracing_subscriber::{EnvFilter, Registry},
};

/// geomatch matches features across two geographic datasets with Dempster-Shafer evidence.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[clap(arg_required_else_help = true)]
struct Cli {
    /// Log levels: error, warn, info, debug, trace
    ///
    /// Default is "info".
    #[arg(short = 'l', long)]
    log_level: Option<String>,

    /// Log formats: ecs, forest
    ///
    /// Default is "ecs".
    #[arg(short = 'f', long)]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

/// The subcommands supported by the geomatch CLI.
#[derive(Subcommand)]
enum Command {
    /// Evaluate every reference feature of a dataset
    Match {
        /// Sets the calibration config file
        #[arg(short, long, value_name = "FILE")]
        config: PathBuf,
        /// Sets the JSON dataset file
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,
        /// Sets the output file for the JSON lines report.
        ///
        /// Default is standard output.
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Load and validate a calibration config file
    Check {
        /// Sets the calibration config file
        #[arg(short, long, value_name = "FILE")]
        config: PathBuf,
    },
}

/// An [`EnvFilter`] pattern to limit matched log events to error events.
const ERROR_FILTER: &str = "error";
/// An [`EnvFilter`] pattern to limit matched log events to warning events.
const WARN_FILTER: &str = "warn";
/// An [`EnvFilter`] pattern to limit matched log events to informational events.
const INFO_FILTER: &str = "info";
/// An [`EnvFilter`] pattern to limit matched log events to debug events.
const DEBUG_FILTER: &str = "debug";
/// An [`EnvFilter`] pattern to limit matched log events to trace events.
const TRACE_FILTER: &str = "trace";

fn init_tracing(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    color_eyre::install()?;

    LogTracer::init()?;

    let log_level: &str = cli.log_level.as_ref().map_or("info", |ll| ll.as_str());
    let log_format: &str = cli.log_format.as_ref().map_or("ecs", |lf| lf.as_str());
    let (ecs_layer, forest_layer) = match log_format {
        "ecs" => (
            Some(ForestLayer::from(
                tracing_forest::Printer::new()
                    .formatter(crate::ecs::EcsFormatter)
                    .writer(std::io::stderr),
            )),
            None,
        ),
        "forest" => (
            None,
            Some(ForestLayer::from(
                tracing_forest::Printer::new().writer(std::io::stderr),
            )),
        ),
        _ => {
            return Err(CliArgumentError::InvalidLogFormat(log_format.to_string()).into());
        }
    };

    let subscriber = Registry::default()
        .with(ecs_layer)
        .with(forest_layer)
        .with(EnvFilter::new(
            match log_level.to_ascii_lowercase().as_str() {
                "error" => ERROR_FILTER,
                "warn" => WARN_FILTER,
                "info" => INFO_FILTER,
                "debug" => DEBUG_FILTER,
                "trace" => TRACE_FILTER,
                _ => log_level,
            },
        ));
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(&cli)?;

    match &cli.command.ok_or(CliArgumentError::MissingSubcommand)? {
        Command::Match {
            config,
            input,
            output,
        } => {
            let config_root = geomatch_config::toml::load_config(config)?;
            let runner = BatchRunner::new(config_root.matcher()?, &config_root.runtime);
            let tasks = load_dataset(input)?.tasks()?;
            info!(
                message = "dataset loaded",
                features = tasks.len(),
                sources = config_root.sources.len(),
            );

            let reports = runner.run(tasks).await;
            match output {
                Some(path) => write_reports(&mut BufWriter::new(File::create(path)?), &reports)?,
                None => write_reports(&mut std::io::stdout().lock(), &reports)?,
            }
        }
        Command::Check { config } => {
            let config_root = geomatch_config::toml::load_config(config)?;
            config_root.matcher()?;

            let decision = &config_root.decision;
            let mut stdout = std::io::stdout().lock();
            writeln!(
                stdout,
                "decision: threshold={} max_conflict={} tie_margin={} criterion={} rule={}",
                decision.threshold,
                decision.max_conflict,
                decision.tie_margin,
                decision.criterion,
                decision.rule,
            )?;
            for source in &config_root.sources {
                writeln!(
                    stdout,
                    "source {}: {}, weight {}, {} membership functions",
                    source.reference,
                    source.kind,
                    source.weight,
                    source.function_count(),
                )?;
            }
            info!(
                message = "config valid",
                sources = config_root.sources.len(),
            );
        }
    }

    Ok(())
}
