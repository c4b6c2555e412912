//! Prompt generation runner.
//!
//! Feeds one task to the configured generator several times, records every
//! attempt, and writes the batch to `{agent_name}_prompts_{timestamp}_{run_id}.json`.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use prompter::controller::{Controller, InvalidRunError};
use prompter::core::record::Record;
use prompter::core::types::GenerationOutcome;
use prompter::exit_codes;
use prompter::io::config::{GeneratorConfig, PrompterConfig, load_config, write_config};
use prompter::io::generator::{CommandGenerator, Generator};
use prompter::io::openai::{OpenAiConfig, OpenAiGenerator};
use prompter::io::store::{JsonFileStore, load_records};
use prompter::logging;

const DEFAULT_CONFIG_PATH: &str = ".prompter/config.toml";

#[derive(Parser)]
#[command(
    name = "prompter",
    version,
    about = "Run a task through a prompt generator and record every attempt"
)]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a default config file.
    Init {
        /// Overwrite an existing file.
        #[arg(short, long)]
        force: bool,
    },
    /// Generate `iterations` prompts for a task and save them as JSON.
    Run {
        /// Description of what the user wants to accomplish.
        #[arg(long)]
        task: String,
        /// Logical agent name; also the output file prefix.
        #[arg(long)]
        agent_name: String,
        #[arg(short = 'n', long, default_value_t = 1)]
        iterations: u32,
        /// Override `output_dir` from the config file.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Validate and print a saved record file.
    Show { file: PathBuf },
}

/// Configuration could not be loaded or turned into a generator.
#[derive(Debug)]
struct ConfigError(anyhow::Error);

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#}", self.0)
    }
}

impl std::error::Error for ConfigError {}

fn main() {
    logging::init();
    let code = match run() {
        Ok(()) => exit_codes::OK,
        Err(err) => {
            eprintln!("{:#}", err);
            exit_code_for(&err)
        }
    };
    std::process::exit(code);
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    if err.is::<InvalidRunError>() || err.is::<ConfigError>() {
        exit_codes::INVALID
    } else {
        exit_codes::FAILED
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Init { force } => cmd_init(&cli.config, force),
        Command::Run {
            task,
            agent_name,
            iterations,
            output_dir,
        } => cmd_run(&cli.config, &task, &agent_name, iterations, output_dir),
        Command::Show { file } => cmd_show(&file),
    }
}

fn cmd_init(config_path: &Path, force: bool) -> Result<()> {
    if !force && config_path.exists() {
        info!(path = %config_path.display(), "config already exists");
        return Ok(());
    }
    write_config(config_path, &PrompterConfig::default())
        .with_context(|| format!("write {}", config_path.display()))?;
    println!("{}", config_path.display());
    Ok(())
}

fn cmd_run(
    config_path: &Path,
    task: &str,
    agent_name: &str,
    iterations: u32,
    output_dir: Option<PathBuf>,
) -> Result<()> {
    let cfg = load_config(config_path).map_err(ConfigError)?;
    let generator = build_generator(&cfg.generator).map_err(ConfigError)?;
    let store = JsonFileStore::new(output_dir.unwrap_or(cfg.output_dir));

    let mut controller = Controller::new(generator, store).with_max_iterations(cfg.max_iterations);
    let outcome = controller.run_task_with(task, agent_name, iterations, |event| {
        match &event.outcome {
            GenerationOutcome::Completed => info!(
                iter = event.iter,
                of = event.iterations,
                record_id = event.record.id(),
                "prompt generated"
            ),
            GenerationOutcome::Failed { reason } => warn!(
                iter = event.iter,
                of = event.iterations,
                record_id = event.record.id(),
                reason = %reason,
                "prompt generation failed"
            ),
        }
    })?;

    for record in &outcome.records {
        print_record(record);
    }
    info!(
        completed = outcome.completed(),
        total = outcome.records.len(),
        "run finished"
    );
    println!("saved: {}", outcome.path.display());
    Ok(())
}

fn cmd_show(file: &Path) -> Result<()> {
    let records = load_records(file)?;
    for record in &records {
        print_record(record);
    }
    Ok(())
}

/// Build the configured backend. Credentials are resolved here and passed in explicitly.
fn build_generator(config: &GeneratorConfig) -> Result<Box<dyn Generator>> {
    match config {
        GeneratorConfig::Command(cmd) => Ok(Box::new(CommandGenerator::new(cmd.clone())?)),
        GeneratorConfig::OpenAi(settings) => {
            let api_key = std::env::var(&settings.api_key_env)
                .with_context(|| format!("{} is not set", settings.api_key_env))?;
            let generator = OpenAiGenerator::new(OpenAiConfig {
                api_key,
                settings: settings.clone(),
            })?;
            Ok(Box::new(generator))
        }
    }
}

fn print_record(record: &Record) {
    println!("record: {} ({})", record.id(), record.agent_name());
    println!("Prompt: {}", record.prompt());
    println!("Output: {}\n", record.output().unwrap_or("<none>"));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_run_defaults_to_one_iteration() {
        let cli = Cli::parse_from([
            "prompter",
            "run",
            "--task",
            "Plan a trip",
            "--agent-name",
            "Trip-Agent",
        ]);
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_PATH));
        match cli.command {
            Command::Run {
                task,
                agent_name,
                iterations,
                output_dir,
            } => {
                assert_eq!(task, "Plan a trip");
                assert_eq!(agent_name, "Trip-Agent");
                assert_eq!(iterations, 1);
                assert!(output_dir.is_none());
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn parse_rejects_negative_iterations() {
        let result = Cli::try_parse_from([
            "prompter",
            "run",
            "--task",
            "t",
            "--agent-name",
            "a",
            "--iterations",
            "-1",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn parse_init_force() {
        let cli = Cli::parse_from(["prompter", "init", "--force"]);
        assert!(matches!(cli.command, Command::Init { force: true }));
    }

    #[test]
    fn invalid_run_maps_to_invalid_exit_code() {
        let err = anyhow::Error::new(InvalidRunError {
            errors: vec!["task must not be empty".to_string()],
        });
        assert_eq!(exit_code_for(&err), exit_codes::INVALID);
        assert_eq!(exit_code_for(&anyhow::anyhow!("disk full")), exit_codes::FAILED);
    }

    #[test]
    fn missing_api_key_env_is_an_error() {
        let settings = prompter::io::config::OpenAiSettings {
            api_key_env: "PROMPTER_TEST_UNSET_KEY".to_string(),
            ..Default::default()
        };
        let err = build_generator(&GeneratorConfig::OpenAi(settings))
            .err()
            .expect("error");
        assert!(err.to_string().contains("PROMPTER_TEST_UNSET_KEY"));
    }
}
