//! Generator abstraction for text generation backends.
//!
//! The [`Generator`] trait decouples the iteration controller from the actual
//! backend (a spawned command such as `codex exec`, or an OpenAI-compatible
//! HTTP API). Tests use scripted generators that return predetermined results
//! without spawning processes or touching the network.

use std::process::Command;
use std::time::Duration;

use anyhow::{Result, anyhow};
use tracing::{debug, info, instrument, warn};

use crate::io::config::CommandConfig;
use crate::io::process::run_command_with_timeout;
use crate::io::prompt::{PROMPT_GENERATOR_SYSTEM_PROMPT, PromptEngine};

/// Abstraction over text generation backends.
///
/// Any `Err` is treated as a failed iteration; callers do not inspect the kind.
pub trait Generator {
    fn generate(&self, task: &str) -> Result<String>;
}

impl<G: Generator + ?Sized> Generator for &G {
    fn generate(&self, task: &str) -> Result<String> {
        (**self).generate(task)
    }
}

impl<G: Generator + ?Sized> Generator for Box<G> {
    fn generate(&self, task: &str) -> Result<String> {
        (**self).generate(task)
    }
}

/// Generator that spawns a command and reads the result from its stdout.
pub struct CommandGenerator {
    config: CommandConfig,
    system_prompt: String,
    engine: PromptEngine,
}

impl CommandGenerator {
    pub fn new(config: CommandConfig) -> Result<Self> {
        Self::with_system_prompt(config, PROMPT_GENERATOR_SYSTEM_PROMPT)
    }

    pub fn with_system_prompt(config: CommandConfig, system_prompt: impl Into<String>) -> Result<Self> {
        if config.command.is_empty() || config.command[0].trim().is_empty() {
            return Err(anyhow!("generator command must be a non-empty array"));
        }
        Ok(Self {
            config,
            system_prompt: system_prompt.into(),
            engine: PromptEngine::new()?,
        })
    }
}

impl Generator for CommandGenerator {
    #[instrument(skip_all, fields(program = %self.config.command[0], timeout_secs = self.config.timeout_secs))]
    fn generate(&self, task: &str) -> Result<String> {
        let pack = self.engine.render_command_pack(&self.system_prompt, task)?;

        let mut cmd = Command::new(&self.config.command[0]);
        cmd.args(&self.config.command[1..]);
        info!("starting generator command");

        let timeout = Duration::from_secs(self.config.timeout_secs);
        let output = run_command_with_timeout(
            cmd,
            Some(pack.into_bytes()),
            timeout,
            self.config.output_limit_bytes,
        )?;

        if output.timed_out {
            warn!("generator command timed out");
            return Err(anyhow!("generator command timed out after {:?}", timeout));
        }
        if !output.status.success() {
            warn!(exit_code = ?output.status.code(), "generator command failed");
            return Err(match output.stderr_tail() {
                Some(tail) => anyhow!(
                    "generator command failed with status {:?}: {}",
                    output.status.code(),
                    tail
                ),
                None => anyhow!(
                    "generator command failed with status {:?}",
                    output.status.code()
                ),
            });
        }

        if output.stdout_truncated > 0 {
            warn!(
                output_limit_bytes = self.config.output_limit_bytes,
                dropped = output.stdout_truncated,
                "generator output exceeded limit"
            );
            return Err(anyhow!(
                "generator output exceeded {} bytes",
                self.config.output_limit_bytes
            ));
        }

        let text = output.stdout_text().trim().to_string();
        if text.is_empty() {
            return Err(anyhow!("generator command produced no output"));
        }
        debug!(bytes = text.len(), "generator command completed");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_command() {
        let config = CommandConfig {
            command: vec![" ".to_string()],
            ..CommandConfig::default()
        };
        assert!(CommandGenerator::new(config).is_err());
    }

    #[test]
    fn reference_forwards_to_generator() {
        struct Echo;
        impl Generator for Echo {
            fn generate(&self, task: &str) -> Result<String> {
                Ok(task.to_uppercase())
            }
        }
        let boxed: Box<dyn Generator> = Box::new(Echo);
        assert_eq!((&boxed).generate("hi").expect("generate"), "HI");
    }

    #[cfg(unix)]
    mod unix {
        use super::*;

        fn sh(script: &str) -> CommandConfig {
            CommandConfig {
                command: vec!["sh".to_string(), "-c".to_string(), script.to_string()],
                timeout_secs: 5,
                output_limit_bytes: 10_000,
            }
        }

        #[test]
        fn returns_trimmed_stdout() {
            let generator = CommandGenerator::new(sh("cat > /dev/null; echo '  OK  '")).expect("new");
            assert_eq!(generator.generate("Plan a trip").expect("generate"), "OK");
        }

        #[test]
        fn feeds_prompt_pack_on_stdin() {
            let generator =
                CommandGenerator::with_system_prompt(sh("cat"), "SYSTEM").expect("new");
            let text = generator.generate("Plan a trip").expect("generate");
            assert!(text.starts_with("SYSTEM"));
            assert!(text.ends_with("Plan a trip"));
        }

        #[test]
        fn nonzero_exit_is_an_error() {
            let generator =
                CommandGenerator::new(sh("cat > /dev/null; echo boom >&2; exit 1")).expect("new");
            let err = generator.generate("task").unwrap_err();
            assert!(err.to_string().contains("boom"));
        }

        #[test]
        fn empty_output_is_an_error() {
            let generator = CommandGenerator::new(sh("cat > /dev/null")).expect("new");
            let err = generator.generate("task").unwrap_err();
            assert!(err.to_string().contains("no output"));
        }

        #[test]
        fn oversized_output_is_an_error() {
            let config = CommandConfig {
                output_limit_bytes: 4,
                ..sh("cat > /dev/null; printf 0123456789")
            };
            let generator = CommandGenerator::new(config).expect("new");
            let err = generator.generate("task").unwrap_err();
            assert!(err.to_string().contains("exceeded 4 bytes"));
        }

        #[test]
        fn output_at_limit_is_kept() {
            let config = CommandConfig {
                output_limit_bytes: 4,
                ..sh("cat > /dev/null; printf 0123")
            };
            let generator = CommandGenerator::new(config).expect("new");
            assert_eq!(generator.generate("task").expect("generate"), "0123");
        }

        #[test]
        fn missing_program_is_an_error() {
            let config = CommandConfig {
                command: vec!["prompter-test-no-such-binary".to_string()],
                ..CommandConfig::default()
            };
            let generator = CommandGenerator::new(config).expect("new");
            assert!(generator.generate("task").is_err());
        }
    }
}
