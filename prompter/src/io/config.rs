//! Prompter configuration stored under `.prompter/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::io::atomic::{WriteMode, write_atomic};

/// Prompter configuration (TOML).
///
/// Missing fields default to sensible values so a partial file is enough.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PrompterConfig {
    /// Directory where record files are written.
    pub output_dir: PathBuf,

    /// Upper bound on `--iterations` for a single run.
    pub max_iterations: u32,

    pub generator: GeneratorConfig,
}

/// Generation backend selection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum GeneratorConfig {
    Command(CommandConfig),
    #[serde(rename = "openai")]
    OpenAi(OpenAiSettings),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CommandConfig {
    /// Command to execute; the prompt pack is written to its stdin.
    pub command: Vec<String>,
    pub timeout_secs: u64,
    /// Truncate captured stdout/stderr beyond this many bytes.
    pub output_limit_bytes: usize,
}

/// OpenAI-compatible chat settings. The API key itself is never stored here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OpenAiSettings {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    /// Environment variable the CLI reads the API key from.
    pub api_key_env: String,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            command: vec!["codex".to_string(), "exec".to_string(), "-".to_string()],
            timeout_secs: 10 * 60,
            output_limit_bytes: 100_000,
        }
    }
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.1,
            max_tokens: 4096,
            timeout_secs: 120,
            api_key_env: "OPENAI_API_KEY".to_string(),
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self::Command(CommandConfig::default())
    }
}

impl Default for PrompterConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            max_iterations: 100,
            generator: GeneratorConfig::default(),
        }
    }
}

impl PrompterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(anyhow!("max_iterations must be > 0"));
        }
        match &self.generator {
            GeneratorConfig::Command(cmd) => {
                if cmd.command.is_empty() || cmd.command[0].trim().is_empty() {
                    return Err(anyhow!("generator.command must be a non-empty array"));
                }
                if cmd.timeout_secs == 0 {
                    return Err(anyhow!("generator.timeout_secs must be > 0"));
                }
                if cmd.output_limit_bytes == 0 {
                    return Err(anyhow!("generator.output_limit_bytes must be > 0"));
                }
            }
            GeneratorConfig::OpenAi(api) => {
                if api.base_url.trim().is_empty() {
                    return Err(anyhow!("generator.base_url must not be empty"));
                }
                if api.model.trim().is_empty() {
                    return Err(anyhow!("generator.model must not be empty"));
                }
                if !(0.0..=2.0).contains(&api.temperature) {
                    return Err(anyhow!("generator.temperature must be within 0.0..=2.0"));
                }
                if api.max_tokens == 0 {
                    return Err(anyhow!("generator.max_tokens must be > 0"));
                }
                if api.timeout_secs == 0 {
                    return Err(anyhow!("generator.timeout_secs must be > 0"));
                }
                if api.api_key_env.trim().is_empty() {
                    return Err(anyhow!("generator.api_key_env must not be empty"));
                }
            }
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `PrompterConfig::default()`.
pub fn load_config(path: &Path) -> Result<PrompterConfig> {
    if !path.exists() {
        let cfg = PrompterConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: PrompterConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &PrompterConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, buf.as_bytes(), WriteMode::Replace)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, PrompterConfig::default());
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("state/config.toml");
        let cfg = PrompterConfig {
            output_dir: PathBuf::from("records"),
            max_iterations: 7,
            generator: GeneratorConfig::OpenAi(OpenAiSettings::default()),
        };
        write_config(&path, &cfg).expect("write");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn write_replaces_existing_config() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "max_iterations = 3\n").expect("write");

        write_config(&path, &PrompterConfig::default()).expect("write");

        assert_eq!(load_config(&path).expect("load"), PrompterConfig::default());
        let names: Vec<_> = fs::read_dir(temp.path()).expect("read dir").collect();
        assert_eq!(names.len(), 1);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(
            &path,
            "max_iterations = 5\n[generator]\nbackend = \"openai\"\nmodel = \"gpt-4o\"\n",
        )
        .expect("write");

        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.max_iterations, 5);
        assert_eq!(cfg.output_dir, PathBuf::from("."));
        match cfg.generator {
            GeneratorConfig::OpenAi(api) => {
                assert_eq!(api.model, "gpt-4o");
                assert_eq!(api.api_key_env, "OPENAI_API_KEY");
            }
            other => panic!("unexpected backend {other:?}"),
        }
    }

    #[test]
    fn rejects_empty_command() {
        let cfg = PrompterConfig {
            generator: GeneratorConfig::Command(CommandConfig {
                command: Vec::new(),
                ..CommandConfig::default()
            }),
            ..PrompterConfig::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("generator.command"));
    }

    #[test]
    fn rejects_out_of_range_temperature() {
        let cfg = PrompterConfig {
            generator: GeneratorConfig::OpenAi(OpenAiSettings {
                temperature: 3.5,
                ..OpenAiSettings::default()
            }),
            ..PrompterConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
