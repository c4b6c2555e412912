//! Prompt pack rendering for generation backends.

use anyhow::{Context, Result};
use minijinja::{Environment, context};
use tracing::debug;

/// System prompt that turns a task description into an agent system prompt.
pub const PROMPT_GENERATOR_SYSTEM_PROMPT: &str = include_str!("prompts/prompt_generator.md");

const COMMAND_PACK_TEMPLATE: &str = include_str!("prompts/command_pack.md");

/// Template engine wrapper around minijinja.
pub struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        env.add_template("command_pack", COMMAND_PACK_TEMPLATE)
            .context("load command_pack template")?;
        Ok(Self { env })
    }

    /// Render the single-document prompt fed to command backends on stdin.
    pub fn render_command_pack(&self, system_prompt: &str, task: &str) -> Result<String> {
        let template = self.env.get_template("command_pack")?;
        let rendered = template
            .render(context! {
                system_prompt => system_prompt.trim(),
                task => task.trim(),
            })
            .context("render command_pack")?;
        debug!(bytes = rendered.len(), "rendered command prompt pack");
        Ok(rendered)
    }
}
