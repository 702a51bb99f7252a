//! CLI argument parsing and execution

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use console::style;

use quack::config::{self, ProjectConfig, DEFAULT_CONFIG_FILE, DEFAULT_PROFILE};
use quack::engine::Engine;
use quack::recursion::RecursionStack;
use quack::suggestions;

/// Quack - declaratively vendor modules and run task profiles
#[derive(Parser, Debug)]
#[command(name = "quack")]
#[command(version, long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(
        short = 'y',
        long = "yaml",
        value_name = "PATH",
        env = "QUACK_CONFIG"
    )]
    yaml: Option<PathBuf>,

    /// Profile to run
    #[arg(short, long, value_name = "NAME")]
    profile: Option<String>,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, value_name = "LEVEL", default_value = "warn")]
    log_level: String,
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        env_logger::Builder::new()
            .parse_filters(&self.log_level)
            .init();

        let explicit_config = self.yaml.is_some();
        let config_path = self
            .yaml
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        let config = if config_path.exists() {
            config::from_file(&config_path)?
        } else if !explicit_config && console::user_attended() {
            // Interactive session with no config at all: offer to start one.
            scaffold(&config_path)?
        } else {
            return Err(suggestions::config_not_found(&config_path));
        };

        let profile = self
            .profile
            .unwrap_or_else(|| DEFAULT_PROFILE.to_string());
        if !config.profiles.contains_key(&profile) {
            return Err(suggestions::unknown_profile(
                &profile,
                config.profiles.keys().map(String::as_str),
            ));
        }

        let config_path = fs::canonicalize(&config_path).unwrap_or(config_path);
        let stats = Engine::new().run(&config, &config_path, &profile, &mut RecursionStack::new())?;

        println!(
            "{} {} task(s) completed with {} dependencies.",
            style("✔").green(),
            stats.tasks,
            stats.dependencies
        );
        if stats.shell_failures > 0 {
            println!(
                "{} {} shell task(s) failed; see warnings above.",
                style("!").yellow(),
                stats.shell_failures
            );
        }
        Ok(())
    }
}

/// Prompt to create a starter configuration in the current directory.
fn scaffold(path: &Path) -> Result<ProjectConfig> {
    use dialoguer::{Confirm, Input};

    let create = Confirm::new()
        .with_prompt("No quack configuration found, do you want to create one?")
        .default(false)
        .interact()?;
    if !create {
        return Err(suggestions::config_not_found(path));
    }

    let name: String = Input::new()
        .with_prompt("Provide project name")
        .interact_text()?;
    let content = config::starter_template(&name);
    fs::write(path, &content)?;
    println!("Created {}", path.display());
    config::parse(&content).context("scaffolded configuration failed to parse")
}
