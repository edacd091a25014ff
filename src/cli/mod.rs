mod console;

pub use console::ConsoleChannel;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Config;
use crate::core::{Outcome, Pipeline, QualityConstraint, ResolutionEngine, ResolutionRequest, UsageLedger};

/// Chat id used for console sessions.
const CONSOLE_CHAT: i64 = 0;

#[derive(Parser)]
#[command(name = "snipsave")]
#[command(about = "Resolve video links into directly downloadable media")]
#[command(version)]
pub struct Cli {
    /// TOML config file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Resolve one link and print the validated result as JSON
    Resolve {
        #[arg(value_name = "URL")]
        url: String,

        /// highest, lowest or audio-only
        #[arg(short, long)]
        quality: Option<QualityConstraint>,
    },

    /// Run every link in the text through the full delivery flow
    Fetch {
        #[arg(value_name = "TEXT", required = true)]
        text: Vec<String>,

        #[arg(short, long)]
        quality: Option<QualityConstraint>,
    },

    /// Replay a choice token printed by an earlier fetch
    Choose {
        #[arg(value_name = "TOKEN")]
        token: String,
    },
}

impl Cli {
    pub async fn run(&self) -> Result<()> {
        let config = Config::load(self.config.as_deref())?;
        let engine = Arc::new(ResolutionEngine::from_config(&config).context("failed to build HTTP client")?);

        match &self.command {
            Command::Resolve { url, quality } => {
                let request = ResolutionRequest::new(url.as_str()).with_quality(*quality);
                let media = engine.resolve(&request).await?;
                println!("{}", serde_json::to_string_pretty(&*media)?);
            }
            Command::Fetch { text, quality } => {
                let pipeline = console_pipeline(engine, &config);
                let outcomes = pipeline.handle_message(CONSOLE_CHAT, &text.join(" "), *quality).await;
                if outcomes.is_empty() {
                    anyhow::bail!("no links found in input");
                }
                println!("{}", pipeline.usage_report());
                report(&outcomes)?;
            }
            Command::Choose { token } => {
                let pipeline = console_pipeline(engine, &config);
                let outcome = pipeline.handle_selection(CONSOLE_CHAT, token).await?;
                report(std::slice::from_ref(&outcome))?;
            }
        }

        Ok(())
    }
}

fn console_pipeline(engine: Arc<ResolutionEngine>, config: &Config) -> Pipeline {
    Pipeline::new(
        engine,
        Arc::new(UsageLedger::new()),
        Arc::new(ConsoleChannel::new()),
        config.batch_pacing(),
    )
}

/// Fails the process when nothing in the batch succeeded.
fn report(outcomes: &[Outcome]) -> Result<()> {
    let succeeded = outcomes
        .iter()
        .filter(|o| matches!(o, Outcome::Delivered(_) | Outcome::ChoicesOffered(_) | Outcome::Cancelled))
        .count();
    if succeeded == 0 {
        anyhow::bail!("{} link(s) could not be delivered", outcomes.len());
    }
    Ok(())
}
