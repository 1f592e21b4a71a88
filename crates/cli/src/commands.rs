//! CLI subcommand handlers

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use redpost::config::CONFIG_KEYS;
use redpost::{GenerationInput, Pipeline, PipelineOutcome, PublishRecordStore, RedpostConfig};

use crate::output::{mask_secret, OutputHandler};
use crate::prompt::TerminalPrompt;

/// Options for `redpost publish`
#[derive(Debug, Clone, Default)]
pub struct PublishArgs {
    pub topic: Option<String>,
    pub accounts: Vec<String>,
    pub word_count: Option<u32>,
    pub context: Option<String>,
    pub quick: bool,
    pub generate_only: bool,
}

impl PublishArgs {
    pub fn to_input(&self) -> GenerationInput {
        GenerationInput {
            topic: self.topic.clone().unwrap_or_default(),
            accounts: (!self.accounts.is_empty()).then(|| self.accounts.clone()),
            word_count: self.word_count,
            context: self.context.clone(),
        }
    }
}

/// Generate a note, review it and publish it
pub async fn publish(config: &RedpostConfig, args: PublishArgs) -> Result<()> {
    let output = OutputHandler::new();
    output.print_banner();

    let pipeline = Pipeline::from_config(config).context("Failed to set up the pipeline")?;
    let mut prompt = TerminalPrompt::new()?;

    let Some(input) = prompt.collect_input(args.to_input())? else {
        output.print_warning("Aborted");
        return Ok(());
    };
    tracing::debug!(
        "[CLI] Input: topic={}, words={:?}, quick={}",
        input.topic,
        input.word_count,
        args.quick
    );

    if args.generate_only {
        let post = pipeline.generate(&input).await.context("Generation failed")?;
        output.print_post(&post);
        output.print_success("Generated (not published)");
        return Ok(());
    }

    let outcome = if args.quick {
        pipeline
            .quick_publish(&input)
            .await
            .context("Publish run failed")?
    } else {
        pipeline
            .run(&input, &mut prompt)
            .await
            .context("Publish run failed")?
    };

    match outcome {
        PipelineOutcome::Published {
            post,
            record,
            receipt,
            waited,
        } => {
            output.print_post(&post);
            if !waited.is_zero() {
                output.print_info(&format!("Waited {}s for the scheduled time", waited.as_secs()));
            }
            output.print_success(&format!(
                "Published \"{}\" via {} ({})",
                record.title, receipt.publisher, receipt.message
            ));
            if let Some(reference) = &receipt.reference {
                println!("  {} {}", "Reference:".dimmed(), reference);
            }
            println!("  {} {}", "Record:".dimmed(), record.id);
        }
        PipelineOutcome::Cancelled { .. } => {
            output.print_warning("Publish cancelled, nothing was recorded");
        }
    }

    Ok(())
}

/// List recent publish records or the summary
pub async fn history(config: &RedpostConfig, limit: usize, summary: bool) -> Result<()> {
    let output = OutputHandler::new();
    let store = PublishRecordStore::in_dir(&config.storage.output_dir);

    if summary {
        let summary = store
            .summary()
            .await
            .with_context(|| format!("Failed to read {}", store.path().display()))?;
        output.print_summary(&summary);
        return Ok(());
    }

    let records = store
        .recent(limit)
        .await
        .with_context(|| format!("Failed to read {}", store.path().display()))?;

    output.print_header("Publish history");
    if records.is_empty() {
        output.print_info("No publish records yet");
        return Ok(());
    }
    output.print_records_table(&records);
    Ok(())
}

/// Show the effective configuration
pub fn show_config(config: &RedpostConfig, path: &Path) -> Result<()> {
    let output = OutputHandler::new();
    output.print_header("Configuration");
    println!("  {} {}", "File:".dimmed(), path.display());
    println!();

    for key in CONFIG_KEYS {
        let value = match config.get(key) {
            Some(v) if key.ends_with("api_key") => mask_secret(&v),
            Some(v) => v,
            None => "(not set)".dimmed().to_string(),
        };
        println!("  {:<24} {}", key.bright_white(), value);
    }
    println!();
    Ok(())
}

/// Persist one `key=value` pair to the config file
pub fn set_config(path: &Path, key_value: &str) -> Result<()> {
    let output = OutputHandler::new();

    let (key, value) = key_value
        .split_once('=')
        .context("Expected key=value, e.g. llm.model=doubao-seed-1-8-251228")?;

    // File values only; environment overrides are not written back
    let mut config = RedpostConfig::load_with_env(Some(path), |_| None)?;
    config.set(key.trim(), value)?;
    config.save(Some(path))?;

    output.print_success(&format!("Set {} in {}", key.trim(), path.display()));
    Ok(())
}

/// Write a default config file unless one exists
pub fn init_config(path: &Path) -> Result<()> {
    let output = OutputHandler::new();

    if path.exists() {
        output.print_warning(&format!("{} already exists, leaving it unchanged", path.display()));
        return Ok(());
    }

    let written = RedpostConfig::default().save(Some(path))?;
    output.print_success(&format!("Wrote default configuration to {}", written.display()));
    output.print_info("Set llm.api_key next: redpost config --set llm.api_key=<key>");
    Ok(())
}
