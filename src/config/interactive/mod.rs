
use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input};

use super::{Config, HfApiConfig, RagApiConfig, ShortTermConfig, SummarizationConfig};

#[inline]
pub fn run_interactive_config() -> Result<()> {
    eprintln!("{}", style("🔧 Polyglot RAG Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config()?;

    eprintln!("{}", style("Hugging Face API").bold().yellow());
    eprintln!("Used for query and chunk embeddings (feature extraction).");
    eprintln!();
    configure_hf(&mut config.hf)?;

    eprintln!();
    eprintln!("{}", style("Groq API").bold().yellow());
    eprintln!("Used for answer generation and snippet summarization.");
    eprintln!();
    configure_groq(&mut config.groq)?;

    eprintln!();
    eprintln!("{}", style("Retrieval Policy").bold().yellow());
    eprintln!();
    configure_policy(&mut config.summarization, &mut config.short_term)?;

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config() -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Hugging Face API:").bold().yellow());
    eprintln!("  Token: {}", style(mask_secret(&config.hf.token)).cyan());
    eprintln!("  Model: {}", style(&config.hf.model).cyan());
    eprintln!("  Endpoint: {}", style(&config.hf.endpoint).cyan());
    eprintln!("  Batch Size: {}", style(config.hf.batch_size).cyan());

    eprintln!();
    eprintln!("{}", style("Groq API:").bold().yellow());
    eprintln!("  Key: {}", style(mask_secret(&config.groq.key)).cyan());
    eprintln!("  Model: {}", style(&config.groq.model).cyan());
    eprintln!("  Endpoint: {}", style(&config.groq.endpoint).cyan());

    eprintln!();
    eprintln!("{}", style("Retrieval Policy:").bold().yellow());
    eprintln!(
        "  Snippet Length: {} chars",
        style(config.summarization.max_chars).cyan()
    );
    eprintln!(
        "  Summary Threshold: {}",
        style(config.summarization.summary_threshold).cyan()
    );
    eprintln!("  Memory Window: {} turns", style(config.short_term.max_turns).cyan());

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );

    Ok(())
}

fn load_existing_config() -> Result<Config> {
    Config::load().map_or_else(
        |_| {
            eprintln!(
                "{}",
                style("No existing configuration found. Using defaults.").yellow()
            );
            let mut config = Config::default();
            config.base_dir = Config::config_dir()?;
            Ok(config)
        },
        |config| {
            eprintln!("{}", style("Found existing configuration.").green());
            Ok(config)
        },
    )
}

fn configure_hf(hf: &mut HfApiConfig) -> Result<()> {
    hf.token = Input::new()
        .with_prompt("Hugging Face API token")
        .default(hf.token.clone())
        .allow_empty(true)
        .interact_text()?;

    hf.model = Input::new()
        .with_prompt("Embedding model")
        .default(hf.model.clone())
        .interact_text()?;

    hf.batch_size = Input::new()
        .with_prompt("Embedding batch size")
        .default(hf.batch_size)
        .interact_text()?;

    Ok(())
}

fn configure_groq(groq: &mut RagApiConfig) -> Result<()> {
    groq.key = Input::new()
        .with_prompt("Groq API key")
        .default(groq.key.clone())
        .allow_empty(true)
        .interact_text()?;

    groq.model = Input::new()
        .with_prompt("Generation model")
        .default(groq.model.clone())
        .interact_text()?;

    Ok(())
}

fn configure_policy(
    summarization: &mut SummarizationConfig,
    short_term: &mut ShortTermConfig,
) -> Result<()> {
    summarization.max_chars = Input::new()
        .with_prompt("Snippet length (characters)")
        .default(summarization.max_chars)
        .interact_text()?;

    summarization.summary_threshold = Input::new()
        .with_prompt("Summary threshold (similarity below which snippets are summarized)")
        .default(summarization.summary_threshold)
        .interact_text()?;

    short_term.max_turns = Input::new()
        .with_prompt("Conversation memory window (turns)")
        .default(short_term.max_turns)
        .interact_text()?;

    Ok(())
}

fn mask_secret(secret: &str) -> String {
    if secret.is_empty() {
        "(not set)".to_string()
    } else {
        let visible: String = secret.chars().take(4).collect();
        format!("{visible}…")
    }
}
