
use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input};

use super::{ClassifierConfig, Config, ConfigError, MatchingConfig, OllamaConfig};

#[inline]
pub fn run_interactive_config() -> Result<()> {
    println!("{}", style("🔧 ERP Sentinel Configuration Setup").bold().cyan());
    println!();

    let mut config = load_existing_config()?;

    println!("{}", style("Ollama Configuration").bold().yellow());
    println!("Configure your local Ollama instance for embedding generation.");
    println!();

    configure_ollama(&mut config.ollama)?;

    println!();
    println!("{}", style("Resolution Thresholds").bold().yellow());
    configure_thresholds(&mut config.matching, &mut config.classifier)?;

    println!();
    println!("{}", style("Testing configuration...").yellow());

    if test_ollama_connection(&config)? {
        println!("{}", style("✓ Ollama connection successful!").green());
    } else {
        println!(
            "{}",
            style("⚠ Warning: Could not connect to Ollama").yellow()
        );
        println!("You can continue, but make sure Ollama is running before indexing or asking.");
    }

    println!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        println!("{}", style("✓ Configuration saved successfully!").green());

        let config_path = Config::config_file_path().context("Failed to get config file path")?;
        println!(
            "Configuration saved to: {}",
            style(config_path.display()).cyan()
        );
    } else {
        println!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config() -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    println!("{}", style("📋 Current Configuration").bold().cyan());
    println!();

    println!("{}", style("Ollama Settings:").bold().yellow());
    println!("  Host: {}", style(&config.ollama.host).cyan());
    println!("  Port: {}", style(config.ollama.port).cyan());
    println!("  Model: {}", style(&config.ollama.model).cyan());
    println!("  Batch Size: {}", style(config.ollama.batch_size).cyan());
    println!(
        "  Embedding Dimension: {}",
        style(config.ollama.embedding_dimension).cyan()
    );

    println!();
    println!("{}", style("Matching Settings:").bold().yellow());
    println!("  Top K: {}", style(config.matching.top_k).cyan());
    println!("  Threshold: {}", style(config.matching.threshold).cyan());
    println!("  High Score: {}", style(config.matching.high_score).cyan());

    println!();
    println!("{}", style("Classifier Settings:").bold().yellow());
    println!(
        "  Confidence Threshold: {}",
        style(config.classifier.confidence_threshold).cyan()
    );
    println!(
        "  Zero-Shot Floor: {}",
        style(config.classifier.zero_shot_floor).cyan()
    );

    println!();
    println!("{}", style("Action Settings:").bold().yellow());
    println!("  Endpoint: {}", style(&config.actions.endpoint).cyan());
    println!(
        "  Timeout: {}s",
        style(config.actions.timeout_seconds).cyan()
    );

    println!();
    match config.ollama_url() {
        Ok(url) => println!("  Ollama URL: {}", style(url).cyan()),
        Err(e) => println!("  Ollama URL: {} ({})", style("Invalid").red(), e),
    }

    let config_path = Config::config_file_path().context("Failed to get config file path")?;
    println!();
    println!("Config file: {}", style(config_path.display()).dim());

    Ok(())
}

fn load_existing_config() -> Result<Config> {
    Config::load().map_or_else(
        |_| {
            println!(
                "{}",
                style("No existing configuration found. Using defaults.").yellow()
            );
            Ok(Config::default())
        },
        |config| {
            println!("{}", style("Found existing configuration.").green());
            Ok(config)
        },
    )
}

fn configure_ollama(ollama: &mut OllamaConfig) -> Result<()> {
    let host: String = Input::new()
        .with_prompt("Ollama host")
        .default(ollama.host.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            let candidate = OllamaConfig {
                host: input.clone(),
                ..OllamaConfig::default()
            };
            candidate.validate()?;
            Ok(())
        })
        .interact_text()?;

    let port: u16 = Input::new()
        .with_prompt("Ollama port")
        .default(ollama.port)
        .validate_with(|input: &u16| -> Result<(), &str> {
            if *input == 0 {
                Err("Port must be greater than 0")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let model: String = Input::new()
        .with_prompt("Embedding model")
        .default(ollama.model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let batch_size: u32 = Input::new()
        .with_prompt("Batch size for embedding generation")
        .default(ollama.batch_size)
        .validate_with(|input: &u32| -> Result<(), &str> {
            if *input == 0 {
                Err("Batch size must be greater than 0")
            } else if *input > 1000 {
                Err("Batch size must be 1000 or less")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    ollama.set_host(host)?;
    ollama.set_port(port)?;
    ollama.set_model(model)?;
    ollama.set_batch_size(batch_size)?;

    Ok(())
}

fn configure_thresholds(
    matching: &mut MatchingConfig,
    classifier: &mut ClassifierConfig,
) -> Result<()> {
    let validate_fraction = |input: &f32| -> Result<(), &str> {
        if (0.0..=1.0).contains(input) {
            Ok(())
        } else {
            Err("Value must be between 0 and 1")
        }
    };

    let threshold: f32 = Input::new()
        .with_prompt("FAQ match threshold (below this, fall back to intent classification)")
        .default(matching.threshold)
        .validate_with(validate_fraction)
        .interact_text()?;

    let confidence_threshold: f32 = Input::new()
        .with_prompt("Classifier confidence threshold")
        .default(classifier.confidence_threshold)
        .validate_with(validate_fraction)
        .interact_text()?;

    let zero_shot_floor: f32 = Input::new()
        .with_prompt("Zero-shot escalation floor")
        .default(classifier.zero_shot_floor)
        .validate_with(validate_fraction)
        .interact_text()?;

    matching.threshold = threshold;
    classifier.confidence_threshold = confidence_threshold;
    classifier.zero_shot_floor = zero_shot_floor;

    matching.validate()?;
    classifier.validate()?;

    Ok(())
}

fn test_ollama_connection(config: &Config) -> Result<bool> {
    let url = format!(
        "{}://{}:{}/api/version",
        config.ollama.protocol, config.ollama.host, config.ollama.port
    );

    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(std::time::Duration::from_secs(5)))
        .build()
        .into();

    match agent.get(&url).call() {
        Ok(_) => Ok(true),
        Err(ureq::Error::StatusCode(code)) if (400..500).contains(&code) => Ok(true),
        Err(_) => Ok(false),
    }
}
