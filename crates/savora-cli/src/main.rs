//! Savora CLI - food recommendations with generated imagery

use clap::{Parser, Subcommand};
use savora_core::commands::{image, recommend};
use savora_core::config::Config;
use savora_core::recommend::Recommendation;
use tracing::warn;

#[derive(Parser)]
#[command(name = "savora")]
#[command(author, version, about = "Food recommendations with generated imagery", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Recommend a dish for right now
    Recommend {
        /// Free-form request, e.g. "something spicy for dinner"
        query: Option<String>,

        /// City used for the weather lookup
        #[arg(short, long)]
        city: Option<String>,

        /// Session the recommendation is remembered under
        #[arg(short, long)]
        session: Option<String>,

        /// Skip dish photo generation
        #[arg(long)]
        no_image: bool,

        /// Skip the LLM and use the built-in catalog only
        #[arg(long)]
        no_llm: bool,
    },

    /// Swap the last recommendation for a different dish
    Another {
        /// Session whose last recommendation should be replaced
        #[arg(short, long)]
        session: Option<String>,
    },

    /// Image generation
    Image {
        #[command(subcommand)]
        action: ImageAction,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Run health check
    Doctor,
}

#[derive(Subcommand)]
enum ImageAction {
    /// Generate an image from a text prompt
    Generate {
        /// Text description of the image
        prompt: String,

        /// Output width in pixels
        #[arg(long)]
        width: Option<u32>,

        /// Output height in pixels
        #[arg(long)]
        height: Option<u32>,

        /// Model identifier
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Delete old images beyond the retention limit
    Cleanup,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Get a configuration value
    Get { key: String },
    /// Set a configuration value
    Set { key: String, value: String },
    /// List all configuration values
    List,
    /// Reset configuration to defaults
    Reset,
    /// Show config file path
    Path,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("savora=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Recommend {
            query,
            city,
            session,
            no_image,
            no_llm,
        } => cmd_recommend(query, city, session, !no_image, !no_llm, cli.quiet).await,

        Commands::Another { session } => cmd_another(session, cli.quiet).await,

        Commands::Image { action } => cmd_image(action, cli.quiet).await,

        Commands::Config { action } => cmd_config(action, cli.quiet),

        Commands::Doctor => cmd_doctor(cli.quiet),
    }
}

// ============================================================================
// Command Implementations
// ============================================================================

async fn cmd_recommend(
    query: Option<String>,
    city: Option<String>,
    session: Option<String>,
    with_image: bool,
    with_llm: bool,
    quiet: bool,
) -> anyhow::Result<()> {
    let config = Config::load()?;

    let recommendation =
        recommend::recommend(&config, query, city, session, with_image, with_llm).await?;

    print_recommendation(&recommendation, quiet);
    Ok(())
}

async fn cmd_another(session: Option<String>, quiet: bool) -> anyhow::Result<()> {
    let config = Config::load()?;

    let recommendation = recommend::another(&config, session).await?;

    print_recommendation(&recommendation, quiet);
    Ok(())
}

fn print_recommendation(recommendation: &Recommendation, quiet: bool) {
    if quiet {
        println!("{}", recommendation.dish);
        return;
    }

    println!("Try: {}", recommendation.dish);
    println!();
    println!("{}", recommendation.description);
    println!();
    println!("Why now: {}", recommendation.reason);
    println!(
        "Weather: {}°C, {} ({})",
        recommendation.weather.temperature_c,
        recommendation.weather.description,
        recommendation.weather.city
    );
    println!("Moment: {}, {}", recommendation.period, recommendation.season);

    if let Some(path) = &recommendation.image_path {
        println!("Photo: {}", path.display());
    }
}

async fn cmd_image(action: ImageAction, quiet: bool) -> anyhow::Result<()> {
    let config = Config::load()?;

    match action {
        ImageAction::Generate {
            prompt,
            width,
            height,
            model,
        } => {
            if !quiet {
                println!("Generating image...");
            }
            let image = image::generate(&config, prompt, width, height, model).await?;
            println!("{}", image.path.display());
        }
        ImageAction::Cleanup => {
            let removed = image::cleanup(&config)?;
            if !quiet {
                println!("Removed {} old image(s).", removed);
                println!(
                    "Directory: {}",
                    config.image.resolved_output_dir()?.display()
                );
            }
        }
    }
    Ok(())
}

fn cmd_config(action: ConfigAction, quiet: bool) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            let value = config.get(&key)?;
            println!("{}", value);
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            if !quiet {
                println!("Set {} = {}", key, value);
            }
        }
        ConfigAction::List => {
            let config = Config::load()?;
            let items = config.list()?;
            for (key, value) in items {
                println!("{} = {}", key, value);
            }
        }
        ConfigAction::Reset => {
            Config::reset()?;
            if !quiet {
                println!("Configuration reset to defaults.");
            }
        }
        ConfigAction::Path => {
            let path = Config::config_path()?;
            println!("{}", path.display());
        }
    }
    Ok(())
}

fn cmd_doctor(quiet: bool) -> anyhow::Result<()> {
    use std::fs;

    if !quiet {
        println!("Savora Health Check");
        println!("===================");
        println!();
    }

    let mut all_ok = true;

    // Check configuration
    match Config::load() {
        Ok(config) => {
            if !quiet {
                println!("[OK] Configuration: Valid");
            }

            // Check image credentials
            match config.image.resolved_credentials() {
                Ok(Some(_)) => {
                    if !quiet {
                        let redacted = config
                            .image
                            .redacted_access_key()?
                            .unwrap_or_default();
                        println!("[OK] Image credentials: Configured ({})", redacted);
                    }
                }
                Ok(None) => {
                    all_ok = false;
                    if !quiet {
                        warn!("image credentials not configured");
                        println!("[!!] Image credentials: Not configured");
                        println!(
                            "     Set VOLC_ACCESS_KEY and VOLC_SECRET_KEY environment variables"
                        );
                    }
                }
                Err(e) => {
                    all_ok = false;
                    if !quiet {
                        println!("[!!] Image credentials: Error - {}", e);
                    }
                }
            }

            // Check LLM API key
            match config.llm.resolved_api_key() {
                Ok(Some(_)) => {
                    if !quiet {
                        let redacted = config.llm.redacted_api_key()?.unwrap_or_default();
                        println!("[OK] LLM API key: Configured ({})", redacted);
                    }
                }
                Ok(None) => {
                    if !quiet {
                        println!("[--] LLM API key: Not configured (catalog picks only)");
                        println!(
                            "     Set SAVORA_LLM_API_KEY or OPENROUTER_API_KEY environment variable"
                        );
                    }
                }
                Err(e) => {
                    all_ok = false;
                    if !quiet {
                        println!("[!!] LLM API key: Error - {}", e);
                    }
                }
            }

            // Check weather capability
            if !quiet {
                if config.weather.enabled {
                    println!("[OK] Weather: Enabled ({})", config.weather.base_url);
                } else {
                    println!("[--] Weather: Disabled");
                }
            }

            // Check image output directory
            if !quiet {
                match config.image.resolved_output_dir() {
                    Ok(dir) => {
                        if dir.exists() {
                            let files = fs::read_dir(&dir)
                                .map(|entries| entries.filter_map(|e| e.ok()).count())
                                .unwrap_or(0);
                            println!("[OK] Image directory: {} ({} files)", dir.display(), files);
                        } else {
                            println!(
                                "[--] Image directory: {} (not created yet)",
                                dir.display()
                            );
                        }
                    }
                    Err(e) => {
                        println!("[!!] Image directory: Error - {}", e);
                    }
                }
            }
        }
        Err(e) => {
            all_ok = false;
            if !quiet {
                println!("[!!] Configuration: Error - {}", e);
            }
        }
    }

    // Check config file location
    if !quiet {
        match Config::config_path() {
            Ok(path) => {
                if path.exists() {
                    println!("[OK] Config file: {}", path.display());
                } else {
                    println!("[--] Config file: {} (using defaults)", path.display());
                }
            }
            Err(e) => {
                println!("[!!] Config file: Error - {}", e);
            }
        }
    }

    // Summary
    if !quiet {
        println!();
        if all_ok {
            println!("All checks passed!");
        } else {
            println!("Some checks failed. See above for details.");
        }
    }

    Ok(())
}
