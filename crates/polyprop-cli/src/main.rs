//! polyprop CLI - polymer property prediction and descriptions from SMILES.

use std::net::IpAddr;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use polyprop_describe::Backend;
use tracing::Level;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::{config as config_cmd, describe, descriptors, predict, serve};
use config::Config;

/// polyprop - Predict polymer properties and describe polymers from SMILES.
#[derive(Parser, Debug)]
#[command(
    name = "polyprop",
    author,
    version,
    about = "polyprop: polymer property prediction and descriptions",
    long_about = None
)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Config file to use instead of the platform default.
    #[arg(long, global = true, env = "POLYPROP_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the HTTP API.
    Serve {
        /// Address to bind.
        #[arg(long, default_value = "0.0.0.0")]
        host: IpAddr,

        /// Port to listen on.
        #[arg(short, long)]
        port: Option<u16>,

        /// Reference dataset for /random-sample.
        #[arg(long)]
        dataset: Option<PathBuf>,

        #[command(flatten)]
        model: ModelArgs,

        #[command(flatten)]
        llm: LlmArgs,
    },

    /// Predict properties for one or more SMILES strings.
    Predict {
        /// SMILES strings to predict.
        #[arg(required = true)]
        smiles: Vec<String>,

        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        model: ModelArgs,
    },

    /// Stream a description of a polymer to stdout.
    ///
    /// Properties are predicted with the local model when the description
    /// is not cached yet.
    Describe {
        /// SMILES string to describe.
        smiles: String,

        /// Use an in-memory cache instead of the configured cache file.
        #[arg(long)]
        no_cache: bool,

        #[command(flatten)]
        model: ModelArgs,

        #[command(flatten)]
        llm: LlmArgs,
    },

    /// List descriptor names, or compute descriptors for a SMILES string.
    Descriptors {
        /// SMILES string to compute descriptors for.
        smiles: Option<String>,

        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Manage CLI configuration.
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Model location flags.
#[derive(Args, Debug)]
struct ModelArgs {
    /// Directory holding the model artifacts.
    #[arg(long)]
    model_dir: Option<PathBuf>,

    /// Description cache file.
    #[arg(long)]
    cache: Option<PathBuf>,
}

/// Generator endpoint flags.
#[derive(Args, Debug)]
struct LlmArgs {
    /// Generator protocol: ollama or openai.
    #[arg(long)]
    llm_backend: Option<Backend>,

    /// Generator base URL.
    #[arg(long)]
    llm_url: Option<String>,

    /// Generator model name.
    #[arg(long)]
    llm_model: Option<String>,
}

impl ModelArgs {
    fn apply(self, config: &mut Config) {
        if let Some(dir) = self.model_dir {
            config.model_dir = dir;
        }
        if let Some(cache) = self.cache {
            config.cache_path = cache;
        }
    }
}

impl LlmArgs {
    fn apply(self, config: &mut Config) {
        if let Some(backend) = self.llm_backend {
            config.llm_backend = backend;
        }
        if let Some(url) = self.llm_url {
            config.llm_url = url;
        }
        if let Some(model) = self.llm_model {
            config.llm_model = model;
        }
    }
}

/// Configuration subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show current configuration.
    Show,

    /// Set a configuration value.
    Set {
        /// Configuration key.
        key: String,
        /// Configuration value.
        value: String,
    },

    /// Reset configuration to defaults.
    Reset,

    /// Show path to config file.
    Path,
}

fn init_tracing(cli: &Cli) {
    let serving = matches!(cli.command, Commands::Serve { .. });
    let level = if cli.quiet {
        Level::ERROR
    } else if cli.verbose {
        Level::DEBUG
    } else if serving {
        Level::INFO
    } else {
        Level::WARN // Default to less noise
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_ascii_lowercase()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    match cli.log_format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    let mut config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve {
            host,
            port,
            dataset,
            model,
            llm,
        } => {
            model.apply(&mut config);
            llm.apply(&mut config);
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(dataset) = dataset {
                config.dataset = Some(dataset);
            }
            serve::execute(&config, host).await?;
        }

        Commands::Predict {
            smiles,
            json,
            model,
        } => {
            model.apply(&mut config);
            predict::execute(&config, &smiles, json)?;
        }

        Commands::Describe {
            smiles,
            no_cache,
            model,
            llm,
        } => {
            model.apply(&mut config);
            llm.apply(&mut config);
            describe::execute(&config, &smiles, no_cache).await?;
        }

        Commands::Descriptors { smiles, json } => {
            descriptors::execute(smiles.as_deref(), json)?;
        }

        Commands::Config(config_cmd_inner) => {
            let path = cli.config.as_deref();
            match config_cmd_inner {
                ConfigCommands::Show => {
                    config_cmd::show(&config, path);
                }
                ConfigCommands::Set { key, value } => {
                    config_cmd::set(&mut config, &key, &value, path)?;
                }
                ConfigCommands::Reset => {
                    config_cmd::reset(path)?;
                }
                ConfigCommands::Path => {
                    match path.map(PathBuf::from).or_else(Config::config_file_path) {
                        Some(path) => println!("{}", path.display()),
                        None => println!("(no config file path available)"),
                    }
                }
            }
        }
    }

    Ok(())
}
