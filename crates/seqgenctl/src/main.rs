mod input;
mod render;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use seqgen_engine::{EngineConfig, ExecutionConfig, ObservationDigest, ObservationInput, ProgramDigest, SequenceEngine};

#[derive(Parser)]
#[command(name = "seqgen")]
#[command(version, about = "Observation sequence generator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Sequence service URL. Sequences are generated locally when absent.
    #[arg(long, global = true, env = "SEQGEN_ENDPOINT")]
    endpoint: Option<String>,

    /// Emit only JSON output
    #[arg(short, long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the next atom and possible future for an observation
    ///
    /// The file holds the observation configuration, ITC result and
    /// execution history as JSON or YAML.
    ///
    /// Examples:
    ///     seqgen generate ./obs/o-20.yaml
    ///     seqgen generate ./obs/o-20.json --limit 5 --json
    ///     seqgen generate ./obs/o-20.yaml --endpoint http://localhost:8084
    #[command(verbatim_doc_comment)]
    Generate {
        /// Observation input file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Maximum number of future atoms to show
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Summarize remaining time, offsets and charges for an observation
    Digest {
        /// Observation input file
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Summarize a set of observations
    Program {
        /// Observation input files
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,
    },
}

/// Where sequences are computed.
enum Backend {
    Local(SequenceEngine),
    Remote { client: Client, base_url: String },
}

impl Backend {
    fn new(endpoint: Option<String>) -> Self {
        match endpoint {
            Some(url) => Backend::Remote {
                client: Client::new(),
                base_url: url.trim_end_matches('/').to_string(),
            },
            None => Backend::Local(SequenceEngine::new(EngineConfig::default())),
        }
    }

    async fn generate(&self, input: &ObservationInput, limit: Option<usize>) -> Result<ExecutionConfig> {
        match self {
            Backend::Local(engine) => Ok(engine.generate_static(input, limit)?),
            Backend::Remote { client, base_url } => {
                let url = match limit {
                    Some(n) => format!("{}/api/sequence?limit={}", base_url, n),
                    None => format!("{}/api/sequence", base_url),
                };
                post(client, &url, input).await
            }
        }
    }

    async fn digest(&self, input: &ObservationInput) -> Result<ObservationDigest> {
        match self {
            Backend::Local(engine) => Ok(engine.digest_static(input)?),
            Backend::Remote { client, base_url } => {
                post(client, &format!("{}/api/digest", base_url), input).await
            }
        }
    }

    async fn program(&self, inputs: &[ObservationInput]) -> Result<ProgramDigest> {
        match self {
            Backend::Local(engine) => Ok(engine.program_digest(inputs)?),
            Backend::Remote { client, base_url } => {
                post(client, &format!("{}/api/program/digest", base_url), &inputs).await
            }
        }
    }
}

async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(client: &Client, url: &str, body: &B) -> Result<T> {
    let response = client
        .post(url)
        .json(body)
        .send()
        .await
        .context(format!("Failed to send request to {}", url))?;

    if response.status().is_success() {
        Ok(response.json().await.context("Failed to decode service response")?)
    } else {
        let status = response.status();
        let text = response.text().await?;
        let message = serde_json::from_str::<serde_json::Value>(&text)
            .ok()
            .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
            .unwrap_or(text);
        bail!("{} - {}", status, message)
    }
}

fn print<T: Serialize>(value: &T, json: bool, text: impl FnOnce(&T) -> String) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        print!("{}", text(value));
    }
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let backend = Backend::new(cli.endpoint);

    match cli.command {
        Commands::Generate { file, limit } => {
            let input = input::load_observation(&file)?;
            let config = backend.generate(&input, limit).await?;
            print(&config, cli.json, render::execution_config)
        }
        Commands::Digest { file } => {
            let input = input::load_observation(&file)?;
            let digest = backend.digest(&input).await?;
            print(&digest, cli.json, render::observation_digest)
        }
        Commands::Program { files } => {
            let inputs = input::load_observations(&files)?;
            let digest = backend.program(&inputs).await?;
            print(&digest, cli.json, render::program_digest)
        }
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    if let Err(e) = run(Cli::parse()).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
