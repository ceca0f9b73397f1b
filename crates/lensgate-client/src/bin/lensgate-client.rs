//! Lensgate client tools: proxy health checks and manual offer/answer exchange.

#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lensgate_client::{build_stream_config, ConnectionForm, ProxySignaler, WorkflowMode};
use lensgate_common::SessionOffer;
use serde_json::{Map, Value};

#[derive(Parser, Debug)]
#[command(name = "lensgate-client")]
#[command(about = "Lensgate proxy client tools")]
struct Args {
    /// Base URL of the proxy
    #[arg(long, env = "LENSGATE_PROXY_URL", default_value = "http://127.0.0.1:3000")]
    proxy_url: String,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check that the proxy is up and has a credential
    Health,

    /// Send an SDP offer through the proxy and print the answer
    Negotiate {
        /// File containing the SDP offer
        #[arg(long)]
        offer_file: PathBuf,

        /// Use the built-in object detection workflow
        #[arg(long, conflicts_with_all = ["workspace", "workflow_id"])]
        example: bool,

        /// Workspace that owns the published workflow
        #[arg(long)]
        workspace: Option<String>,

        /// Published workflow id
        #[arg(long)]
        workflow_id: Option<String>,

        #[arg(long, default_value = lensgate_common::DEFAULT_IMAGE_INPUT_NAME)]
        image_input: String,

        /// Stream output names, comma-separated
        #[arg(long, default_value = "")]
        stream_output: String,

        /// Data output names, comma-separated
        #[arg(long, default_value = "")]
        data_output: String,

        /// Worker threads on the inference server
        #[arg(long)]
        threads: Option<u32>,

        /// Workflow parameter as key=value; JSON values are parsed (repeatable)
        #[arg(long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,
    },
}

fn parse_param(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got {raw:?}"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err("parameter name must not be empty".into());
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

#[tokio::main]
async fn main() -> Result<()> {
    lensgate_common::init_tracing_with_default("lensgate_client=info");

    let args = Args::parse();
    let signaler = ProxySignaler::new(&args.proxy_url, Duration::from_secs(args.timeout_secs))?;

    match args.command {
        Command::Health => {
            let health = signaler.health().await?;
            println!("status:            {}", health.status);
            println!("api key configured: {}", health.api_key_configured);
            println!("message:           {}", health.message);
        }
        Command::Negotiate {
            offer_file,
            example,
            workspace,
            workflow_id,
            image_input,
            stream_output,
            data_output,
            threads,
            params,
        } => {
            let sdp = std::fs::read_to_string(&offer_file)
                .with_context(|| format!("failed to read {}", offer_file.display()))?;

            let mut workflow_parameters = Map::new();
            for raw in &params {
                let (key, value) = parse_param(raw).map_err(anyhow::Error::msg)?;
                workflow_parameters.insert(key, value);
            }

            let mode = if example || (workspace.is_none() && workflow_id.is_none()) {
                WorkflowMode::Example
            } else {
                WorkflowMode::Custom
            };
            let form = ConnectionForm {
                mode,
                workspace_name: workspace.unwrap_or_default(),
                workflow_id: workflow_id.unwrap_or_default(),
                image_input_name: image_input,
                stream_outputs: stream_output,
                data_outputs: data_output,
                workflow_parameters,
                thread_pool_workers: threads,
                ..Default::default()
            };

            let config = build_stream_config(&form, &signaler.init_url())?;
            tracing::info!("negotiating {}", config.wrtc_params.source.describe());

            let answer = signaler
                .init_webrtc(&config.init_request(SessionOffer::new(sdp)))
                .await?;
            if let Some(pipeline_id) = answer.pipeline_id() {
                tracing::info!("pipeline {}", pipeline_id);
            }
            println!("{}", serde_json::to_string_pretty(&answer)?);
        }
    }

    Ok(())
}
