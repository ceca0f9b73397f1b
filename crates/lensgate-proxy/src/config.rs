use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use lensgate_common::{
    helpers::{env_bool, env_string, env_u32, env_u64, normalize_origin},
    ApiKey, Error, Result,
};

use crate::inference::DEFAULT_SERVER_URL;

pub const API_KEY_ENV: &str = "LENSGATE_API_KEY";

const DEFAULT_ALLOWED_ORIGINS: [&str; 4] = [
    "http://localhost:5173",
    "http://127.0.0.1:5173",
    "http://localhost:3000",
    "http://127.0.0.1:3000",
];

/// Development serves only the API; production also serves the prebuilt frontend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RuntimeMode {
    Development,
    Production,
}

#[derive(Parser, Debug)]
#[command(name = "lensgate-proxy")]
#[command(about = "Forwards WebRTC session offers to a hosted inference service")]
pub struct ProxyArgs {
    /// HTTP listen address
    #[arg(long, env = "LENSGATE_BIND_ADDR", default_value = "127.0.0.1:3000")]
    pub listen: String,

    /// Inference server base URL
    #[arg(long, env = "LENSGATE_SERVER_URL")]
    pub server_url: Option<String>,

    /// Runtime mode
    #[arg(long, env = "LENSGATE_ENVIRONMENT", value_enum, default_value = "development")]
    pub environment: RuntimeMode,

    /// Directory holding the prebuilt frontend (production only)
    #[arg(long, env = "LENSGATE_STATIC_DIR", default_value = "public")]
    pub static_dir: PathBuf,

    /// Default tracing filter when RUST_LOG is unset
    #[arg(long, default_value = "lensgate_proxy=info,tower_http=info")]
    pub log_filter: String,
}

#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub api_key: Option<ApiKey>,
    pub server_url: String,
    pub bind_addr: SocketAddr,
    pub mode: RuntimeMode,
    pub static_dir: PathBuf,
    pub allowed_origins: Vec<String>,
    pub cors_allow_any: bool,
    pub allow_public_bind: bool,
    pub trust_proxy_headers: bool,
    pub upstream_timeout: Duration,
    pub init_rate_limit: u32,
    pub init_rate_window: Duration,
}

impl ProxyConfig {
    /// Defaults with the given credential; the base for tests and for [`ProxyConfig::load`].
    pub fn new(api_key: Option<ApiKey>) -> Self {
        Self {
            api_key,
            server_url: DEFAULT_SERVER_URL.to_string(),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            mode: RuntimeMode::Development,
            static_dir: PathBuf::from("public"),
            allowed_origins: DEFAULT_ALLOWED_ORIGINS
                .iter()
                .map(|origin| normalize_origin(origin))
                .collect(),
            cors_allow_any: false,
            allow_public_bind: false,
            trust_proxy_headers: false,
            upstream_timeout: Duration::from_secs(30),
            init_rate_limit: 30,
            init_rate_window: Duration::from_secs(60),
        }
    }

    /// Builds the runtime config from parsed flags plus the environment.
    pub fn load(args: &ProxyArgs) -> Result<Self> {
        let mut config = Self::new(ApiKey::from_env(API_KEY_ENV));

        let mut bind_addr: SocketAddr = args
            .listen
            .parse()
            .map_err(|err| Error::config(format!("invalid listen address '{}': {err}", args.listen)))?;
        if let Some(port) = env_string("PORT") {
            let port: u16 = port
                .parse()
                .map_err(|err| Error::config(format!("invalid PORT '{port}': {err}")))?;
            bind_addr.set_port(port);
        }
        config.bind_addr = bind_addr;

        if let Some(server_url) = args.server_url.as_deref().map(str::trim) {
            if !server_url.is_empty() {
                config.server_url = server_url.to_string();
            }
        }
        if !config.server_url.starts_with("http://") && !config.server_url.starts_with("https://")
        {
            return Err(Error::config(format!(
                "server url must be http(s): {}",
                config.server_url
            )));
        }

        config.mode = args.environment;
        config.static_dir = args.static_dir.clone();

        if let Some(origins) = env_string("LENSGATE_ALLOWED_ORIGINS") {
            let parsed = parse_origins(&origins);
            if !parsed.is_empty() {
                config.allowed_origins = parsed;
            }
        }
        config.cors_allow_any = env_bool("LENSGATE_CORS_ALLOW_ANY", false);
        config.allow_public_bind = env_bool("LENSGATE_ALLOW_PUBLIC_BIND", false);
        config.trust_proxy_headers = env_bool("LENSGATE_TRUST_PROXY_HEADERS", false);
        config.upstream_timeout =
            Duration::from_secs(env_u64("LENSGATE_UPSTREAM_TIMEOUT_SECS", 30).max(1));
        config.init_rate_limit = env_u32("LENSGATE_INIT_RATE_LIMIT", 30);
        config.init_rate_window =
            Duration::from_secs(env_u64("LENSGATE_INIT_RATE_WINDOW_SECS", 60).max(1));

        Ok(config)
    }

    pub fn api_key_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Non-loopback binds must be opted into.
    pub fn check_bind_allowed(&self) -> Result<()> {
        if self.bind_addr.ip().is_loopback() || self.allow_public_bind {
            return Ok(());
        }
        Err(Error::config(
            "refusing non-loopback bind without LENSGATE_ALLOW_PUBLIC_BIND=1",
        ))
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    let mut origins: Vec<String> = raw
        .split(',')
        .map(normalize_origin)
        .filter(|origin| !origin.is_empty())
        .collect();
    origins.sort();
    origins.dedup();
    origins
}
