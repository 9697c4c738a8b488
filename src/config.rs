use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Server configuration from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub tick_interval: Duration,
    pub train_probability: f64,
    pub gate_probability: f64,
    /// Per-client queue length before a slow client is dropped.
    pub client_queue: usize,
    pub handshake_timeout: Duration,
    pub trains_today: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            tick_interval: Duration::from_secs(30),
            train_probability: 0.3,
            gate_probability: 0.3,
            client_queue: 64,
            handshake_timeout: Duration::from_millis(5000),
            trains_today: 24,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    /// Every variable is optional; see `Default` for the fallbacks.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();

        let listen_addr = match std::env::var("RAILGATE_LISTEN_ADDR") {
            Ok(s) => s.parse().map_err(|_| {
                ConfigError::Invalid("RAILGATE_LISTEN_ADDR", "must be a valid socket address")
            })?,
            Err(_) => defaults.listen_addr,
        };

        let tick_secs: u64 = env_or("RAILGATE_TICK_SECS", 30, "must be a whole number of seconds")?;
        if tick_secs == 0 {
            return Err(ConfigError::Invalid("RAILGATE_TICK_SECS", "must be at least 1"));
        }

        let train_probability =
            probability("RAILGATE_TRAIN_PROBABILITY", defaults.train_probability)?;
        let gate_probability =
            probability("RAILGATE_GATE_PROBABILITY", defaults.gate_probability)?;

        let client_queue = env_or(
            "RAILGATE_CLIENT_QUEUE",
            defaults.client_queue,
            "must be a positive integer",
        )?;
        let handshake_ms: u64 =
            env_or("RAILGATE_HANDSHAKE_TIMEOUT_MS", 5000, "must be milliseconds")?;
        let trains_today = env_or(
            "RAILGATE_TRAINS_TODAY",
            defaults.trains_today,
            "must be a positive integer",
        )?;

        Ok(Config {
            listen_addr,
            tick_interval: Duration::from_secs(tick_secs),
            train_probability,
            gate_probability,
            client_queue,
            handshake_timeout: Duration::from_millis(handshake_ms),
            trains_today,
        })
    }
}

/// Dashboard client configuration from environment variables.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub server_url: String,
    pub poll_interval: Duration,
    /// Upper bound on each snapshot pull, login and channel handshake.
    pub request_timeout: Duration,
    pub session_path: PathBuf,
    /// Try to reopen the push channel on each poll tick.
    pub reconnect: bool,
    pub username: Option<String>,
    pub location: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            server_url: "http://127.0.0.1:3000".to_string(),
            poll_interval: Duration::from_secs(30),
            request_timeout: Duration::from_secs(5),
            session_path: PathBuf::from("./railgate-session.json"),
            reconnect: true,
            username: None,
            location: None,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = ClientConfig::default();

        let server_url = std::env::var("RAILGATE_SERVER_URL").unwrap_or(defaults.server_url);
        if !server_url.starts_with("http://") && !server_url.starts_with("https://") {
            return Err(ConfigError::Invalid("RAILGATE_SERVER_URL", "must be an http(s) URL"));
        }

        let poll_secs: u64 = env_or("RAILGATE_POLL_SECS", 30, "must be a whole number of seconds")?;
        if poll_secs == 0 {
            return Err(ConfigError::Invalid("RAILGATE_POLL_SECS", "must be at least 1"));
        }

        let timeout_ms: u64 = env_or("RAILGATE_TIMEOUT_MS", 5000, "must be milliseconds")?;
        if timeout_ms == 0 {
            return Err(ConfigError::Invalid("RAILGATE_TIMEOUT_MS", "must be at least 1"));
        }

        let session_path = std::env::var("RAILGATE_SESSION_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.session_path);

        Ok(ClientConfig {
            server_url,
            poll_interval: Duration::from_secs(poll_secs),
            request_timeout: Duration::from_millis(timeout_ms),
            session_path,
            reconnect: std::env::var("RAILGATE_NO_RECONNECT").is_err(),
            username: std::env::var("RAILGATE_USERNAME").ok().filter(|s| !s.is_empty()),
            location: std::env::var("RAILGATE_LOCATION").ok().filter(|s| !s.is_empty()),
        })
    }
}

fn env_or<T: std::str::FromStr>(
    var: &'static str,
    default: T,
    msg: &'static str,
) -> Result<T, ConfigError> {
    match std::env::var(var) {
        Ok(s) => s.trim().parse().map_err(|_| ConfigError::Invalid(var, msg)),
        Err(_) => Ok(default),
    }
}

fn probability(var: &'static str, default: f64) -> Result<f64, ConfigError> {
    let p: f64 = env_or(var, default, "must be a number between 0 and 1")?;
    if !(0.0..=1.0).contains(&p) {
        return Err(ConfigError::Invalid(var, "must be a number between 0 and 1"));
    }
    Ok(p)
}

#[derive(Debug)]
pub enum ConfigError {
    Invalid(&'static str, &'static str),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Invalid(var, msg) => write!(f, "Invalid value for {}: {}", var, msg),
        }
    }
}

impl std::error::Error for ConfigError {}
