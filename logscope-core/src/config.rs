//! Centralized configuration for Logscope.
//!
//! All tunable parameters and settings are defined here to avoid
//! hard-coded values scattered throughout the codebase.

use std::time::Duration;

/// Central configuration for all Logscope components.
///
/// Groups related configuration settings into logical sections.
/// Supports environment variable overrides for runtime customization.
#[derive(Debug, Clone, Default)]
pub struct LogscopeConfig {
    pub protocol: ProtocolConfig,
    pub node: NodeConfig,
    pub server: ServerConfig,
}

/// Log protocol polling configuration.
///
/// Controls how often a pending node request is re-examined and how many
/// dispatcher attempts are tolerated before a remote error becomes final.
#[derive(Debug, Clone)]
pub struct ProtocolConfig {
    /// Delay between two snapshots of a pending request
    pub poll_interval: Duration,
    /// Dispatcher attempt count at which a failed request is given up on
    pub retry_ceiling: u32,
}

/// Poll interval used when nothing else is configured.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Attempt ceiling used when nothing else is configured.
pub const DEFAULT_RETRY_CEILING: u32 = 16;

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            retry_ceiling: DEFAULT_RETRY_CEILING,
        }
    }
}

/// Node transport configuration.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Timeout for a single HTTP call to the node
    pub request_timeout: Duration,
    /// User agent for HTTP requests
    pub user_agent: &'static str,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            user_agent: "logscope/0.1.0",
        }
    }
}

/// Web server bind configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl LogscopeConfig {
    /// Creates configuration with environment variable overrides.
    ///
    /// Allows runtime configuration via environment variables while
    /// maintaining sensible defaults. Unparseable values are ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(interval) = std::env::var("LOGSCOPE_POLL_INTERVAL_MS") {
            if let Ok(millis) = interval.parse::<u64>() {
                config.protocol.poll_interval = Duration::from_millis(millis);
            }
        }

        if let Ok(ceiling) = std::env::var("LOGSCOPE_RETRY_CEILING") {
            if let Ok(count) = ceiling.parse::<u32>() {
                config.protocol.retry_ceiling = count;
            }
        }

        if let Ok(timeout) = std::env::var("LOGSCOPE_REQUEST_TIMEOUT") {
            if let Ok(seconds) = timeout.parse::<u64>() {
                config.node.request_timeout = Duration::from_secs(seconds);
            }
        }

        if let Ok(host) = std::env::var("LOGSCOPE_HOST") {
            config.server.host = host;
        }

        if let Ok(port) = std::env::var("LOGSCOPE_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                config.server.port = port;
            }
        }

        config
    }

    /// Creates a configuration optimized for testing.
    ///
    /// Polls every few milliseconds so retry loops finish quickly.
    pub fn for_testing() -> Self {
        Self {
            protocol: ProtocolConfig {
                poll_interval: Duration::from_millis(5),
                retry_ceiling: DEFAULT_RETRY_CEILING,
            },
            node: NodeConfig {
                request_timeout: Duration::from_secs(5),
                user_agent: "logscope/test",
            },
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
            },
        }
    }
}
