//! Application configuration.
//!
//! All settings come from environment variables with sensible defaults,
//! so the binary runs with zero configuration on a developer machine.

/// Runtime configuration for a service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Name of the service (used in logs and response metadata).
    pub service_name: String,
    /// Bind address for the HTTP listener.
    pub host: String,
    /// Bind port for the HTTP listener.
    pub port: u16,
    /// Timeout when opening database connections, in seconds.
    pub connect_timeout_secs: u64,
    /// Maximum pool size for network databases.
    pub max_connections: u32,
    /// Whether to open the UI in the system browser on startup.
    pub open_browser: bool,
}

impl AppConfig {
    /// Loads configuration from the environment for the given service.
    pub fn load_with_service(service_name: &str) -> Self {
        Self {
            service_name: service_name.to_string(),
            host: env_or("SERVER_HOST", "127.0.0.1"),
            port: env_parse("SERVER_PORT", 8080),
            connect_timeout_secs: env_parse("CONNECT_TIMEOUT_SECS", 10),
            max_connections: env_parse("MAX_CONNECTIONS", 5),
            open_browser: env_parse("OPEN_BROWSER", true),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_env() {
        let config = AppConfig::load_with_service("test-service");
        assert_eq!(config.service_name, "test-service");
        assert_eq!(config.connect_timeout_secs, 10);
        assert_eq!(config.max_connections, 5);
    }
}
