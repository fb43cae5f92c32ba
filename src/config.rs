// ⚙️ Configuration - environment (and .env) driven settings

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_DB_PATH: &str = "financials.db";
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:5000";
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3:8b";
pub const DEFAULT_ASSISTANT_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_HISTORY_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("json") {
            Ok(LogFormat::Json)
        } else if s.eq_ignore_ascii_case("text") {
            Ok(LogFormat::Text)
        } else {
            Err(format!("unknown log format '{}'", s))
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    pub listen_addr: SocketAddr,
    pub ollama_url: String,
    pub ollama_model: String,
    pub assistant_timeout: Duration,
    pub history_limit: usize,
    pub log_format: LogFormat,
    /// Variables that were set but could not be parsed
    rejected: Vec<(String, String)>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Values that fail to parse keep their default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut rejected = Vec::new();

        let parsed = |key: &str, default: &str| -> String {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let db_path = parsed("DASHBOARD_DB_PATH", DEFAULT_DB_PATH);
        let ollama_url = parsed("OLLAMA_URL", DEFAULT_OLLAMA_URL);
        let ollama_model = parsed("OLLAMA_MODEL", DEFAULT_OLLAMA_MODEL);
        let raw_addr = parsed("DASHBOARD_LISTEN_ADDR", DEFAULT_LISTEN_ADDR);
        let raw_timeout = parsed(
            "ASSISTANT_TIMEOUT_SECS",
            &DEFAULT_ASSISTANT_TIMEOUT_SECS.to_string(),
        );
        let raw_history = parsed("ASSISTANT_HISTORY_LIMIT", &DEFAULT_HISTORY_LIMIT.to_string());
        let raw_format = parsed("DASHBOARD_LOG_FORMAT", "text");

        let listen_addr = parse_or(&mut rejected, "DASHBOARD_LISTEN_ADDR", &raw_addr, || {
            SocketAddr::from(([0, 0, 0, 0], 5000))
        });
        let timeout_secs = parse_or(&mut rejected, "ASSISTANT_TIMEOUT_SECS", &raw_timeout, || {
            DEFAULT_ASSISTANT_TIMEOUT_SECS
        });
        let history_limit = parse_or(&mut rejected, "ASSISTANT_HISTORY_LIMIT", &raw_history, || {
            DEFAULT_HISTORY_LIMIT
        });
        let log_format = parse_or(&mut rejected, "DASHBOARD_LOG_FORMAT", &raw_format, || {
            LogFormat::Text
        });

        Config {
            db_path,
            listen_addr,
            ollama_url,
            ollama_model,
            assistant_timeout: Duration::from_secs(timeout_secs),
            history_limit,
            log_format,
            rejected,
        }
    }

    /// Config is read before logging exists; call this once tracing is up.
    pub fn log_rejected(&self) {
        for (key, value) in &self.rejected {
            tracing::warn!(
                key = %key,
                value = %value,
                "Ignoring unparseable setting, using default"
            );
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

fn parse_or<T, D>(rejected: &mut Vec<(String, String)>, key: &str, raw: &str, default: D) -> T
where
    T: FromStr,
    D: FnOnce() -> T,
{
    match raw.parse() {
        Ok(v) => v,
        Err(_) => {
            rejected.push((key.to_string(), raw.to_string()));
            default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();

        assert_eq!(config.db_path, "financials.db");
        assert_eq!(config.listen_addr, "0.0.0.0:5000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.ollama_url, "http://localhost:11434");
        assert_eq!(config.ollama_model, "llama3:8b");
        assert_eq!(config.assistant_timeout, Duration::from_secs(120));
        assert_eq!(config.history_limit, 5);
        assert_eq!(config.log_format, LogFormat::Text);
        assert!(config.rejected.is_empty());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("DASHBOARD_DB_PATH", "/tmp/metrics.db"),
            ("DASHBOARD_LISTEN_ADDR", "127.0.0.1:8080"),
            ("OLLAMA_URL", "http://gpu-box:11434"),
            ("OLLAMA_MODEL", "mistral"),
            ("ASSISTANT_TIMEOUT_SECS", "30"),
            ("ASSISTANT_HISTORY_LIMIT", "10"),
            ("DASHBOARD_LOG_FORMAT", "JSON"),
        ]));

        assert_eq!(config.db_path, "/tmp/metrics.db");
        assert_eq!(config.listen_addr.port(), 8080);
        assert_eq!(config.ollama_url, "http://gpu-box:11434");
        assert_eq!(config.ollama_model, "mistral");
        assert_eq!(config.assistant_timeout, Duration::from_secs(30));
        assert_eq!(config.history_limit, 10);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_bad_values_fall_back() {
        let config = Config::from_lookup(lookup_from(&[
            ("DASHBOARD_LISTEN_ADDR", "not-an-address"),
            ("ASSISTANT_TIMEOUT_SECS", "soon"),
            ("DASHBOARD_LOG_FORMAT", "xml"),
            ("DASHBOARD_DB_PATH", "   "),
        ]));

        assert_eq!(config.listen_addr.port(), 5000);
        assert_eq!(config.assistant_timeout, Duration::from_secs(120));
        assert_eq!(config.log_format, LogFormat::Text);
        assert_eq!(config.db_path, "financials.db");

        let rejected: Vec<&str> = config.rejected.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(
            rejected,
            vec!["DASHBOARD_LISTEN_ADDR", "ASSISTANT_TIMEOUT_SECS", "DASHBOARD_LOG_FORMAT"]
        );
    }
}
