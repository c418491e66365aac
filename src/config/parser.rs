use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default first port tried when allocating the RSP server port.
pub const DEFAULT_BASE_PORT: u16 = 27511;

/// Settings for launching the backing RSP server process.
///
/// Every field has a default, so an empty object is a valid launcher
/// configuration.
///
/// # Examples
///
/// ```
/// use rsp_runner::config::LauncherConfig;
///
/// let launcher = LauncherConfig::default();
/// assert_eq!(launcher.base_port, 27511);
/// assert!(launcher.server_location.is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LauncherConfig {
    /// Install location of the RSP server.
    ///
    /// The `RSP_SERVER_LOCATION` environment variable takes precedence over
    /// this value. When neither is set the bundled `server` directory next to
    /// the running executable is used.
    pub server_location: Option<PathBuf>,

    /// Java installation used to run the server. Falls back to `JAVA_HOME`
    /// and then to `java` on the `PATH`.
    pub java_home: Option<PathBuf>,

    /// First port tried.
    pub base_port: u16,

    /// How many consecutive ports are tried before giving up.
    pub max_port_attempts: u16,

    /// How long to wait for the server port to accept connections.
    pub startup_timeout_ms: u64,

    /// Delay between two connection attempts while waiting for the port.
    pub poll_interval_ms: u64,

    /// Extra JVM arguments placed before `-jar`.
    pub jvm_args: Vec<String>,

    /// How long the server may take to exit on its own after the shutdown
    /// notification before it is killed.
    pub shutdown_grace_ms: u64,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            server_location: None,
            java_home: None,
            base_port: DEFAULT_BASE_PORT,
            max_port_attempts: 100,
            startup_timeout_ms: 30_000,
            poll_interval_ms: 250,
            jvm_args: Vec::new(),
            shutdown_grace_ms: 5_000,
        }
    }
}

impl LauncherConfig {
    /// Startup timeout as a [`Duration`].
    pub fn startup_timeout(&self) -> Duration {
        Duration::from_millis(self.startup_timeout_ms)
    }

    /// Poll interval as a [`Duration`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Shutdown grace period as a [`Duration`].
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

/// Settings for the RPC session with the RSP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionConfig {
    /// Per-request timeout enforced by the transport.
    pub request_timeout_ms: u64,

    /// How long `restart` waits for the stopped notification.
    pub restart_timeout_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 60_000,
            restart_timeout_ms: 30_000,
        }
    }
}

impl SessionConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn restart_timeout(&self) -> Duration {
        Duration::from_millis(self.restart_timeout_ms)
    }
}

/// Main configuration for the RSP Runner.
///
/// # JSON Schema
///
/// ```json
/// {
///   "showChannelOnServerOutput": true,
///   "launcher": {
///     "serverLocation": "/opt/rsp/server",
///     "basePort": 27511,
///     "startupTimeoutMs": 30000,
///     "shutdownGraceMs": 5000
///   },
///   "session": {
///     "requestTimeoutMs": 60000
///   }
/// }
/// ```
///
/// # Examples
///
/// ```
/// use rsp_runner::config::Config;
///
/// let config = Config::parse_from_str(r#"{ "showChannelOnServerOutput": false }"#).unwrap();
/// assert!(!config.show_channel_on_server_output);
/// assert_eq!(config.launcher.base_port, 27511);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Bring a server's output channel to the foreground whenever new
    /// output arrives for it.
    pub show_channel_on_server_output: bool,

    /// Process launch settings.
    pub launcher: LauncherConfig,

    /// RPC session settings.
    pub session: SessionConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            show_channel_on_server_output: true,
            launcher: LauncherConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

impl Config {
    /// Loads a configuration from a file path.
    ///
    /// Files ending in `.yaml` or `.yml` are parsed as YAML, everything else
    /// as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// * The file cannot be read
    /// * The file contents cannot be parsed
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::ConfigParse(format!("Failed to read config file: {}", e)))?;

        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

        if is_yaml {
            Self::parse_from_yaml_str(&content)
        } else {
            Self::parse_from_str(&content)
        }
    }

    /// Parses a configuration from a JSON string.
    pub fn parse_from_str(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| Error::ConfigParse(format!("Failed to parse JSON config: {}", e)))
    }

    /// Parses a configuration from a YAML string.
    pub fn parse_from_yaml_str(content: &str) -> Result<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| Error::ConfigParse(format!("Failed to parse YAML config: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config_str = r#"{
            "showChannelOnServerOutput": false,
            "launcher": {
                "serverLocation": "/opt/rsp/server",
                "javaHome": "/usr/lib/jvm/java-17",
                "basePort": 30000,
                "maxPortAttempts": 5,
                "startupTimeoutMs": 1000,
                "pollIntervalMs": 50,
                "jvmArgs": ["-Xmx512m"],
                "shutdownGraceMs": 750
            },
            "session": { "requestTimeoutMs": 5000 }
        }"#;

        let config = Config::parse_from_str(config_str).unwrap();

        assert!(!config.show_channel_on_server_output);
        assert_eq!(
            config.launcher.server_location,
            Some(PathBuf::from("/opt/rsp/server"))
        );
        assert_eq!(config.launcher.base_port, 30000);
        assert_eq!(config.launcher.max_port_attempts, 5);
        assert_eq!(config.launcher.startup_timeout(), Duration::from_secs(1));
        assert_eq!(config.launcher.jvm_args, vec!["-Xmx512m"]);
        assert_eq!(config.launcher.shutdown_grace(), Duration::from_millis(750));
        assert_eq!(config.session.request_timeout(), Duration::from_secs(5));
        // unspecified fields keep their defaults
        assert_eq!(config.session.restart_timeout_ms, 30_000);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse_from_str("{}").unwrap();
        assert!(config.show_channel_on_server_output);
        assert_eq!(config.launcher.base_port, DEFAULT_BASE_PORT);
        assert_eq!(config.launcher.shutdown_grace_ms, 5_000);
    }

    #[test]
    fn test_parse_yaml_config() {
        let yaml = "showChannelOnServerOutput: false\nlauncher:\n  basePort: 28000\n";
        let config = Config::parse_from_yaml_str(yaml).unwrap();
        assert!(!config.show_channel_on_server_output);
        assert_eq!(config.launcher.base_port, 28000);
    }
}
