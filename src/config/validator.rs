use crate::config::{Config, LauncherConfig, SessionConfig};
use crate::error::{Error, Result};

/// Validates the launcher settings
pub fn validate_launcher_config(config: &LauncherConfig) -> Result<()> {
    if config.base_port == 0 {
        return Err(Error::ConfigInvalid("Base port must not be 0".to_string()));
    }

    if config.max_port_attempts == 0 {
        return Err(Error::ConfigInvalid(
            "At least one port attempt is required".to_string(),
        ));
    }

    // The whole search window has to fit in the port space
    if config
        .base_port
        .checked_add(config.max_port_attempts - 1)
        .is_none()
    {
        return Err(Error::ConfigInvalid(format!(
            "Port range starting at {} with {} attempts exceeds 65535",
            config.base_port, config.max_port_attempts
        )));
    }

    if config.startup_timeout_ms == 0 {
        return Err(Error::ConfigInvalid(
            "Startup timeout must be greater than 0".to_string(),
        ));
    }

    if config.poll_interval_ms == 0 || config.poll_interval_ms >= config.startup_timeout_ms {
        return Err(Error::ConfigInvalid(format!(
            "Poll interval {}ms must be non-zero and shorter than the startup timeout {}ms",
            config.poll_interval_ms, config.startup_timeout_ms
        )));
    }

    Ok(())
}

/// Validates the session settings
pub fn validate_session_config(config: &SessionConfig) -> Result<()> {
    if config.request_timeout_ms == 0 {
        return Err(Error::ConfigInvalid(
            "Request timeout must be greater than 0".to_string(),
        ));
    }

    if config.restart_timeout_ms == 0 {
        return Err(Error::ConfigInvalid(
            "Restart timeout must be greater than 0".to_string(),
        ));
    }

    Ok(())
}

/// Full configuration validation
pub fn validate_config(config: &Config) -> Result<()> {
    validate_launcher_config(&config.launcher)?;
    validate_session_config(&config.session)?;

    Ok(())
}
