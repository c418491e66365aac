use rsp_runner::config::{Config, validate_config};
use rsp_runner::error::{Error, Result};
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

#[test]
fn test_load_json_file() -> Result<()> {
    let mut file = NamedTempFile::with_suffix(".json")?;
    write!(
        file,
        r#"{{
            "launcher": {{
                "serverLocation": "/opt/rsp/server",
                "jvmArgs": ["-Xmx1g", "-Dfile.encoding=UTF-8"]
            }}
        }}"#
    )?;

    let config = Config::from_file(file.path())?;

    assert_eq!(
        config.launcher.server_location,
        Some(PathBuf::from("/opt/rsp/server"))
    );
    assert_eq!(config.launcher.jvm_args.len(), 2);
    assert!(config.show_channel_on_server_output);
    validate_config(&config)?;
    Ok(())
}

#[test]
fn test_load_yaml_file() -> Result<()> {
    let mut file = NamedTempFile::with_suffix(".yml")?;
    writeln!(file, "showChannelOnServerOutput: false")?;
    writeln!(file, "launcher:")?;
    writeln!(file, "  javaHome: /usr/lib/jvm/java-17")?;
    writeln!(file, "  maxPortAttempts: 10")?;
    writeln!(file, "session:")?;
    writeln!(file, "  restartTimeoutMs: 5000")?;

    let config = Config::from_file(file.path())?;

    assert!(!config.show_channel_on_server_output);
    assert_eq!(
        config.launcher.java_home,
        Some(PathBuf::from("/usr/lib/jvm/java-17"))
    );
    assert_eq!(config.launcher.max_port_attempts, 10);
    assert_eq!(config.session.restart_timeout_ms, 5000);
    Ok(())
}

#[test]
fn test_missing_file() {
    let result = Config::from_file("/definitely/not/here/rsp.json");
    assert!(matches!(result, Err(Error::ConfigParse(_))));
}

#[test]
fn test_malformed_json() {
    let result = Config::parse_from_str(r#"{ "launcher": { "basePort": "high" } }"#);
    assert!(matches!(result, Err(Error::ConfigParse(_))));
}

#[test]
fn test_validate_config() -> Result<()> {
    validate_config(&Config::default())?;

    let invalid = [
        r#"{ "launcher": { "basePort": 0 } }"#,
        r#"{ "launcher": { "maxPortAttempts": 0 } }"#,
        r#"{ "launcher": { "basePort": 65500, "maxPortAttempts": 100 } }"#,
        r#"{ "launcher": { "startupTimeoutMs": 0 } }"#,
        r#"{ "launcher": { "startupTimeoutMs": 1000, "pollIntervalMs": 1000 } }"#,
        r#"{ "launcher": { "pollIntervalMs": 0 } }"#,
        r#"{ "session": { "requestTimeoutMs": 0 } }"#,
        r#"{ "session": { "restartTimeoutMs": 0 } }"#,
    ];
    for config in invalid {
        let config = Config::parse_from_str(config)?;
        assert!(
            matches!(validate_config(&config), Err(Error::ConfigInvalid(_))),
            "expected {:?} to be rejected",
            config
        );
    }

    // The last port of the search window may be 65535
    let edge = Config::parse_from_str(r#"{ "launcher": { "basePort": 65436, "maxPortAttempts": 100 } }"#)?;
    validate_config(&edge)?;
    Ok(())
}
