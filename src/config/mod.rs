//! Configuration module for RSP Runner.
//!
//! This module handles parsing, validation, and access to the settings that
//! control how the backing RSP server is launched, how the RPC session behaves
//! and how server output is surfaced. Configurations load from JSON or YAML
//! files or strings.
//!
//! # Examples
//!
//! Loading a configuration from a file:
//!
//! ```no_run
//! use rsp_runner::config::Config;
//!
//! let config = Config::from_file("rsp.json").unwrap();
//! println!("RSP server port search starts at {}", config.launcher.base_port);
//! ```
//!
//! Creating a configuration programmatically:
//!
//! ```
//! use rsp_runner::config::{validate_config, Config, LauncherConfig};
//!
//! let config = Config {
//!     show_channel_on_server_output: false,
//!     launcher: LauncherConfig {
//!         base_port: 28000,
//!         ..LauncherConfig::default()
//!     },
//!     ..Config::default()
//! };
//! validate_config(&config).unwrap();
//! ```
mod parser;
pub mod validator;

pub use parser::{Config, DEFAULT_BASE_PORT, LauncherConfig, SessionConfig};
pub use validator::validate_config;
