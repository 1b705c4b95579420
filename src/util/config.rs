//! Contains type and functions related to Silo configuration file
use std::io::Read;
use std::path::PathBuf;

use serde::Deserialize;

use crate::error::Error;

/// Represent the whole configuration
#[derive(Deserialize, Debug, Clone)]
pub struct Config {
	/// Key datanodes in the node registry by their resolved hostname instead
	/// of their IP address
	#[serde(default)]
	pub use_datanode_hostnames: bool,

	/// Configuration for the administrative lifecycle controller
	#[serde(default)]
	pub admin: AdminConfig,
}

/// Configuration for the administrative lifecycle controller
#[derive(Deserialize, Debug, Clone)]
pub struct AdminConfig {
	/// Interval in seconds at which the progress of draining nodes is
	/// evaluated. Non-positive values are replaced by the default at startup.
	#[serde(default = "default_admin_monitor_interval_secs")]
	pub monitor_interval_secs: i64,
}

impl Default for AdminConfig {
	fn default() -> Self {
		Self {
			monitor_interval_secs: default_admin_monitor_interval_secs(),
		}
	}
}

pub fn default_admin_monitor_interval_secs() -> i64 {
	30
}

/// Read and parse configuration
pub fn read_config(config_file: PathBuf) -> Result<Config, Error> {
	let mut file = std::fs::OpenOptions::new()
		.read(true)
		.open(config_file.as_path())?;

	let mut config = String::new();
	file.read_to_string(&mut config)?;

	Ok(toml::from_str(&config)?)
}
