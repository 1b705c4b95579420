//! Module containing error types used in Silo
use err_derive::Error;

/// Errors of this crate
#[derive(Debug, Error)]
pub enum Error {
	#[error(display = "IO error: {}", _0)]
	Io(#[error(source)] std::io::Error),

	#[error(display = "Invalid TOML: {}", _0)]
	TomlDecode(#[error(source)] toml::de::Error),

	#[error(display = "{}", _0)]
	Message(String),
}

impl From<&str> for Error {
	fn from(v: &str) -> Error {
		Error::Message(v.to_string())
	}
}
