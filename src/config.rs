use std::convert::TryFrom;
use std::path::{Path, PathBuf};

use rawhttp::server::ServerConfig;

#[derive(thiserror::Error, Debug)]
pub(crate) enum Error {
    #[error("Unable to find configuration file at {0}")]
    FileNotFound(PathBuf),
    #[error("Unable to read configuration file: {0}")]
    FileReadError(#[from] std::io::Error),
    #[error("Configuration file is not valid toml: {0}")]
    FileFormatSyntaxError(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Loads server settings, starting from the built-in defaults.
///
/// ```toml
/// [rawhttpd]
/// bind = "0.0.0.0:4221"
/// keep-alive = true
/// read-buffer-size = 1024
/// ```
pub(crate) fn load<P: AsRef<Path>>(path: Option<P>) -> Result<ServerConfig, Error> {
    let mut result = ServerConfig::default();

    if let Some(config_path) = path {
        let config_path = config_path.as_ref();
        if ! config_path.is_file() {
            return Err(Error::FileNotFound(config_path.to_path_buf()));
        }
        let config = std::fs::read(config_path)?;
        let toml = toml::from_slice::<toml::Value>(&config)?;
        apply(&mut result, &toml)?;
        log::debug!("Loaded configuration from {}", config_path.to_string_lossy());
    }

    Ok(result)
}

fn apply(result: &mut ServerConfig, toml: &toml::Value) -> Result<(), Error> {
    let section = toml.get("rawhttpd").ok_or(Error::InvalidConfiguration("missing configuration key: rawhttpd".into()))?;

    if let Some(bind) = section.get("bind") {
        let bind = bind.as_str().ok_or(Error::InvalidConfiguration("rawhttpd.bind must be a string".into()))?;
        result.bind_address = bind.to_string();
    }

    if let Some(keep_alive) = section.get("keep-alive") {
        result.keep_alive = keep_alive.as_bool().ok_or(Error::InvalidConfiguration("rawhttpd.keep-alive must be a boolean".into()))?;
    }

    if let Some(size) = section.get("read-buffer-size") {
        let size = size
            .as_integer()
            .and_then(|s| usize::try_from(s).ok())
            .filter(|&s| s > 0)
            .ok_or(Error::InvalidConfiguration("rawhttpd.read-buffer-size must be a positive integer".into()))?;
        result.read_buffer_size = size;
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    fn from_str(s: &str) -> Result<ServerConfig, Error> {
        let mut result = ServerConfig::default();
        apply(&mut result, &toml::from_str::<toml::Value>(s).unwrap())?;
        Ok(result)
    }

    #[test]
    fn no_file_means_defaults() {
        let config = load(None::<PathBuf>).unwrap();

        assert_eq!(config.bind_address, "0.0.0.0:4221");
        assert!(config.keep_alive);
        assert_eq!(config.read_buffer_size, 1024);
    }

    #[test]
    fn file_values_override_defaults() {
        let config = from_str(
            r#"
            [rawhttpd]
            bind = "127.0.0.1:8080"
            keep-alive = false
            read-buffer-size = 4096
            "#,
        )
        .unwrap();

        assert_eq!(config.bind_address, "127.0.0.1:8080");
        assert!(!config.keep_alive);
        assert_eq!(config.read_buffer_size, 4096);
    }

    #[test]
    fn unspecified_keys_keep_defaults() {
        let config = from_str("[rawhttpd]\nkeep-alive = false\n").unwrap();

        assert_eq!(config.bind_address, "0.0.0.0:4221");
        assert_eq!(config.read_buffer_size, 1024);
    }

    #[test]
    fn missing_section_is_invalid() {
        assert!(matches!(from_str("[other]\n"), Err(Error::InvalidConfiguration(_))));
    }

    #[test]
    fn rejects_wrongly_typed_values() {
        assert!(matches!(from_str("[rawhttpd]\nbind = 4221\n"), Err(Error::InvalidConfiguration(_))));
        assert!(matches!(from_str("[rawhttpd]\nkeep-alive = \"yes\"\n"), Err(Error::InvalidConfiguration(_))));
        assert!(matches!(from_str("[rawhttpd]\nread-buffer-size = 0\n"), Err(Error::InvalidConfiguration(_))));
        assert!(matches!(from_str("[rawhttpd]\nread-buffer-size = -5\n"), Err(Error::InvalidConfiguration(_))));
    }

    #[test]
    fn missing_file_is_reported() {
        let result = load(Some("/definitely/not/here/rawhttpd.toml"));

        assert!(matches!(result, Err(Error::FileNotFound(_))));
    }
}
