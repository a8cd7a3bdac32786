use std::path::Path;
use thiserror::Error;
use tokio::fs;

use crate::config::models::ServerConfig;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML config: {0}")]
    ParseError(#[from] serde_yaml::Error),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

pub async fn load_config<P: AsRef<Path>>(path: P) -> ConfigResult<ServerConfig> {
    let config_content = fs::read_to_string(path).await?;
    let config: ServerConfig = serde_yaml::from_str(&config_content)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn loads_yaml_config_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
listen_addr: "127.0.0.1:8080"
routes:
  "/api":
    type: proxy
    target: "http://webserver:5001/api/"
"#
        )
        .unwrap();

        let config = load_config(file.path()).await.unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:8080");
        assert!(config.routes.contains_key("/api"));
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let err = load_config("/nonexistent/devproxy.yaml").await.unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }

    #[tokio::test]
    async fn malformed_yaml_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "listen_addr: [not a string").unwrap();

        let err = load_config(file.path()).await.unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }
}
