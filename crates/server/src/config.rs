//! Listener and HTTP settings. Engine tuning lives in the pipeline YAML
//! referenced by `pipeline_config`.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Environment prefix for overrides, e.g. `SHARKID_SERVER__PORT=9000`.
pub const ENV_PREFIX: &str = "SHARKID_SERVER";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub port: u16,
    /// Whole-request deadline; video uploads are sampled inside it.
    pub timeout_secs: u64,
    /// Upload cap in MiB, sized for short dive clips.
    pub max_body_size_mb: usize,
    pub enable_cors: bool,
    /// `EnvFilter` directive, e.g. `info` or `server=debug,index=info`.
    pub log_level: String,
    /// Install the Prometheus recorder and serve `/metrics`.
    pub metrics_enabled: bool,
    /// Pipeline YAML. Unset means built-in defaults plus environment
    /// overrides such as `EMBEDDINGS_PATH`.
    pub pipeline_config: Option<PathBuf>,
    /// Replaces `workers.frame_workers` from the pipeline YAML.
    pub frame_workers: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0".into(),
            port: 8001,
            timeout_secs: 120,
            max_body_size_mb: 200,
            enable_cors: true,
            log_level: "info".into(),
            metrics_enabled: true,
            pipeline_config: None,
            frame_workers: None,
        }
    }
}

impl ServerConfig {
    /// Read an optional `server.{toml,yaml,json}` from the working directory,
    /// then layer `SHARKID_SERVER__*` variables on top.
    pub fn load() -> anyhow::Result<Self> {
        let loaded: ServerConfig = config::Config::builder()
            .add_source(config::File::with_name("server").required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?
            .try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_body_size_mb == 0 {
            anyhow::bail!("max_body_size_mb must be > 0");
        }
        if self.timeout_secs == 0 {
            anyhow::bail!("timeout_secs must be > 0");
        }
        if self.frame_workers == Some(0) {
            anyhow::bail!("frame_workers must be >= 1");
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.bind_addr, self.port).parse()?)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Body limit in bytes.
    pub fn max_body_size(&self) -> usize {
        self.max_body_size_mb.saturating_mul(1024 * 1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_listen_on_ml_port() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.socket_addr().unwrap().port(), 8001);
        assert_eq!(cfg.timeout(), Duration::from_secs(120));
        assert_eq!(cfg.max_body_size(), 200 * 1024 * 1024);
        assert!(cfg.pipeline_config.is_none());
        cfg.validate().unwrap();
    }

    #[test]
    fn partial_document_keeps_remaining_defaults() {
        let cfg: ServerConfig =
            serde_json::from_str(r#"{"port": 9000, "pipeline_config": "/etc/sharkid.yaml"}"#)
                .unwrap();
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.bind_addr, "0.0.0.0");
        assert_eq!(cfg.pipeline_config, Some(PathBuf::from("/etc/sharkid.yaml")));
    }

    #[test]
    fn zero_limits_are_rejected() {
        let cfg = ServerConfig {
            max_body_size_mb: 0,
            ..ServerConfig::default()
        };
        assert!(cfg.validate().is_err());
        let cfg = ServerConfig {
            frame_workers: Some(0),
            ..ServerConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn bad_bind_address_is_an_error() {
        let cfg = ServerConfig {
            bind_addr: "not an address".into(),
            ..ServerConfig::default()
        };
        assert!(cfg.socket_addr().is_err());
    }
}
