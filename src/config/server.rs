use super::{parse_or, VarSource};
use crate::core::Result;

/// Server configuration for HTTP server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
}

impl ServerConfig {
    pub fn new(host: String, port: u16) -> Self {
        Self {
            host,
            port,
            workers: num_cpus::get() * 2, // 2x CPU cores for I/O-bound workload
        }
    }

    pub(crate) fn from_source(vars: VarSource<'_>) -> Result<Self> {
        let host = vars("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_or(vars, "SERVER_PORT", 8080)?;
        Ok(Self::new(host, port))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
