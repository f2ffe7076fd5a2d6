//! Runtime configuration.
//!
//! Values come from built-in defaults, optionally replaced by a YAML file named
//! in `WISECOW_CONFIG`, then by the `LISTEN` and `PORT` environment variables.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, bail};
use serde::Deserialize;

pub const DEFAULT_PORT: u16 = 4499;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub timeouts: TimeoutConfig,
    pub fortune: FortuneConfig,
    pub renderer: RendererConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the acceptor binds to.
    pub listen_addr: String,
    /// Connections handled at once. 1 keeps the accept loop strictly sequential.
    pub max_in_flight: usize,
    /// Longest request line accepted before the connection is dropped.
    pub max_request_line: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub read_secs: u64,
    pub generate_secs: u64,
    pub write_secs: u64,
    pub linger_millis: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityKind {
    /// Spawn an external program per request.
    Command,
    /// Generate in-process.
    Builtin,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FortuneConfig {
    pub source: CapabilityKind,
    pub program: String,
    pub args: Vec<String>,
    /// Messages for the builtin source. Empty means the bundled list.
    pub messages: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    pub kind: CapabilityKind,
    pub program: String,
    pub args: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: format!("0.0.0.0:{}", DEFAULT_PORT),
            max_in_flight: 1,
            max_request_line: 8192,
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            read_secs: 10,
            generate_secs: 10,
            write_secs: 10,
            linger_millis: 500,
        }
    }
}

impl Default for FortuneConfig {
    fn default() -> Self {
        Self {
            source: CapabilityKind::Command,
            program: "fortune".to_string(),
            args: Vec::new(),
            messages: Vec::new(),
        }
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            kind: CapabilityKind::Command,
            program: "cowsay".to_string(),
            args: Vec::new(),
        }
    }
}

impl TimeoutConfig {
    pub fn read(&self) -> Duration {
        Duration::from_secs(self.read_secs)
    }

    pub fn generate(&self) -> Duration {
        Duration::from_secs(self.generate_secs)
    }

    pub fn write(&self) -> Duration {
        Duration::from_secs(self.write_secs)
    }

    pub fn linger(&self) -> Duration {
        Duration::from_millis(self.linger_millis)
    }
}

impl Config {
    /// Loads configuration from the process environment.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// Loads configuration using `lookup` in place of the process environment.
    pub fn load_with<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = match lookup("WISECOW_CONFIG") {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };

        if let Some(listen) = lookup("LISTEN") {
            cfg.server.listen_addr = listen;
        }

        if let Some(port) = lookup("PORT") {
            let port: u16 = port
                .trim()
                .parse()
                .with_context(|| format!("invalid PORT value {:?}", port))?;
            let mut addr = cfg.listen_socket_addr()?;
            addr.set_port(port);
            cfg.server.listen_addr = addr.to_string();
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        let cfg: Config = serde_yaml::from_str(content)?;
        Ok(cfg)
    }

    pub fn listen_socket_addr(&self) -> anyhow::Result<SocketAddr> {
        self.server
            .listen_addr
            .parse()
            .with_context(|| format!("invalid listen address {:?}", self.server.listen_addr))
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.listen_socket_addr()?;

        if self.server.max_in_flight == 0 {
            bail!("server.max_in_flight must be at least 1");
        }
        if self.server.max_request_line == 0 {
            bail!("server.max_request_line must be at least 1");
        }

        let t = &self.timeouts;
        if t.read_secs == 0 || t.generate_secs == 0 || t.write_secs == 0 {
            bail!("timeouts must be greater than zero");
        }

        if self.fortune.source == CapabilityKind::Command && self.fortune.program.trim().is_empty() {
            bail!("fortune.program must not be empty");
        }
        if self.renderer.kind == CapabilityKind::Command && self.renderer.program.trim().is_empty() {
            bail!("renderer.program must not be empty");
        }

        Ok(())
    }
}
