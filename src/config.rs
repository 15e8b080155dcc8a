use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Directory name the agent is installed under when it lives inside the
/// workspace it serves. A process started from there confines to the parent.
const AGENT_DIR: &str = ".steward";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub root: Root,
    pub server: Server,
    pub auth: Auth,
    pub limits: Limits,
    pub terminal: Terminal,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Root {
    pub root_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Server {
    pub bind_addr: String,
    pub port: u16,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".to_string(),
            port: 3001,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Auth {
    /// Pre-shared token required on the terminal upgrade. Absent means the
    /// open (insecure, trusted-network) variant.
    pub bearer_token: Option<String>,
    /// Exact origins, or `*.suffix` wildcard entries.
    pub allowed_origins: Vec<String>,
}

impl Default for Auth {
    fn default() -> Self {
        Self {
            bearer_token: None,
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "*.app.github.dev".to_string(),
            ],
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Limits {
    pub max_request_kb: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_request_kb: 10 * 1024,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Terminal {
    /// Shell binary for terminal sessions; platform default when unset.
    pub shell: Option<String>,
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)?;
        if path.extension().map(|e| e == "json").unwrap_or(false) {
            Ok(serde_json::from_str(&raw)?)
        } else {
            Ok(toml::from_str(&raw)?)
        }
    }

    /// Missing config file is not an error; every section has defaults.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(dir) = &self.root.root_dir {
            if !dir.is_dir() {
                anyhow::bail!(
                    "root_dir does not exist or is not a directory: {}",
                    dir.display()
                );
            }
        }
        if let Some(token) = &self.auth.bearer_token {
            if token.trim().is_empty() {
                anyhow::bail!("bearer_token must not be empty when set");
            }
        }
        if self.auth.allowed_origins.is_empty() {
            anyhow::bail!("allowed_origins must not be empty");
        }
        if self.limits.max_request_kb == 0 {
            anyhow::bail!("max_request_kb must be > 0");
        }
        Ok(())
    }

    /// The directory terminal sessions and file operations are confined to.
    /// Explicit `root_dir` wins; otherwise the invocation directory, except
    /// that an agent launched from its own install dir serves the parent.
    pub fn workdir(&self) -> anyhow::Result<PathBuf> {
        if let Some(dir) = &self.root.root_dir {
            return Ok(dir.clone());
        }
        let cwd = std::env::current_dir()?;
        if cwd.file_name().map(|n| n == AGENT_DIR).unwrap_or(false) {
            if let Some(parent) = cwd.parent() {
                return Ok(parent.to_path_buf());
            }
        }
        Ok(cwd)
    }
}
