// MIT License - Copyright (c) 2026 lares2mqtt contributors
// Lares HTTP/XML bridge

use std::time::Duration;

/// Default TCP port of the panel's embedded web server.
pub const DEFAULT_PORT: u16 = 4202;

/// Default per-poll timeout and poll interval, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_SCAN_INTERVAL_SECS: u64 = 10;

/// Paths of the XML resources, relative to `/xml/`.
///
/// The info, zone and output paths are fixed by the firmware. The partition
/// paths are overridable because not every firmware serves them under the
/// same name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePaths {
    pub general_info: String,
    pub zones_description: String,
    pub zones_status: String,
    pub outputs_description: String,
    pub outputs_status: String,
    pub partitions_description: String,
    pub partitions_status: String,
}

impl Default for ResourcePaths {
    fn default() -> Self {
        Self {
            general_info: "info/generalInfo.xml".to_string(),
            zones_description: "zones/zonesDescription48IP.xml".to_string(),
            zones_status: "zones/zonesStatus48IP.xml".to_string(),
            outputs_description: "outputs/outputsDescription48IP.xml".to_string(),
            outputs_status: "outputs/outputsStatus48IP.xml".to_string(),
            partitions_description: "partitions/partitionsDescription48IP.xml".to_string(),
            partitions_status: "partitions/partitionsStatus48IP.xml".to_string(),
        }
    }
}

/// Connection parameters for one panel.
///
/// Immutable once built; construct it through [`PanelConnection::builder`].
#[derive(Debug, Clone)]
pub struct PanelConnection {
    host: String,
    port: u16,
    username: String,
    password: String,
    timeout: Duration,
    paths: ResourcePaths,
}

impl Default for PanelConnection {
    fn default() -> Self {
        Self {
            host: "192.168.1.100".to_string(),
            port: DEFAULT_PORT,
            username: String::new(),
            password: String::new(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            paths: ResourcePaths::default(),
        }
    }
}

impl PanelConnection {
    pub fn builder() -> PanelConnectionBuilder {
        PanelConnectionBuilder::default()
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    /// Per-request timeout applied by the HTTP client.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn paths(&self) -> &ResourcePaths {
        &self.paths
    }

    /// `http://{host}:{port}`
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// `http://{host}:{port}/xml/{path}`
    pub fn resource_url(&self, path: &str) -> String {
        format!("{}/xml/{}", self.base_url(), path.trim_start_matches('/'))
    }
}

/// Builder for PanelConnection.
#[derive(Debug, Clone, Default)]
pub struct PanelConnectionBuilder {
    config: PanelConnection,
}

impl PanelConnectionBuilder {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// `None` keeps the default port.
    pub fn port(mut self, port: Option<u16>) -> Self {
        self.config.port = port.unwrap_or(DEFAULT_PORT);
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.config.username = username.into();
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.config.password = password.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn partitions_description_path(mut self, path: impl Into<String>) -> Self {
        self.config.paths.partitions_description = path.into();
        self
    }

    pub fn partitions_status_path(mut self, path: impl Into<String>) -> Self {
        self.config.paths.partitions_status = path.into();
        self
    }

    pub fn build(self) -> PanelConnection {
        self.config
    }
}
