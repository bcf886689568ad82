// MIT License - Copyright (c) 2026 lares2mqtt contributors
// Lares HTTP/XML bridge

use tracing::{debug, trace, Instrument, Span};

use crate::config::PanelConnection;
use crate::devices::{DeviceInfo, OutputStatus, PartitionStatus, ZoneStatus};
use crate::error::{LaresError, Result};
use crate::xml;

/// HTTP client for a Lares panel's `/xml/` resources.
///
/// Every call is an independent, authenticated GET. The client holds no
/// mutable state, so it can be cloned freely and polled concurrently.
///
/// The `fetch_*` methods are best-effort: any failure is logged once at
/// debug level and reported as `None` ("data temporarily unavailable").
/// The matching `try_*` methods return the [`LaresError`] instead.
///
/// # Example
///
/// ```no_run
/// use lares_bridge::{PanelClient, PanelConnection};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let conn = PanelConnection::builder()
///         .host("192.168.1.50")
///         .username("admin")
///         .password("secret")
///         .build();
///     let client = PanelClient::new(conn)?;
///
///     if let Some(info) = client.fetch_device_info().await {
///         println!("{} ({})", info.name, info.info);
///     }
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct PanelClient {
    connection: PanelConnection,
    http: reqwest::Client,
    span: Span,
}

impl PanelClient {
    /// Create a client that logs under a `lares_panel{host, port}` span.
    pub fn new(connection: PanelConnection) -> Result<Self> {
        let span = tracing::debug_span!(
            "lares_panel",
            host = %connection.host(),
            port = connection.port()
        );
        Self::with_span(connection, span)
    }

    /// Create a client whose diagnostics are recorded inside `span`.
    pub fn with_span(connection: PanelConnection, span: Span) -> Result<Self> {
        // No idle pool: each request opens its own connection and releases
        // it before the call returns.
        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(0)
            .timeout(connection.timeout())
            .build()
            .map_err(|e| LaresError::unexpected(format!("HTTP client setup failed: {e}")))?;
        Ok(Self {
            connection,
            http,
            span,
        })
    }

    pub fn connection(&self) -> &PanelConnection {
        &self.connection
    }

    // ── Best-effort API ──────────────────────────────────────────────

    pub async fn fetch_device_info(&self) -> Option<DeviceInfo> {
        let result = self.try_fetch_device_info().await;
        self.settle("device info", result)
    }

    pub async fn fetch_zone_descriptions(&self) -> Option<Vec<String>> {
        let result = self.try_fetch_zone_descriptions().await;
        self.settle("zone descriptions", result)
    }

    pub async fn fetch_zone_statuses(&self) -> Option<Vec<ZoneStatus>> {
        let result = self.try_fetch_zone_statuses().await;
        self.settle("zone statuses", result)
    }

    pub async fn fetch_output_descriptions(&self) -> Option<Vec<String>> {
        let result = self.try_fetch_output_descriptions().await;
        self.settle("output descriptions", result)
    }

    pub async fn fetch_output_statuses(&self) -> Option<Vec<OutputStatus>> {
        let result = self.try_fetch_output_statuses().await;
        self.settle("output statuses", result)
    }

    pub async fn fetch_partition_descriptions(&self) -> Option<Vec<String>> {
        let result = self.try_fetch_partition_descriptions().await;
        self.settle("partition descriptions", result)
    }

    pub async fn fetch_partition_statuses(&self) -> Option<Vec<PartitionStatus>> {
        let result = self.try_fetch_partition_statuses().await;
        self.settle("partition statuses", result)
    }

    // ── Typed API ────────────────────────────────────────────────────

    pub async fn try_fetch_device_info(&self) -> Result<DeviceInfo> {
        self.get(&self.connection.paths().general_info, xml::parse_general_info)
            .await
    }

    pub async fn try_fetch_zone_descriptions(&self) -> Result<Vec<String>> {
        self.get(&self.connection.paths().zones_description, |body| {
            xml::parse_descriptions(body, "zonesDescription", "zone")
        })
        .await
    }

    pub async fn try_fetch_zone_statuses(&self) -> Result<Vec<ZoneStatus>> {
        self.get(&self.connection.paths().zones_status, xml::parse_zone_statuses)
            .await
    }

    pub async fn try_fetch_output_descriptions(&self) -> Result<Vec<String>> {
        self.get(&self.connection.paths().outputs_description, |body| {
            xml::parse_descriptions(body, "outputsDescription", "output")
        })
        .await
    }

    pub async fn try_fetch_output_statuses(&self) -> Result<Vec<OutputStatus>> {
        self.get(&self.connection.paths().outputs_status, xml::parse_output_statuses)
            .await
    }

    pub async fn try_fetch_partition_descriptions(&self) -> Result<Vec<String>> {
        self.get(&self.connection.paths().partitions_description, |body| {
            xml::parse_descriptions(body, "partitionsDescription", "partition")
        })
        .await
    }

    pub async fn try_fetch_partition_statuses(&self) -> Result<Vec<PartitionStatus>> {
        self.get(
            &self.connection.paths().partitions_status,
            xml::parse_partition_statuses,
        )
        .await
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// GET `/xml/{path}` and hand the full body to `parse`.
    ///
    /// The HTTP status is not inspected: the panel answers with XML-shaped
    /// bytes whatever it declares, and an error page fails to parse anyway.
    async fn get<T>(&self, path: &str, parse: impl FnOnce(&[u8]) -> Result<T>) -> Result<T> {
        let url = self.connection.resource_url(path);
        async {
            trace!("GET {url}");
            let response = self
                .http
                .get(&url)
                .basic_auth(self.connection.username(), Some(self.connection.password()))
                .send()
                .await?;
            trace!("{url}: HTTP {}", response.status());
            let body = response.bytes().await?;
            parse(&body[..])
        }
        .instrument(self.span.clone())
        .await
    }

    /// Collapse a typed result to the best-effort contract.
    fn settle<T>(&self, what: &str, result: Result<T>) -> Option<T> {
        let _entered = self.span.enter();
        match result {
            Ok(value) => Some(value),
            Err(LaresError::Connection(e)) => {
                debug!(
                    "Host {}: connection error fetching {what}: {e}",
                    self.connection.base_url()
                );
                None
            }
            Err(e) => {
                debug!(
                    "Host {}: failed to fetch {what}: {e}",
                    self.connection.base_url()
                );
                None
            }
        }
    }
}
