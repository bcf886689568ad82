// MIT License - Copyright (c) 2026 lares2mqtt contributors
// Lares HTTP/XML bridge
//
//! # lares-bridge
//!
//! Polling client for Ksenia Lares alarm panels over the panel's local
//! HTTP/XML API (`http://<panel>:4202/xml/...`, HTTP Basic auth).
//!
//! The client fetches device info, zone/output/partition descriptions and
//! their current status. Requests are best-effort: a failed poll yields
//! `None` and is logged at debug level, never an error for the caller.
//! The [`Poller`] pairs descriptions with statuses on a fixed interval and
//! broadcasts what changed; the `lares2mqtt` binary publishes that to MQTT
//! with Home Assistant discovery.
//!
//! ## Quick Start
//!
//! ```no_run
//! use lares_bridge::{PanelClient, PanelConnection};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let conn = PanelConnection::builder()
//!         .host("192.168.1.50")
//!         .username("admin")
//!         .password("secret")
//!         .build();
//!     let client = PanelClient::new(conn)?;
//!
//!     let names = client.fetch_zone_descriptions().await.unwrap_or_default();
//!     if let Some(zones) = client.fetch_zone_statuses().await {
//!         for (i, zone) in zones.iter().enumerate() {
//!             let name = names.get(i).map(String::as_str).unwrap_or("?");
//!             println!("{name}: {} (bypass={})", zone.status, zone.bypass);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod devices;
pub mod error;
pub mod event;
pub mod hass;
pub mod poller;
pub mod xml;

// Re-exports for convenience
pub use client::PanelClient;
pub use config::{PanelConnection, PanelConnectionBuilder, ResourcePaths};
pub use error::{LaresError, Result};
pub use event::{EventReceiver, PanelEvent, Resource};
pub use poller::{Descriptions, PanelSnapshot, Poller};
pub use devices::zone::{Zone, ZoneStatus};
pub use devices::partition::{Partition, PartitionStatus};
pub use devices::output::{Output, OutputStatus};
pub use devices::system::DeviceInfo;
