// MIT License - Copyright (c) 2026 lares2mqtt contributors
// Lares HTTP/XML bridge

use std::fmt;
use std::sync::Arc;

use crate::devices::{DeviceInfo, OutputStatus, PartitionStatus, ZoneStatus};
use crate::poller::PanelSnapshot;

/// The polled resources, for availability reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Zones,
    Outputs,
    Partitions,
}

impl Resource {
    pub const ALL: [Resource; 3] = [Resource::Zones, Resource::Outputs, Resource::Partitions];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Zones => "zones",
            Self::Outputs => "outputs",
            Self::Partitions => "partitions",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the poller reports.
///
/// Subscribe via [`Poller::subscribe`](crate::Poller::subscribe) to receive a
/// `tokio::sync::broadcast::Receiver<PanelEvent>`.
#[derive(Debug, Clone)]
pub enum PanelEvent {
    /// A poll cycle finished. Sent after that cycle's change events.
    Snapshot(Arc<PanelSnapshot>),
    ZoneChanged {
        index: usize,
        old: ZoneStatus,
        new: ZoneStatus,
    },
    OutputChanged {
        index: usize,
        old: OutputStatus,
        new: OutputStatus,
    },
    PartitionChanged {
        index: usize,
        old: PartitionStatus,
        new: PartitionStatus,
    },
    /// A resource failed to poll after succeeding on the previous cycle.
    Unavailable { resource: Resource },
    /// A resource polled successfully after failing on the previous cycle.
    Available { resource: Resource },
    /// A description list that was missing has been fetched. Snapshots
    /// from now on carry its labels.
    DescriptionsLoaded { resource: Resource },
    /// Device info fetched after being unavailable.
    DeviceInfo(DeviceInfo),
}

pub type EventSender = tokio::sync::broadcast::Sender<PanelEvent>;

pub type EventReceiver = tokio::sync::broadcast::Receiver<PanelEvent>;

pub fn event_channel(capacity: usize) -> (EventSender, EventReceiver) {
    tokio::sync::broadcast::channel(capacity)
}
