// MIT License - Copyright (c) 2026 lares2mqtt contributors
// Lares HTTP/XML bridge

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::{interval, timeout, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::client::PanelClient;
use crate::config::{DEFAULT_SCAN_INTERVAL_SECS, DEFAULT_TIMEOUT_SECS};
use crate::devices::{DeviceInfo, Output, Partition, Zone};
use crate::event::{event_channel, EventReceiver, EventSender, PanelEvent, Resource};

/// Labels indexed like the status lists. Fetched at startup; a list that
/// failed is retried on later ticks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Descriptions {
    pub zones: Vec<String>,
    pub outputs: Vec<String>,
    pub partitions: Vec<String>,
}

impl Descriptions {
    pub fn get(&self, resource: Resource) -> &[String] {
        match resource {
            Resource::Zones => &self.zones,
            Resource::Outputs => &self.outputs,
            Resource::Partitions => &self.partitions,
        }
    }

    fn get_mut(&mut self, resource: Resource) -> &mut Vec<String> {
        match resource {
            Resource::Zones => &mut self.zones,
            Resource::Outputs => &mut self.outputs,
            Resource::Partitions => &mut self.partitions,
        }
    }
}

/// The paired result of one poll cycle.
///
/// `None` means that resource could not be fetched this cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PanelSnapshot {
    pub zones: Option<Vec<Zone>>,
    pub outputs: Option<Vec<Output>>,
    pub partitions: Option<Vec<Partition>>,
}

impl PanelSnapshot {
    pub fn is_available(&self, resource: Resource) -> bool {
        match resource {
            Resource::Zones => self.zones.is_some(),
            Resource::Outputs => self.outputs.is_some(),
            Resource::Partitions => self.partitions.is_some(),
        }
    }

    /// True when at least one resource answered.
    pub fn any_available(&self) -> bool {
        Resource::ALL.iter().any(|r| self.is_available(*r))
    }
}

/// Pair status `i` with description `i`.
///
/// The two lists come from separate requests and nothing on the wire ties
/// them together. On a length mismatch a warning is logged, statuses
/// without a description are labelled `"{kind} {n}"` (1-based) and surplus
/// descriptions are ignored.
pub fn pair_by_position<S, R>(
    kind: &str,
    labels: &[String],
    statuses: Vec<S>,
    make: impl Fn(usize, String, S) -> R,
) -> Vec<R> {
    if labels.len() != statuses.len() {
        warn!(
            "{kind}: {} descriptions but {} statuses; pairing by position",
            labels.len(),
            statuses.len()
        );
    }
    statuses
        .into_iter()
        .enumerate()
        .map(|(index, status)| {
            let label = labels
                .get(index)
                .cloned()
                .unwrap_or_else(|| format!("{kind} {}", index + 1));
            make(index, label, status)
        })
        .collect()
}

/// Change events between two consecutive snapshots.
///
/// Records are compared by position. Indexes present in only one of the
/// snapshots produce no change event; the next `Snapshot` carries them.
pub fn diff(prev: &PanelSnapshot, next: &PanelSnapshot) -> Vec<PanelEvent> {
    let mut events = Vec::new();

    for resource in Resource::ALL {
        match (prev.is_available(resource), next.is_available(resource)) {
            (true, false) => events.push(PanelEvent::Unavailable { resource }),
            (false, true) => events.push(PanelEvent::Available { resource }),
            _ => {}
        }
    }

    if let (Some(old), Some(new)) = (&prev.zones, &next.zones) {
        for (o, n) in old.iter().zip(new) {
            if o.status != n.status {
                events.push(PanelEvent::ZoneChanged {
                    index: n.index,
                    old: o.status.clone(),
                    new: n.status.clone(),
                });
            }
        }
    }

    if let (Some(old), Some(new)) = (&prev.outputs, &next.outputs) {
        for (o, n) in old.iter().zip(new) {
            if o.status != n.status {
                events.push(PanelEvent::OutputChanged {
                    index: n.index,
                    old: o.status.clone(),
                    new: n.status.clone(),
                });
            }
        }
    }

    if let (Some(old), Some(new)) = (&prev.partitions, &next.partitions) {
        for (o, n) in old.iter().zip(new) {
            if o.status != n.status {
                events.push(PanelEvent::PartitionChanged {
                    index: n.index,
                    old: o.status.clone(),
                    new: n.status.clone(),
                });
            }
        }
    }

    events
}

/// Periodically polls a panel and broadcasts what changed.
///
/// # Example
///
/// ```no_run
/// use lares_bridge::{PanelClient, PanelConnection, PanelEvent, Poller};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let client = PanelClient::new(PanelConnection::builder().host("192.168.1.50").build())?;
///     let mut poller = Poller::new(client);
///     poller.load_descriptions().await;
///
///     let mut events = poller.subscribe();
///     let (_stop_tx, stop_rx) = tokio::sync::watch::channel(false);
///     tokio::spawn(poller.run(stop_rx));
///
///     while let Ok(event) = events.recv().await {
///         if let PanelEvent::ZoneChanged { index, new, .. } = event {
///             println!("zone {index}: {}", new.status);
///         }
///     }
///     Ok(())
/// }
/// ```
pub struct Poller {
    client: PanelClient,
    descriptions: Descriptions,
    /// Description lists not fetched yet; retried on every tick.
    missing: HashSet<Resource>,
    info: Option<DeviceInfo>,
    zone_names: HashMap<usize, String>,
    interval: Duration,
    timeout: Duration,
    event_tx: EventSender,
    last: Option<PanelSnapshot>,
}

impl Poller {
    pub fn new(client: PanelClient) -> Self {
        let (event_tx, _event_rx) = event_channel(256);
        Self {
            client,
            descriptions: Descriptions::default(),
            missing: Resource::ALL.into_iter().collect(),
            info: None,
            zone_names: HashMap::new(),
            interval: Duration::from_secs(DEFAULT_SCAN_INTERVAL_SECS),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            event_tx,
            last: None,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Upper bound for each individual fetch of a poll cycle.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Zone labels that win over the panel's descriptions, keyed by 1-based
    /// zone number. Numbers the panel does not report are ignored.
    pub fn with_zone_names(mut self, zone_names: HashMap<usize, String>) -> Self {
        self.zone_names = zone_names;
        self
    }

    pub fn client(&self) -> &PanelClient {
        &self.client
    }

    pub fn descriptions(&self) -> &Descriptions {
        &self.descriptions
    }

    /// Device info, once it has been fetched.
    pub fn info(&self) -> Option<&DeviceInfo> {
        self.info.as_ref()
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.event_tx.subscribe()
    }

    /// Fetch and keep the device info, within the poll timeout.
    pub async fn load_device_info(&mut self) -> Option<DeviceInfo> {
        let info = self
            .bounded("device info", self.client.fetch_device_info())
            .await;
        if info.is_some() {
            self.info = info.clone();
        }
        info
    }

    /// Fetch the three description lists. A list that cannot be fetched
    /// stays empty, so its records fall back to positional labels until a
    /// later tick loads it.
    pub async fn load_descriptions(&mut self) {
        let (zones, outputs, partitions) = tokio::join!(
            self.fetch_labels(Resource::Zones),
            self.fetch_labels(Resource::Outputs),
            self.fetch_labels(Resource::Partitions),
        );
        self.store_labels(Resource::Zones, zones);
        self.store_labels(Resource::Outputs, outputs);
        self.store_labels(Resource::Partitions, partitions);
        info!(
            "Panel has {} zones, {} outputs, {} partitions",
            self.descriptions.zones.len(),
            self.descriptions.outputs.len(),
            self.descriptions.partitions.len()
        );
    }

    /// Fetch all status resources once and pair them with their labels.
    pub async fn poll_once(&self) -> PanelSnapshot {
        let (zones, outputs, partitions) = tokio::join!(
            self.bounded("zone statuses", self.client.fetch_zone_statuses()),
            self.bounded("output statuses", self.client.fetch_output_statuses()),
            self.bounded("partition statuses", self.client.fetch_partition_statuses()),
        );

        PanelSnapshot {
            zones: zones.map(|s| {
                let mut zones =
                    pair_by_position("Zone", &self.descriptions.zones, s, |index, label, status| {
                        Zone { index, label, status }
                    });
                rename_zones(&mut zones, &self.zone_names);
                zones
            }),
            outputs: outputs.map(|s| {
                pair_by_position("Output", &self.descriptions.outputs, s, |index, label, status| {
                    Output { index, label, status }
                })
            }),
            partitions: partitions.map(|s| {
                pair_by_position(
                    "Partition",
                    &self.descriptions.partitions,
                    s,
                    |index, label, status| Partition { index, label, status },
                )
            }),
        }
    }

    /// Poll once, broadcast events and the snapshot, and remember it.
    ///
    /// Device info and description lists still missing are fetched first;
    /// each that arrives is announced with `DeviceInfo` or
    /// `DescriptionsLoaded`. Change events start from the second cycle.
    pub async fn tick(&mut self) -> Arc<PanelSnapshot> {
        self.retry_missing().await;

        let snapshot = self.poll_once().await;
        if let Some(prev) = &self.last {
            for event in diff(prev, &snapshot) {
                // No receivers is not an error for a poller.
                let _ = self.event_tx.send(event);
            }
        }
        let snapshot = Arc::new(snapshot);
        let _ = self.event_tx.send(PanelEvent::Snapshot(Arc::clone(&snapshot)));
        self.last = Some((*snapshot).clone());
        snapshot
    }

    /// Poll on the configured interval until `shutdown` flips to `true`.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!("Polling every {} seconds", self.interval.as_secs());
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        debug!("Poller stopping");
                        break;
                    }
                }
            }
        }
    }

    async fn retry_missing(&mut self) {
        if self.info.is_none()
            && let Some(info) = self.load_device_info().await
        {
            info!("Panel: {} ({})", info.name, info.info);
            let _ = self.event_tx.send(PanelEvent::DeviceInfo(info));
        }

        for resource in Resource::ALL {
            if !self.missing.contains(&resource) {
                continue;
            }
            let labels = self.fetch_labels(resource).await;
            if self.store_labels(resource, labels) {
                info!(
                    "Loaded {} {resource} descriptions",
                    self.descriptions.get(resource).len()
                );
                let _ = self.event_tx.send(PanelEvent::DescriptionsLoaded { resource });
            }
        }
    }

    async fn fetch_labels(&self, resource: Resource) -> Option<Vec<String>> {
        match resource {
            Resource::Zones => {
                self.bounded("zone descriptions", self.client.fetch_zone_descriptions())
                    .await
            }
            Resource::Outputs => {
                self.bounded("output descriptions", self.client.fetch_output_descriptions())
                    .await
            }
            Resource::Partitions => {
                self.bounded(
                    "partition descriptions",
                    self.client.fetch_partition_descriptions(),
                )
                .await
            }
        }
    }

    /// Keep a fetched description list. Returns whether one was fetched.
    fn store_labels(&mut self, resource: Resource, labels: Option<Vec<String>>) -> bool {
        match labels {
            Some(labels) => {
                *self.descriptions.get_mut(resource) = labels;
                self.missing.remove(&resource);
                true
            }
            None => false,
        }
    }

    /// Apply the poll timeout. An expired fetch is abandoned and counts as
    /// unavailable; it is not retried.
    async fn bounded<T>(&self, what: &str, fut: impl Future<Output = Option<T>>) -> Option<T> {
        match timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                debug!("Fetching {what} timed out after {:?}", self.timeout);
                None
            }
        }
    }
}

/// Replace zone labels with configured names (1-based keys).
fn rename_zones(zones: &mut [Zone], names: &HashMap<usize, String>) {
    if names.is_empty() {
        return;
    }
    for zone in zones {
        if let Some(name) = names.get(&(zone.index + 1)) {
            zone.label = name.clone();
        }
    }
}
