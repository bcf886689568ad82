// MIT License - Copyright (c) 2026 lares2mqtt contributors
// Lares HTTP/XML bridge

//! Home Assistant MQTT wire format: topics, discovery configs, entity
//! states, and the bridge's own snapshot/ack messages.

use serde::{Deserialize, Serialize};

use crate::devices::{DeviceInfo, Output, Partition, Zone};
use crate::event::Resource;
use crate::poller::PanelSnapshot;

pub const DEFAULT_DISCOVERY_PREFIX: &str = "homeassistant";
pub const DEFAULT_BASE_TOPIC: &str = "lares";

pub const PAYLOAD_ONLINE: &str = "online";
pub const PAYLOAD_OFFLINE: &str = "offline";
pub const STATE_ON: &str = "ON";
pub const STATE_OFF: &str = "OFF";

const MANUFACTURER: &str = "Ksenia";

/// The three kinds of entity the bridge exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Zone,
    Output,
    Partition,
}

impl EntityKind {
    /// Path segment used in state topics and unique ids.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Zone => "zones",
            Self::Output => "outputs",
            Self::Partition => "partitions",
        }
    }

    /// Home Assistant component the entity is announced as.
    pub fn component(&self) -> &'static str {
        "binary_sensor"
    }

    pub fn device_class(&self) -> Option<&'static str> {
        match self {
            Self::Zone => Some("motion"),
            Self::Output => Some("power"),
            Self::Partition => None,
        }
    }

    /// `lares_zones_3`, `lares_outputs_0`, ...
    pub fn unique_id(&self, index: usize) -> String {
        format!("lares_{}_{index}", self.as_str())
    }
}

/// Topic layout under a base topic and a discovery prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    base: String,
    discovery_prefix: String,
}

impl Default for Topics {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_TOPIC, DEFAULT_DISCOVERY_PREFIX)
    }
}

impl Topics {
    pub fn new(base: impl Into<String>, discovery_prefix: impl Into<String>) -> Self {
        let base: String = base.into();
        let discovery_prefix: String = discovery_prefix.into();
        Self {
            base: base.trim_end_matches('/').to_string(),
            discovery_prefix: discovery_prefix.trim_end_matches('/').to_string(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Bridge availability, `online`/`offline`, retained.
    pub fn availability(&self) -> String {
        format!("{}/status", self.base)
    }

    pub fn snapshot(&self) -> String {
        format!("{}/snapshot", self.base)
    }

    pub fn command(&self) -> String {
        format!("{}/cmd", self.base)
    }

    pub fn ack(&self) -> String {
        format!("{}/ack", self.base)
    }

    pub fn state(&self, kind: EntityKind, index: usize) -> String {
        format!("{}/{}/{index}/state", self.base, kind.as_str())
    }

    pub fn config(&self, kind: EntityKind, index: usize) -> String {
        format!(
            "{}/{}/{}/config",
            self.discovery_prefix,
            kind.component(),
            kind.unique_id(index)
        )
    }
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

/// Device block shared by every entity of one panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HaDevice {
    pub identifiers: Vec<String>,
    pub name: String,
    pub manufacturer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sw_version: Option<String>,
}

impl HaDevice {
    /// Build the device block. `host` keeps identifiers unique when several
    /// panels share a broker.
    pub fn new(host: &str, info: Option<&DeviceInfo>) -> Self {
        Self {
            identifiers: vec![format!("lares_{host}")],
            name: info
                .map(|i| i.name.clone())
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| "Lares".to_string()),
            manufacturer: MANUFACTURER.to_string(),
            model: info.map(|i| i.name.clone()).filter(|n| !n.is_empty()),
            sw_version: info.map(|i| i.info.clone()).filter(|v| !v.is_empty()),
        }
    }
}

/// Discovery config for one `binary_sensor`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HaBinarySensorConfig {
    pub name: String,
    pub unique_id: String,
    pub state_topic: String,
    pub availability_topic: String,
    pub payload_on: String,
    pub payload_off: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_class: Option<String>,
    pub device: HaDevice,
}

/// A discovery config and the topic it is published on (retained).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    pub topic: String,
    pub config: HaBinarySensorConfig,
}

fn binary_sensor(
    topics: &Topics,
    device: &HaDevice,
    kind: EntityKind,
    index: usize,
    label: &str,
) -> Announcement {
    Announcement {
        topic: topics.config(kind, index),
        config: HaBinarySensorConfig {
            name: label.to_string(),
            unique_id: kind.unique_id(index),
            state_topic: topics.state(kind, index),
            availability_topic: topics.availability(),
            payload_on: STATE_ON.to_string(),
            payload_off: STATE_OFF.to_string(),
            device_class: kind.device_class().map(str::to_string),
            device: device.clone(),
        },
    }
}

/// Discovery for a zone; `None` for zones the panel reports as not used.
pub fn zone_discovery(topics: &Topics, device: &HaDevice, zone: &Zone) -> Option<Announcement> {
    if zone.is_not_used() {
        return None;
    }
    Some(binary_sensor(topics, device, EntityKind::Zone, zone.index, &zone.label))
}

/// Discovery for an output; `None` for outputs of type `NOT_USED`.
pub fn output_discovery(
    topics: &Topics,
    device: &HaDevice,
    output: &Output,
) -> Option<Announcement> {
    if output.is_not_used() {
        return None;
    }
    Some(binary_sensor(
        topics,
        device,
        EntityKind::Output,
        output.index,
        &output.label,
    ))
}

pub fn partition_discovery(topics: &Topics, device: &HaDevice, partition: &Partition) -> Announcement {
    binary_sensor(
        topics,
        device,
        EntityKind::Partition,
        partition.index,
        &partition.label,
    )
}

/// Discovery configs for one resource of a snapshot, skipping unused
/// entities. Empty when the resource was unavailable.
pub fn discovery_for_resource(
    topics: &Topics,
    device: &HaDevice,
    snapshot: &PanelSnapshot,
    resource: Resource,
) -> Vec<Announcement> {
    match resource {
        Resource::Zones => snapshot
            .zones
            .iter()
            .flatten()
            .filter_map(|z| zone_discovery(topics, device, z))
            .collect(),
        Resource::Outputs => snapshot
            .outputs
            .iter()
            .flatten()
            .filter_map(|o| output_discovery(topics, device, o))
            .collect(),
        Resource::Partitions => snapshot
            .partitions
            .iter()
            .flatten()
            .map(|p| partition_discovery(topics, device, p))
            .collect(),
    }
}

/// All discovery configs for a snapshot.
pub fn discovery_for(topics: &Topics, device: &HaDevice, snapshot: &PanelSnapshot) -> Vec<Announcement> {
    Resource::ALL
        .iter()
        .flat_map(|r| discovery_for_resource(topics, device, snapshot, *r))
        .collect()
}

pub fn on_off(on: bool) -> &'static str {
    if on { STATE_ON } else { STATE_OFF }
}

pub fn zone_state(zone: &Zone) -> &'static str {
    on_off(zone.is_alarm())
}

pub fn output_state(output: &Output) -> &'static str {
    on_off(output.is_on())
}

pub fn partition_state(partition: &Partition) -> &'static str {
    on_off(partition.is_armed())
}

/// `(topic, payload)` for every announced entity of one resource.
pub fn states_for_resource(
    topics: &Topics,
    snapshot: &PanelSnapshot,
    resource: Resource,
) -> Vec<(String, &'static str)> {
    match resource {
        Resource::Zones => snapshot
            .zones
            .iter()
            .flatten()
            .filter(|z| !z.is_not_used())
            .map(|z| (topics.state(EntityKind::Zone, z.index), zone_state(z)))
            .collect(),
        Resource::Outputs => snapshot
            .outputs
            .iter()
            .flatten()
            .filter(|o| !o.is_not_used())
            .map(|o| (topics.state(EntityKind::Output, o.index), output_state(o)))
            .collect(),
        Resource::Partitions => snapshot
            .partitions
            .iter()
            .flatten()
            .map(|p| (topics.state(EntityKind::Partition, p.index), partition_state(p)))
            .collect(),
    }
}

/// `(topic, payload)` for every announced entity in a snapshot.
pub fn states_for(topics: &Topics, snapshot: &PanelSnapshot) -> Vec<(String, &'static str)> {
    Resource::ALL
        .iter()
        .flat_map(|r| states_for_resource(topics, snapshot, *r))
        .collect()
}

// ---------------------------------------------------------------------------
// Bridge messages
// ---------------------------------------------------------------------------

// Published messages share a flat {now, op, ...} structure

#[derive(Debug, Serialize)]
pub struct MqttSnapshot {
    pub now: u64,
    pub op: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<MqttDevice>,
    pub zones: Option<Vec<MqttZoneState>>,
    pub outputs: Option<Vec<MqttOutputState>>,
    pub partitions: Option<Vec<MqttPartitionState>>,
}

#[derive(Debug, Serialize)]
pub struct MqttDevice {
    pub name: String,
    pub info: String,
}

#[derive(Debug, Serialize)]
pub struct MqttZoneState {
    pub id: usize,
    pub name: String,
    pub status: String,
    pub bypass: String,
    pub alarm: String,
}

#[derive(Debug, Serialize)]
pub struct MqttOutputState {
    pub id: usize,
    pub name: String,
    pub status: String,
    pub value: String,
    #[serde(rename = "type")]
    pub output_type: String,
}

#[derive(Debug, Serialize)]
pub struct MqttPartitionState {
    pub id: usize,
    pub name: String,
    pub status: String,
    pub armed: bool,
}

/// CMD_ACK response
#[derive(Debug, Serialize)]
pub struct MqttCmdAck {
    pub now: u64,
    pub op: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl MqttCmdAck {
    pub fn new(now: u64, success: bool, src: Option<serde_json::Value>) -> Self {
        Self {
            now,
            op: "CMD_ACK".to_string(),
            success,
            src,
            data: None,
        }
    }
}

/// Inbound command (subscribed)
#[derive(Debug, Deserialize)]
pub struct MqttCommand {
    pub op: String,
    #[serde(default)]
    pub op_id: Option<String>,
}

pub fn build_snapshot(now: u64, info: Option<&DeviceInfo>, snapshot: &PanelSnapshot) -> MqttSnapshot {
    MqttSnapshot {
        now,
        op: "SNAPSHOT".to_string(),
        device: info.map(|i| MqttDevice {
            name: i.name.clone(),
            info: i.info.clone(),
        }),
        zones: snapshot.zones.as_ref().map(|zones| {
            zones
                .iter()
                .map(|z| MqttZoneState {
                    id: z.index,
                    name: z.label.clone(),
                    status: z.status.status.clone(),
                    bypass: z.status.bypass.clone(),
                    alarm: z.status.alarm.clone(),
                })
                .collect()
        }),
        outputs: snapshot.outputs.as_ref().map(|outputs| {
            outputs
                .iter()
                .map(|o| MqttOutputState {
                    id: o.index,
                    name: o.label.clone(),
                    status: o.status.status.clone(),
                    value: o.status.value.clone(),
                    output_type: o.status.output_type.clone(),
                })
                .collect()
        }),
        partitions: snapshot.partitions.as_ref().map(|parts| {
            parts
                .iter()
                .map(|p| MqttPartitionState {
                    id: p.index,
                    name: p.label.clone(),
                    status: p.status.to_string(),
                    armed: p.is_armed(),
                })
                .collect()
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::{OutputStatus, PartitionStatus, ZoneStatus};

    fn info() -> DeviceInfo {
        DeviceInfo {
            name: "Lares4.0".to_string(),
            info: "FW1.2".to_string(),
        }
    }

    fn snapshot() -> PanelSnapshot {
        PanelSnapshot {
            zones: Some(vec![
                Zone {
                    index: 0,
                    label: "Front door".to_string(),
                    status: ZoneStatus::new("ALARM", "UN_BYPASS", "ON"),
                },
                Zone {
                    index: 1,
                    label: "Spare".to_string(),
                    status: ZoneStatus::new("NOT_USED", "UN_BYPASS", "OFF"),
                },
            ]),
            outputs: Some(vec![Output {
                index: 0,
                label: "Siren".to_string(),
                status: OutputStatus::new("OK", "0", "MONO"),
            }]),
            partitions: Some(vec![Partition {
                index: 0,
                label: "House".to_string(),
                status: PartitionStatus::ArmedImmediate,
            }]),
        }
    }

    #[test]
    fn test_topics() {
        let t = Topics::new("lares/", "homeassistant");
        assert_eq!(t.availability(), "lares/status");
        assert_eq!(t.state(EntityKind::Zone, 3), "lares/zones/3/state");
        assert_eq!(
            t.config(EntityKind::Output, 0),
            "homeassistant/binary_sensor/lares_outputs_0/config"
        );
        assert_eq!(t.command(), "lares/cmd");
    }

    #[test]
    fn test_unique_ids_do_not_collide() {
        assert_eq!(EntityKind::Zone.unique_id(1), "lares_zones_1");
        assert_ne!(EntityKind::Output.unique_id(1), EntityKind::Partition.unique_id(1));
    }

    #[test]
    fn test_device_block() {
        let i = info();
        let device = HaDevice::new("10.0.0.5", Some(&i));
        assert_eq!(device.identifiers, vec!["lares_10.0.0.5"]);
        assert_eq!(device.name, "Lares4.0");
        assert_eq!(device.sw_version.as_deref(), Some("FW1.2"));

        let bare = HaDevice::new("10.0.0.5", None);
        assert_eq!(bare.name, "Lares");
        assert!(bare.sw_version.is_none());
    }

    #[test]
    fn test_discovery_skips_unused_zone() {
        let device = HaDevice::new("h", None);
        let anns = discovery_for(&Topics::default(), &device, &snapshot());
        let ids: Vec<&str> = anns.iter().map(|a| a.config.unique_id.as_str()).collect();
        assert_eq!(ids, vec!["lares_zones_0", "lares_outputs_0", "lares_partitions_0"]);
        assert_eq!(anns[0].config.device_class.as_deref(), Some("motion"));
        assert!(anns[2].config.device_class.is_none());
    }

    #[test]
    fn test_states() {
        let states = states_for(&Topics::default(), &snapshot());
        assert_eq!(
            states,
            vec![
                ("lares/zones/0/state".to_string(), "ON"),
                ("lares/outputs/0/state".to_string(), "OFF"),
                ("lares/partitions/0/state".to_string(), "ON"),
            ]
        );
    }

    #[test]
    fn test_discovery_json_shape() {
        let device = HaDevice::new("h", None);
        let ann = partition_discovery(
            &Topics::default(),
            &device,
            &snapshot().partitions.unwrap()[0],
        );
        let v = serde_json::to_value(&ann.config).unwrap();
        assert_eq!(v["name"], "House");
        assert_eq!(v["availability_topic"], "lares/status");
        assert!(v.get("device_class").is_none());
        assert!(v["device"].get("model").is_none());
    }

    #[test]
    fn test_snapshot_unavailable_resource_is_null() {
        let mut snap = snapshot();
        snap.outputs = None;
        let i = info();
        let msg = build_snapshot(42, Some(&i), &snap);
        let v = serde_json::to_value(&msg).unwrap();
        assert_eq!(v["op"], "SNAPSHOT");
        assert!(v["outputs"].is_null());
        assert_eq!(v["zones"][0]["status"], "ALARM");
        assert_eq!(v["partitions"][0]["status"], "ARMED_IMMEDIATE");
        assert_eq!(v["partitions"][0]["armed"], true);
        assert_eq!(v["device"]["info"], "FW1.2");
    }

    #[test]
    fn test_command_parse() {
        let cmd: MqttCommand = serde_json::from_str(r#"{"op":"PING","op_id":"7"}"#).unwrap();
        assert_eq!(cmd.op, "PING");
        assert_eq!(cmd.op_id.as_deref(), Some("7"));
        let cmd: MqttCommand = serde_json::from_str(r#"{"op":"SNAPSHOT"}"#).unwrap();
        assert!(cmd.op_id.is_none());
    }
}
