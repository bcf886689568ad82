// Schema validation tests for MQTT wire format
//
// Payloads are built both from the library's own types and from literal
// JSON, and validated against the JSON Schema files in schemas/mqtt/.

use serde_json::json;

use lares_bridge::hass::{self, HaDevice, MqttCmdAck, Topics};
use lares_bridge::{
    DeviceInfo, Output, OutputStatus, PanelSnapshot, Partition, PartitionStatus, Zone, ZoneStatus,
};

fn load_schema(name: &str) -> serde_json::Value {
    let path = format!("{}/schemas/mqtt/{name}", env!("CARGO_MANIFEST_DIR"));
    let text = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read schema {path}: {e}"));
    serde_json::from_str(&text).unwrap_or_else(|e| panic!("Failed to parse schema {path}: {e}"))
}

fn build_validator(schema_name: &str) -> jsonschema::Validator {
    let schema = load_schema(schema_name);
    jsonschema::validator_for(&schema)
        .unwrap_or_else(|e| panic!("Failed to compile schema {schema_name}: {e}"))
}

fn validate(schema_name: &str, instance: &serde_json::Value) {
    let validator = build_validator(schema_name);
    let errors: Vec<_> = validator.iter_errors(instance).collect();
    if !errors.is_empty() {
        let msgs: Vec<String> = errors.iter().map(|e| format!("  - {e}")).collect();
        panic!(
            "Schema validation failed for {schema_name}:\n{}\nInstance: {}",
            msgs.join("\n"),
            serde_json::to_string_pretty(instance).unwrap()
        );
    }
}

fn validate_fails(schema_name: &str, instance: &serde_json::Value) {
    let validator = build_validator(schema_name);
    assert!(
        !validator.is_valid(instance),
        "Expected schema validation to fail for {schema_name}, but it passed.\nInstance: {}",
        serde_json::to_string_pretty(instance).unwrap()
    );
}

fn device_info() -> DeviceInfo {
    DeviceInfo {
        name: "Lares4.0".to_string(),
        info: "FW1.2".to_string(),
    }
}

fn sample_snapshot() -> PanelSnapshot {
    PanelSnapshot {
        zones: Some(vec![
            Zone {
                index: 0,
                label: "Front Door".to_string(),
                status: ZoneStatus::new("NORMAL", "UN_BYPASS", "OFF"),
            },
            Zone {
                index: 1,
                label: "Hall PIR".to_string(),
                status: ZoneStatus::new("ALARM", "UN_BYPASS", "ON"),
            },
        ]),
        outputs: Some(vec![Output {
            index: 0,
            label: "Siren".to_string(),
            status: OutputStatus::new("OK", "1", "MONO"),
        }]),
        partitions: Some(vec![Partition {
            index: 0,
            label: "House".to_string(),
            status: PartitionStatus::Disarmed,
        }]),
    }
}

// =========================================================================
// Snapshot
// =========================================================================

#[test]
fn snapshot_from_library_valid() {
    let info = device_info();
    let msg = hass::build_snapshot(1_738_900_000_000, Some(&info), &sample_snapshot());
    validate("snapshot.schema.json", &serde_json::to_value(&msg).unwrap());
}

#[test]
fn snapshot_with_unavailable_resources_valid() {
    let msg = hass::build_snapshot(0, None, &PanelSnapshot::default());
    validate("snapshot.schema.json", &serde_json::to_value(&msg).unwrap());
}

#[test]
fn snapshot_empty_arrays() {
    validate(
        "snapshot.schema.json",
        &json!({
            "now": 0,
            "op": "SNAPSHOT",
            "zones": [],
            "outputs": [],
            "partitions": []
        }),
    );
}

#[test]
fn snapshot_wrong_op() {
    validate_fails(
        "snapshot.schema.json",
        &json!({
            "now": 1738900000000_u64,
            "op": "WRONG",
            "zones": [],
            "outputs": [],
            "partitions": []
        }),
    );
}

#[test]
fn snapshot_missing_resource_key() {
    // Unavailable resources are null, never omitted
    validate_fails(
        "snapshot.schema.json",
        &json!({
            "now": 1738900000000_u64,
            "op": "SNAPSHOT",
            "zones": [],
            "outputs": []
        }),
    );
}

#[test]
fn snapshot_zone_missing_field() {
    validate_fails(
        "snapshot.schema.json",
        &json!({
            "now": 1,
            "op": "SNAPSHOT",
            "zones": [{ "id": 0, "name": "Door", "status": "NORMAL" }],
            "outputs": null,
            "partitions": null
        }),
    );
}

#[test]
fn snapshot_timestamp_string_rejected() {
    validate_fails(
        "snapshot.schema.json",
        &json!({
            "now": "2026-01-01T00:00:00Z",
            "op": "SNAPSHOT",
            "zones": [],
            "outputs": [],
            "partitions": []
        }),
    );
}

// =========================================================================
// Discovery
// =========================================================================

#[test]
fn discovery_configs_from_library_valid() {
    let info = device_info();
    let device = HaDevice::new("192.168.1.50", Some(&info));
    let configs = hass::discovery_for(&Topics::default(), &device, &sample_snapshot());
    assert_eq!(configs.len(), 4);
    for ann in &configs {
        validate(
            "binary_sensor_config.schema.json",
            &serde_json::to_value(&ann.config).unwrap(),
        );
    }
}

#[test]
fn discovery_config_without_device_info_valid() {
    let device = HaDevice::new("alarm.local", None);
    let configs = hass::discovery_for(&Topics::default(), &device, &sample_snapshot());
    validate(
        "binary_sensor_config.schema.json",
        &serde_json::to_value(&configs[0].config).unwrap(),
    );
}

#[test]
fn discovery_config_bad_payload_rejected() {
    validate_fails(
        "binary_sensor_config.schema.json",
        &json!({
            "name": "Door",
            "unique_id": "lares_zones_0",
            "state_topic": "lares/zones/0/state",
            "availability_topic": "lares/status",
            "payload_on": "1",
            "payload_off": "0",
            "device": { "identifiers": ["lares_x"], "name": "Lares", "manufacturer": "Ksenia" }
        }),
    );
}

#[test]
fn discovery_config_bad_unique_id_rejected() {
    validate_fails(
        "binary_sensor_config.schema.json",
        &json!({
            "name": "Door",
            "unique_id": "lares_output_0",
            "state_topic": "lares/outputs/0/state",
            "availability_topic": "lares/status",
            "payload_on": "ON",
            "payload_off": "OFF",
            "device": { "identifiers": ["lares_x"], "name": "Lares", "manufacturer": "Ksenia" }
        }),
    );
}

// =========================================================================
// CMD_ACK
// =========================================================================

#[test]
fn cmd_ack_from_library_valid() {
    let ack = MqttCmdAck::new(1_738_900_000_000, true, Some(json!({ "op": "PING" })));
    validate("cmd_ack.schema.json", &serde_json::to_value(&ack).unwrap());
}

#[test]
fn cmd_ack_with_snapshot_data_valid() {
    let msg = hass::build_snapshot(5, None, &sample_snapshot());
    let mut ack = MqttCmdAck::new(5, true, None);
    ack.data = serde_json::to_value(&msg).ok();
    validate("cmd_ack.schema.json", &serde_json::to_value(&ack).unwrap());
}

#[test]
fn cmd_ack_missing_success() {
    validate_fails(
        "cmd_ack.schema.json",
        &json!({ "now": 1, "op": "CMD_ACK" }),
    );
}
