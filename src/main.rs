// MIT License - Copyright (c) 2026 lares2mqtt contributors
// MQTT bridge

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use rumqttc::{AsyncClient, Event, LastWill, MqttOptions, Packet, QoS};
use serde::{Deserialize, Serialize};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::{watch, Mutex};
use tokio::time::Duration;
use tracing::{debug, error, info, warn};

use lares_bridge::config::{DEFAULT_SCAN_INTERVAL_SECS, DEFAULT_TIMEOUT_SECS};
use lares_bridge::hass::{self, HaDevice, MqttCmdAck, MqttCommand, Topics};
use lares_bridge::{
    DeviceInfo, PanelClient, PanelConnection, PanelEvent, PanelSnapshot, Poller, Resource,
};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "lares2mqtt")]
#[command(about = "Bridge between a Ksenia Lares alarm panel and MQTT")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: String,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Config {
    panel: PanelToml,
    mqtt: MqttToml,
    /// Label overrides keyed by 1-based zone number.
    #[serde(default, deserialize_with = "deserialize_zone_names")]
    zone_names: HashMap<usize, String>,
}

fn deserialize_zone_names<'de, D>(deserializer: D) -> Result<HashMap<usize, String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let string_map: HashMap<String, String> = HashMap::deserialize(deserializer)?;
    string_map
        .into_iter()
        .map(|(k, v)| match k.parse::<usize>() {
            Ok(id) if id >= 1 => Ok((id, v)),
            _ => Err(serde::de::Error::custom(format!("invalid zone number: {k}"))),
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct PanelToml {
    host: String,
    #[serde(default)]
    port: Option<u16>,
    username: String,
    password: String,
    #[serde(default = "default_rate")]
    rate_secs: u64,
    #[serde(default = "default_timeout")]
    timeout_secs: u64,
    #[serde(default)]
    partitions_description_path: Option<String>,
    #[serde(default)]
    partitions_status_path: Option<String>,
}

fn default_rate() -> u64 {
    DEFAULT_SCAN_INTERVAL_SECS
}
fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

#[derive(Debug, Deserialize)]
struct MqttToml {
    url: String,
    #[serde(default = "default_client_id")]
    client_id: String,
    #[serde(default = "default_base_topic")]
    base_topic: String,
    #[serde(default = "default_discovery_prefix")]
    discovery_prefix: String,
}

fn default_client_id() -> String {
    "lares-bridge".to_string()
}
fn default_base_topic() -> String {
    hass::DEFAULT_BASE_TOPIC.to_string()
}
fn default_discovery_prefix() -> String {
    hass::DEFAULT_DISCOVERY_PREFIX.to_string()
}

fn load_config(path: &str) -> Result<Config> {
    let text = std::fs::read_to_string(path).context("Failed to read config file")?;
    let config: Config = toml::from_str(&text).context("Failed to parse config file")?;
    if config.panel.rate_secs == 0 {
        anyhow::bail!("panel.rate_secs must be at least 1");
    }
    Ok(config)
}

fn build_panel_connection(toml: &PanelToml) -> PanelConnection {
    let mut builder = PanelConnection::builder()
        .host(&toml.host)
        .port(toml.port)
        .username(&toml.username)
        .password(&toml.password)
        .timeout(Duration::from_secs(toml.timeout_secs));
    if let Some(path) = &toml.partitions_description_path {
        builder = builder.partitions_description_path(path);
    }
    if let Some(path) = &toml.partitions_status_path {
        builder = builder.partitions_status_path(path);
    }
    builder.build()
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn now_epoch_ms() -> u64 {
    Utc::now().timestamp_millis() as u64
}

async fn publish_json(client: &AsyncClient, topic: &str, payload: &impl Serialize, retain: bool) {
    match serde_json::to_string(payload) {
        Ok(json) => {
            if let Err(e) = client.publish(topic, QoS::AtLeastOnce, retain, json).await {
                error!("Failed to publish to {topic}: {e}");
            }
        }
        Err(e) => error!("Failed to serialize MQTT payload: {e}"),
    }
}

async fn publish_text(client: &AsyncClient, topic: &str, payload: &str, retain: bool) {
    if let Err(e) = client
        .publish(topic, QoS::AtLeastOnce, retain, payload.as_bytes().to_vec())
        .await
    {
        error!("Failed to publish to {topic}: {e}");
    }
}

async fn publish_cmd_ack(
    client: &AsyncClient,
    topics: &Topics,
    success: bool,
    src: Option<serde_json::Value>,
    data: Option<serde_json::Value>,
) {
    let mut msg = MqttCmdAck::new(now_epoch_ms(), success, src);
    msg.data = data;
    publish_json(client, &topics.ack(), &msg, false).await;
}

/// Device block and info, replaced when device info arrives late.
struct PanelIdentity {
    device: HaDevice,
    info: Option<DeviceInfo>,
}

/// Everything the MQTT side needs to describe the panel.
struct Bridge {
    client: AsyncClient,
    topics: Topics,
    host: String,
    identity: Mutex<PanelIdentity>,
    latest: Mutex<Option<Arc<PanelSnapshot>>>,
}

impl Bridge {
    fn new(client: AsyncClient, topics: Topics, host: &str, info: Option<DeviceInfo>) -> Self {
        Self {
            client,
            topics,
            host: host.to_string(),
            identity: Mutex::new(PanelIdentity {
                device: HaDevice::new(host, info.as_ref()),
                info,
            }),
            latest: Mutex::new(None),
        }
    }

    async fn set_info(&self, info: DeviceInfo) {
        let mut identity = self.identity.lock().await;
        identity.device = HaDevice::new(&self.host, Some(&info));
        identity.info = Some(info);
    }

    async fn publish_snapshot(&self, snapshot: &PanelSnapshot) -> Option<serde_json::Value> {
        let msg = {
            let identity = self.identity.lock().await;
            hass::build_snapshot(now_epoch_ms(), identity.info.as_ref(), snapshot)
        };
        publish_json(&self.client, &self.topics.snapshot(), &msg, true).await;
        serde_json::to_value(&msg).ok()
    }

    async fn publish_availability(&self, online: bool) {
        let payload = if online {
            hass::PAYLOAD_ONLINE
        } else {
            hass::PAYLOAD_OFFLINE
        };
        publish_text(&self.client, &self.topics.availability(), payload, true).await;
    }

    /// Announce a resource's entities and publish their current state.
    async fn announce(&self, snapshot: &PanelSnapshot, resource: Resource) {
        let device = self.identity.lock().await.device.clone();
        let configs = hass::discovery_for_resource(&self.topics, &device, snapshot, resource);
        info!("Announcing {} {resource} entities", configs.len());
        for ann in &configs {
            publish_json(&self.client, &ann.topic, &ann.config, true).await;
        }
        for (topic, state) in hass::states_for_resource(&self.topics, snapshot, resource) {
            publish_text(&self.client, &topic, state, true).await;
        }
    }

    async fn publish_state(&self, kind: hass::EntityKind, index: usize, on: bool) {
        let topic = self.topics.state(kind, index);
        publish_text(&self.client, &topic, hass::on_off(on), true).await;
    }
}

// ---------------------------------------------------------------------------
// Panel event → MQTT
// ---------------------------------------------------------------------------

/// Per-connection bookkeeping of the event task.
#[derive(Default)]
struct EventState {
    announced: HashSet<Resource>,
    online: Option<bool>,
}

async fn handle_panel_event(event: PanelEvent, bridge: &Bridge, state: &mut EventState) {
    match event {
        PanelEvent::Snapshot(snapshot) => {
            for resource in Resource::ALL {
                if snapshot.is_available(resource) && state.announced.insert(resource) {
                    bridge.announce(&snapshot, resource).await;
                }
            }

            let online = snapshot.any_available();
            if state.online != Some(online) {
                if online {
                    info!("Panel reachable");
                } else {
                    warn!("Panel unreachable, marking entities offline");
                }
                bridge.publish_availability(online).await;
                state.online = Some(online);
            }

            bridge.publish_snapshot(&snapshot).await;
            *bridge.latest.lock().await = Some(snapshot);
        }

        PanelEvent::ZoneChanged { index, old, new } => {
            info!(
                "Zone {} status {} -> {} (bypass {})",
                index + 1,
                old.status,
                new.status,
                new.bypass
            );
            if !new.is_not_used() {
                bridge
                    .publish_state(hass::EntityKind::Zone, index, new.is_alarm())
                    .await;
            }
        }

        PanelEvent::OutputChanged { index, old, new } => {
            info!("Output {} value {} -> {}", index + 1, old.value, new.value);
            if !new.is_not_used() {
                bridge
                    .publish_state(hass::EntityKind::Output, index, new.is_on())
                    .await;
            }
        }

        PanelEvent::PartitionChanged { index, old, new } => {
            info!("Partition {} {old} -> {new}", index + 1);
            bridge
                .publish_state(hass::EntityKind::Partition, index, new.is_armed())
                .await;
        }

        PanelEvent::Unavailable { resource } => {
            warn!("Panel {resource} unavailable");
        }

        PanelEvent::Available { resource } => {
            info!("Panel {resource} available again");
        }

        PanelEvent::DescriptionsLoaded { resource } => {
            info!("Labels for {resource} loaded, announcing again");
            state.announced.remove(&resource);
        }

        PanelEvent::DeviceInfo(info) => {
            info!("Device info now {} ({}), announcing again", info.name, info.info);
            bridge.set_info(info).await;
            state.announced.clear();
        }
    }
}

// ---------------------------------------------------------------------------
// MQTT command handler
// ---------------------------------------------------------------------------

async fn handle_command(payload_str: &str, cmd: MqttCommand, bridge: &Bridge) {
    // Parse the raw payload as a JSON value for the CMD_ACK src field
    let src_json = serde_json::from_str::<serde_json::Value>(payload_str).ok();

    match cmd.op.as_str() {
        "SNAPSHOT" => {
            debug!("Command: SNAPSHOT");
            let latest = bridge.latest.lock().await.clone();
            match latest {
                Some(snapshot) => {
                    let data = bridge.publish_snapshot(&snapshot).await;
                    publish_cmd_ack(&bridge.client, &bridge.topics, true, src_json, data).await;
                }
                None => {
                    warn!("SNAPSHOT: no poll has completed yet");
                    publish_cmd_ack(&bridge.client, &bridge.topics, false, src_json, None).await;
                }
            }
        }

        "PING" => {
            info!("Command: PING");
            publish_cmd_ack(&bridge.client, &bridge.topics, true, src_json, None).await;
        }

        other => {
            warn!("Unknown command: {other}");
            publish_cmd_ack(&bridge.client, &bridge.topics, false, src_json, None).await;
        }
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG controls verbosity (e.g. RUST_LOG=debug or RUST_LOG=lares_bridge=trace).
    // Default: info.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    // systemd journal already adds timestamps, so omit them when running under systemd
    if std::env::var_os("JOURNAL_STREAM").is_some() {
        tracing_subscriber::fmt().without_time().with_env_filter(env_filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let cli = Cli::parse();

    let mut config = load_config(&cli.config)?;
    parse_mqtt_url(&config.mqtt.url)?;

    let mut sighup = signal(SignalKind::hangup())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    loop {
        let (mqtt_host, mqtt_port) = parse_mqtt_url(&config.mqtt.url)?;
        let topics = Topics::new(&config.mqtt.base_topic, &config.mqtt.discovery_prefix);

        // Panel client and static data
        let connection = build_panel_connection(&config.panel);
        info!("Polling Lares panel at {}", connection.base_url());
        let client = PanelClient::new(connection).context("Failed to create panel client")?;
        let mut poller = Poller::new(client)
            .with_interval(Duration::from_secs(config.panel.rate_secs))
            .with_timeout(Duration::from_secs(config.panel.timeout_secs))
            .with_zone_names(config.zone_names.clone());

        let info = poller.load_device_info().await;
        match &info {
            Some(i) => info!("Panel: {} ({})", i.name, i.info),
            None => warn!("Could not read panel info; retrying on every poll"),
        }
        poller.load_descriptions().await;

        // Set up MQTT
        let mut mqtt_opts = MqttOptions::new(&config.mqtt.client_id, &mqtt_host, mqtt_port);
        mqtt_opts.set_keep_alive(Duration::from_secs(30));
        mqtt_opts.set_last_will(LastWill::new(
            topics.availability(),
            hass::PAYLOAD_OFFLINE,
            QoS::AtLeastOnce,
            true,
        ));
        let (mqtt_client, mut eventloop) = AsyncClient::new(mqtt_opts, 256);

        let bridge = Arc::new(Bridge::new(
            mqtt_client.clone(),
            topics.clone(),
            poller.client().connection().host(),
            info,
        ));

        // Task 1: Panel event listener
        let bridge_events = Arc::clone(&bridge);
        let mut event_rx = poller.subscribe();
        let event_handle = tokio::spawn(async move {
            let mut state = EventState::default();
            loop {
                match event_rx.recv().await {
                    Ok(event) => handle_panel_event(event, &bridge_events, &mut state).await,
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        warn!("Event receiver lagged, missed {n} events");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                        info!("Event channel closed");
                        break;
                    }
                }
            }
        });

        // Task 2: MQTT event loop (receives messages, handles commands)
        let bridge_cmds = Arc::clone(&bridge);
        let sub_topic = topics.command();
        let mqtt_handle = tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        // rumqttc does not resubscribe after a broker
                        // reconnect, so subscribe on every ConnAck.
                        info!("MQTT: connected, subscribing to {sub_topic}");
                        if let Err(e) = bridge_cmds
                            .client
                            .subscribe(&sub_topic, QoS::AtLeastOnce)
                            .await
                        {
                            error!("Failed to subscribe to {sub_topic}: {e}");
                        }
                    }
                    Ok(Event::Incoming(Packet::Publish(msg))) => {
                        if msg.topic == sub_topic {
                            let payload = String::from_utf8_lossy(&msg.payload);
                            match serde_json::from_str::<MqttCommand>(&payload) {
                                Ok(cmd) => {
                                    if cmd.op == "SNAPSHOT" {
                                        debug!("MQTT command received: {payload}");
                                    } else {
                                        info!("MQTT command received: {payload}");
                                    }
                                    handle_command(&payload, cmd, &bridge_cmds).await;
                                }
                                Err(e) => {
                                    warn!("Failed to parse MQTT command: {e}");
                                }
                            }
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!("MQTT event loop error: {e}");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        });

        // Task 3: poller
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let poll_handle = tokio::spawn(poller.run(shutdown_rx));

        info!("MQTT bridge running. Send SIGHUP to restart, SIGINT/SIGTERM to stop.");
        let restart = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received SIGINT, shutting down...");
                false
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down...");
                false
            }
            _ = sighup.recv() => {
                info!("Received SIGHUP, reloading config and restarting connections...");
                true
            }
        };

        let _ = shutdown_tx.send(true);
        if let Err(e) = poll_handle.await {
            warn!("Poller task ended abnormally: {e}");
        }
        event_handle.abort();

        // Let the MQTT loop flush the offline marker before tearing it down
        bridge.publish_availability(false).await;
        tokio::time::sleep(Duration::from_millis(500)).await;
        if let Err(e) = mqtt_client.disconnect().await {
            debug!("MQTT disconnect: {e}");
        }
        mqtt_handle.abort();

        if !restart {
            break;
        }

        // Reload config from disk; keep previous config on failure
        info!("Reloading config from {}", cli.config);
        match load_config(&cli.config).and_then(|c| parse_mqtt_url(&c.mqtt.url).map(|_| c)) {
            Ok(new_config) => {
                config = new_config;
                info!("Config reloaded successfully");
            }
            Err(e) => warn!("Failed to reload config, keeping previous: {e:#}"),
        }

        info!("Reconnecting...");
    }

    info!("Shutdown complete");
    Ok(())
}

/// Parse an MQTT URL like "mqtt://host:port" into (host, port).
fn parse_mqtt_url(url: &str) -> Result<(String, u16)> {
    let stripped = url
        .strip_prefix("mqtt://")
        .or_else(|| url.strip_prefix("tcp://"))
        .unwrap_or(url);

    let (host, port_str) = stripped
        .rsplit_once(':')
        .context("MQTT URL must be in format mqtt://host:port")?;

    let port: u16 = port_str.parse().context("Invalid MQTT port number")?;

    Ok((host.to_string(), port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mqtt_url() {
        assert_eq!(
            parse_mqtt_url("mqtt://broker.lan:1883").unwrap(),
            ("broker.lan".to_string(), 1883)
        );
        assert_eq!(
            parse_mqtt_url("tcp://10.0.0.2:1884").unwrap(),
            ("10.0.0.2".to_string(), 1884)
        );
        assert!(parse_mqtt_url("mqtt://broker.lan").is_err());
        assert!(parse_mqtt_url("mqtt://broker.lan:http").is_err());
    }

    #[test]
    fn test_config_defaults() {
        let config: Config = toml::from_str(
            r#"
            [panel]
            host = "192.168.1.50"
            username = "admin"
            password = "secret"

            [mqtt]
            url = "mqtt://localhost:1883"
            "#,
        )
        .unwrap();
        assert_eq!(config.panel.rate_secs, 10);
        assert_eq!(config.panel.timeout_secs, 10);
        assert_eq!(config.mqtt.base_topic, "lares");
        assert_eq!(config.mqtt.discovery_prefix, "homeassistant");

        let conn = build_panel_connection(&config.panel);
        assert_eq!(conn.port(), 4202);
        assert_eq!(
            conn.paths().partitions_status,
            "partitions/partitionsStatus48IP.xml"
        );
    }

    #[test]
    fn test_config_overrides() {
        let config: Config = toml::from_str(
            r#"
            [panel]
            host = "alarm"
            port = 8080
            username = "u"
            password = "p"
            rate_secs = 30
            partitions_status_path = "partitions/custom.xml"

            [mqtt]
            url = "mqtt://localhost:1883"
            base_topic = "home/alarm"

            [zone_names]
            1 = "Front door"
            "#,
        )
        .unwrap();
        let conn = build_panel_connection(&config.panel);
        assert_eq!(conn.base_url(), "http://alarm:8080");
        assert_eq!(conn.paths().partitions_status, "partitions/custom.xml");
        assert_eq!(config.panel.rate_secs, 30);
        assert_eq!(config.zone_names.get(&1).map(String::as_str), Some("Front door"));
    }

    #[test]
    fn test_zone_names_reject_zero() {
        let result: std::result::Result<Config, _> = toml::from_str(
            r#"
            [panel]
            host = "alarm"
            username = "u"
            password = "p"
            [mqtt]
            url = "mqtt://localhost:1883"
            [zone_names]
            0 = "Nope"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_zone_names_out_of_range_accepted() {
        let config: Config = toml::from_str(
            r#"
            [panel]
            host = "alarm"
            username = "u"
            password = "p"
            [mqtt]
            url = "mqtt://localhost:1883"
            [zone_names]
            18446744073709551615 = "Typo"
            "#,
        )
        .unwrap();
        assert_eq!(config.zone_names.len(), 1);

        // Applied at label time, so unknown numbers cannot grow anything
        let client = PanelClient::new(build_panel_connection(&config.panel)).unwrap();
        let poller = Poller::new(client).with_zone_names(config.zone_names);
        assert!(poller.descriptions().zones.is_empty());
    }

    fn test_bridge() -> (Bridge, rumqttc::EventLoop) {
        let (client, eventloop) =
            AsyncClient::new(MqttOptions::new("test", "localhost", 1883), 64);
        let bridge = Bridge::new(client, Topics::default(), "10.0.0.5", None);
        (bridge, eventloop)
    }

    #[tokio::test]
    async fn test_late_labels_announce_again() {
        let (bridge, _eventloop) = test_bridge();
        let mut state = EventState::default();
        let snapshot = Arc::new(PanelSnapshot {
            zones: Some(vec![]),
            ..Default::default()
        });

        handle_panel_event(PanelEvent::Snapshot(Arc::clone(&snapshot)), &bridge, &mut state).await;
        assert!(state.announced.contains(&Resource::Zones));
        assert!(!state.announced.contains(&Resource::Outputs));

        handle_panel_event(
            PanelEvent::DescriptionsLoaded {
                resource: Resource::Zones,
            },
            &bridge,
            &mut state,
        )
        .await;
        assert!(!state.announced.contains(&Resource::Zones));

        handle_panel_event(PanelEvent::Snapshot(snapshot), &bridge, &mut state).await;
        assert!(state.announced.contains(&Resource::Zones));
    }

    #[tokio::test]
    async fn test_late_device_info_replaces_device_block() {
        let (bridge, _eventloop) = test_bridge();
        let mut state = EventState::default();
        state.announced.insert(Resource::Partitions);
        assert_eq!(bridge.identity.lock().await.device.name, "Lares");

        let info = DeviceInfo {
            name: "Lares4.0".to_string(),
            info: "FW1.2".to_string(),
        };
        handle_panel_event(PanelEvent::DeviceInfo(info), &bridge, &mut state).await;

        let identity = bridge.identity.lock().await;
        assert_eq!(identity.device.name, "Lares4.0");
        assert_eq!(identity.device.sw_version.as_deref(), Some("FW1.2"));
        assert_eq!(identity.info.as_ref().map(|i| i.info.as_str()), Some("FW1.2"));
        assert!(state.announced.is_empty());
    }

}
