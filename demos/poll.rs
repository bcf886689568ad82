//! Example: Poll a panel, print its state, then print changes as they happen.

use std::time::Duration;

use lares_bridge::{PanelClient, PanelConnection, PanelEvent, Poller};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let conn = PanelConnection::builder()
        .host("192.168.1.50")
        .username("admin")
        .password("secret")
        .build();

    let mut poller = Poller::new(PanelClient::new(conn)?).with_interval(Duration::from_secs(5));

    match poller.load_device_info().await {
        Some(info) => println!("Panel: {} ({})", info.name, info.info),
        None => println!("Panel: device info unavailable"),
    }
    poller.load_descriptions().await;

    let snapshot = poller.poll_once().await;
    for zone in snapshot.zones.iter().flatten() {
        println!(
            "  Zone {}: {} - {} (bypass={}, alarm={})",
            zone.index + 1,
            zone.label,
            zone.status.status,
            zone.status.bypass,
            zone.status.alarm
        );
    }
    for output in snapshot.outputs.iter().flatten() {
        println!(
            "  Output {}: {} - {}",
            output.index + 1,
            output.label,
            if output.is_on() { "ON" } else { "OFF" }
        );
    }
    for partition in snapshot.partitions.iter().flatten() {
        println!(
            "  Partition {}: {} - {}",
            partition.index + 1,
            partition.label,
            partition.status
        );
    }

    let mut events = poller.subscribe();
    let (stop_tx, stop_rx) = tokio::sync::watch::channel(false);
    let task = tokio::spawn(poller.run(stop_rx));

    println!("\nListening for changes (Ctrl+C to stop)...\n");

    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Ok(PanelEvent::Snapshot(_)) => {}
                    Ok(PanelEvent::ZoneChanged { index, old, new }) => {
                        println!("Zone {}: {} -> {}", index + 1, old.status, new.status);
                    }
                    Ok(PanelEvent::OutputChanged { index, new, .. }) => {
                        println!("Output {}: value {}", index + 1, new.value);
                    }
                    Ok(PanelEvent::PartitionChanged { index, old, new }) => {
                        println!("Partition {}: {} -> {}", index + 1, old, new);
                    }
                    Ok(event) => {
                        println!("Event: {:?}", event);
                    }
                    Err(e) => {
                        println!("Event channel error: {}", e);
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("\nStopping...");
                break;
            }
        }
    }

    let _ = stop_tx.send(true);
    task.await?;
    Ok(())
}
