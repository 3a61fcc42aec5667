//! Example: a registry, two stations and one renter on an in-memory switchboard.
//!
//! Run with `RUST_LOG=rental_hub=debug cargo run --example marketplace [config.toml]`.

use std::time::Duration;

use rental_hub::{MarketConfig, Registry, Renter, Station, Switchboard};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rental_hub=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let path = std::env::args().nth(1).unwrap_or_else(|| {
        concat!(env!("CARGO_MANIFEST_DIR"), "/demos/marketplace.toml").to_owned()
    });
    let config = MarketConfig::from_path(&path)?;
    let board = Switchboard::new();

    let (registry, registry_task) = Registry::spawn(
        &config.registry,
        board.open(config.registry.address.clone()),
        board.clone(),
    );

    let mut stations = Vec::new();
    for station in &config.stations {
        stations.push(Station::spawn(
            station.clone(),
            board.open(station.address.clone()),
            board.clone(),
        )?);
    }
    registry.wait_for_members(stations.len()).await?;
    tracing::info!(members = ?registry.members(), "all stations registered");

    if let Some(renter) = config.renter.clone() {
        let (_handle, task) =
            Renter::spawn(renter.clone(), board.open(renter.address.clone()), board.clone())?;
        let session = task.await?;
        tracing::info!(
            outcome = ?session.outcome,
            history = ?session.history,
            earnings = ?session.station_earnings,
            "rental finished"
        );
    }

    // Give the charging cycles a chance to run before shutting down.
    tokio::time::sleep(Duration::from_secs(2)).await;

    for (handle, task) in stations {
        handle.shutdown_graceful();
        let snapshot = task.await?;
        for vehicle in &snapshot.vehicles {
            tracing::info!(
                station = %snapshot.address,
                vehicle = vehicle.name(),
                charge = vehicle.charge_level,
                status = ?vehicle.status,
                "final inventory"
            );
        }
        tracing::info!(station = %snapshot.address, earnings = snapshot.earnings, "station closed");
    }

    registry.shutdown_graceful();
    registry_task.await?;
    Ok(())
}
