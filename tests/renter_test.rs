use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use rental_hub::{
    Address, ConfigError, Envelope, Kind, Message, Outcome, Registry, RegistryConfig, RegistryHandle,
    RentalError, Renter, RenterConfig, RenterState, Station, StationConfig, StationHandle, Status,
    Switchboard, Transport, TransportError,
};

/// Drops the first `vehicleCollected` reply that passes through.
#[derive(Clone)]
struct DropFirstCollected {
    inner: Switchboard,
    dropped: Arc<AtomicBool>,
}

impl Transport for DropFirstCollected {
    fn send(&self, envelope: Envelope) -> Result<(), TransportError> {
        if envelope.kind == Kind::VehicleCollected && !self.dropped.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.inner.send(envelope)
    }
}

fn quiet_station(address: &str) -> StationConfig {
    StationConfig {
        charge_period: 1000.0,
        ..StationConfig::new(address)
    }
}

fn spawn_station<T: Transport>(board: &Switchboard, config: StationConfig, transport: T) -> StationHandle {
    let (handle, _task) =
        Station::spawn(config.clone(), board.open(config.address.clone()), transport).unwrap();
    handle
}

fn spawn_registry(board: &Switchboard) -> RegistryHandle {
    let config = RegistryConfig::default();
    let (handle, _task) = Registry::spawn(&config, board.open(config.address.clone()), board.clone());
    handle
}

/// Holds `vehicle` at `station` on behalf of someone else.
async fn occupy(board: &Switchboard, station: &Address, vehicle: &str) {
    let mut other = board.open(format!("other-{station}"));
    board
        .send(
            Envelope::inform(
                other.address().clone(),
                station.clone(),
                &Message::ReserveVehicle {
                    vehicle: vehicle.into(),
                },
            )
            .with_thread(1),
        )
        .unwrap();
    let reply = other.receive(Duration::from_secs(1)).await.unwrap();
    assert_eq!(reply.kind, Kind::VehicleReserved);
}

async fn two_station_ring(board: &Switchboard) -> (StationHandle, StationHandle) {
    let registry = spawn_registry(board);
    let s1 = spawn_station(board, quiet_station("station1@rec.foi.hr"), board.clone());
    registry.wait_for_members(1).await.unwrap();
    let s2 = spawn_station(board, quiet_station("station2@rec.foi.hr"), board.clone());
    registry.wait_for_members(2).await.unwrap();
    for station in [&s1, &s2] {
        station.wait_for(|s| s.known_stations.len() == 2).await.unwrap();
    }
    (s1, s2)
}

#[tokio::test(start_paused = true)]
async fn test_full_rental_cycle() {
    let board = Switchboard::new();
    let station = spawn_station(&board, quiet_station("station1@rec.foi.hr"), board.clone());

    let config = RenterConfig::new("station1@rec.foi.hr", "mercedes", 2);
    let (handle, task) = Renter::spawn(config.clone(), board.open(config.address.clone()), board.clone()).unwrap();

    handle.wait_for_state(RenterState::Use).await.unwrap();
    assert_eq!(
        station.snapshot().vehicle("mercedes").unwrap().status,
        Status::Reserved
    );

    let session = task.await.unwrap();
    use RenterState::*;
    assert_eq!(
        session.history,
        vec![Reserve, Collect, Use, Charge, Use, Charge, Use, Return, Returned]
    );
    assert!(session.is_success());
    assert_eq!(session.station_earnings, Some(40));
    assert_eq!(session.returned_charge, Some(0.0));
    assert_eq!(session.remaining_time, 50.0);
    assert_eq!(handle.current_state(), Returned);

    let snapshot = station.snapshot();
    let mercedes = snapshot.vehicle("mercedes").unwrap();
    assert_eq!(mercedes.charge_level, 0);
    assert_eq!(mercedes.status, Status::Charging);
    assert_eq!(snapshot.earnings, 40);
}

#[tokio::test(start_paused = true)]
async fn test_second_session_from_same_address_is_served_afresh() {
    let board = Switchboard::new();
    let station = spawn_station(&board, quiet_station("station1@rec.foi.hr"), board.clone());

    let first = RenterConfig::new("station1@rec.foi.hr", "mercedes", 2);
    let (_handle, task) = Renter::spawn(first.clone(), board.open(first.address.clone()), board.clone()).unwrap();
    let session = task.await.unwrap();
    assert_eq!(session.station_earnings, Some(40));

    let second = RenterConfig::new("station1@rec.foi.hr", "mazda", 1);
    assert_eq!(second.address, first.address);
    let (_handle, task) = Renter::spawn(second.clone(), board.open(second.address.clone()), board.clone()).unwrap();
    let session = task.await.unwrap();

    assert!(session.is_success());
    assert_eq!(session.station_earnings, Some(52));

    let snapshot = station.snapshot();
    assert_eq!(snapshot.earnings, 52);
    let mazda = snapshot.vehicle("mazda").unwrap();
    assert_eq!(mazda.status, Status::Charging);
    assert_eq!(mazda.charge_level, 0);
}

#[tokio::test(start_paused = true)]
async fn test_rejects_invalid_configuration() {
    let board = Switchboard::new();
    let config = RenterConfig {
        max_attempts: 0,
        ..RenterConfig::new("station1@rec.foi.hr", "mercedes", 2)
    };
    let result = Renter::spawn(config.clone(), board.open(config.address.clone()), board.clone());
    assert!(matches!(result, Err(ConfigError::Invalid(_))));

    let config = RenterConfig {
        reply_timeout: Duration::ZERO,
        ..RenterConfig::new("station1@rec.foi.hr", "mercedes", 2)
    };
    let result = Renter::spawn(config.clone(), board.open(config.address.clone()), board.clone());
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}

#[tokio::test(start_paused = true)]
async fn test_follows_redirect_to_another_station() {
    let board = Switchboard::new();
    let (s1, s2) = two_station_ring(&board).await;
    occupy(&board, s1.address(), "mazda").await;

    let config = RenterConfig::new("station1@rec.foi.hr", "mazda", 1);
    let (_handle, task) = Renter::spawn(config.clone(), board.open(config.address.clone()), board.clone()).unwrap();
    let session = task.await.unwrap();

    assert!(session.is_success());
    assert_eq!(session.target_station, *s2.address());
    assert_eq!(session.visited, vec![s1.address().clone(), s2.address().clone()]);
    assert_eq!(session.redirects, 1);
    assert_eq!(session.station_earnings, Some(12));
    assert_eq!(s1.snapshot().earnings, 0);
    assert_eq!(s2.snapshot().earnings, 12);
}

#[tokio::test(start_paused = true)]
async fn test_terminates_without_other_stations() {
    let board = Switchboard::new();
    let station = spawn_station(&board, quiet_station("station1@rec.foi.hr"), board.clone());
    occupy(&board, station.address(), "trek").await;

    let config = RenterConfig::new("station1@rec.foi.hr", "trek", 1);
    let (_handle, task) = Renter::spawn(config.clone(), board.open(config.address.clone()), board.clone()).unwrap();
    let session = task.await.unwrap();

    assert_eq!(session.history, vec![RenterState::Reserve, RenterState::Terminated]);
    assert_eq!(
        session.outcome,
        Some(Outcome::Terminated(RentalError::NoStationsAvailable {
            vehicle: "trek".into()
        }))
    );
    assert_eq!(session.station_earnings, None);
}

#[tokio::test(start_paused = true)]
async fn test_stops_when_redirects_come_full_circle() {
    let board = Switchboard::new();
    let (s1, s2) = two_station_ring(&board).await;
    occupy(&board, s1.address(), "ktm").await;
    occupy(&board, s2.address(), "ktm").await;

    let config = RenterConfig::new("station1@rec.foi.hr", "ktm", 1);
    let (_handle, task) = Renter::spawn(config.clone(), board.open(config.address.clone()), board.clone()).unwrap();
    let session = task.await.unwrap();

    assert!(!session.is_success());
    assert_eq!(session.redirects, 1);
    assert_eq!(session.visited.len(), 2);
    assert_eq!(
        session.history,
        vec![RenterState::Reserve, RenterState::Reserve, RenterState::Terminated]
    );
    assert!(matches!(
        session.outcome,
        Some(Outcome::Terminated(RentalError::NoStationsAvailable { .. }))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_lost_reply_is_recovered_without_double_charge() {
    let board = Switchboard::new();
    let lossy = DropFirstCollected {
        inner: board.clone(),
        dropped: Arc::new(AtomicBool::new(false)),
    };
    let station = spawn_station(&board, quiet_station("station1@rec.foi.hr"), lossy.clone());

    let config = RenterConfig::new("station1@rec.foi.hr", "mercedes", 2);
    let (_handle, task) = Renter::spawn(config.clone(), board.open(config.address.clone()), board.clone()).unwrap();
    let session = task.await.unwrap();

    assert!(lossy.dropped.load(Ordering::SeqCst));
    assert!(session.is_success());
    assert_eq!(session.station_earnings, Some(40));
    assert_eq!(station.snapshot().earnings, 40);
}

#[tokio::test(start_paused = true)]
async fn test_gives_up_on_unreachable_station() {
    let board = Switchboard::new();
    let config = RenterConfig::new("ghost@rec.foi.hr", "nissan", 1);
    let (_handle, task) = Renter::spawn(config.clone(), board.open(config.address.clone()), board.clone()).unwrap();
    let session = task.await.unwrap();

    assert_eq!(
        session.outcome,
        Some(Outcome::Terminated(RentalError::RetriesExhausted {
            peer: Address::new("ghost@rec.foi.hr"),
            attempts: config.max_attempts,
        }))
    );
}

#[tokio::test(start_paused = true)]
async fn test_silent_station_is_retried_on_the_same_thread() {
    let board = Switchboard::new();
    let mut silent = board.open("station1@rec.foi.hr");

    let config = RenterConfig::new("station1@rec.foi.hr", "nissan", 1);
    let (_handle, task) = Renter::spawn(config.clone(), board.open(config.address.clone()), board.clone()).unwrap();
    let session = task.await.unwrap();
    assert!(matches!(
        session.outcome,
        Some(Outcome::Terminated(RentalError::RetriesExhausted { attempts: 3, .. }))
    ));

    let mut threads = Vec::new();
    while let Some(envelope) = silent.try_recv() {
        assert_eq!(envelope.kind, Kind::ReserveVehicle);
        threads.push(envelope.thread);
    }
    assert_eq!(threads.len(), 3);
    assert!(threads.iter().all(|t| t.is_some() && *t == threads[0]));
}

#[tokio::test(start_paused = true)]
async fn test_unknown_vehicle_sends_nothing() {
    let board = Switchboard::new();
    let mut station = board.open("station1@rec.foi.hr");

    let config = RenterConfig::new("station1@rec.foi.hr", "vespa", 1);
    let (_handle, task) = Renter::spawn(config.clone(), board.open(config.address.clone()), board.clone()).unwrap();
    let session = task.await.unwrap();

    assert_eq!(
        session.outcome,
        Some(Outcome::Terminated(RentalError::UnknownVehicle("vespa".into())))
    );
    assert!(station.try_recv().is_none());
}
