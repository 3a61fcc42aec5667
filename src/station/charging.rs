use std::sync::Arc;
use std::time::Duration;

use rental_hub_core::{Address, ShutdownSignal};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::{Publisher, StationState};

/// Periodic station-wide charging.
///
/// Every `period` the cycle checks whether any vehicle needs charge. If so it
/// waits `duration` without holding the inventory lock, then brings every
/// eligible vehicle to full charge at once. Reserved vehicles are skipped.
pub(crate) struct ChargingCycle {
    pub(crate) address: Address,
    pub(crate) state: Arc<Mutex<StationState>>,
    pub(crate) publisher: Publisher,
    pub(crate) period: Duration,
    pub(crate) duration: Duration,
    pub(crate) reservation_ttl: Option<Duration>,
}

impl ChargingCycle {
    pub(crate) fn spawn(self, shutdown: ShutdownSignal) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    async fn run(self, mut shutdown: ShutdownSignal) {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.requested() => break,
                _ = ticker.tick() => {}
            }

            if !self.begin().await {
                continue;
            }
            tracing::info!(station = %self.address, duration = ?self.duration, "charging cycle started");

            tokio::select! {
                biased;
                _ = shutdown.requested() => break,
                _ = tokio::time::sleep(self.duration) => {}
            }

            let charged = self.finish().await;
            tracing::info!(station = %self.address, ?charged, "charging cycle finished");
        }

        tracing::debug!(station = %self.address, "charging stopped");
    }

    /// Releases stale reservations and reports whether anything needs charge.
    async fn begin(&self) -> bool {
        let mut state = self.state.lock().await;
        if let Some(ttl) = self.reservation_ttl {
            let expired = state.inventory.expire_reservations(Instant::now(), ttl);
            if !expired.is_empty() {
                tracing::info!(station = %self.address, ?expired, "released expired reservations");
                self.publisher.publish(&state);
            }
        }
        state.inventory.needs_charging()
    }

    async fn finish(&self) -> Vec<String> {
        let mut state = self.state.lock().await;
        let charged = state.inventory.charge_all();
        if !charged.is_empty() {
            self.publisher.publish(&state);
        }
        charged
    }
}
