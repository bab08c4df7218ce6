//! In-memory reference server.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use focustown_core::{apply_command, now_millis, Command, TownState};

use super::{PushOutcome, Rejection, ServerAdapter};
use crate::error::{SyncError, SyncResult};

/// Holds an authoritative snapshot and applies pushed commands with the
/// shared reducer, each at its `client_created_at`.
#[derive(Debug)]
pub struct InProcessServer {
    snapshot: Mutex<TownState>,
    offline: AtomicBool,
    latency: Option<Duration>,
}

impl Default for InProcessServer {
    fn default() -> Self {
        Self::new(TownState::initial(now_millis()))
    }
}

impl InProcessServer {
    /// A server holding `seed`.
    #[must_use]
    pub fn new(seed: TownState) -> Self {
        Self {
            snapshot: Mutex::new(seed),
            offline: AtomicBool::new(false),
            latency: None,
        }
    }

    /// Delays every call by `latency`.
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Makes every call fail until switched back.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// True while calls fail.
    #[must_use]
    pub fn is_offline(&self) -> bool {
        self.offline.load(Ordering::SeqCst)
    }

    /// Copy of the authoritative state.
    #[must_use]
    pub fn snapshot(&self) -> TownState {
        self.snapshot.lock().clone()
    }

    /// Replaces the authoritative state, as another device would.
    pub fn set_snapshot(&self, town: TownState) {
        *self.snapshot.lock() = town;
    }

    async fn round_trip(&self) -> SyncResult<()> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.is_offline() {
            return Err(SyncError::Adapter("server unreachable".to_string()));
        }
        Ok(())
    }
}

impl ServerAdapter for InProcessServer {
    async fn fetch_state(&self) -> SyncResult<TownState> {
        self.round_trip().await?;
        Ok(self.snapshot())
    }

    async fn push_commands(&self, commands: &[Command]) -> SyncResult<PushOutcome> {
        self.round_trip().await?;

        let mut snapshot = self.snapshot.lock();
        let mut outcome = PushOutcome::default();
        for command in commands {
            match apply_command(&snapshot, command, command.client_created_at) {
                Ok(applied) => {
                    *snapshot = applied.state;
                    outcome.acked.push(command.id.clone());
                }
                Err(reason) => {
                    tracing::debug!(id = %command.id, kind = command.type_name(), %reason, "server rejected command");
                    outcome.rejected.push(Rejection::new(command.id.clone(), reason));
                }
            }
        }
        outcome.new_state = Some(snapshot.clone());
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use focustown_core::{BuildingKind, CommandFactory, RejectReason, Timestamp};

    fn clock() -> Timestamp {
        0
    }

    #[tokio::test]
    async fn test_push_applies_in_order() {
        let server = InProcessServer::new(TownState::initial(0));
        let factory = CommandFactory::with_clock(clock);
        let place = factory.place_building("farm-2", BuildingKind::Farm, 0, 0, 0);
        let clash = factory.place_building("farm-3", BuildingKind::Farm, 1, 1, 0);

        let outcome = server
            .push_commands(&[place.clone(), clash.clone()])
            .await
            .unwrap();
        assert_eq!(outcome.acked, vec![place.id]);
        assert_eq!(
            outcome.rejected,
            vec![Rejection::new(clash.id, RejectReason::TileOccupied)]
        );
        let new_state = outcome.new_state.unwrap();
        assert_eq!(new_state, server.snapshot());
        assert_eq!(new_state.version, 2);
    }

    #[tokio::test]
    async fn test_offline_fails_without_changes() {
        let server = InProcessServer::new(TownState::initial(0));
        server.set_offline(true);
        let claim = CommandFactory::with_clock(clock).claim_production("farm-1");

        assert!(matches!(
            server.push_commands(&[claim]).await,
            Err(SyncError::Adapter(_))
        ));
        assert!(server.fetch_state().await.is_err());
        assert_eq!(server.snapshot().version, 1);

        server.set_offline(false);
        assert_eq!(server.fetch_state().await.unwrap().version, 1);
    }
}
