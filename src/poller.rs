//! Periodic device polling.
//!
//! Each cycle reads every catalogued signal exactly once through the shared
//! session and publishes a fresh [`Snapshot`]. A failed signal read degrades
//! that entry; a failed connection degrades the whole cycle; neither cancels
//! the schedule.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Notify, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::codec::{decode_coil, decode_float32};
use crate::registers::{RegisterMap, SignalDescriptor, SignalKind};
use crate::session::{DeviceSession, SessionError};
use crate::snapshot::{SignalStatus, SignalValue, Snapshot, SnapshotEntry};
use crate::transport::ModbusTransport;

/// Error type for polling operations.
#[derive(Debug, thiserror::Error)]
pub enum PollerError {
    #[error("connection failed: {0}")]
    Connection(String),
}

/// A poller for one device session.
pub struct Poller<T> {
    session: Arc<Mutex<DeviceSession<T>>>,
    map: Arc<RegisterMap>,
    period: Duration,
    publish: watch::Sender<Snapshot>,
    refresh: Arc<Notify>,
}

impl<T: ModbusTransport> Poller<T> {
    /// Create a poller and the receiver through which snapshots are
    /// observed.
    pub fn new(
        session: Arc<Mutex<DeviceSession<T>>>,
        map: Arc<RegisterMap>,
        period: Duration,
    ) -> (Self, watch::Receiver<Snapshot>) {
        let (publish, snapshots) = watch::channel(Snapshot::default());

        let poller = Self {
            session,
            map,
            period,
            publish,
            refresh: Arc::new(Notify::new()),
        };

        (poller, snapshots)
    }

    /// Handle for requesting an out-of-schedule cycle (used after a
    /// successful write so consumers see the new value promptly).
    pub fn refresh_handle(&self) -> Arc<Notify> {
        Arc::clone(&self.refresh)
    }

    /// Run the polling loop until the task is cancelled.
    pub async fn run(self) {
        info!(
            "Starting poller: {} signal(s), period {:?}",
            self.map.len(),
            self.period
        );

        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = self.refresh.notified() => {}
            }

            match self.poll_once().await {
                Ok(fresh) => {
                    debug!("Poll cycle complete: {}/{} fresh", fresh, self.map.len());
                }
                Err(e) => {
                    warn!("Poll cycle skipped: {}", e);
                }
            }
        }
    }

    /// Perform one cycle and publish the resulting snapshot.
    ///
    /// Returns the number of signals read successfully. If the connection
    /// cannot be established the cycle ends early with every entry marked
    /// Stale and no individual reads attempted.
    pub async fn poll_once(&self) -> Result<usize, PollerError> {
        let previous = self.publish.borrow().clone();
        let taken_at = chrono::Utc::now().timestamp_millis();

        let mut session = self.session.lock().await;

        if let Err(e) = session.ensure_connected().await {
            drop(session);
            self.publish
                .send_replace(self.stale_snapshot(&previous, taken_at));
            return Err(PollerError::Connection(e.to_string()));
        }

        let mut entries = HashMap::with_capacity(self.map.len());
        let mut fresh = 0;

        for signal in self.map.iter() {
            match read_signal(&mut session, signal).await {
                Ok(value) => {
                    entries.insert(
                        signal.name.clone(),
                        SnapshotEntry {
                            value: Some(value),
                            last_updated: taken_at,
                            status: SignalStatus::Ok,
                        },
                    );
                    fresh += 1;
                }
                Err(e) => {
                    warn!("Failed to read '{}' @ {}: {}", signal.name, signal.address, e);
                    entries.insert(
                        signal.name.clone(),
                        carried_over(&previous, &signal.name, taken_at, SignalStatus::ReadError),
                    );
                }
            }
        }

        drop(session);

        self.publish.send_replace(Snapshot::new(taken_at, entries));
        Ok(fresh)
    }

    /// Snapshot for a cycle that never got a connection: every catalogued
    /// signal carried over and marked Stale.
    fn stale_snapshot(&self, previous: &Snapshot, taken_at: i64) -> Snapshot {
        let entries = self
            .map
            .iter()
            .map(|signal| {
                (
                    signal.name.clone(),
                    carried_over(previous, &signal.name, taken_at, SignalStatus::Stale),
                )
            })
            .collect();

        Snapshot::new(taken_at, entries)
    }
}

/// Build a degraded entry that keeps the previous value and its timestamp.
fn carried_over(
    previous: &Snapshot,
    name: &str,
    taken_at: i64,
    status: SignalStatus,
) -> SnapshotEntry {
    match previous.get(name) {
        Some(entry) => SnapshotEntry {
            value: entry.value,
            last_updated: entry.last_updated,
            status,
        },
        None => SnapshotEntry {
            value: None,
            last_updated: taken_at,
            status,
        },
    }
}

/// Issue the read matching the signal's kind and decode the result.
async fn read_signal<T: ModbusTransport>(
    session: &mut DeviceSession<T>,
    signal: &SignalDescriptor,
) -> Result<SignalValue, SessionError> {
    match signal.kind {
        SignalKind::Float32Pair => {
            let words = session.read_registers(signal.address, 2).await?;
            if words.len() < 2 {
                return Err(SessionError::Io(format!(
                    "short read @ {}: got {} word(s)",
                    signal.address,
                    words.len()
                )));
            }
            Ok(SignalValue::Float(decode_float32(words[0], words[1])))
        }
        SignalKind::Coil => {
            let bit = session.read_coil(signal.address).await?;
            Ok(SignalValue::Switch(decode_coil(bit)))
        }
    }
}
