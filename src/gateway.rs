//! Operator write gateway.
//!
//! Validates user-initiated writes against the catalogue before any I/O is
//! attempted: unknown names, kind mismatches, and out-of-range setpoints are
//! rejected up front; the device is never asked to store a bad value.

use std::sync::Arc;

use tokio::sync::{Mutex, Notify};
use tracing::{info, warn};

use crate::codec::{encode_coil, encode_float32};
use crate::registers::{RegisterMap, RegisterMapError, SignalKind};
use crate::session::{DeviceSession, SessionError};
use crate::snapshot::SignalValue;
use crate::transport::ModbusTransport;

/// Error type for gateway operations.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("unknown signal '{0}'")]
    UnknownSignal(String),
    #[error("value {value} for '{name}' outside valid range [{min}, {max}]")]
    OutOfRange {
        name: String,
        value: f32,
        min: f32,
        max: f32,
    },
    #[error("signal '{name}' is a {expected} signal, got a {given} value")]
    WrongKind {
        name: String,
        expected: &'static str,
        given: &'static str,
    },
    #[error("communication failed: {0}")]
    Communication(#[from] SessionError),
}

impl From<RegisterMapError> for GatewayError {
    fn from(e: RegisterMapError) -> Self {
        match e {
            RegisterMapError::UnknownSignal(name) => GatewayError::UnknownSignal(name),
            RegisterMapError::OutOfRange {
                name,
                value,
                min,
                max,
            } => GatewayError::OutOfRange {
                name,
                value,
                min,
                max,
            },
        }
    }
}

/// Validates and forwards operator writes through the shared session.
pub struct CommandGateway<T> {
    session: Arc<Mutex<DeviceSession<T>>>,
    map: Arc<RegisterMap>,
    refresh: Arc<Notify>,
}

impl<T: ModbusTransport> CommandGateway<T> {
    /// Create a gateway sharing the poller's session and refresh trigger.
    pub fn new(
        session: Arc<Mutex<DeviceSession<T>>>,
        map: Arc<RegisterMap>,
        refresh: Arc<Notify>,
    ) -> Self {
        Self {
            session,
            map,
            refresh,
        }
    }

    /// Validate and write one value. Never retries; a failed write is
    /// surfaced to the caller, who decides whether to try again.
    pub async fn write_value(&self, name: &str, value: SignalValue) -> Result<(), GatewayError> {
        let signal = self.map.resolve(name)?;

        match (signal.kind, value) {
            (SignalKind::Float32Pair, SignalValue::Float(v)) => {
                self.map.validate_range(name, v)?;
                let words = encode_float32(v);
                let mut session = self.session.lock().await;
                session.write_registers(signal.address, &words).await?;
            }
            (SignalKind::Coil, SignalValue::Switch(b)) => {
                let mut session = self.session.lock().await;
                session.write_coil(signal.address, encode_coil(b)).await?;
            }
            (kind, given) => {
                return Err(GatewayError::WrongKind {
                    name: name.to_string(),
                    expected: kind.as_str(),
                    given: match given {
                        SignalValue::Float(_) => "float32",
                        SignalValue::Switch(_) => "coil",
                    },
                });
            }
        }

        info!("Wrote '{}' = {:?}", name, value);

        // Pull fresh state instead of waiting out the poll interval.
        self.refresh.notify_one();
        Ok(())
    }

    /// Write a batch of values, continuing past individual failures and
    /// reporting each outcome independently.
    pub async fn write_batch(
        &self,
        writes: &[(String, SignalValue)],
    ) -> Vec<(String, Result<(), GatewayError>)> {
        let mut results = Vec::with_capacity(writes.len());

        for (name, value) in writes {
            let result = self.write_value(name, *value).await;
            if let Err(e) = &result {
                warn!("Batch write of '{}' failed: {}", name, e);
            }
            results.push((name.clone(), result));
        }

        results
    }
}
