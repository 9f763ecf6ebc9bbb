//! Heatlink: Modbus communication layer for a heating controller.
//!
//! This crate maintains one managed session to a register-oriented
//! controller, polls a configured catalogue of named signals on a schedule,
//! and exposes the results as atomically swapped snapshots:
//!
//! - [`codec`] - float32 ⇄ register-pair and coil ⇄ bool conversions
//! - [`transport`] - the Modbus client seam ([`transport::TcpTransport`] in production)
//! - [`session`] - connection lifecycle and primitive reads/writes
//! - [`registers`] - the named signal catalogue
//! - [`poller`] - the periodic poll loop publishing [`snapshot::Snapshot`]s
//! - [`gateway`] - validated operator writes
//! - [`config`] - JSON5 configuration loading

pub mod codec;
pub mod config;
pub mod gateway;
pub mod poller;
pub mod registers;
pub mod session;
pub mod snapshot;
pub mod transport;

// Re-export commonly used types at the crate root
pub use config::{ConfigError, DeviceConfig, HeatlinkConfig, LogFormat, LoggingConfig, SignalConfig};
pub use gateway::{CommandGateway, GatewayError};
pub use poller::{Poller, PollerError};
pub use registers::{CatalogueError, RegisterMap, RegisterMapError, SignalDescriptor, SignalKind};
pub use session::{ConnectionState, DeviceSession, SessionError};
pub use snapshot::{SignalStatus, SignalValue, Snapshot, SnapshotEntry};
pub use transport::{ModbusTransport, TcpTransport, TransportError};

/// Initialize tracing with the given configuration.
///
/// Supports two output formats:
/// - `LogFormat::Text` (default): Human-readable text format
/// - `LogFormat::Json`: Structured JSON format for log aggregation systems
pub fn init_tracing(config: &LoggingConfig) -> Result<(), ConfigError> {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format {
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(fmt::layer())
                .with(filter)
                .try_init()
                .map_err(|e| {
                    ConfigError::Validation(format!("Failed to initialize tracing: {}", e))
                })?;
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(fmt::layer().json())
                .with(filter)
                .try_init()
                .map_err(|e| {
                    ConfigError::Validation(format!("Failed to initialize tracing: {}", e))
                })?;
        }
    }

    Ok(())
}
