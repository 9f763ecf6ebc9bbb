//! Device session: connection lifecycle and primitive reads/writes.
//!
//! One logical connection to the controller. Every operation funnels through
//! [`DeviceSession::ensure_connected`]; any transport failure drops the
//! session back to [`ConnectionState::Disconnected`] so the next call can
//! attempt recovery. The session never retries internally.

use tracing::{debug, info, warn};

use crate::transport::{ModbusTransport, TransportError};

/// Error type for session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Opening the connection failed.
    #[error("connection failed: {0}")]
    Connection(String),
    /// A read or write failed on an established connection (includes timeout).
    #[error("i/o failed: {0}")]
    Io(String),
}

/// Connection lifecycle state, owned exclusively by the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
}

/// A managed session over one Modbus transport.
///
/// Not safe for concurrent use without external serialization; the protocol
/// allows one outstanding request per device. Callers share the session
/// behind a `tokio::sync::Mutex`.
pub struct DeviceSession<T> {
    transport: T,
    state: ConnectionState,
}

impl<T: ModbusTransport> DeviceSession<T> {
    /// Create a session in the Disconnected state.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            state: ConnectionState::Disconnected,
        }
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Connect if not already connected. A single bounded attempt; the
    /// retry decision belongs to the caller.
    pub async fn ensure_connected(&mut self) -> Result<(), SessionError> {
        if self.state == ConnectionState::Connected {
            return Ok(());
        }

        match self.transport.connect().await {
            Ok(()) => {
                self.state = ConnectionState::Connected;
                info!("Connected to device");
                Ok(())
            }
            Err(e) => {
                warn!("Connection attempt failed: {}", e);
                Err(SessionError::Connection(e.to_string()))
            }
        }
    }

    /// Read `count` holding registers starting at `address`.
    pub async fn read_registers(
        &mut self,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, SessionError> {
        self.ensure_connected().await?;

        match self.transport.read_holding_registers(address, count).await {
            Ok(words) => Ok(words),
            Err(e) => Err(self.fail("read registers", address, e).await),
        }
    }

    /// Write a block of holding registers starting at `address`.
    pub async fn write_registers(
        &mut self,
        address: u16,
        values: &[u16],
    ) -> Result<(), SessionError> {
        self.ensure_connected().await?;

        match self.transport.write_multiple_registers(address, values).await {
            Ok(()) => {
                debug!("Wrote {} register(s) @ {}", values.len(), address);
                Ok(())
            }
            Err(e) => Err(self.fail("write registers", address, e).await),
        }
    }

    /// Read a single coil.
    pub async fn read_coil(&mut self, address: u16) -> Result<bool, SessionError> {
        self.ensure_connected().await?;

        match self.transport.read_coils(address, 1).await {
            Ok(bits) => bits
                .first()
                .copied()
                .ok_or_else(|| SessionError::Io(format!("empty coil response @ {address}"))),
            Err(e) => Err(self.fail("read coil", address, e).await),
        }
    }

    /// Write a single coil.
    pub async fn write_coil(&mut self, address: u16, value: bool) -> Result<(), SessionError> {
        self.ensure_connected().await?;

        match self.transport.write_single_coil(address, value).await {
            Ok(()) => {
                debug!("Wrote coil @ {} = {}", address, value);
                Ok(())
            }
            Err(e) => Err(self.fail("write coil", address, e).await),
        }
    }

    /// Release the transport. Idempotent; always succeeds.
    pub async fn close(&mut self) {
        self.transport.close().await;
        self.state = ConnectionState::Disconnected;
    }

    /// Drop to Disconnected after an I/O failure so the next call reconnects.
    async fn fail(&mut self, op: &str, address: u16, e: TransportError) -> SessionError {
        warn!("Failed to {} @ {}: {}", op, address, e);
        self.state = ConnectionState::Disconnected;
        self.transport.close().await;
        SessionError::Io(e.to_string())
    }
}
