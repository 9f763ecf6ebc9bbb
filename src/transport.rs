//! Modbus transport abstraction.
//!
//! [`ModbusTransport`] is the seam between the session state machine and the
//! wire protocol: the production implementation is [`TcpTransport`] over
//! `tokio-modbus`, tests substitute a recording fake.

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use tokio_modbus::client::{Context, Reader, Writer};
use tokio_modbus::prelude::*;

/// Error type for transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),
    #[error("i/o error: {0}")]
    Io(String),
    #[error("modbus exception: {0}")]
    Exception(String),
    #[error("not connected")]
    NotConnected,
}

/// The request/response operations the controller's protocol client exposes.
///
/// One outstanding request per transport; callers serialize access.
#[async_trait]
pub trait ModbusTransport: Send {
    /// Open the underlying connection. Replaces any previous connection.
    async fn connect(&mut self) -> Result<(), TransportError>;

    /// Whether an open connection is currently held.
    fn is_connected(&self) -> bool;

    /// Release the underlying connection. Best-effort, idempotent.
    async fn close(&mut self);

    async fn read_holding_registers(
        &mut self,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, TransportError>;

    async fn write_multiple_registers(
        &mut self,
        address: u16,
        values: &[u16],
    ) -> Result<(), TransportError>;

    async fn read_coils(&mut self, address: u16, count: u16) -> Result<Vec<bool>, TransportError>;

    async fn write_single_coil(
        &mut self,
        address: u16,
        value: bool,
    ) -> Result<(), TransportError>;
}

/// Modbus TCP transport with a bounded timeout on every operation.
pub struct TcpTransport {
    addr: SocketAddr,
    slave: Slave,
    timeout: Duration,
    ctx: Option<Context>,
}

impl TcpTransport {
    /// Create a transport for the given device address and unit id.
    pub fn new(addr: SocketAddr, unit_id: u8, timeout: Duration) -> Self {
        Self {
            addr,
            slave: Slave(unit_id),
            timeout,
            ctx: None,
        }
    }

    fn context(&mut self) -> Result<&mut Context, TransportError> {
        self.ctx.as_mut().ok_or(TransportError::NotConnected)
    }
}

#[async_trait]
impl ModbusTransport for TcpTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        self.ctx = None;

        let ctx = tokio::time::timeout(self.timeout, tcp::connect_slave(self.addr, self.slave))
            .await
            .map_err(|_| TransportError::Timeout(self.timeout))?
            .map_err(|e| TransportError::Io(e.to_string()))?;

        self.ctx = Some(ctx);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.ctx.is_some()
    }

    async fn close(&mut self) {
        if let Some(mut ctx) = self.ctx.take() {
            let _ = tokio::time::timeout(self.timeout, ctx.disconnect()).await;
        }
    }

    async fn read_holding_registers(
        &mut self,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, TransportError> {
        let timeout = self.timeout;
        let ctx = self.context()?;

        tokio::time::timeout(timeout, ctx.read_holding_registers(address, count))
            .await
            .map_err(|_| TransportError::Timeout(timeout))?
            .map_err(|e| TransportError::Io(e.to_string()))?
            .map_err(|e| TransportError::Exception(format!("{e:?}")))
    }

    async fn write_multiple_registers(
        &mut self,
        address: u16,
        values: &[u16],
    ) -> Result<(), TransportError> {
        let timeout = self.timeout;
        let ctx = self.context()?;

        tokio::time::timeout(timeout, ctx.write_multiple_registers(address, values))
            .await
            .map_err(|_| TransportError::Timeout(timeout))?
            .map_err(|e| TransportError::Io(e.to_string()))?
            .map_err(|e| TransportError::Exception(format!("{e:?}")))
    }

    async fn read_coils(&mut self, address: u16, count: u16) -> Result<Vec<bool>, TransportError> {
        let timeout = self.timeout;
        let ctx = self.context()?;

        tokio::time::timeout(timeout, ctx.read_coils(address, count))
            .await
            .map_err(|_| TransportError::Timeout(timeout))?
            .map_err(|e| TransportError::Io(e.to_string()))?
            .map_err(|e| TransportError::Exception(format!("{e:?}")))
    }

    async fn write_single_coil(
        &mut self,
        address: u16,
        value: bool,
    ) -> Result<(), TransportError> {
        let timeout = self.timeout;
        let ctx = self.context()?;

        tokio::time::timeout(timeout, ctx.write_single_coil(address, value))
            .await
            .map_err(|_| TransportError::Timeout(timeout))?
            .map_err(|e| TransportError::Io(e.to_string()))?
            .map_err(|e| TransportError::Exception(format!("{e:?}")))
    }
}
