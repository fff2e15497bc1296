use crate::error::CageError;
use async_trait::async_trait;

/// Result type for hardware operations
pub type HwResult<T> = Result<T, CageError>;

/// Trait for the auxiliary relay microcontroller
///
/// Implementations:
/// - Serial link to the relay board firmware
/// - Mock interface for testing
#[async_trait]
pub trait RelayDriver: Send + Sync {
    /// Name/identifier of this driver (typically the port path)
    fn name(&self) -> &str;

    /// Command one relay channel to a state
    async fn send(&mut self, channel: u8, state: u8) -> HwResult<()>;

    /// Return all auxiliary channels to their rest position
    async fn reset(&mut self) -> HwResult<()>;

    /// Connect-time handshake with the firmware
    async fn handshake(&mut self) -> HwResult<()>;
}

/// Trait for one axis's programmable power supply
#[async_trait]
pub trait PowerSupply: Send + Sync {
    /// Name/identifier of this supply (typically the port path)
    fn name(&self) -> &str;

    /// Connect-time instrument preamble (display mode, output on)
    async fn initialize(&mut self) -> HwResult<()>;

    /// Command a voltage/current setpoint
    async fn apply(&mut self, voltage: f64, current: f64) -> HwResult<()>;

    /// Command the supply to its zero/rest output
    async fn zero(&mut self) -> HwResult<()>;
}
