use crate::core::Axis;
use crate::error::CageError;
use crate::hardware::interface::{HwResult, PowerSupply, RelayDriver};
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info};

/// Baud rate of the relay board firmware
const RELAY_BAUD: u32 = 9600;

/// Baud rate of the power supply serial front panels
const SUPPLY_BAUD: u32 = 9600;

/// Bound on any single hardware write; a timeout is a CommunicationError
const WRITE_TIMEOUT: Duration = Duration::from_millis(500);

/// Settle time after opening the relay port, before the handshake
const RELAY_SETTLE: Duration = Duration::from_millis(250);

/// Relay handshake: channel 1 driven to state 1 at connect
const HANDSHAKE_CHANNEL: u8 = 1;
const HANDSHAKE_STATE: u8 = 1;

/// Relay rest command: channel 2 / state 4, returns pins 8:13 to rest
const REST_CHANNEL: u8 = 2;
const REST_STATE: u8 = 4;

/// Encode a relay command into the firmware's single-byte wire format
///
/// The deployed microcontroller firmware decodes `channel*2 + state + 100`;
/// this must stay bit-exact.
pub fn encode_relay_command(channel: u8, state: u8) -> u8 {
    channel * 2 + state + 100
}

async fn write_with_timeout(
    port: &mut tokio_serial::SerialStream,
    buf: &[u8],
    what: &str,
) -> HwResult<()> {
    let io = async {
        port.write_all(buf).await?;
        port.flush().await
    };
    match tokio::time::timeout(WRITE_TIMEOUT, io).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(CageError::comm(format!("{what}: write failed: {e}"))),
        Err(_) => Err(CageError::comm(format!(
            "{what}: write timed out after {}ms",
            WRITE_TIMEOUT.as_millis()
        ))),
    }
}

/// Relay board driver over a serial port
pub struct SerialRelayDriver {
    name: String,
    port: tokio_serial::SerialStream,
}

impl SerialRelayDriver {
    /// Open the relay board's serial port
    pub fn open(path: &str) -> HwResult<Self> {
        debug!("Opening relay port: {}", path);
        let port = tokio_serial::new(path, RELAY_BAUD)
            .open_native_async()
            .map_err(|e| CageError::comm(format!("relay port {path}: {e}")))?;
        Ok(Self {
            name: path.to_string(),
            port,
        })
    }
}

#[async_trait]
impl RelayDriver for SerialRelayDriver {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&mut self, channel: u8, state: u8) -> HwResult<()> {
        let byte = encode_relay_command(channel, state);
        debug!(channel, state, byte, "relay command");
        write_with_timeout(&mut self.port, &[byte], "relay").await
    }

    async fn reset(&mut self) -> HwResult<()> {
        self.send(REST_CHANNEL, REST_STATE).await
    }

    async fn handshake(&mut self) -> HwResult<()> {
        // The board needs a moment after the port opens before it listens
        tokio::time::sleep(RELAY_SETTLE).await;
        info!(port = %self.name, "relay handshake");
        self.send(HANDSHAKE_CHANNEL, HANDSHAKE_STATE).await
    }
}

/// Power supply driver speaking the instrument's textual protocol
///
/// One instance per axis. Setpoints go out as `APPL <voltage>,<current>`,
/// the verb the deployed instruments accept.
pub struct SerialPowerSupply {
    name: String,
    axis: Axis,
    port: tokio_serial::SerialStream,
}

impl SerialPowerSupply {
    /// Open the serial port for one axis's supply
    pub fn open(path: &str, axis: Axis) -> HwResult<Self> {
        debug!("Opening {} supply port: {}", axis.label(), path);
        let port = tokio_serial::new(path, SUPPLY_BAUD)
            .open_native_async()
            .map_err(|e| {
                CageError::comm(format!("{} supply port {path}: {e}", axis.label()))
            })?;
        Ok(Self {
            name: path.to_string(),
            axis,
            port,
        })
    }

    async fn write_line(&mut self, line: String) -> HwResult<()> {
        debug!(axis = self.axis.label(), command = %line, "supply command");
        let label = self.axis.label();
        write_with_timeout(&mut self.port, format!("{line}\n").as_bytes(), label).await
    }
}

#[async_trait]
impl PowerSupply for SerialPowerSupply {
    fn name(&self) -> &str {
        &self.name
    }

    async fn initialize(&mut self) -> HwResult<()> {
        info!(axis = self.axis.label(), port = %self.name, "supply preamble");
        // Abort pending operations, preset, and switch the front panel to
        // the live V/I readout, then enable the output stage.
        self.write_line("ABORt ; SYST:PRES ; DISPlay:MENU:NAME 3".to_string())
            .await?;
        self.write_line("OUTP:STAT ON".to_string()).await
    }

    async fn apply(&mut self, voltage: f64, current: f64) -> HwResult<()> {
        self.write_line(format!("APPL {},{:.2}", voltage, current))
            .await
    }

    async fn zero(&mut self) -> HwResult<()> {
        self.write_line("APPL 0.00,0.00".to_string()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relay_encoding_is_bit_exact() {
        // Firmware scheme: channel*2 + state + 100
        assert_eq!(encode_relay_command(1, 0), 102);
        assert_eq!(encode_relay_command(1, 1), 103);
        assert_eq!(encode_relay_command(2, 0), 104);
        assert_eq!(encode_relay_command(3, 1), 107);
    }

    #[test]
    fn test_rest_command_byte() {
        // Legacy rest command is channel 2 / state 4 -> byte 108
        assert_eq!(encode_relay_command(REST_CHANNEL, REST_STATE), 108);
    }

    #[test]
    fn test_handshake_byte() {
        assert_eq!(
            encode_relay_command(HANDSHAKE_CHANNEL, HANDSHAKE_STATE),
            103
        );
    }
}
