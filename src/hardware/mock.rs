use crate::core::{Axis, Setpoint};
use crate::error::CageError;
use crate::hardware::interface::{HwResult, PowerSupply, RelayDriver};
use crate::hardware::rig::HardwareRig;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Command observed by a mock relay driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayCommand {
    Handshake,
    Send { channel: u8, state: u8 },
    Reset,
}

/// Command observed by a mock power supply
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SupplyCommand {
    Init,
    Apply(Setpoint),
    Zero,
}

/// Shared view into a mock relay driver's command log
///
/// The driver itself moves into the rig (and from there into the engine
/// task), so verification goes through this cloneable probe instead.
#[derive(Clone, Default)]
pub struct RelayProbe {
    log: Arc<Mutex<Vec<RelayCommand>>>,
    fail: Arc<AtomicBool>,
}

impl RelayProbe {
    pub fn commands(&self) -> Vec<RelayCommand> {
        self.log.lock().unwrap().clone()
    }

    pub fn reset_count(&self) -> usize {
        self.commands()
            .iter()
            .filter(|c| matches!(c, RelayCommand::Reset))
            .count()
    }

    /// Make every subsequent write fail
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

/// Shared view into a mock power supply's command log
#[derive(Clone, Default)]
pub struct SupplyProbe {
    log: Arc<Mutex<Vec<SupplyCommand>>>,
    fail: Arc<AtomicBool>,
}

impl SupplyProbe {
    pub fn commands(&self) -> Vec<SupplyCommand> {
        self.log.lock().unwrap().clone()
    }

    /// Setpoints applied, in order (zero commands excluded)
    pub fn applied(&self) -> Vec<Setpoint> {
        self.commands()
            .iter()
            .filter_map(|c| match c {
                SupplyCommand::Apply(sp) => Some(*sp),
                _ => None,
            })
            .collect()
    }

    /// True when the last command left the supply at rest
    pub fn ends_zeroed(&self) -> bool {
        matches!(self.commands().last(), Some(SupplyCommand::Zero))
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

/// Mock relay driver for testing without the relay board
pub struct MockRelayDriver {
    name: String,
    probe: RelayProbe,
}

impl MockRelayDriver {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            probe: RelayProbe::default(),
        }
    }

    pub fn probe(&self) -> RelayProbe {
        self.probe.clone()
    }

    fn record(&self, command: RelayCommand) -> HwResult<()> {
        if self.probe.fail.load(Ordering::SeqCst) {
            return Err(CageError::comm("injected relay failure"));
        }
        self.probe.log.lock().unwrap().push(command);
        Ok(())
    }
}

#[async_trait]
impl RelayDriver for MockRelayDriver {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&mut self, channel: u8, state: u8) -> HwResult<()> {
        self.record(RelayCommand::Send { channel, state })
    }

    async fn reset(&mut self) -> HwResult<()> {
        self.record(RelayCommand::Reset)
    }

    async fn handshake(&mut self) -> HwResult<()> {
        self.record(RelayCommand::Handshake)
    }
}

/// Mock power supply for testing without instruments
pub struct MockPowerSupply {
    name: String,
    probe: SupplyProbe,
}

impl MockPowerSupply {
    pub fn new(axis: Axis) -> Self {
        Self {
            name: format!("mock-psu-{}", axis.label()),
            probe: SupplyProbe::default(),
        }
    }

    pub fn probe(&self) -> SupplyProbe {
        self.probe.clone()
    }

    fn record(&self, command: SupplyCommand) -> HwResult<()> {
        if self.probe.fail.load(Ordering::SeqCst) {
            return Err(CageError::comm(format!("injected failure on {}", self.name)));
        }
        self.probe.log.lock().unwrap().push(command);
        Ok(())
    }
}

#[async_trait]
impl PowerSupply for MockPowerSupply {
    fn name(&self) -> &str {
        &self.name
    }

    async fn initialize(&mut self) -> HwResult<()> {
        self.record(SupplyCommand::Init)
    }

    async fn apply(&mut self, voltage: f64, current: f64) -> HwResult<()> {
        self.record(SupplyCommand::Apply(Setpoint { voltage, current }))
    }

    async fn zero(&mut self) -> HwResult<()> {
        self.record(SupplyCommand::Zero)
    }
}

/// Probes for a fully mocked rig, indexable per axis
#[derive(Clone)]
pub struct RigProbes {
    pub relay: RelayProbe,
    pub supplies: [SupplyProbe; 3],
}

impl RigProbes {
    pub fn supply(&self, axis: Axis) -> &SupplyProbe {
        &self.supplies[axis.index()]
    }

    /// True when every supply's last command was a zero
    pub fn all_supplies_zeroed(&self) -> bool {
        self.supplies.iter().all(|p| p.ends_zeroed())
    }
}

/// Build a rig backed entirely by mocks, plus the probes to observe it
pub fn mock_rig() -> (HardwareRig, RigProbes) {
    let relay = MockRelayDriver::new("mock-relay");
    let x = MockPowerSupply::new(Axis::X);
    let y = MockPowerSupply::new(Axis::Y);
    let z = MockPowerSupply::new(Axis::Z);
    let probes = RigProbes {
        relay: relay.probe(),
        supplies: [x.probe(), y.probe(), z.probe()],
    };
    let rig = HardwareRig::new(Box::new(relay), Box::new(x), Box::new(y), Box::new(z));
    (rig, probes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_relay_records_commands() {
        let mut relay = MockRelayDriver::new("test");
        let probe = relay.probe();

        relay.handshake().await.unwrap();
        relay.send(1, 0).await.unwrap();
        relay.reset().await.unwrap();

        assert_eq!(
            probe.commands(),
            vec![
                RelayCommand::Handshake,
                RelayCommand::Send { channel: 1, state: 0 },
                RelayCommand::Reset,
            ]
        );
        assert_eq!(probe.reset_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_supply_failure_injection() {
        let mut psu = MockPowerSupply::new(Axis::Y);
        let probe = psu.probe();

        psu.apply(30.0, 1.25).await.unwrap();
        probe.set_fail(true);
        let err = psu.apply(30.0, 2.0).await.unwrap_err();
        assert!(matches!(err, CageError::Communication(_)));

        probe.set_fail(false);
        psu.zero().await.unwrap();
        assert_eq!(probe.applied().len(), 1);
        assert!(probe.ends_zeroed());
    }
}
