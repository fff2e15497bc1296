use crate::core::{Setpoint, AXES};
use crate::hardware::interface::{HwResult, PowerSupply, RelayDriver};
use tracing::{trace, warn};

/// The engine's exclusive handle on the cage hardware
///
/// Bundles the relay board and the three axis supplies, and owns the debug
/// flag: in debug mode every write becomes a logged no-op while timing and
/// state transitions run unchanged.
pub struct HardwareRig {
    relay: Box<dyn RelayDriver>,
    supplies: [Box<dyn PowerSupply>; 3],
    debug: bool,
}

impl HardwareRig {
    pub fn new(
        relay: Box<dyn RelayDriver>,
        x: Box<dyn PowerSupply>,
        y: Box<dyn PowerSupply>,
        z: Box<dyn PowerSupply>,
    ) -> Self {
        Self {
            relay,
            supplies: [x, y, z],
            debug: false,
        }
    }

    pub fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    /// Connect-time setup: relay handshake, then each supply's preamble
    pub async fn initialize(&mut self) -> HwResult<()> {
        if self.debug {
            trace!("debug mode: skipping hardware initialization");
            return Ok(());
        }
        self.relay.handshake().await?;
        for supply in &mut self.supplies {
            supply.initialize().await?;
        }
        Ok(())
    }

    /// Dispatch one sample: relay commands from the sign flags, then the
    /// setpoint to each axis's supply
    pub async fn dispatch(
        &mut self,
        sign_flags: [bool; 3],
        setpoints: &[Setpoint; 3],
    ) -> HwResult<()> {
        if self.debug {
            trace!(?setpoints, "debug mode: suppressing dispatch");
            return Ok(());
        }
        for axis in AXES {
            let state = sign_flags[axis.index()] as u8;
            self.relay.send(axis.relay_channel(), state).await?;
        }
        for axis in AXES {
            let sp = setpoints[axis.index()];
            self.supplies[axis.index()].apply(sp.voltage, sp.current).await?;
        }
        Ok(())
    }

    /// Return everything to rest: relay channels first, then zero each supply
    pub async fn rest(&mut self) -> HwResult<()> {
        if self.debug {
            trace!("debug mode: suppressing rest command");
            return Ok(());
        }
        self.relay.reset().await?;
        for supply in &mut self.supplies {
            supply.zero().await?;
        }
        Ok(())
    }

    /// Rest, logging failures instead of raising them
    ///
    /// Used on every exit from an active run; once the run is coming down
    /// there is nobody left to retry, so each endpoint gets its own attempt.
    pub async fn rest_best_effort(&mut self) {
        if self.debug {
            return;
        }
        if let Err(e) = self.relay.reset().await {
            warn!(relay = self.relay.name(), error = %e, "relay rest failed");
        }
        for supply in &mut self.supplies {
            if let Err(e) = supply.zero().await {
                warn!(supply = supply.name(), error = %e, "supply zero failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Setpoint;
    use crate::hardware::mock::{mock_rig, RelayCommand, SupplyCommand};

    const SPS: [Setpoint; 3] = [
        Setpoint { voltage: 30.0, current: 1.0 },
        Setpoint { voltage: 30.0, current: 2.0 },
        Setpoint { voltage: 30.0, current: 3.0 },
    ];

    #[tokio::test]
    async fn test_dispatch_orders_relays_before_supplies() {
        let (mut rig, probes) = mock_rig();
        rig.dispatch([true, false, true], &SPS).await.unwrap();

        assert_eq!(
            probes.relay.commands(),
            vec![
                RelayCommand::Send { channel: 1, state: 1 },
                RelayCommand::Send { channel: 2, state: 0 },
                RelayCommand::Send { channel: 3, state: 1 },
            ]
        );
        assert_eq!(probes.supplies[1].applied(), vec![SPS[1]]);
    }

    #[tokio::test]
    async fn test_rest_zeroes_every_supply() {
        let (mut rig, probes) = mock_rig();
        rig.dispatch([false; 3], &SPS).await.unwrap();
        rig.rest().await.unwrap();

        assert_eq!(probes.relay.reset_count(), 1);
        assert!(probes.all_supplies_zeroed());
    }

    #[tokio::test]
    async fn test_best_effort_rest_continues_past_failures() {
        let (mut rig, probes) = mock_rig();
        probes.supply(crate::core::Axis::X).set_fail(true);

        // Must not return an error, and must still zero Y and Z
        rig.rest_best_effort().await;
        assert!(probes.supplies[1].ends_zeroed());
        assert!(probes.supplies[2].ends_zeroed());
    }

    #[tokio::test]
    async fn test_debug_mode_suppresses_writes() {
        let (mut rig, probes) = mock_rig();
        rig.set_debug(true);

        rig.initialize().await.unwrap();
        rig.dispatch([true; 3], &SPS).await.unwrap();
        rig.rest().await.unwrap();

        assert!(probes.relay.commands().is_empty());
        assert!(probes.supplies.iter().all(|p| p.commands().is_empty()));
    }

    #[tokio::test]
    async fn test_initialize_runs_handshake_and_preambles() {
        let (mut rig, probes) = mock_rig();
        rig.initialize().await.unwrap();

        assert_eq!(probes.relay.commands(), vec![RelayCommand::Handshake]);
        for probe in &probes.supplies {
            assert_eq!(probe.commands(), vec![SupplyCommand::Init]);
        }
    }
}
