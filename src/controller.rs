use crate::config::{PortSettings, Readiness, RunConfig};
use crate::core::{Axis, FieldDataset};
use crate::error::{CageError, CageResult};
use crate::hardware::mock::{mock_rig, RigProbes};
use crate::hardware::{HardwareRig, SerialPowerSupply, SerialRelayDriver};
use crate::input::load_field_csv;
use crate::playback::engine::{PlaybackEngine, RunControlHandle, RunHandle};
use crate::playback::StatusEvent;
use std::path::Path;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Owner of the cage hardware and the run lifecycle
///
/// Holds the rig while no run is active and enforces that at most one run
/// exists at a time; the rig moves into the playback task for the duration
/// of a run and comes back through `wait`.
pub struct CageController {
    rig: Option<HardwareRig>,
    run: Option<RunHandle>,
    dataset: Option<FieldDataset>,
    readiness: Readiness,
}

impl Default for CageController {
    fn default() -> Self {
        Self::new()
    }
}

impl CageController {
    pub fn new() -> Self {
        Self {
            rig: None,
            run: None,
            dataset: None,
            readiness: Readiness::default(),
        }
    }

    pub fn readiness(&self) -> Readiness {
        self.readiness
    }

    /// Extract a field dataset from a CSV file
    pub fn extract(&mut self, path: &Path) -> CageResult<usize> {
        let dataset = load_field_csv(path)?;
        Ok(self.install_dataset(dataset))
    }

    /// Install an already-extracted dataset, replacing any previous one
    pub fn install_dataset(&mut self, dataset: FieldDataset) -> usize {
        let count = dataset.len();
        self.dataset = Some(dataset);
        self.readiness.file_selected = true;
        self.readiness.data_extracted = true;
        count
    }

    /// Open the relay and supply ports and run the connect-time setup
    pub async fn connect(&mut self, ports: &PortSettings) -> CageResult<()> {
        self.readiness.relay_port_set = !ports.relay.is_empty();
        self.readiness.psu_x_port_set = !ports.psu_x.is_empty();
        self.readiness.psu_y_port_set = !ports.psu_y.is_empty();
        self.readiness.psu_z_port_set = !ports.psu_z.is_empty();
        if !self.readiness.can_connect() {
            return Err(CageError::config(
                "ports not fully specified or hardware already connected",
            ));
        }

        let relay = SerialRelayDriver::open(&ports.relay)?;
        let x = SerialPowerSupply::open(&ports.psu_x, Axis::X)?;
        let y = SerialPowerSupply::open(&ports.psu_y, Axis::Y)?;
        let z = SerialPowerSupply::open(&ports.psu_z, Axis::Z)?;

        let mut rig = HardwareRig::new(Box::new(relay), Box::new(x), Box::new(y), Box::new(z));
        rig.initialize().await?;

        self.rig = Some(rig);
        self.readiness.connected = true;
        info!(relay = %ports.relay, "hardware connected");
        Ok(())
    }

    /// Attach a fully mocked rig (debug/no-hardware mode and tests)
    pub fn connect_mock(&mut self) -> RigProbes {
        let (rig, probes) = mock_rig();
        self.rig = Some(rig);
        self.readiness.relay_port_set = true;
        self.readiness.psu_x_port_set = true;
        self.readiness.psu_y_port_set = true;
        self.readiness.psu_z_port_set = true;
        self.readiness.connected = true;
        info!("mock hardware attached");
        probes
    }

    /// Start a run; rejected while another run is active
    pub async fn start(
        &mut self,
        config: &RunConfig,
    ) -> CageResult<mpsc::UnboundedReceiver<StatusEvent>> {
        if self.run.as_ref().is_some_and(|r| !r.is_finished()) {
            return Err(CageError::config("a run is already active"));
        }
        self.reclaim_rig().await;

        let dataset = self
            .dataset
            .as_ref()
            .ok_or_else(|| CageError::data("no dataset extracted"))?;
        let prepared = PlaybackEngine::prepare(dataset, config)?;
        self.readiness.offsets_set = true;
        self.readiness.roc_set = true;

        if !self.readiness.can_run() {
            return Err(CageError::config(format!(
                "not ready to run: {:?}",
                self.readiness
            )));
        }
        let rig = self
            .rig
            .take()
            .ok_or_else(|| CageError::comm("hardware not connected"))?;

        let (handle, status) = prepared.launch(rig);
        self.run = Some(handle);
        self.readiness.run_active = true;
        info!(samples = dataset.len(), "run started");
        Ok(status)
    }

    pub fn pause(&self) {
        if let Some(run) = &self.run {
            run.pause();
        }
    }

    pub fn resume(&self) {
        if let Some(run) = &self.run {
            run.resume();
        }
    }

    pub fn stop(&self) {
        if let Some(run) = &self.run {
            run.stop();
        }
    }

    /// Control handle for the active run, if any
    pub fn control_handle(&self) -> Option<RunControlHandle> {
        self.run.as_ref().map(|r| r.control())
    }

    /// Wait for the active run to reach a terminal state and take the
    /// hardware back
    pub async fn wait(&mut self) {
        if let Some(run) = self.run.take() {
            let rig = run.wait().await;
            self.rig = Some(rig);
            self.readiness.run_active = false;
            debug!("rig reclaimed from finished run");
        }
    }

    /// Stop anything active, rest the hardware, and drop the ports
    pub async fn disconnect(&mut self) {
        self.stop();
        self.wait().await;
        if let Some(mut rig) = self.rig.take() {
            rig.rest_best_effort().await;
        }
        self.readiness = Readiness {
            file_selected: self.readiness.file_selected,
            data_extracted: self.readiness.data_extracted,
            ..Readiness::default()
        };
        info!("hardware disconnected");
    }

    async fn reclaim_rig(&mut self) {
        if self.run.as_ref().is_some_and(|r| r.is_finished()) {
            self.wait().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RateOfChange, RunConfig};
    use crate::core::units::{FieldUnit, TimeUnit};
    use crate::core::FieldSample;
    use std::time::Duration;

    fn small_dataset() -> FieldDataset {
        FieldDataset::new(
            vec![
                FieldSample::new(10.0, 0.0, 0.0),
                FieldSample::new(0.0, 10.0, 0.0),
            ],
            FieldUnit::Nanotesla,
        )
    }

    fn fast_config() -> RunConfig {
        RunConfig {
            rate_of_change: RateOfChange {
                value: 100.0,
                unit: TimeUnit::Millisecond,
            },
            ..RunConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_start_is_rejected_while_active() {
        let mut controller = CageController::new();
        controller.connect_mock();
        controller.install_dataset(small_dataset());

        let _status = controller.start(&fast_config()).await.unwrap();
        let err = controller.start(&fast_config()).await.unwrap_err();
        assert!(matches!(err, CageError::Configuration(_)));

        controller.stop();
        controller.wait().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_rig_is_reusable_after_a_run() {
        let mut controller = CageController::new();
        let probes = controller.connect_mock();
        controller.install_dataset(small_dataset());

        let _status = controller.start(&fast_config()).await.unwrap();
        controller.wait().await;
        assert!(probes.all_supplies_zeroed());

        // A second run on the reclaimed rig
        let _status = controller.start(&fast_config()).await.unwrap();
        controller.wait().await;
        assert_eq!(probes.supplies[0].applied().len(), 4);
    }

    #[tokio::test]
    async fn test_start_without_dataset_is_a_data_error() {
        let mut controller = CageController::new();
        controller.connect_mock();
        let err = controller.start(&fast_config()).await.unwrap_err();
        assert!(matches!(err, CageError::Data(_)));
    }

    #[tokio::test]
    async fn test_start_without_hardware_is_rejected() {
        let mut controller = CageController::new();
        controller.install_dataset(small_dataset());
        let err = controller.start(&fast_config()).await.unwrap_err();
        assert!(matches!(err, CageError::Configuration(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_finished_run_reclaims_implicitly() {
        let mut controller = CageController::new();
        controller.connect_mock();
        controller.install_dataset(small_dataset());

        let _status = controller.start(&fast_config()).await.unwrap();
        // Let the 2-sample run finish without an explicit wait
        tokio::time::sleep(Duration::from_millis(500)).await;

        let _status = controller.start(&fast_config()).await.unwrap();
        controller.stop();
        controller.wait().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_resets_connection_readiness() {
        let mut controller = CageController::new();
        controller.connect_mock();
        controller.install_dataset(small_dataset());
        assert!(controller.readiness().connected);

        controller.disconnect().await;
        let r = controller.readiness();
        assert!(!r.connected);
        assert!(!r.relay_port_set);
        // Extracted data survives a disconnect
        assert!(r.data_extracted);
    }
}
