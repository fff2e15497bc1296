use crate::config::RunConfig;
use crate::core::{build_setpoint_table, FieldDataset, FieldSample, Setpoint};
use crate::error::{CageError, CageResult};
use crate::hardware::HardwareRig;
use crate::playback::{RunState, StatusEvent};
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Slice of the paced inter-sample wait; bounds how long a pause or stop
/// request can go unobserved
const PACE_SLICE: Duration = Duration::from_millis(100);

/// Poll interval while parked in Paused
const PAUSE_POLL: Duration = Duration::from_millis(250);

/// Cooperative control flags shared between a run and its handles
#[derive(Default)]
struct RunControl {
    stop: AtomicBool,
    pause: AtomicBool,
}

impl RunControl {
    fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    fn pause_requested(&self) -> bool {
        self.pause.load(Ordering::SeqCst)
    }
}

/// Cloneable handle for signalling a run
///
/// Decoupled from any UI representation; anything holding one can request
/// pause/resume/stop.
#[derive(Clone)]
pub struct RunControlHandle(Arc<RunControl>);

impl RunControlHandle {
    pub fn pause(&self) {
        self.0.pause.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.0.pause.store(false, Ordering::SeqCst);
    }

    /// Request a stop; honored cooperatively, even while paused
    pub fn stop(&self) {
        self.0.stop.store(true, Ordering::SeqCst);
    }
}

/// Handle on an active run
pub struct RunHandle {
    control: RunControlHandle,
    join: JoinHandle<HardwareRig>,
}

impl RunHandle {
    pub fn control(&self) -> RunControlHandle {
        self.control.clone()
    }

    pub fn pause(&self) {
        self.control.pause();
    }

    pub fn resume(&self) {
        self.control.resume();
    }

    pub fn stop(&self) {
        self.control.stop();
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the run to reach a terminal state and reclaim the rig
    pub async fn wait(self) -> HardwareRig {
        match self.join.await {
            Ok(rig) => rig,
            Err(e) => {
                // A panicking playback task is a bug; the rig state is
                // unknown either way, so surface it loudly.
                panic!("playback task failed: {e}");
            }
        }
    }
}

/// Outcome of one paced inter-sample wait
enum WaitOutcome {
    Elapsed,
    Stop,
    Pause,
}

/// A validated run, ready to launch against a rig
///
/// Validation and setpoint precomputation happen here, before any hardware
/// is committed: a bad configuration never takes the rig, and the paced
/// loop only ever dispatches precomputed values.
#[derive(Debug)]
pub struct PreparedRun {
    samples: Vec<FieldSample>,
    table: Vec<[Setpoint; 3]>,
    delay: Duration,
    debug: bool,
}

impl PreparedRun {
    /// Spawn the playback task; the rig moves into it, which is what makes
    /// the engine's hardware ownership exclusive while the run is live
    ///
    /// Returns the handle plus the status stream, which carries an event
    /// for every transition and every completed dispatch.
    pub fn launch(
        self,
        mut rig: HardwareRig,
    ) -> (RunHandle, mpsc::UnboundedReceiver<StatusEvent>) {
        rig.set_debug(self.debug);
        let control = Arc::new(RunControl::default());
        let (tx, rx) = mpsc::unbounded_channel();

        let engine = PlaybackEngine {
            total: self.samples.len(),
            samples: self.samples,
            table: self.table,
            delay: self.delay,
            rig,
            control: control.clone(),
            status: tx,
            state: RunState::Idle,
            index: 0,
        };

        let join = tokio::spawn(engine.run());

        (
            RunHandle {
                control: RunControlHandle(control),
                join,
            },
            rx,
        )
    }
}

/// Real-time playback engine for one simulation run
///
/// Walks the dataset, dispatches precomputed setpoints, paces against the
/// configured inter-sample delay, and services pause/stop cooperatively.
pub struct PlaybackEngine {
    samples: Vec<FieldSample>,
    table: Vec<[Setpoint; 3]>,
    delay: Duration,
    rig: HardwareRig,
    control: Arc<RunControl>,
    status: mpsc::UnboundedSender<StatusEvent>,
    state: RunState,
    index: usize,
    total: usize,
}

impl PlaybackEngine {
    /// Validate a configuration against a dataset and precompute the
    /// setpoint table
    pub fn prepare(dataset: &FieldDataset, config: &RunConfig) -> CageResult<PreparedRun> {
        config.validate()?;
        // The table is computed against the dataset's header-declared unit;
        // the configured unit is a cross-check against running a file under
        // the wrong assumption.
        if config.field_unit != dataset.unit() {
            return Err(CageError::Configuration(format!(
                "configured field unit {} does not match dataset unit {}",
                config.field_unit,
                dataset.unit()
            )));
        }
        let table = build_setpoint_table(dataset, config);
        Ok(PreparedRun {
            samples: dataset.samples().to_vec(),
            table,
            delay: Duration::from_secs_f64(config.rate_of_change.delay_ms() / 1000.0),
            debug: config.debug_mode,
        })
    }

    fn emit(&self, last_error: Option<String>) {
        // The receiver side going away must not take the run down
        let _ = self.status.send(StatusEvent {
            index: self.index,
            total: self.total,
            state: self.state,
            last_error,
            timestamp: Utc::now(),
        });
    }

    async fn run(mut self) -> HardwareRig {
        info!(
            samples = self.total,
            delay_ms = self.delay.as_millis() as u64,
            debug = self.rig.debug(),
            "simulation starting"
        );
        self.state = RunState::Running;
        self.emit(None);

        while self.index < self.total {
            if self.control.stop_requested() {
                self.finish_stopped(None).await;
                return self.rig;
            }

            let flags = self.samples[self.index].sign_flags();
            let setpoints = self.table[self.index];
            if let Err(e) = self.rig.dispatch(flags, &setpoints).await {
                error!(index = self.index, error = %e, "dispatch failed, aborting run");
                self.finish_stopped(Some(e.to_string())).await;
                return self.rig;
            }
            self.emit(None);

            match self.paced_wait().await {
                WaitOutcome::Elapsed => self.index += 1,
                // Handled by the stop check at the top of the loop
                WaitOutcome::Stop => continue,
                WaitOutcome::Pause => {
                    self.rig.rest_best_effort().await;
                    self.state = RunState::Paused;
                    self.emit(None);
                    info!(index = self.index, "simulation paused");

                    self.block_while_paused().await;
                    if self.control.stop_requested() {
                        continue;
                    }

                    self.state = RunState::Running;
                    self.emit(None);
                    info!(index = self.index, "simulation resumed");
                    // Index deliberately not advanced: the paused sample is
                    // dispatched once more on resume.
                }
            }
        }

        self.rig.rest_best_effort().await;
        self.state = RunState::Completed;
        self.emit(None);
        info!("simulation complete");
        self.rig
    }

    /// Wait out the inter-sample delay in bounded slices, watching for
    /// stop and pause requests between slices
    async fn paced_wait(&self) -> WaitOutcome {
        let mut remaining = self.delay;
        loop {
            if self.control.stop_requested() {
                return WaitOutcome::Stop;
            }
            if self.control.pause_requested() {
                return WaitOutcome::Pause;
            }
            if remaining.is_zero() {
                return WaitOutcome::Elapsed;
            }
            let slice = remaining.min(PACE_SLICE);
            tokio::time::sleep(slice).await;
            remaining = remaining.saturating_sub(slice);
        }
    }

    /// Park until resume or stop; stop wins
    async fn block_while_paused(&self) {
        while self.control.pause_requested() && !self.control.stop_requested() {
            tokio::time::sleep(PAUSE_POLL).await;
        }
    }

    async fn finish_stopped(&mut self, last_error: Option<String>) {
        if last_error.is_some() {
            warn!("run aborted by hardware failure");
        }
        self.state = RunState::Stopping;
        self.emit(last_error.clone());
        self.rig.rest_best_effort().await;
        self.state = RunState::Stopped;
        self.emit(last_error);
        info!(index = self.index, "simulation stopped");
    }
}
