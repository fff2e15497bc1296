use crate::core::units::{FieldUnit, TimeUnit};
use crate::error::{CageError, CageResult};
use serde::{Deserialize, Serialize};

/// Constant bias field added per axis before conversion, in nT
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AxisOffsets {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl AxisOffsets {
    pub fn components(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Delay applied between successive samples during playback
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RateOfChange {
    pub value: f64,
    pub unit: TimeUnit,
}

impl RateOfChange {
    /// Per-sample delay in milliseconds
    pub fn delay_ms(&self) -> f64 {
        self.value * self.unit.scalar()
    }
}

/// Everything the engine needs to know before `start`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub offsets: AxisOffsets,
    pub rate_of_change: RateOfChange,
    pub field_unit: FieldUnit,
    #[serde(default = "default_supply_voltage")]
    pub supply_voltage: f64,
    #[serde(default)]
    pub debug_mode: bool,
}

fn default_supply_voltage() -> f64 {
    30.0
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            offsets: AxisOffsets::default(),
            rate_of_change: RateOfChange {
                value: 1.0,
                unit: TimeUnit::Second,
            },
            field_unit: FieldUnit::Nanotesla,
            supply_voltage: default_supply_voltage(),
            debug_mode: false,
        }
    }
}

impl RunConfig {
    /// Reject configurations a run must never start with
    pub fn validate(&self) -> CageResult<()> {
        if !self.offsets.is_finite() {
            return Err(CageError::config("axis offsets must be finite"));
        }
        if !self.rate_of_change.value.is_finite() || self.rate_of_change.value <= 0.0 {
            return Err(CageError::config(format!(
                "rate of change must be > 0, got {}",
                self.rate_of_change.value
            )));
        }
        if !self.supply_voltage.is_finite() || self.supply_voltage < 0.0 {
            return Err(CageError::config(format!(
                "supply voltage must be a finite non-negative value, got {}",
                self.supply_voltage
            )));
        }
        Ok(())
    }

    /// Nominal total run duration for an n-sample dataset, in ms
    pub fn nominal_duration_ms(&self, n: usize) -> f64 {
        n as f64 * self.rate_of_change.delay_ms()
    }
}

/// Serial port assignments for the rig
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortSettings {
    pub relay: String,
    pub psu_x: String,
    pub psu_y: String,
    pub psu_z: String,
}

/// Readiness of the controller's inputs and connections
///
/// Replaces the legacy integer-coded flag switch: each precondition is a
/// named field, and the gating predicates recompute from the fields alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Readiness {
    pub file_selected: bool,
    pub data_extracted: bool,
    pub relay_port_set: bool,
    pub psu_x_port_set: bool,
    pub psu_y_port_set: bool,
    pub psu_z_port_set: bool,
    pub connected: bool,
    pub offsets_set: bool,
    pub roc_set: bool,
    pub run_active: bool,
}

impl Readiness {
    /// All ports named, nothing connected yet
    pub fn can_connect(&self) -> bool {
        self.relay_port_set
            && self.psu_x_port_set
            && self.psu_y_port_set
            && self.psu_z_port_set
            && !self.connected
    }

    /// Data in hand, hardware up, parameters set, no run in flight
    pub fn can_run(&self) -> bool {
        self.data_extracted
            && self.connected
            && self.offsets_set
            && self.roc_set
            && !self.run_active
    }
}
