use crate::config::RunConfig;
use crate::core::field::FieldDataset;

/// Combined constant from the cage field equations
pub const CAGE_CONSTANT: f64 = 613_647.0;

/// Cage axis, in dataset column order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

pub const AXES: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

impl Axis {
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    /// Relay channel assigned to this axis (channels 1..=3)
    pub fn relay_channel(self) -> u8 {
        self.index() as u8 + 1
    }

    pub fn label(self) -> &'static str {
        match self {
            Axis::X => "X",
            Axis::Y => "Y",
            Axis::Z => "Z",
        }
    }

    /// Per-axis coil parameters
    pub fn coil(self) -> CoilParams {
        match self {
            // X middle coil
            Axis::X => CoilParams { constant: 1.4492, turns: 35.0 },
            // Y small coil
            Axis::Y => CoilParams { constant: 1.3984, turns: 35.0 },
            // Z large coil
            Axis::Z => CoilParams { constant: 1.5, turns: 35.0 },
        }
    }
}

/// Physical parameters of one coil pair
#[derive(Debug, Clone, Copy)]
pub struct CoilParams {
    pub constant: f64,
    pub turns: f64,
}

/// Voltage/current pair commanded to one axis's power supply for one sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Setpoint {
    pub voltage: f64,
    pub current: f64,
}

/// Convert one field component into the current setpoint for its axis
///
/// `field` is the raw reading in the dataset unit, `offset_nt` the
/// configured axis bias in nT. Current comes out rounded to 2 decimals,
/// matching what the instrument is sent.
pub fn compute_setpoint(
    field: f64,
    offset_nt: f64,
    axis: Axis,
    field_unit_scalar: f64,
    supply_voltage: f64,
) -> Setpoint {
    let coil = axis.coil();
    let tesla = field * 1e-9 * field_unit_scalar + 1e-9 * offset_nt;
    let current = CAGE_CONSTANT * tesla * coil.constant / coil.turns;
    Setpoint {
        voltage: supply_voltage,
        current: round2(current),
    }
}

/// Precompute the full setpoint table for a dataset
///
/// Computed once before playback starts so the paced loop only dispatches,
/// keeping per-sample jitter down.
pub fn build_setpoint_table(dataset: &FieldDataset, config: &RunConfig) -> Vec<[Setpoint; 3]> {
    let unit_scalar = dataset.unit().scalar();
    dataset
        .samples()
        .iter()
        .map(|sample| {
            let fields = sample.components();
            let offsets = config.offsets.components();
            [
                compute_setpoint(fields[0], offsets[0], Axis::X, unit_scalar, config.supply_voltage),
                compute_setpoint(fields[1], offsets[1], Axis::Y, unit_scalar, config.supply_voltage),
                compute_setpoint(fields[2], offsets[2], Axis::Z, unit_scalar, config.supply_voltage),
            ]
        })
        .collect()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::field::FieldSample;
    use crate::core::units::FieldUnit;

    #[test]
    fn test_compute_setpoint_x_axis() {
        // 100000 nT on X, no offset:
        // 613647 * 100000e-9 * 1.4492 / 35 = 2.5409...
        let sp = compute_setpoint(100_000.0, 0.0, Axis::X, 1.0, 30.0);
        assert_eq!(sp.voltage, 30.0);
        assert_eq!(sp.current, 2.54);
    }

    #[test]
    fn test_compute_setpoint_is_deterministic() {
        for _ in 0..3 {
            let a = compute_setpoint(-5234.7, 120.0, Axis::Y, 1.0, 30.0);
            let b = compute_setpoint(-5234.7, 120.0, Axis::Y, 1.0, 30.0);
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_offset_is_applied_in_nanotesla() {
        let with = compute_setpoint(0.0, 100_000.0, Axis::Z, 1.0, 30.0);
        let without = compute_setpoint(100_000.0, 0.0, Axis::Z, 1.0, 30.0);
        assert_eq!(with.current, without.current);
    }

    #[test]
    fn test_gauss_scaling() {
        // 1 G == 1e5 nT
        let gauss = compute_setpoint(1.0, 0.0, Axis::X, FieldUnit::Gauss.scalar(), 30.0);
        let nt = compute_setpoint(1e5, 0.0, Axis::X, FieldUnit::Nanotesla.scalar(), 30.0);
        assert_eq!(gauss.current, nt.current);
    }

    #[test]
    fn test_table_matches_per_sample_computation() {
        let dataset = FieldDataset::new(
            vec![
                FieldSample::new(100.0, 0.0, 0.0),
                FieldSample::new(0.0, -250.0, 40.0),
            ],
            FieldUnit::Nanotesla,
        );
        let config = RunConfig::default();
        let table = build_setpoint_table(&dataset, &config);
        assert_eq!(table.len(), 2);
        assert_eq!(
            table[1][1],
            compute_setpoint(-250.0, 0.0, Axis::Y, 1.0, config.supply_voltage)
        );
    }
}
