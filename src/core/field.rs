use crate::core::units::FieldUnit;
use serde::{Deserialize, Serialize};

/// One target field vector from the dataset
///
/// Components are raw readings in the dataset's declared unit. The sign
/// flags are precomputed at extraction and drive the relay commands only;
/// the setpoint math uses the signed components directly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldSample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub x_neg: bool,
    pub y_neg: bool,
    pub z_neg: bool,
}

impl FieldSample {
    /// Create a sample, deriving the sign flags from the components
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z,
            x_neg: x < 0.0,
            y_neg: y < 0.0,
            z_neg: z < 0.0,
        }
    }

    /// Field components in axis order
    pub fn components(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    /// Sign flags in axis order
    pub fn sign_flags(&self) -> [bool; 3] {
        [self.x_neg, self.y_neg, self.z_neg]
    }
}

/// An extracted field-vector sequence, immutable for the duration of a run
///
/// Replaced wholesale on re-extraction. Sample identity is its 0-based
/// index.
#[derive(Debug, Clone)]
pub struct FieldDataset {
    samples: Vec<FieldSample>,
    unit: FieldUnit,
}

impl FieldDataset {
    pub fn new(samples: Vec<FieldSample>, unit: FieldUnit) -> Self {
        Self { samples, unit }
    }

    pub fn samples(&self) -> &[FieldSample] {
        &self.samples
    }

    pub fn unit(&self) -> FieldUnit {
        self.unit
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_flags_derived() {
        let s = FieldSample::new(-120.5, 0.0, 43.2);
        assert!(s.x_neg);
        assert!(!s.y_neg);
        assert!(!s.z_neg);
        assert_eq!(s.sign_flags(), [true, false, false]);
    }

    #[test]
    fn test_zero_is_not_negative() {
        // Legacy isNegative(0) == 0
        let s = FieldSample::new(0.0, -0.0, 0.0);
        assert!(!s.x_neg);
        assert!(!s.y_neg);
    }
}
