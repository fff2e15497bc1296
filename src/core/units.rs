use crate::error::CageError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Magnetic field unit declared by the dataset header
///
/// Base unit is the nanotesla; `scalar()` converts a value in this unit
/// to nT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldUnit {
    Nanotesla,
    Tesla,
    Gauss,
}

impl FieldUnit {
    /// Multiplier against the base unit (nT)
    pub fn scalar(self) -> f64 {
        match self {
            FieldUnit::Nanotesla => 1.0,
            FieldUnit::Tesla => 1e9,
            FieldUnit::Gauss => 1e5,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FieldUnit::Nanotesla => "nT",
            FieldUnit::Tesla => "T",
            FieldUnit::Gauss => "G",
        }
    }
}

impl FromStr for FieldUnit {
    type Err = CageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "nT" => Ok(FieldUnit::Nanotesla),
            "T" => Ok(FieldUnit::Tesla),
            "G" => Ok(FieldUnit::Gauss),
            other => Err(CageError::UnrecognizedUnit(other.to_string())),
        }
    }
}

impl fmt::Display for FieldUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Time unit for the rate-of-change setting
///
/// Base unit is the millisecond. Labels match the legacy combo-box
/// entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeUnit {
    Millisecond,
    Second,
    Minute,
}

impl TimeUnit {
    /// Multiplier against the base unit (ms)
    pub fn scalar(self) -> f64 {
        match self {
            TimeUnit::Millisecond => 1.0,
            TimeUnit::Second => 1000.0,
            TimeUnit::Minute => 60_000.0,
        }
    }
}

impl FromStr for TimeUnit {
    type Err = CageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "millisecond(s)" | "ms" => Ok(TimeUnit::Millisecond),
            "second(s)" | "s" => Ok(TimeUnit::Second),
            "minute(s)" | "min" => Ok(TimeUnit::Minute),
            other => Err(CageError::UnrecognizedUnit(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_unit_scalars() {
        assert_eq!(FieldUnit::Nanotesla.scalar(), 1.0);
        assert_eq!(FieldUnit::Tesla.scalar(), 1e9);
        assert_eq!(FieldUnit::Gauss.scalar(), 1e5);
    }

    #[test]
    fn test_time_unit_scalars() {
        assert_eq!(TimeUnit::Millisecond.scalar(), 1.0);
        assert_eq!(TimeUnit::Second.scalar(), 1000.0);
        assert_eq!(TimeUnit::Minute.scalar(), 60_000.0);
    }

    #[test]
    fn test_parse_legacy_labels() {
        assert_eq!("nT".parse::<FieldUnit>().unwrap(), FieldUnit::Nanotesla);
        assert_eq!("G".parse::<FieldUnit>().unwrap(), FieldUnit::Gauss);
        assert_eq!("second(s)".parse::<TimeUnit>().unwrap(), TimeUnit::Second);
        assert_eq!(
            "minute(s)".parse::<TimeUnit>().unwrap(),
            TimeUnit::Minute
        );
    }

    #[test]
    fn test_unknown_label_is_an_error() {
        // The old controller returned a -1 sentinel here and kept going.
        let err = "furlongs".parse::<FieldUnit>().unwrap_err();
        assert!(matches!(err, CageError::UnrecognizedUnit(_)));
        let err = "fortnight(s)".parse::<TimeUnit>().unwrap_err();
        assert!(matches!(err, CageError::UnrecognizedUnit(_)));
    }
}
