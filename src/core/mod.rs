pub mod field;
pub mod setpoint;
pub mod units;

pub use field::{FieldDataset, FieldSample};
pub use setpoint::{build_setpoint_table, compute_setpoint, Axis, Setpoint, AXES};
pub use units::{FieldUnit, TimeUnit};
