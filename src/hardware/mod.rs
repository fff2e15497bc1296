pub mod interface;
pub mod mock;
pub mod rig;
pub mod serial;

pub use interface::{HwResult, PowerSupply, RelayDriver};
pub use mock::{mock_rig, MockPowerSupply, MockRelayDriver, RigProbes};
pub use rig::HardwareRig;
pub use serial::{SerialPowerSupply, SerialRelayDriver};
