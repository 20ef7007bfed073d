pub mod faults;

pub use faults::{FaultKind, FaultLedger, FaultRecord, Faults, RelayId};
