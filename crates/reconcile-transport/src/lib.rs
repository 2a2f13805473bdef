//! reconcile-transport — framed length-prefixed byte-stream transport for
//! the reconciliation protocol, and the SKIP/CONTINUE control bytes that
//! drive the protocol's branch points (§4.9, §6).

pub mod connection;
pub mod control;
pub mod frame;

pub use connection::{Connection, ConnectionError};
pub use control::ControlByte;
