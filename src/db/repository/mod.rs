//! Repository layer — entity-scoped database operations.
//!
//! Free functions over a borrowed `Connection`; the store layer decides
//! locking and transactions.

mod appointment;
mod audit;
mod patient;

pub use appointment::*;
pub use audit::*;
pub use patient::*;
