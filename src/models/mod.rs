pub mod appointment;
pub mod enums;
pub mod patient;
pub mod screening;

pub use appointment::*;
pub use enums::*;
pub use patient::*;
pub use screening::*;
