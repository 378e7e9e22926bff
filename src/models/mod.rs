pub mod account;
pub mod appointment;
pub mod billing;
pub mod department;
pub mod employee;
pub mod enums;
pub mod filters;
pub mod orders;
pub mod patient;
pub mod prescription;

pub use account::*;
pub use appointment::*;
pub use billing::*;
pub use department::*;
pub use employee::*;
pub use enums::*;
pub use filters::*;
pub use orders::*;
pub use patient::*;
pub use prescription::*;
