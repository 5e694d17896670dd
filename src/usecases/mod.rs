pub mod billing;
pub mod expenses;
pub mod mileage;
pub mod settings;
