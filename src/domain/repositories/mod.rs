pub mod expenses;
pub mod mileage;
pub mod profiles;
pub mod subscriptions;
