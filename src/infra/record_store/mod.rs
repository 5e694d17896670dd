pub mod http;
pub mod repositories;

/// Collection names in the document store. The record store is keyed by
/// `(collection, document id)`; subscription and profile documents use
/// the user id as their document id.
pub mod collections {
    pub const USER_SUBSCRIPTIONS: &str = "userSubscriptions";
    pub const EXPENSES: &str = "expenses";
    pub const MILEAGE: &str = "mileage";
    pub const USER_PROFILES: &str = "userProfiles";
    pub const COMMISSION_SCHEDULES: &str = "commissionSchedules";
}
