pub mod clients;
pub mod extraction;
pub mod firm_config;
pub mod health;
pub mod snapshots;
pub mod statuses;
