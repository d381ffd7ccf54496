pub mod client_statuses;
pub mod clients;
pub mod firm_config;
pub mod indicator_snapshots;
