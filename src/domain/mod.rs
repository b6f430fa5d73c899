pub mod models;
pub mod pager;
pub mod parking;
pub mod parking_metrics;
pub mod standby;
pub mod timeline;
pub mod units;
pub mod validity;
