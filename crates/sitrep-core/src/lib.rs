pub mod error;
pub mod manifest;
pub mod store;
pub mod frame;
pub mod fetch;
pub mod feeds;
pub mod transforms;
pub mod metrics;
pub mod report;
pub mod ping;
