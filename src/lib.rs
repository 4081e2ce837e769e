pub mod backup;
pub mod capacity;
pub mod clock;
pub mod command;
pub mod config;
pub mod engine;
pub mod lecture;
pub mod limits;
pub mod model;
pub mod notify;
pub mod observability;
pub mod policy;
pub mod snapshot;
pub mod store;
