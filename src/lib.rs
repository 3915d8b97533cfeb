pub mod audit_log;
pub mod auction;
pub mod auth;
pub mod bidding;
pub mod clock;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod lifecycle;
pub mod message_broker;
pub mod notifier;
pub mod query;
pub mod scheduler;
pub mod store;
