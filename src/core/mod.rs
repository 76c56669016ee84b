pub mod auth;
pub mod clock;
pub mod config;
pub mod counter;
pub mod dispatcher;
pub mod lifecycle;
pub mod messages;
pub mod scheduler;
pub mod store;
pub mod terminal;
pub mod types;
