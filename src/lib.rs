pub mod app;
pub mod config;
pub mod response;
pub mod state;
pub mod tracking;
pub mod users;
