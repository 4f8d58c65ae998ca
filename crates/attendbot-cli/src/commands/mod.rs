pub mod admin;
pub mod attend;
pub mod breaks;
pub mod config;
pub mod status;
