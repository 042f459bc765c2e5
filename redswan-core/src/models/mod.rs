//! Data models for the session layer

pub mod user;

pub use user::*;
