//! HTTP request handlers.

pub mod auth;
pub mod form;
pub mod health;
pub mod packages;

pub use auth::*;
pub use health::*;
pub use packages::*;
