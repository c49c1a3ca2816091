//! Library exports for sessiontron, shared between host shells and tests.

pub mod backend;
pub mod config;
pub mod errors;
pub mod gate;
pub mod models;
pub mod session;
pub mod store;
pub mod utils;
