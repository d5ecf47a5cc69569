//! HTTP request handlers.

pub mod status;
pub mod weather;

pub use status::*;
pub use weather::*;
