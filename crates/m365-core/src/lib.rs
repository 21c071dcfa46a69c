pub mod audit;
pub mod config;
pub mod db;
pub mod directory;
pub mod error;
pub mod health;
pub mod io;
pub mod sanitize;
pub mod teams;
pub mod template;
pub mod users;
pub mod validation;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use directory::{RemoteError, ResourceClient};
pub use error::{AdminError, Result};
