pub mod builder;
pub mod clipboard;
pub mod config;
pub mod coordinator;
pub mod provider;
pub mod reconcile;
pub mod search;
pub mod selection;
pub mod service;
pub mod store;

mod error;
mod session;

#[cfg(test)]
mod tests;

pub use coordinator::{RestartPolicy, ServiceControl, TeardownReport};
pub use error::{Error, Result};
pub use session::{Collaborators, Session, SessionOptions};

pub use splitroute_types::*;
