mod dirs;
mod settings;
mod validation;

pub use dirs::Directories;
pub use settings::{Config, RestartConfig, SearchConfig, ServiceConfig};
pub use validation::{KnownKeys, warn_unknown_keys};
