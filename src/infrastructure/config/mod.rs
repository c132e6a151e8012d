pub mod loader;

pub use loader::{mask_api_key, ConfigError, ConfigLoader};
