pub mod global;
pub mod loader;

pub use global::{EventEngineConfig, ProcessorConfig, SystemConfig};
pub use loader::ConfigLoader;
