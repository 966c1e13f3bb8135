//! Configuration for Tether.
//! TOML-based, 3-layer resolution: env > file > defaults.

pub mod cache_config;
pub mod compiler_config;
pub mod defaults;
pub mod dispatch_config;
pub mod tether_config;

pub use cache_config::CacheConfig;
pub use compiler_config::CompilerConfig;
pub use dispatch_config::DispatchConfig;
pub use tether_config::TetherConfig;
