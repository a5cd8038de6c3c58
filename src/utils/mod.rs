//! Configuration loading and validation

pub mod config;

pub use config::{
    ConfigError, ConnectConfig, DiscoveryConfig, HarnessConfig, PresentationConfig, RouteConfig, ScenarioConfig,
};
