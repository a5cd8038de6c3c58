use crate::core::{
    Waypoint, ACCELEROMETER_GROUP, CONNECT_ATTEMPTS, CONNECT_RETRY_DELAY_MS, DISCOVERY_POLL_INTERVAL_MS,
};
use crate::link::channel::ChannelSpec;
use crate::link::establisher::RetryPolicy;
use crate::navigation::route::Route;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

/// Harness configuration, stored as JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarnessConfig {
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub connect: ConnectConfig,
    #[serde(default)]
    pub route: RouteConfig,
    /// Missing means the two reference sensors; an explicit `[]` runs without telemetry
    #[serde(default = "default_channels")]
    pub channels: Vec<ChannelSpec>,
    #[serde(default)]
    pub presentation: PresentationConfig,
    #[serde(default)]
    pub scenario: ScenarioConfig,
}

/// Discovery polling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Delay between lookups while the service is not registered (milliseconds)
    pub poll_interval_ms: u64,
    /// Give up after this many empty lookups; `None` waits forever
    pub max_polls: Option<u32>,
}

/// Socket connect retries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectConfig {
    /// Connect attempts before the channel is abandoned
    pub attempts: u32,
    /// Delay between failed attempts (milliseconds)
    pub retry_delay_ms: u64,
}

/// Route walked by the patient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteConfig {
    pub actor_id: String,
    /// Waypoints as `[x, y, z]` in scene meters
    pub waypoints: Vec<[f32; 3]>,
    pub looping: bool,
    /// Walking speed of the scripted actor (m/s)
    pub speed_m_s: f32,
}

/// Display settings for the telemetry series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresentationConfig {
    /// Points kept per shifting series
    pub window_size: usize,
    pub unit: String,
    pub axis_labels: String,
}

/// Fall and recovery timing of the demo run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    /// Seconds of walking before the patient falls
    pub fall_after_s: f32,
    /// Seconds on the ground before standing up and resuming
    pub recover_after_s: f32,
    /// Total simulated time (seconds)
    pub duration_s: f32,
    /// Simulation step (seconds)
    pub tick_s: f32,
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid parameter '{parameter}' = '{value}': {reason}")]
    InvalidParameter { parameter: String, value: String, reason: String },
    #[error("failed to access config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config file '{path}': {source}")]
    Serialization {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DISCOVERY_POLL_INTERVAL_MS,
            max_polls: None,
        }
    }
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            attempts: CONNECT_ATTEMPTS,
            retry_delay_ms: CONNECT_RETRY_DELAY_MS,
        }
    }
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            actor_id: "Patient".to_string(),
            waypoints: vec![[2.0, 0.0, 2.0], [4.0, 0.0, 4.0], [4.0, 0.0, 2.0], [2.0, 0.0, 2.0]],
            looping: true,
            speed_m_s: 0.5,
        }
    }
}

impl RouteConfig {
    pub fn positions(&self) -> Vec<Waypoint> {
        self.waypoints.iter().map(|p| Vector3::new(p[0], p[1], p[2])).collect()
    }
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self {
            window_size: 200,
            unit: "m/s2".to_string(),
            axis_labels: "x,y,z".to_string(),
        }
    }
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            fall_after_s: 10.0,
            recover_after_s: 6.0,
            duration_s: 40.0,
            tick_s: 1.0 / 60.0,
        }
    }
}

fn default_channels() -> Vec<ChannelSpec> {
    vec![
        ChannelSpec::new(ACCELEROMETER_GROUP, "sensor1", "Remote Chest Sensor"),
        ChannelSpec::new(ACCELEROMETER_GROUP, "sensor2", "Remote Left Hand"),
    ]
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            discovery: DiscoveryConfig::default(),
            connect: ConnectConfig::default(),
            route: RouteConfig::default(),
            channels: default_channels(),
            presentation: PresentationConfig::default(),
            scenario: ScenarioConfig::default(),
        }
    }
}

fn invalid(parameter: &str, value: impl ToString, reason: &str) -> ConfigError {
    ConfigError::InvalidParameter {
        parameter: parameter.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

impl HarnessConfig {
    /// Load and validate a JSON configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let content = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path_str.clone(),
            source,
        })?;

        let config: HarnessConfig = serde_json::from_str(&content).map_err(|source| ConfigError::Serialization {
            path: path_str,
            source,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Write the configuration as pretty-printed JSON
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let content = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Serialization {
            path: path_str.clone(),
            source,
        })?;

        fs::write(&path, content).map_err(|source| ConfigError::Io { path: path_str, source })
    }

    /// Check parameter ranges; the first violation is returned
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.discovery.poll_interval_ms == 0 {
            return Err(invalid("discovery.poll_interval_ms", 0, "must be positive"));
        }
        if self.discovery.max_polls == Some(0) {
            return Err(invalid("discovery.max_polls", 0, "use null for no limit"));
        }
        if self.connect.attempts == 0 {
            return Err(invalid("connect.attempts", 0, "at least one attempt is required"));
        }

        if self.route.actor_id.trim().is_empty() {
            return Err(invalid("route.actor_id", &self.route.actor_id, "must not be empty"));
        }
        if self.route.waypoints.is_empty() {
            return Err(invalid("route.waypoints", "[]", "route needs at least one waypoint"));
        }
        if let Some(p) = self.route.waypoints.iter().find(|p| p.iter().any(|c| !c.is_finite())) {
            return Err(invalid("route.waypoints", format!("{:?}", p), "coordinates must be finite"));
        }
        if !(self.route.speed_m_s > 0.0) {
            return Err(invalid("route.speed_m_s", self.route.speed_m_s, "must be positive"));
        }

        let mut seen = HashSet::new();
        for channel in &self.channels {
            if channel.group.is_empty() || channel.sensor.is_empty() {
                return Err(invalid("channels", channel.name(), "group and sensor are required"));
            }
            if !seen.insert(channel.name()) {
                return Err(invalid("channels", channel.name(), "sensor listed twice"));
            }
        }

        if self.presentation.window_size == 0 {
            return Err(invalid("presentation.window_size", 0, "must be positive"));
        }

        let scenario = &self.scenario;
        if !(scenario.tick_s > 0.0) {
            return Err(invalid("scenario.tick_s", scenario.tick_s, "must be positive"));
        }
        if scenario.fall_after_s < 0.0 || scenario.recover_after_s < 0.0 {
            return Err(invalid(
                "scenario",
                format!("fall={} recover={}", scenario.fall_after_s, scenario.recover_after_s),
                "timings must not be negative",
            ));
        }

        Ok(())
    }

    /// Route built from the configured waypoints
    pub fn route(&self) -> Route {
        Route::new(&self.route.positions(), self.route.looping)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from_config(&self.discovery, &self.connect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_matches_reference_run() {
        let config = HarnessConfig::default();
        assert_eq!(config.discovery.poll_interval_ms, 1000);
        assert_eq!(config.discovery.max_polls, None);
        assert_eq!(config.connect.attempts, 5);
        assert_eq!(config.connect.retry_delay_ms, 500);
        assert_eq!(config.route.actor_id, "Patient");
        assert!(config.route.looping);
        assert_eq!(config.route.positions()[1], Vector3::new(4.0, 0.0, 4.0));
        assert_eq!(config.channels.len(), 2);
        assert!(config.validate().is_ok());

        let route = config.route();
        assert_eq!(route.len(), 4);
        assert!(route.is_looping());
        let policy = config.retry_policy();
        assert_eq!(policy.connect_attempts, 5);
        assert_eq!(policy.connect_delay, std::time::Duration::from_millis(500));
    }

    #[test]
    fn test_invalid_parameters_rejected() {
        let mut config = HarnessConfig::default();
        config.connect.attempts = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidParameter { ref parameter, .. }) if parameter == "connect.attempts"
        ));

        let mut config = HarnessConfig::default();
        config.route.waypoints.clear();
        assert!(config.validate().is_err());

        let mut config = HarnessConfig::default();
        config.channels.push(ChannelSpec::new("accel", "sensor1", "again"));
        assert!(config.validate().is_err());

        let mut config = HarnessConfig::default();
        config.route.speed_m_s = f32::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("harness.json");

        let mut config = HarnessConfig::default();
        config.discovery.max_polls = Some(30);
        config.route.looping = false;
        config.save_to_file(&path).unwrap();

        let loaded = HarnessConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.json");
        fs::write(&path, r#"{ "connect": { "attempts": 2, "retry_delay_ms": 100 } }"#).unwrap();

        let loaded = HarnessConfig::from_file(&path).unwrap();
        assert_eq!(loaded.connect.attempts, 2);
        assert_eq!(loaded.route, RouteConfig::default());
        assert_eq!(loaded.channels, HarnessConfig::default().channels);
        assert_eq!(loaded.channels.len(), 2);
        assert!(loaded.validate().is_ok());
    }

    #[test]
    fn test_explicit_channel_list_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("channels.json");
        fs::write(
            &path,
            r#"{ "channels": [ { "group": "accel", "sensor": "sensor3", "title": "Remote Ankle" } ] }"#,
        )
        .unwrap();
        let loaded = HarnessConfig::from_file(&path).unwrap();
        assert_eq!(loaded.channels, vec![ChannelSpec::new("accel", "sensor3", "Remote Ankle")]);

        fs::write(&path, r#"{ "channels": [] }"#).unwrap();
        assert!(HarnessConfig::from_file(&path).unwrap().channels.is_empty());
    }

    #[test]
    fn test_missing_and_broken_files() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            HarnessConfig::from_file(dir.path().join("absent.json")),
            Err(ConfigError::Io { .. })
        ));

        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(HarnessConfig::from_file(&path), Err(ConfigError::Serialization { .. })));
    }
}
