//! Service discovery interface and an in-memory service table

use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Mutex;

/// Network endpoint of a registered sensor service
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    pub host: String,
    pub port: u16,
}

impl ServiceDescriptor {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self { host: host.into(), port }
    }
}

impl fmt::Display for ServiceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Maps a logical (group, name) pair to an endpoint.
///
/// Lookups must be cheap; the connection establisher polls them.
pub trait Discovery: Send + Sync {
    fn lookup(&self, group: &str, name: &str) -> Option<ServiceDescriptor>;
}

/// Thread-safe registry of services, passed explicitly to whoever needs it
#[derive(Debug, Default)]
pub struct ServiceTable {
    services: Mutex<BTreeMap<(String, String), ServiceDescriptor>>,
}

impl ServiceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a service
    pub fn register(&self, group: &str, name: &str, descriptor: ServiceDescriptor) {
        info!("service {}/{} registered at {}", group, name, descriptor);
        self.with_services(|s| {
            s.insert((group.to_string(), name.to_string()), descriptor);
        });
    }

    pub fn unregister(&self, group: &str, name: &str) -> Option<ServiceDescriptor> {
        let removed = self.with_services(|s| s.remove(&(group.to_string(), name.to_string())));
        if removed.is_some() {
            info!("service {}/{} unregistered", group, name);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.with_services(|s| s.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn with_services<T>(&self, f: impl FnOnce(&mut BTreeMap<(String, String), ServiceDescriptor>) -> T) -> T {
        let mut guard = match self.services.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }
}

impl Discovery for ServiceTable {
    fn lookup(&self, group: &str, name: &str) -> Option<ServiceDescriptor> {
        self.with_services(|s| s.get(&(group.to_string(), name.to_string())).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_lookup() {
        let table = ServiceTable::new();
        assert!(table.lookup("accel", "sensor1").is_none());

        table.register("accel", "sensor1", ServiceDescriptor::new("127.0.0.1", 60000));
        table.register("accel", "sensor2", ServiceDescriptor::new("127.0.0.1", 60001));

        let found = table.lookup("accel", "sensor1").unwrap();
        assert_eq!(found.port, 60000);
        assert_eq!(found.to_string(), "127.0.0.1:60000");
        assert!(table.lookup("gyro", "sensor1").is_none());
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_unregister() {
        let table = ServiceTable::new();
        table.register("accel", "sensor1", ServiceDescriptor::new("localhost", 1));
        assert!(table.unregister("accel", "sensor1").is_some());
        assert!(table.unregister("accel", "sensor1").is_none());
        assert!(table.is_empty());
    }
}
