use serde::Deserialize;

/// Settings for the `gmsec` bus server binary.
///
/// These are distinct from the `Config` option store consumed by
/// connections: they describe the process, not a connection.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub bus: BusSettings,
    pub logging: LoggingSettings,
}

/// Address the WebSocket bus server binds to.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

/// Operational limits of the bus.
///
/// `persistence_path` enables the durable message store when set.
#[derive(Debug, Deserialize, Clone)]
pub struct BusSettings {
    pub max_connections: usize,
    pub message_ttl_secs: u64,
    pub max_messages_per_subject: usize,
    pub persistence_path: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    pub level: String,
}

/// Partial settings as read from files or the environment; missing values
/// are filled from `Settings::default()`.
#[derive(Debug, Deserialize, Default)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub bus: Option<PartialBusSettings>,
    pub logging: Option<PartialLoggingSettings>,
}

#[derive(Debug, Deserialize)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Deserialize)]
pub struct PartialBusSettings {
    pub max_connections: Option<usize>,
    pub message_ttl_secs: Option<u64>,
    pub max_messages_per_subject: Option<usize>,
    pub persistence_path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PartialLoggingSettings {
    pub level: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 9100,
            },
            bus: BusSettings {
                max_connections: 1000,
                message_ttl_secs: 3600,
                max_messages_per_subject: 1000,
                persistence_path: None,
            },
            logging: LoggingSettings {
                level: "info".to_string(),
            },
        }
    }
}

impl PartialSettings {
    /// Fills every missing value from `Settings::default()`.
    pub fn resolve(self) -> Settings {
        let default = Settings::default();
        let server = self.server;
        let bus = self.bus;
        let logging = self.logging;

        Settings {
            server: ServerSettings {
                host: server
                    .as_ref()
                    .and_then(|s| s.host.clone())
                    .unwrap_or(default.server.host),
                port: server
                    .as_ref()
                    .and_then(|s| s.port)
                    .unwrap_or(default.server.port),
            },
            bus: BusSettings {
                max_connections: bus
                    .as_ref()
                    .and_then(|b| b.max_connections)
                    .unwrap_or(default.bus.max_connections),
                message_ttl_secs: bus
                    .as_ref()
                    .and_then(|b| b.message_ttl_secs)
                    .unwrap_or(default.bus.message_ttl_secs),
                max_messages_per_subject: bus
                    .as_ref()
                    .and_then(|b| b.max_messages_per_subject)
                    .unwrap_or(default.bus.max_messages_per_subject),
                persistence_path: bus
                    .as_ref()
                    .and_then(|b| b.persistence_path.clone())
                    .or(default.bus.persistence_path),
            },
            logging: LoggingSettings {
                level: logging
                    .and_then(|l| l.level)
                    .unwrap_or(default.logging.level),
            },
        }
    }
}
