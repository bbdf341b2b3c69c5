use serde::Deserialize;

/// Top-level configuration settings for the gateway.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub hub: HubSettings,
    pub bus: BusSettings,
    pub logging: LoggingSettings,
}

/// Address the WebSocket listener binds to.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

/// Connection hub settings.
///
/// `queue_capacity` bounds every connection's outbound queue; a connection
/// whose queue is full when a broadcast arrives is evicted.
#[derive(Debug, Deserialize, Clone)]
pub struct HubSettings {
    pub queue_capacity: usize,
}

/// Subject naming and delivery buffering for the pub/sub bus.
///
/// Subjects are built as `<namespace>.<topic>.<event_kind>`.
#[derive(Debug, Deserialize, Clone)]
pub struct BusSettings {
    pub namespace: String,
    pub event_kind: String,
    pub delivery_buffer: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    pub level: String,
}

/// Partial configuration settings loaded from files or environment.
///
/// Every field is optional; missing values are filled from `Settings::default()`.
#[derive(Debug, Deserialize, Default)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub hub: Option<PartialHubSettings>,
    pub bus: Option<PartialBusSettings>,
    pub logging: Option<PartialLoggingSettings>,
}

#[derive(Debug, Deserialize)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Deserialize)]
pub struct PartialHubSettings {
    pub queue_capacity: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct PartialBusSettings {
    pub namespace: Option<String>,
    pub event_kind: Option<String>,
    pub delivery_buffer: Option<usize>,
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
                port: 9001,
            },
            hub: HubSettings {
                queue_capacity: 256,
            },
            bus: BusSettings {
                namespace: "document".to_string(),
                event_kind: "edit".to_string(),
                delivery_buffer: 1024,
            },
            logging: LoggingSettings {
                level: "info".to_string(),
            },
        }
    }
}

impl Settings {
    /// Merge partially specified settings over the defaults.
    pub fn merge(partial: PartialSettings) -> Self {
        let default = Settings::default();
        let server = partial.server;
        let hub = partial.hub;
        let bus = partial.bus;
        let logging = partial.logging;

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
            hub: HubSettings {
                queue_capacity: hub
                    .as_ref()
                    .and_then(|h| h.queue_capacity)
                    .unwrap_or(default.hub.queue_capacity),
            },
            bus: BusSettings {
                namespace: bus
                    .as_ref()
                    .and_then(|b| b.namespace.clone())
                    .unwrap_or(default.bus.namespace),
                event_kind: bus
                    .as_ref()
                    .and_then(|b| b.event_kind.clone())
                    .unwrap_or(default.bus.event_kind),
                delivery_buffer: bus
                    .as_ref()
                    .and_then(|b| b.delivery_buffer)
                    .unwrap_or(default.bus.delivery_buffer),
            },
            logging: LoggingSettings {
                level: logging
                    .and_then(|l| l.level)
                    .unwrap_or(default.logging.level),
            },
        }
    }

    /// `host:port` for the WebSocket listener.
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Reject values the runtime cannot work with.
    pub fn validate(&self) -> Result<(), String> {
        if self.hub.queue_capacity == 0 {
            return Err("hub.queue_capacity must be greater than zero".to_string());
        }
        if self.bus.delivery_buffer == 0 {
            return Err("bus.delivery_buffer must be greater than zero".to_string());
        }
        for (key, value) in [
            ("bus.namespace", &self.bus.namespace),
            ("bus.event_kind", &self.bus.event_kind),
        ] {
            if value.is_empty() || value.contains('.') {
                return Err(format!("{key} must be non-empty and contain no '.'"));
            }
        }
        Ok(())
    }
}
