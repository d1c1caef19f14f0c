//! Per-service database credentials and the shared coordinates they point at.

use serde_json::{json, Value};

use super::{first_present, BuiltBundle, BundleKind, Payload, SecretNamer};
use crate::errors::{Result, SeederError};
use crate::secrets::SecretString;

/// Host and port shared by every per-service credential in a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbCoordinates {
    pub host: String,
    /// Always rendered as a string in payloads
    pub port: String,
}

impl DbCoordinates {
    pub fn new(host: impl Into<String>, port: impl Into<String>) -> Self {
        Self { host: host.into(), port: port.into() }
    }

    /// Merge explicit overrides with the master secret's `host`/`port`.
    ///
    /// Overrides win field by field. The master secret may carry the port as
    /// a number or a string.
    pub fn resolve(
        host_override: Option<&str>,
        port_override: Option<&str>,
        master: Option<&Value>,
    ) -> Result<Self> {
        let master_host = master.and_then(|m| scalar(m.get("host")));
        let master_port = master.and_then(|m| scalar(m.get("port")));

        let host = first_present(&[host_override, master_host.as_deref()]).ok_or_else(|| {
            SeederError::missing_db_coordinates("no host override and master secret has no host")
        })?;
        let port = first_present(&[port_override, master_port.as_deref()]).ok_or_else(|| {
            SeederError::missing_db_coordinates("no port override and master secret has no port")
        })?;

        Ok(Self::new(host, port))
    }
}

fn scalar(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// `{username, password, host, port, database}` for one service.
pub fn build(
    namer: &SecretNamer,
    service: &str,
    coordinates: &DbCoordinates,
    password: &SecretString,
) -> BuiltBundle {
    let payload = json!({
        "username": service,
        "password": password.expose_secret(),
        "host": coordinates.host,
        "port": coordinates.port,
        "database": service,
    });

    BuiltBundle {
        kind: BundleKind::DatabaseCredential,
        name: namer.service(service),
        payload: Payload::Json(payload),
    }
}
