//! Metadata service bundle: database credentials, env file and admin login.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde_json::json;

use super::extract::ADMIN_USER;
use super::{require, BuiltBundle, BundleKind, DbCoordinates, Payload, SecretNamer};
use crate::errors::Result;
use crate::invocation::G3AutoInputs;
use crate::secrets::SecretString;

/// Database and login name of the metadata service
pub const METADATA_SERVICE: &str = "metadata";

/// Passwords the metadata bundle embeds
#[derive(Debug, Clone)]
pub struct MetadataPasswords {
    pub db_password: SecretString,
    pub admin_password: SecretString,
}

/// Check preconditions; returns the hostname the bundle will carry.
pub fn hostname(inputs: &G3AutoInputs) -> Result<&str> {
    require(
        BundleKind::Metadata,
        "hostname",
        &[inputs.metadata.hostname.as_deref(), inputs.hostname.as_deref()],
    )
}

pub fn build(
    namer: &SecretNamer,
    inputs: &G3AutoInputs,
    coordinates: &DbCoordinates,
    passwords: &MetadataPasswords,
) -> Result<BuiltBundle> {
    let hostname = hostname(inputs)?;
    let db_password = passwords.db_password.expose_secret();
    let admin_login = format!("{}:{}", ADMIN_USER, passwords.admin_password.expose_secret());

    let env_lines = vec![
        "DEBUG=false".to_string(),
        format!("DB_HOST={}", coordinates.host),
        format!("DB_PORT={}", coordinates.port),
        format!("DB_USER={}", METADATA_SERVICE),
        format!("DB_PASSWORD={}", db_password),
        format!("DB_DATABASE={}", METADATA_SERVICE),
        format!("HOSTNAME={}", hostname),
        format!("ADMIN_LOGINS={}", admin_login),
    ];

    let payload = json!({
        "dbcreds.json": {
            "db_host": coordinates.host,
            "db_username": METADATA_SERVICE,
            "db_password": db_password,
            "db_database": METADATA_SERVICE,
        },
        "metadata.env": env_lines,
        "base64Authz.txt": STANDARD.encode(admin_login),
    });

    Ok(BuiltBundle {
        kind: BundleKind::Metadata,
        name: namer.bundle(BundleKind::Metadata),
        payload: Payload::Json(payload),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundles::extract::extract_admin_password_from_metadata_bundle;
    use crate::errors::SeederError;

    fn passwords() -> MetadataPasswords {
        MetadataPasswords {
            db_password: SecretString::new("dbpw"),
            admin_password: SecretString::new("adminpw"),
        }
    }

    #[test]
    fn test_env_line_order() {
        let namer = SecretNamer::new("omix3", "test");
        let inputs = G3AutoInputs {
            hostname: Some("data.example.org".into()),
            ..Default::default()
        };
        let coords = DbCoordinates::new("db.local", "5432");

        let bundle = build(&namer, &inputs, &coords, &passwords()).unwrap();
        let payload = bundle.json().unwrap();

        assert_eq!(bundle.name, "omix3-test-metadata-g3auto");
        assert_eq!(
            payload["metadata.env"],
            json!([
                "DEBUG=false",
                "DB_HOST=db.local",
                "DB_PORT=5432",
                "DB_USER=metadata",
                "DB_PASSWORD=dbpw",
                "DB_DATABASE=metadata",
                "HOSTNAME=data.example.org",
                "ADMIN_LOGINS=gateway:adminpw",
            ])
        );
        assert_eq!(payload["dbcreds.json"]["db_password"], "dbpw");
        assert_eq!(payload["base64Authz.txt"], STANDARD.encode("gateway:adminpw"));
        let admin = extract_admin_password_from_metadata_bundle(payload);
        assert_eq!(admin.as_deref(), Some("adminpw"));
    }

    #[test]
    fn test_sub_object_hostname_wins() {
        let mut inputs = G3AutoInputs { hostname: Some("shared".into()), ..Default::default() };
        inputs.metadata.hostname = Some("meta.example.org".into());
        assert_eq!(hostname(&inputs).unwrap(), "meta.example.org");
    }

    #[test]
    fn test_hostname_required() {
        let err = hostname(&G3AutoInputs::default()).unwrap_err();
        assert!(matches!(
            err,
            SeederError::MissingRequiredInput { ref input, .. } if input == "hostname"
        ));
    }
}
