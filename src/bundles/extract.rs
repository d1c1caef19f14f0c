//! Read values back out of bundles persisted by earlier passes.
//!
//! Pre-existing bundles may have been written by hand or by older tooling,
//! so every lookup here tolerates any shape and answers `None` when the
//! value cannot be found.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde_json::Value;

/// Login whose password the metadata bundle's admin entry carries
pub const ADMIN_USER: &str = "gateway";

const ADMIN_LOGINS_PREFIX: &str = "ADMIN_LOGINS=";

/// The `gateway` admin password of a metadata bundle.
///
/// Looks at the `ADMIN_LOGINS=user:pw[,user:pw...]` line of `metadata.env`
/// first, then at the base64 `user:pw` in `base64Authz.txt`.
pub fn extract_admin_password_from_metadata_bundle(bundle: &Value) -> Option<String> {
    from_env_lines(bundle).or_else(|| from_authz(bundle))
}

fn from_env_lines(bundle: &Value) -> Option<String> {
    let lines = bundle.get("metadata.env")?.as_array()?;
    lines
        .iter()
        .filter_map(Value::as_str)
        .filter_map(|line| line.trim().strip_prefix(ADMIN_LOGINS_PREFIX))
        .flat_map(|logins| logins.split(','))
        .find_map(password_for_admin)
}

fn from_authz(bundle: &Value) -> Option<String> {
    let encoded = bundle.get("base64Authz.txt")?.as_str()?;
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let pair = String::from_utf8(decoded).ok()?;
    password_for_admin(&pair)
}

fn password_for_admin(pair: &str) -> Option<String> {
    let (user, password) = pair.trim().split_once(':')?;
    (user == ADMIN_USER && !password.is_empty()).then(|| password.to_string())
}

/// The indexing job's image password from a dispatcher bundle.
///
/// Takes the job named `indexing`, else the first job, from `JOBS` (or
/// lower-case `jobs`).
pub fn extract_password_from_dispatcher_bundle(bundle: &Value) -> Option<String> {
    let jobs = bundle.get("JOBS").or_else(|| bundle.get("jobs"))?.as_array()?;
    let job = jobs
        .iter()
        .find(|job| job.get("name").and_then(Value::as_str) == Some("indexing"))
        .or_else(|| jobs.first())?;

    job.get("imageConfig")?
        .get("password")?
        .as_str()
        .filter(|p| !p.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_admin_password_from_env_lines() {
        let bundle = json!({
            "metadata.env": [
                "DEBUG=false",
                "ADMIN_LOGINS=alice:one,gateway:s3cret",
            ],
        });
        assert_eq!(extract_admin_password_from_metadata_bundle(&bundle).as_deref(), Some("s3cret"));
    }

    #[test]
    fn test_admin_password_falls_back_to_authz() {
        let bundle = json!({
            "metadata.env": ["ADMIN_LOGINS=alice:one"],
            "base64Authz.txt": STANDARD.encode("gateway:fromauthz"),
        });
        assert_eq!(
            extract_admin_password_from_metadata_bundle(&bundle).as_deref(),
            Some("fromauthz")
        );
    }

    #[test]
    fn test_admin_password_malformed_bundles() {
        for bundle in [
            json!(null),
            json!("metadata"),
            json!({"metadata.env": "ADMIN_LOGINS=gateway:x"}),
            json!({"metadata.env": [1, 2, 3]}),
            json!({"base64Authz.txt": "%%%not base64%%%"}),
            json!({"base64Authz.txt": STANDARD.encode("gateway")}),
            json!({"metadata.env": ["ADMIN_LOGINS=gateway:"]}),
        ] {
            assert!(extract_admin_password_from_metadata_bundle(&bundle).is_none(), "{bundle}");
        }
    }

    #[test]
    fn test_dispatcher_password_prefers_indexing_job() {
        let bundle = json!({
            "JOBS": [
                {"name": "other", "imageConfig": {"password": "first"}},
                {"name": "indexing", "imageConfig": {"password": "wanted"}},
            ],
        });
        assert_eq!(extract_password_from_dispatcher_bundle(&bundle).as_deref(), Some("wanted"));
    }

    #[test]
    fn test_dispatcher_password_lowercase_and_first_job() {
        let bundle = json!({"jobs": [{"name": "other", "imageConfig": {"password": "first"}}]});
        assert_eq!(extract_password_from_dispatcher_bundle(&bundle).as_deref(), Some("first"));
    }

    #[test]
    fn test_dispatcher_password_malformed_bundles() {
        for bundle in [
            json!({}),
            json!({"JOBS": {}}),
            json!({"JOBS": []}),
            json!({"JOBS": [{"name": "indexing"}]}),
            json!({"JOBS": [{"name": "indexing", "imageConfig": {"password": 7}}]}),
        ] {
            assert!(extract_password_from_dispatcher_bundle(&bundle).is_none(), "{bundle}");
        }
    }
}
