//! Service-account credential loading.
//!
//! The credential arrives as a base64-encoded JSON document in
//! `SERVICE_ACCOUNT_BASE64`. It is decoded once, before the store is opened,
//! and any problem is reported as [`ParleyError::Config`].

use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::Deserialize;

use crate::error::{ParleyError, Result};

/// Environment variable carrying the encoded credential.
pub const ENV_SERVICE_ACCOUNT: &str = "SERVICE_ACCOUNT_BASE64";

/// Decoded service-account credential.
#[derive(Clone, Deserialize)]
pub struct ServiceAccount {
    /// Credential type, usually `service_account`.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// Project the store belongs to. Names the database file.
    pub project_id: String,
    /// Identity the credential was issued to.
    pub client_email: String,
    /// Signing key. Never logged.
    pub private_key: String,
}

impl std::fmt::Debug for ServiceAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccount")
            .field("kind", &self.kind)
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .finish_non_exhaustive()
    }
}

impl ServiceAccount {
    /// Read and decode the credential from the process environment.
    ///
    /// # Errors
    /// Returns [`ParleyError::Config`] if the variable is unset or malformed.
    pub fn from_env() -> Result<Self> {
        let encoded = std::env::var(ENV_SERVICE_ACCOUNT)
            .map_err(|_| ParleyError::Config(format!("{ENV_SERVICE_ACCOUNT} is not set")))?;
        Self::from_base64(&encoded)
    }

    /// Decode a base64-encoded JSON credential.
    ///
    /// # Errors
    /// Returns [`ParleyError::Config`] if the value is not base64, not JSON,
    /// or has an empty `project_id`.
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let encoded = encoded.trim();
        if encoded.is_empty() {
            return Err(ParleyError::Config(format!("{ENV_SERVICE_ACCOUNT} is empty")));
        }

        let bytes = STANDARD
            .decode(encoded)
            .map_err(|e| ParleyError::Config(format!("{ENV_SERVICE_ACCOUNT} is not valid base64: {e}")))?;

        let account: Self = serde_json::from_slice(&bytes)
            .map_err(|e| ParleyError::Config(format!("service account JSON is malformed: {e}")))?;

        if account.project_id.trim().is_empty() {
            return Err(ParleyError::Config("service account has an empty project_id".into()));
        }
        // Used as a file name.
        if account
            .project_id
            .chars()
            .any(|c| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
        {
            return Err(ParleyError::Config(format!(
                "service account project_id '{}' contains unsupported characters",
                account.project_id
            )));
        }

        Ok(account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(json: &str) -> String {
        STANDARD.encode(json)
    }

    #[test]
    fn decodes_valid_credential() {
        let raw = encode(
            r#"{"type":"service_account","project_id":"npc-world","client_email":"svc@npc-world.iam","private_key":"-----BEGIN KEY-----"}"#,
        );
        let account = ServiceAccount::from_base64(&raw).expect("valid");
        assert_eq!(account.project_id, "npc-world");
        assert_eq!(account.kind.as_deref(), Some("service_account"));
    }

    #[test]
    fn debug_hides_private_key() {
        let raw = encode(r#"{"project_id":"p","client_email":"e","private_key":"TOPSECRET"}"#);
        let account = ServiceAccount::from_base64(&raw).expect("valid");
        assert!(!format!("{account:?}").contains("TOPSECRET"));
    }

    #[test]
    fn rejects_malformed_values() {
        assert!(matches!(ServiceAccount::from_base64(""), Err(ParleyError::Config(_))));
        assert!(matches!(ServiceAccount::from_base64("%%%not base64"), Err(ParleyError::Config(_))));
        assert!(matches!(
            ServiceAccount::from_base64(&encode("not json")),
            Err(ParleyError::Config(_))
        ));
        assert!(matches!(
            ServiceAccount::from_base64(&encode(r#"{"project_id":"","client_email":"e","private_key":"k"}"#)),
            Err(ParleyError::Config(_))
        ));
        assert!(matches!(
            ServiceAccount::from_base64(&encode(r#"{"project_id":"../etc","client_email":"e","private_key":"k"}"#)),
            Err(ParleyError::Config(_))
        ));
    }
}
