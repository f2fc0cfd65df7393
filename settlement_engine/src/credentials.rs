use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stl_common::{secret_string, Secret};

/// A merchant's credentials for one payment network, in the clear.
///
/// Values of this type only live for the duration of a single request: they are produced by
/// [`crate::CredentialVault::reveal`] (or an onboarding exchange), used, and dropped. All secret fields print as
/// `****` and are wiped on drop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptedCredentials {
    #[serde(with = "secret_string")]
    pub access_token: Secret<String>,
    #[serde(default, with = "secret_string::option", skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<Secret<String>>,
    /// The merchant's account at the network. Settlement is paid out to this account.
    pub account_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, with = "secret_string::option", skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<Secret<String>>,
    #[serde(default, with = "secret_string::option", skip_serializing_if = "Option::is_none")]
    pub api_key: Option<Secret<String>>,
}

impl DecryptedCredentials {
    pub fn new<S: Into<String>>(access_token: S, account_id: S) -> Self {
        Self {
            access_token: Secret::new(access_token.into()),
            refresh_token: None,
            account_id: account_id.into(),
            expires_at: None,
            public_key: None,
            client_id: None,
            client_secret: None,
            api_key: None,
        }
    }

    pub fn with_refresh_token(mut self, refresh_token: &str) -> Self {
        self.refresh_token = Some(Secret::new(refresh_token.to_string()));
        self
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn with_public_key(mut self, public_key: &str) -> Self {
        self.public_key = Some(public_key.to_string());
        self
    }

    /// Client-credentials auth, as used by the push network.
    pub fn with_client_credentials(mut self, client_id: &str, client_secret: &str, api_key: &str) -> Self {
        self.client_id = Some(client_id.to_string());
        self.client_secret = Some(Secret::new(client_secret.to_string()));
        self.api_key = Some(Secret::new(api_key.to_string()));
        self
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn debug_output_is_redacted() {
        let creds = DecryptedCredentials::new("APP_USR-123", "acct-9")
            .with_refresh_token("TG-456")
            .with_client_credentials("client-1", "very-secret", "key-789");
        let printed = format!("{creds:?}");
        for secret in ["APP_USR-123", "TG-456", "very-secret", "key-789"] {
            assert!(!printed.contains(secret), "{secret} leaked into {printed}");
        }
        assert!(printed.contains("acct-9"));
    }

    #[test]
    fn optional_fields_may_be_absent() {
        let creds: DecryptedCredentials =
            serde_json::from_str(r#"{"access_token": "prv_test_1", "account_id": "m-42"}"#).unwrap();
        assert_eq!(creds, DecryptedCredentials::new("prv_test_1", "m-42"));
    }
}
