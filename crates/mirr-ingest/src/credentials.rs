//! Destination credential lookup
//!
//! Credentials come either straight from configuration or from an AWS Secrets
//! Manager secret whose `SecretString` is `{"username": ..., "password": ...}`.

use std::fmt;

use aws_config::{BehaviorVersion, Region};
use aws_sdk_secretsmanager::error::DisplayErrorContext;
use serde::Deserialize;
use tracing::{info, instrument};

use crate::error::{IngestError, Result};

#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct DbCredentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for DbCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbCredentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    Static(DbCredentials),
    SecretsManager { secret_id: String, region: String },
}

impl CredentialSource {
    #[instrument(skip(self))]
    pub async fn resolve(&self) -> Result<DbCredentials> {
        match self {
            CredentialSource::Static(credentials) => Ok(credentials.clone()),
            CredentialSource::SecretsManager { secret_id, region } => {
                fetch_secret(secret_id, region).await
            }
        }
    }
}

async fn fetch_secret(secret_id: &str, region: &str) -> Result<DbCredentials> {
    let shared = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(region.to_string()))
        .load()
        .await;
    let client = aws_sdk_secretsmanager::Client::new(&shared);

    let response = client
        .get_secret_value()
        .secret_id(secret_id)
        .send()
        .await
        .map_err(|e| {
            IngestError::Credentials(format!(
                "GetSecretValue({}) failed: {}",
                secret_id,
                DisplayErrorContext(&e)
            ))
        })?;

    let secret = response.secret_string().ok_or_else(|| {
        IngestError::Credentials(format!("secret {} has no SecretString", secret_id))
    })?;

    let credentials = parse_secret_string(secret)?;
    info!(secret_id, username = %credentials.username, "Resolved database credentials");
    Ok(credentials)
}

/// Parse a `{"username", "password"}` secret body. Extra keys (host, engine,
/// ...) are ignored.
pub fn parse_secret_string(secret: &str) -> Result<DbCredentials> {
    serde_json::from_str(secret)
        .map_err(|e| IngestError::Credentials(format!("secret is not a username/password pair: {}", e)))
}
