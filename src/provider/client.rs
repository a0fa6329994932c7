use std::collections::HashMap;

use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use base64::{engine::general_purpose::STANDARD, Engine};
use subtle::ConstantTimeEq;

use crate::provider::error::ProtocolError;
use crate::provider::settings::ClientMetadata;

/// Statically registered clients, keyed by client id.
pub struct ClientRegistry {
    clients: HashMap<String, ClientMetadata>,
}

impl ClientRegistry {
    pub fn new(clients: Vec<ClientMetadata>) -> Self {
        Self {
            clients: clients
                .into_iter()
                .map(|c| (c.client_id.clone(), c))
                .collect(),
        }
    }

    pub fn get(&self, client_id: &str) -> Option<&ClientMetadata> {
        self.clients.get(client_id)
    }

    /// Authenticates the caller with `client_secret_basic`.
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<&ClientMetadata, ProtocolError> {
        let (client_id, secret) = basic_credentials(headers)?;

        let client = self
            .get(&client_id)
            .ok_or_else(|| ProtocolError::InvalidClient("client authentication failed".into()))?;

        if client.token_endpoint_auth_method != "client_secret_basic" {
            return Err(ProtocolError::InvalidClient(format!(
                "client uses {}",
                client.token_endpoint_auth_method
            )));
        }

        let matches: bool = client
            .client_secret
            .as_bytes()
            .ct_eq(secret.as_bytes())
            .into();
        if !matches {
            tracing::warn!(client_id = %client_id, "Invalid client credentials");
            return Err(ProtocolError::InvalidClient(
                "client authentication failed".into(),
            ));
        }

        Ok(client)
    }
}

/// Decodes `Authorization: Basic` into `(client_id, client_secret)`.
///
/// Both halves are form-urlencoded per RFC 6749 §2.3.1.
fn basic_credentials(headers: &HeaderMap) -> Result<(String, String), ProtocolError> {
    let invalid = || ProtocolError::InvalidClient("client authentication failed".into());

    let encoded = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Basic "))
        .ok_or_else(|| {
            ProtocolError::InvalidClient("client_secret_basic authentication required".into())
        })?;

    let decoded = STANDARD.decode(encoded.trim()).map_err(|_| invalid())?;
    let decoded = String::from_utf8(decoded).map_err(|_| invalid())?;
    let (id, secret) = decoded.split_once(':').ok_or_else(invalid)?;

    Ok((form_decode(id), form_decode(secret)))
}

fn form_decode(value: &str) -> String {
    url::form_urlencoded::parse(format!("v={value}").as_bytes())
        .next()
        .map(|(_, v)| v.into_owned())
        .unwrap_or_default()
}
