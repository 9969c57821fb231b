use std::fmt;

use serde::{Deserialize, Serialize};
use wiremq_frame::Payload;

use crate::error::Result;

/// Identity and access token carried by the CONNECT frame.
///
/// Serialized as `{"id": ..., "accessToken": ...}`; absent fields are omitted.
#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    /// Unique client identity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Opaque secret. Redacted in debug output and never logged.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

impl Credentials {
    pub fn new(id: Option<String>, access_token: Option<String>) -> Self {
        Self { id, access_token }
    }

    /// Encode as the CONNECT payload.
    pub fn to_payload(&self) -> Result<Payload> {
        Ok(Payload::text(serde_json::to_string(self)?))
    }

    /// Parse a CONNECT payload.
    pub fn from_payload(payload: &Payload) -> Result<Self> {
        Ok(serde_json::from_slice(&payload.as_bytes())?)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dbg = f.debug_struct("Credentials");
        dbg.field("id", &self.id);
        if let Some(token) = &self.access_token {
            dbg.field(
                "access_token",
                &format_args!("<redacted:{} bytes>", token.len()),
            );
        } else {
            dbg.field("access_token", &Option::<String>::None);
        }
        dbg.finish()
    }
}
