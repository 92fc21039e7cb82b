use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::errors::Error;

/// Wire form returned by the credential endpoints (login, signup, refresh).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CredentialPayload {
    pub access_token: String,
    pub issued_at: Timestamp,
    pub expires_at: Timestamp,
}

/// A validated session credential.
///
/// The value is opaque to this layer; the timestamps exist so callers can
/// ask whether the session is already known-stale without a round trip.
#[derive(Clone, Debug)]
pub struct Credential {
    value: String,
    issued_at: Timestamp,
    expires_at: Timestamp,
}

impl Credential {
    pub fn try_new(
        value: String,
        issued_at: Timestamp,
        expires_at: Timestamp,
    ) -> Result<Self, Error> {
        if value.is_empty() {
            return Err(Error::Config("Credential value is empty".into()));
        }
        if expires_at <= issued_at {
            return Err(Error::Config(
                "Credential expires before or at issuance".into(),
            ));
        }
        Ok(Self {
            value,
            issued_at,
            expires_at,
        })
    }

    pub fn from_payload(payload: CredentialPayload) -> Result<Self, Error> {
        let CredentialPayload {
            access_token,
            issued_at,
            expires_at,
        } = payload;
        Self::try_new(access_token, issued_at, expires_at)
    }

    pub fn to_payload(&self) -> CredentialPayload {
        CredentialPayload {
            access_token: self.value.clone(),
            issued_at: self.issued_at,
            expires_at: self.expires_at,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn issued_at(&self) -> Timestamp {
        self.issued_at
    }

    pub fn expires_at(&self) -> Timestamp {
        self.expires_at
    }

    pub fn expired(&self, now: Timestamp) -> bool {
        self.expires_at <= now
    }
}
