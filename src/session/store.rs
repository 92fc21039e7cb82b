use std::sync::{PoisonError, RwLock};

use crate::session::Credential;

/// In-memory credential state shared by all clones of a client.
///
/// The transport's cookie jar carries the session ambiently, so an empty
/// store does not imply an unauthenticated session; it only means no
/// credential metadata has been observed yet.
#[derive(Default)]
pub struct CredentialStore {
    current: RwLock<Option<Credential>>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<Credential> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set(&self, credential: Credential) {
        *self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(credential);
    }

    pub fn clear(&self) {
        *self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }
}
