mod credential;
mod store;

pub use credential::{Credential, CredentialPayload};
pub use store::CredentialStore;
