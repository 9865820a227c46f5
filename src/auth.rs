//! Sign-in gate in front of submission.
//!
//! Credential checking is delegated to a [`CredentialVerifier`]. The signed-in user
//! lives in a [`Session`] handle that is passed explicitly to whoever needs it; the
//! workflow refuses to submit while the session is empty.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::config::CredentialEntry;
use crate::error::{ExtractorError, Result};

/// The signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub id: String,
    pub email: String,
}

/// Checks an email/secret pair.
pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, email: &str, secret: &str) -> Option<Identity>;
}

/// Verifier backed by a list of allowed accounts with hashed secrets.
#[derive(Debug, Clone, Default)]
pub struct AllowListVerifier {
    entries: Vec<CredentialEntry>,
}

impl AllowListVerifier {
    pub fn new(entries: Vec<CredentialEntry>) -> Self {
        Self { entries }
    }

    /// Hex SHA-256 digest in the form stored in configuration.
    pub fn digest(secret: &str) -> String {
        hex::encode(Sha256::digest(secret.as_bytes()))
    }
}

impl CredentialVerifier for AllowListVerifier {
    fn verify(&self, email: &str, secret: &str) -> Option<Identity> {
        let digest = Self::digest(secret);
        self.entries
            .iter()
            .find(|entry| {
                entry.email == email && entry.secret_sha256.eq_ignore_ascii_case(&digest)
            })
            .map(|entry| Identity {
                id: entry.email.clone(),
                email: entry.email.clone(),
            })
    }
}

/// Shared handle to the current sign-in state.
#[derive(Debug, Clone, Default)]
pub struct Session {
    current: Arc<RwLock<Option<Identity>>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// A session that is already signed in, for embedding and tests.
    pub fn signed_in(identity: Identity) -> Self {
        Self {
            current: Arc::new(RwLock::new(Some(identity))),
        }
    }

    pub fn identity(&self) -> Option<Identity> {
        self.current.read().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.read().is_some()
    }

    /// The signed-in identity, or [`ExtractorError::Unauthenticated`].
    pub fn require(&self) -> Result<Identity> {
        self.identity().ok_or(ExtractorError::Unauthenticated)
    }

    fn set(&self, identity: Option<Identity>) {
        *self.current.write() = identity;
    }
}

/// What the gate reports to the front end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthStatus {
    pub authenticated: bool,
    pub identity: Option<Identity>,
}

/// Signs users in and out of a [`Session`].
pub struct AuthGate<V: CredentialVerifier> {
    verifier: V,
    session: Session,
}

impl<V: CredentialVerifier> AuthGate<V> {
    pub fn new(verifier: V) -> Self {
        Self {
            verifier,
            session: Session::new(),
        }
    }

    /// Handle to share with the workflow.
    pub fn session(&self) -> Session {
        self.session.clone()
    }

    pub fn status(&self) -> AuthStatus {
        let identity = self.session.identity();
        AuthStatus {
            authenticated: identity.is_some(),
            identity,
        }
    }

    /// Verify the credentials and, on success, sign the user in.
    ///
    /// A failed attempt leaves any existing session untouched.
    pub fn sign_in(&self, email: &str, secret: &str) -> Result<Identity> {
        match self.verifier.verify(email, secret) {
            Some(identity) => {
                tracing::info!(email = %identity.email, "Signed in");
                self.session.set(Some(identity.clone()));
                Ok(identity)
            }
            None => {
                tracing::debug!(email, "Sign-in rejected");
                Err(ExtractorError::InvalidCredentials)
            }
        }
    }

    pub fn sign_out(&self) {
        if let Some(identity) = self.session.identity() {
            tracing::info!(email = %identity.email, "Signed out");
        }
        self.session.set(None);
    }
}
