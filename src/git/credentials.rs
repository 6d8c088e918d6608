//! git::credentials
//!
//! Credential provider for remote transport authentication.
//!
//! The remote side authenticates every fetch and push with a
//! (principal, secret) pair, in practice a username and an OAuth token
//! used in place of a password. A [`Credentials`] value is injected once
//! per repository handle before any network call and answers every
//! credential callback for that handle.

/// A (principal, secret) pair used for remote authentication.
///
/// The secret is typically an OAuth bearer token rather than a real
/// password; the transport treats them identically.
#[derive(Clone)]
pub struct Credentials {
    username: String,
    secret: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Create credentials from a principal and its secret.
    pub fn new(username: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            secret: secret.into(),
        }
    }

    /// The principal these credentials authenticate.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Build remote callbacks that answer every credential request with
    /// this userpass pair.
    pub(crate) fn callbacks(&self) -> git2::RemoteCallbacks<'static> {
        let username = self.username.clone();
        let secret = self.secret.clone();

        let mut callbacks = git2::RemoteCallbacks::new();
        callbacks.credentials(move |_url, _username_from_url, _allowed| {
            git2::Cred::userpass_plaintext(&username, &secret)
        });
        callbacks
    }
}
