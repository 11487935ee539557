//! Credentials and the authenticated session snapshot.

use std::collections::HashMap;

use crate::error::ClientError;

/// Operator credentials. Supplied once, never persisted; logging must go
/// through [`Credentials::redacted`].
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Identifier with everything past the first two characters masked.
    pub fn redacted(&self) -> String {
        let shown: String = self.username.chars().take(2).collect();
        format!("{shown}****")
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.redacted())
            .field("password", &"****")
            .finish()
    }
}

/// Cookie snapshot taken once after a successful login.
///
/// Invalid once `logged_in` is false; the cookies must not be read or
/// reused past that point, which [`AuthenticatedSession::cookies`]
/// enforces.
#[derive(Debug, Clone)]
pub struct AuthenticatedSession {
    cookies: HashMap<String, String>,
    logged_in: bool,
}

impl AuthenticatedSession {
    /// Wraps a freshly captured cookie jar. Produced by a successful
    /// login; the snapshot is read-only from here on.
    pub fn from_cookies(cookies: HashMap<String, String>) -> Self {
        Self {
            cookies,
            logged_in: true,
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.logged_in
    }

    /// The cookie jar as captured at login.
    ///
    /// Hard precondition: the session must still be valid. Calling this
    /// on a never-logged-in or logged-out session is a usage error.
    pub fn cookies(&self) -> Result<&HashMap<String, String>, ClientError> {
        if !self.logged_in {
            return Err(ClientError::NotLoggedIn);
        }
        Ok(&self.cookies)
    }

    /// Cookie jar rendered as a `Cookie:` header value.
    pub fn cookie_header(&self) -> Result<String, ClientError> {
        let cookies = self.cookies()?;
        let mut pairs: Vec<String> = cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        pairs.sort();
        Ok(pairs.join("; "))
    }

    /// Marks the session invalid; the cookies are unreachable afterwards.
    pub fn invalidate(&mut self) {
        self.logged_in = false;
    }
}
