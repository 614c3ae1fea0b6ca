use std::fmt;

use serde::{Deserialize, Serialize};

/// Authentication scheme declared for a client or destination.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AuthType {
    Basic,
    OAuth,
    Certificate,
}

impl fmt::Display for AuthType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Basic => "basic",
            Self::OAuth => "oauth",
            Self::Certificate => "certificate",
        };
        f.write_str(name)
    }
}

/// Rendered `Authorization` header value such as `Basic ...` or `Bearer ...`.
///
/// `Debug` only shows the scheme so the credential never ends up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthorizationHeader(String);

impl AuthorizationHeader {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn basic(encoded: &str) -> Self {
        Self(format!("Basic {encoded}"))
    }

    pub fn bearer(token: &str) -> Self {
        Self(format!("Bearer {token}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The scheme part (`Basic`, `Bearer`, ...).
    pub fn scheme(&self) -> &str {
        self.0.split_whitespace().next().unwrap_or_default()
    }
}

impl fmt::Debug for AuthorizationHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AuthorizationHeader({} ***)", self.scheme())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_hides_credential() {
        let header = AuthorizationHeader::bearer("super-secret-token");
        let rendered = format!("{header:?}");
        assert_eq!(rendered, "AuthorizationHeader(Bearer ***)");
        assert_eq!(header.as_str(), "Bearer super-secret-token");
    }
}
