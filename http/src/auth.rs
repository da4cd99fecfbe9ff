use crate::Headers;

/// Parsed contents of an `Authorization` or `Proxy-Authorization` header.
///
/// For the `Basic` scheme, `user` and `password` hold the decoded
/// credentials; other schemes keep their raw `auth_string`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Auth {
    /// decoded user name (`Basic` only)
    pub user: String,
    /// decoded password (`Basic` only)
    pub password: String,
    /// authentication scheme token, e.g. `Basic`
    pub scheme: String,
    /// the raw credential string following the scheme
    pub auth_string: String,
    /// the `realm` parameter, when present
    pub realm: String,
    /// any remaining parameters
    pub parameters: Headers,
}

impl Auth {
    /// Whether any credential information was parsed.
    pub fn is_empty(&self) -> bool {
        self.scheme.is_empty()
    }
}

/// A single challenge for a `WWW-Authenticate` or `Proxy-Authenticate`
/// header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthChallenge {
    /// authentication scheme token, e.g. `Basic`
    pub scheme: String,
    /// the realm presented to the client, quoted on the wire
    pub realm: String,
    /// additional challenge parameters
    pub parameters: Headers,
}

impl AuthChallenge {
    /// A challenge for `scheme` with the given realm.
    pub fn new(scheme: impl Into<String>, realm: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            realm: realm.into(),
            parameters: Headers::new(),
        }
    }
}
