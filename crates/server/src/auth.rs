//! Bearer-token authentication against an external identity provider.
//!
//! The server never stores credentials. Each request's token is resolved to
//! an identity (an id and an email) through the configured provider, and the
//! email is then checked against the administrator allow-list. Any failure to
//! resolve the token, network errors included, denies the request.

use std::collections::{HashMap, HashSet};

use serde::Deserialize;

/// A resolved identity: who the bearer token belongs to.
#[derive(Clone, Debug, Deserialize)]
pub struct Identity {
    #[serde(rename = "sub")]
    pub id: String,
    pub email: String,
}

/// Where tokens get resolved.
///
/// `Http` calls an OIDC-style userinfo endpoint with the token. `Static` is
/// a fixed token table, used by tests and single-box deployments.
pub enum IdentityProvider {
    Http {
        client: reqwest::Client,
        userinfo_url: String,
    },
    Static(HashMap<String, Identity>),
}

impl IdentityProvider {
    pub fn http(userinfo_url: impl Into<String>) -> Self {
        Self::Http {
            client: reqwest::Client::new(),
            userinfo_url: userinfo_url.into(),
        }
    }

    pub fn fixed(tokens: HashMap<String, Identity>) -> Self {
        Self::Static(tokens)
    }

    /// Resolve a bearer token, failing closed: any provider error is `None`.
    pub async fn resolve(&self, token: &str) -> Option<Identity> {
        match self {
            Self::Http {
                client,
                userinfo_url,
            } => {
                let response = client
                    .get(userinfo_url)
                    .bearer_auth(token)
                    .send()
                    .await
                    .inspect_err(|err| tracing::warn!("identity provider unreachable: {err}"))
                    .ok()?;
                if !response.status().is_success() {
                    return None;
                }
                response
                    .json::<Identity>()
                    .await
                    .inspect_err(|err| tracing::warn!("malformed userinfo response: {err}"))
                    .ok()
            }
            Self::Static(tokens) => tokens.get(token).cloned(),
        }
    }
}

/// Administrator allow-list, matched on lowercased emails.
pub struct AdminList {
    emails: HashSet<String>,
}

impl AdminList {
    pub fn new(emails: impl IntoIterator<Item = String>) -> Self {
        Self {
            emails: emails.into_iter().map(|e| e.to_lowercase()).collect(),
        }
    }

    pub fn contains(&self, email: &str) -> bool {
        self.emails.contains(&email.to_lowercase())
    }
}

/// The provider and allow-list bundled as one request gate.
pub struct AuthGate {
    pub provider: IdentityProvider,
    pub admins: AdminList,
}

impl AuthGate {
    pub async fn authenticate(&self, token: &str) -> Option<AuthUser> {
        let identity = self.provider.resolve(token).await?;
        let admin = self.admins.contains(&identity.email);
        Some(AuthUser {
            id: identity.id,
            email: identity.email,
            admin,
        })
    }
}

/// The authenticated caller, stored as a request extension.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    pub admin: bool,
}

impl AuthUser {
    pub fn actor(&self) -> engine::Actor {
        if self.admin {
            engine::Actor::admin(self.id.clone())
        } else {
            engine::Actor::user(self.id.clone())
        }
    }
}
