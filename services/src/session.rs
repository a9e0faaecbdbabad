//! Caller identity resolution.
//!
//! The external authentication layer is a single shared secret: a request
//! whose `sec_token` cookie matches the configured admin secret runs as the
//! admin identity, anything else runs as a guest. The extractor never
//! rejects — authorization failures are produced by the mutation guards,
//! not here.

use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::CookieJar;

use crate::config::Config;
use crate::store::Id;

/// Name of the cookie carrying the session token.
pub const KEY_SEC_TOKEN: &str = "sec_token";

/// Reserved id of the admin identity.
pub const ADMIN_ID: Id = 1;

/// Id of unauthenticated (guest) callers.
pub const GUEST_ID: Id = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: Id,
    pub name: String,
    pub is_admin: bool,
}

/// Request-scoped caller context. Cancellation rides on the request future:
/// dropping it aborts in-flight storage calls, so nothing extra is carried
/// here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub identity: Identity,
}

impl Session {
    pub fn guest() -> Self {
        Self {
            identity: Identity {
                id: GUEST_ID,
                name: String::new(),
                is_admin: false,
            },
        }
    }

    pub fn admin(name: impl Into<String>) -> Self {
        Self {
            identity: Identity {
                id: ADMIN_ID,
                name: name.into(),
                is_admin: true,
            },
        }
    }

    pub fn is_admin(&self) -> bool {
        self.identity.is_admin
    }
}

impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Config is injected via an Extension layer at router assembly.
        let Some(config) = parts.extensions.get::<Config>() else {
            return Ok(Session::guest());
        };

        let jar = CookieJar::from_headers(&parts.headers);
        match jar.get(KEY_SEC_TOKEN) {
            Some(cookie) if cookie.value() == config.admin_secret() => {
                Ok(Session::admin(config.admin_name()))
            }
            _ => Ok(Session::guest()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(request: Request<()>) -> Session {
        let (mut parts, ()) = request.into_parts();
        parts.extensions.insert(Config::new_for_test());
        Session::from_request_parts(&mut parts, &()).await.unwrap()
    }

    #[tokio::test]
    async fn matching_token_yields_admin() {
        let request = Request::builder()
            .header("cookie", "sec_token=admin")
            .body(())
            .unwrap();
        let session = extract(request).await;
        assert!(session.is_admin());
        assert_eq!(session.identity.id, ADMIN_ID);
        assert_eq!(session.identity.name, "admin");
    }

    #[tokio::test]
    async fn wrong_token_yields_guest() {
        let request = Request::builder()
            .header("cookie", "sec_token=nope")
            .body(())
            .unwrap();
        let session = extract(request).await;
        assert!(!session.is_admin());
        assert_eq!(session.identity.id, GUEST_ID);
    }

    #[tokio::test]
    async fn missing_cookie_yields_guest() {
        let request = Request::builder().body(()).unwrap();
        let session = extract(request).await;
        assert_eq!(session, Session::guest());
    }

    #[tokio::test]
    async fn missing_config_yields_guest() {
        let request = Request::builder()
            .header("cookie", "sec_token=admin")
            .body(())
            .unwrap();
        let (mut parts, ()) = request.into_parts();
        let session = Session::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(session, Session::guest());
    }
}
