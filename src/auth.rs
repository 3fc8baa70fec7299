use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, request::Parts},
    response::Redirect,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;

/// Name of the cookie carrying the signed session token.
pub const SESSION_COOKIE: &str = "session";

/// Session lifetime baked into the signed token; a token past this window is treated
/// as absent and the browser is simply asked to sign in again.
const SESSION_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// SessionClaims
///
/// The payload signed into the session cookie. The two authentication facts are
/// independent: a browser may hold a user identity, the admin flag, both, or neither,
/// and logging one role out leaves the other untouched.
#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    /// The authenticated user's id, when a user session is established.
    sub: Option<i64>,
    /// The authenticated user's username, carried for display without a DB round trip.
    username: Option<String>,
    /// The administrator fact.
    admin: bool,
    /// Issued At timestamp.
    iat: i64,
    /// Expiration timestamp; tokens past this are treated as absent.
    exp: i64,
}

/// UserIdentity
///
/// The resolved identity of an authenticated regular user. Protocol authorship is
/// always bound to this id, never to anything client-supplied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    pub id: i64,
    pub username: String,
}

/// SessionContext
///
/// The request-scoped Session/Identity Guard state. Decoded once per request from the
/// session cookie and threaded explicitly through workflow calls — there is no ambient
/// mutable session. A missing, malformed, or expired cookie yields the anonymous
/// context rather than an error; denial is a control-flow branch, not an exception.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    pub user: Option<UserIdentity>,
    pub is_admin: bool,
}

impl SessionContext {
    /// Decodes the session context from request headers. Infallible by design: every
    /// failure mode degrades to the anonymous context.
    pub fn from_headers(headers: &HeaderMap, config: &AppConfig) -> Self {
        let jar = CookieJar::from_headers(headers);
        let Some(cookie) = jar.get(SESSION_COOKIE) else {
            return Self::default();
        };

        let key = DecodingKey::from_secret(config.secret_key.as_bytes());
        let mut validation = Validation::default();
        validation.validate_exp = true;

        match decode::<SessionClaims>(cookie.value(), &key, &validation) {
            Ok(data) => {
                let claims = data.claims;
                let user = match (claims.sub, claims.username) {
                    (Some(id), Some(username)) => Some(UserIdentity { id, username }),
                    _ => None,
                };
                Self {
                    user,
                    is_admin: claims.admin,
                }
            }
            Err(err) => {
                // A stale or tampered cookie is a normal occurrence, not an incident.
                tracing::debug!("discarding invalid session cookie: {err}");
                Self::default()
            }
        }
    }

    // --- Guard mutations ---

    pub fn login_user(&mut self, id: i64, username: &str) {
        self.user = Some(UserIdentity {
            id,
            username: username.to_string(),
        });
    }

    pub fn logout_user(&mut self) {
        self.user = None;
    }

    pub fn login_admin(&mut self) {
        self.is_admin = true;
    }

    pub fn logout_admin(&mut self) {
        self.is_admin = false;
    }

    /// write
    ///
    /// Persists the (possibly mutated) context back into the cookie jar. A fully
    /// anonymous context removes the cookie instead of signing an empty token.
    pub fn write(
        &self,
        jar: CookieJar,
        config: &AppConfig,
    ) -> Result<CookieJar, jsonwebtoken::errors::Error> {
        if self.user.is_none() && !self.is_admin {
            let mut removal = Cookie::from(SESSION_COOKIE);
            removal.set_path("/");
            return Ok(jar.remove(removal));
        }

        let now = Utc::now().timestamp();
        let claims = SessionClaims {
            sub: self.user.as_ref().map(|u| u.id),
            username: self.user.as_ref().map(|u| u.username.clone()),
            admin: self.is_admin,
            iat: now,
            exp: now + SESSION_TTL_SECS,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.secret_key.as_bytes()),
        )?;

        let cookie = Cookie::build((SESSION_COOKIE, token))
            .path("/")
            .http_only(true)
            .build();
        Ok(jar.add(cookie))
    }
}

/// SessionContext Extractor
///
/// Makes the guard state available to any handler as a plain argument. Extraction
/// never rejects; handlers that need a *privileged* context use the `RequireUser` /
/// `RequireAdmin` guards below instead.
impl<S> FromRequestParts<S> for SessionContext
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AppConfig::from_ref(state);
        Ok(SessionContext::from_headers(&parts.headers, &config))
    }
}

/// RequireUser
///
/// Guard extractor for the regular-user role. A handler taking `RequireUser` can only
/// run with an established user identity; otherwise the request is answered with a
/// redirect to the user login view — never a 401/403 body.
#[derive(Debug, Clone)]
pub struct RequireUser(pub UserIdentity);

impl<S> FromRequestParts<S> for RequireUser
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AppConfig::from_ref(state);
        match SessionContext::from_headers(&parts.headers, &config).user {
            Some(identity) => Ok(RequireUser(identity)),
            None => Err(Redirect::to("/user/login")),
        }
    }
}

/// RequireAdmin
///
/// Guard extractor for the administrator role. Denial redirects to the admin login
/// view. The admin fact is independent of any user identity in the same session.
#[derive(Debug, Clone, Copy)]
pub struct RequireAdmin;

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AppConfig::from_ref(state);
        if SessionContext::from_headers(&parts.headers, &config).is_admin {
            Ok(RequireAdmin)
        } else {
            Err(Redirect::to("/admin/login"))
        }
    }
}

/// verify_password
///
/// The single credential-comparison point in the codebase. Passwords are currently
/// stored in clear text; keeping the comparison behind this function means hashing
/// can be introduced here without touching any login workflow.
pub fn verify_password(stored: &str, supplied: &str) -> bool {
    stored == supplied
}
