use axum_extra::extract::cookie::{Cookie, CookieJar};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};

/// One-shot user-facing messages, carried across a redirect in a short-lived cookie
/// and cleared on the next render. Base64-wrapped JSON keeps the value cookie-safe.
const FLASH_COOKIE: &str = "flash";

/// Severity of a flash message; the renderer maps it to a banner style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flash {
    pub level: Level,
    pub message: String,
}

/// set
///
/// Queues a message for the next rendered page. Only one message is carried at a time;
/// a later `set` before the next render wins.
pub fn set(jar: CookieJar, level: Level, message: &str) -> CookieJar {
    let flash = Flash {
        level,
        message: message.to_string(),
    };
    // Serializing a two-field struct cannot fail.
    let payload = serde_json::to_string(&flash).unwrap_or_default();
    let cookie = Cookie::build((FLASH_COOKIE, URL_SAFE_NO_PAD.encode(payload)))
        .path("/")
        .http_only(true)
        .build();
    jar.add(cookie)
}

/// take
///
/// Consumes the pending message, if any, returning the jar with the cookie removed.
/// An undecodable cookie is dropped silently; flash content is never load-bearing.
pub fn take(jar: CookieJar) -> (CookieJar, Option<Flash>) {
    let Some(cookie) = jar.get(FLASH_COOKIE) else {
        return (jar, None);
    };

    let flash = URL_SAFE_NO_PAD
        .decode(cookie.value())
        .ok()
        .and_then(|bytes| serde_json::from_slice::<Flash>(&bytes).ok());

    let mut removal = Cookie::from(FLASH_COOKIE);
    removal.set_path("/");
    (jar.remove(removal), flash)
}
