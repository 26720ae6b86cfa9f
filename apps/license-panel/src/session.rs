// Admin sessions
// Signed cookie carries an opaque token; the token maps to an AdminSession held in memory.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
    response::Redirect,
};
use axum_extra::extract::cookie::{Cookie, Key, SameSite, SignedCookieJar};
use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha512};
use tokio::sync::RwLock;
use tracing::debug;

pub const SESSION_COOKIE: &str = "admin_session";
pub const SESSION_TTL_HOURS: i64 = 24;
pub const LOGIN_PATH: &str = "/login";

/// Authenticated admin context, extracted per request.
#[derive(Debug, Clone)]
pub struct AdminSession {
    pub username: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl AdminSession {
    fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, AdminSession>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self, username: &str) -> AdminSession {
        let now = Utc::now();
        let session = AdminSession {
            username: username.to_string(),
            token: uuid::Uuid::new_v4().to_string(),
            expires_at: now + Duration::hours(SESSION_TTL_HOURS),
        };

        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, s| !s.is_expired_at(now));
        sessions.insert(session.token.clone(), session.clone());
        session
    }

    /// Live session for `token`; an expired one is dropped on the way.
    pub async fn get(&self, token: &str) -> Option<AdminSession> {
        let now = Utc::now();
        {
            let sessions = self.sessions.read().await;
            match sessions.get(token) {
                Some(session) if !session.is_expired_at(now) => return Some(session.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        debug!("Dropping expired session {}...", token.chars().take(6).collect::<String>());
        self.sessions.write().await.remove(token);
        None
    }

    pub async fn remove(&self, token: &str) -> bool {
        self.sessions.write().await.remove(token).is_some()
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    #[cfg(test)]
    async fn insert(&self, session: AdminSession) {
        self.sessions.write().await.insert(session.token.clone(), session);
    }
}

/// Cookie signing key derived from the configured secret.
pub fn cookie_key(secret: &str) -> Key {
    Key::from(Sha512::digest(secret.as_bytes()).as_slice())
}

pub fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::hours(SESSION_TTL_HOURS))
        .build()
}

pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, "")).path("/").build()
}

impl<S> FromRequestParts<S> for AdminSession
where
    S: Send + Sync,
    Key: FromRef<S>,
    SessionStore: FromRef<S>,
{
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let jar = match SignedCookieJar::<Key>::from_request_parts(parts, state).await {
            Ok(jar) => jar,
            Err(never) => match never {},
        };

        let token = jar
            .get(SESSION_COOKIE)
            .map(|cookie| cookie.value().to_string())
            .ok_or_else(|| Redirect::to(LOGIN_PATH))?;

        SessionStore::from_ref(state)
            .get(&token)
            .await
            .ok_or_else(|| Redirect::to(LOGIN_PATH))
    }
}
