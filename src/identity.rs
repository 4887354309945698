// client address and session cookie

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{Extensions, HeaderMap, header, request::Parts},
};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use uuid::Uuid;

use crate::state::AppState;

pub const UNKNOWN_IDENTITY: &str = "unknown";

pub const SESSION_COOKIE: &str = "relay_session";

pub fn client_identity(headers: &HeaderMap, extensions: &Extensions, trust_forwarded: bool) -> String {
    if trust_forwarded {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.split(',').next())
            .map(|s| s.trim())
            .filter(|s| !s.is_empty());
        if let Some(ip) = forwarded {
            return ip.to_string();
        }
    }

    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_IDENTITY.to_string())
}

// never rejects
pub struct ClientIdentity(pub String);

impl FromRequestParts<Arc<AppState>> for ClientIdentity {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        Ok(ClientIdentity(client_identity(
            &parts.headers,
            &parts.extensions,
            state.trust_forwarded_for,
        )))
    }
}

// only UUID values are accepted as session ids
pub fn session_cookie(headers: &HeaderMap) -> Option<String> {
    let prefix = format!("{}=", SESSION_COOKIE);
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .map(|s| s.trim())
        .find_map(|s| s.strip_prefix(&prefix))
        .and_then(|value| Uuid::parse_str(value).ok())
        .map(|id| id.to_string())
}

pub fn new_session_id() -> String {
    Uuid::new_v4().to_string()
}

pub fn session_set_cookie(session_id: &str) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax",
        SESSION_COOKIE, session_id
    )
}
