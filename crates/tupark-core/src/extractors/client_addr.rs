use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{request::Parts, HeaderMap},
};

use crate::auth::Identity;
use crate::config::Config;
use crate::error::TuparkError;

/// The requesting client's address, used as the login-attempt key and as the
/// source recorded in the audit trail.
///
/// Taken from the TCP peer. `X-Forwarded-For` / `X-Real-IP` are only consulted
/// when `TRUST_PROXY_HEADERS` is enabled; otherwise a client could pick a
/// fresh key for every attempt.
#[derive(Debug, Clone)]
pub struct ClientAddr(pub Identity);

impl<S> FromRequestParts<S> for ClientAddr
where
    S: Send + Sync,
{
    type Rejection = TuparkError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let trust_proxy = parts
            .extensions
            .get::<Arc<Config>>()
            .map(|config| config.security.trust_proxy_headers)
            .unwrap_or(false);

        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        resolve(&parts.headers, peer, trust_proxy).map(ClientAddr)
    }
}

/// Pick the client identity from the peer address and, if trusted, proxy headers.
pub fn resolve(
    headers: &HeaderMap,
    peer: Option<IpAddr>,
    trust_proxy: bool,
) -> Result<Identity, TuparkError> {
    if trust_proxy {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .or_else(|| {
                headers
                    .get("x-real-ip")
                    .and_then(|v| v.to_str().ok())
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
            });

        if let Some(raw) = forwarded {
            return match raw.parse::<IpAddr>() {
                Ok(ip) => Ok(Identity::from(ip)),
                Err(_) => Identity::parse(raw),
            };
        }
    }

    peer.map(Identity::from).ok_or_else(|| {
        TuparkError::InvalidIdentity("Unable to determine client address".to_string())
    })
}
