//! Cookie-backed session middleware.

use axum::{
    extract::{Request, State},
    http::{
        HeaderMap, HeaderValue,
        header::{COOKIE, SET_COOKIE},
    },
    middleware::Next,
    response::Response,
};
use tracing::{error, warn};

use crate::domain::session::Session;
use crate::state::AppState;
use crate::utils::token::{SESSION_ID_BYTES, generate_hex_token};

/// Attaches a [`Session`] to every request.
///
/// # Flow
///
/// 1. Read the session id from the session cookie
/// 2. Load its data from the session store, or start a fresh session when the
///    cookie is missing, malformed, or refers to an unknown/expired session
/// 3. Run the rest of the stack with the session in request extensions
/// 4. If the session data changed, save it; a fresh session also gets its cookie
///
/// Fresh sessions that are never written to are not persisted.
///
/// When the store cannot be read, the request proceeds without a session; the
/// CSRF guard then rejects state-changing requests with `500`.
///
/// # Example
///
/// ```rust,ignore
/// let app = middleware::from_fn_with_state(state.clone(), session::layer).layer(router);
/// ```
pub async fn layer(State(st): State<AppState>, mut req: Request, next: Next) -> Response {
    let session = match session_id_from_cookies(req.headers(), &st.settings.session_cookie) {
        Some(id) => match st.session_store.load(&id).await {
            Ok(Some(data)) => Some(Session::existing(id, data)),
            Ok(None) => Some(new_session()),
            Err(e) => {
                error!(error = %e, "failed to load session");
                None
            }
        },
        None => Some(new_session()),
    };

    let Some(session) = session else {
        return next.run(req).await;
    };

    let before = session.snapshot();
    req.extensions_mut().insert(session.clone());

    let mut response = next.run(req).await;

    let after = session.snapshot();
    if after == before {
        return response;
    }

    if let Err(e) = st.session_store.save(session.id(), &after).await {
        warn!(error = %e, "failed to save session");
        return response;
    }

    if session.is_new() {
        let cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            st.settings.session_cookie,
            session.id(),
            st.settings.session_ttl_seconds
        );
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().append(SET_COOKIE, value);
        }
    }

    response
}

fn new_session() -> Session {
    Session::fresh(generate_hex_token(SESSION_ID_BYTES))
}

/// Finds the session id cookie. Values that could not have been issued by
/// this service are ignored so they never reach the store as keys.
fn session_id_from_cookies(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|cookie_str| cookie_str.split(';'))
        .find_map(|cookie| {
            let mut parts = cookie.trim().splitn(2, '=');
            match (parts.next(), parts.next()) {
                (Some(name), Some(value)) if name == cookie_name => Some(value.to_string()),
                _ => None,
            }
        })
        .filter(|id| is_session_id(id))
}

fn is_session_id(value: &str) -> bool {
    value.len() == SESSION_ID_BYTES * 2 && value.bytes().all(|b| b.is_ascii_hexdigit())
}
