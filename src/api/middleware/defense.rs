//! HTTP adapter for the [`DefensePipeline`](crate::application::services::DefensePipeline).
//!
//! Decodes the request into an [`InboundRequest`], runs the pipeline, then writes
//! the sanitized path, query and body back before handing the request on.
//!
//! This middleware must wrap the router itself (not be added with
//! `Router::layer`), so that routing and path extraction see the rewritten URI.

use axum::{
    body::{Body, Bytes, to_bytes},
    extract::{Request, State},
    http::{
        HeaderMap, HeaderValue, Uri,
        header::{CONTENT_LENGTH, CONTENT_TYPE},
        request::Parts,
        uri::PathAndQuery,
    },
    middleware::Next,
    response::Response,
};
use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};
use std::borrow::Cow;
use tracing::warn;
use url::form_urlencoded;

use super::rate_limit::{apply_headers, request_identity};
use crate::application::services::{InboundRequest, Payload};
use crate::domain::session::Session;
use crate::error::AppError;
use crate::state::AppState;

/// Characters escaped when a sanitized path segment is written back.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Json,
    Form,
    Other,
}

/// Runs sanitization, CSRF verification and rate limiting, in that order.
///
/// # Rejections
///
/// - `413` when a JSON or form body exceeds `MAX_BODY_BYTES`
/// - `500` when a state-changing request has no session
/// - `403` on a missing or wrong CSRF token
/// - `429` when the client's window is spent
///
/// Admitted responses carry `X-RateLimit-Limit`, `X-RateLimit-Remaining` and
/// `X-RateLimit-Reset` unless the counter store was unavailable.
///
/// # Example
///
/// ```rust,ignore
/// let app = middleware::from_fn_with_state(state.clone(), defense::layer).layer(router);
/// ```
pub async fn layer(
    State(st): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let identity = request_identity(&req, st.settings.behind_proxy);
    let session = req.extensions().get::<Session>().cloned();

    let (mut parts, body) = req.into_parts();

    let kind = body_kind(&parts.headers);
    let (payload, buffered, untouched) = match kind {
        BodyKind::Other => (Payload::Opaque, None, Some(body)),
        BodyKind::Json | BodyKind::Form => {
            let limit = st.settings.max_body_bytes;
            let bytes = to_bytes(body, limit)
                .await
                .map_err(|_| AppError::PayloadTooLarge { limit })?;
            (decode_payload(kind, &bytes), Some(bytes), None)
        }
    };

    let raw_segments: Vec<String> = parts.uri.path().split('/').map(str::to_string).collect();
    let decoded_segments: Vec<String> = raw_segments
        .iter()
        .map(|s| percent_decode_str(s).decode_utf8_lossy().into_owned())
        .collect();
    let query: Vec<(String, String)> = parts
        .uri
        .query()
        .map(|q| form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default();

    let mut inbound = InboundRequest {
        method: parts.method.clone(),
        headers: std::mem::take(&mut parts.headers),
        path_segments: decoded_segments.clone(),
        query: query.clone(),
        payload,
    };

    let result = st
        .pipeline
        .process(&mut inbound, session.as_ref(), &identity)
        .await;
    parts.headers = std::mem::take(&mut inbound.headers);

    let decision = result.inspect_err(|e| {
        metrics::counter!("defense_rejections_total", "reason" => e.reason()).increment(1);
        warn!(
            method = %parts.method,
            path = %parts.uri.path(),
            identity = %identity,
            reason = e.reason(),
            "request rejected"
        );
    })?;

    rewrite_uri(&mut parts, &raw_segments, &decoded_segments, &query, &inbound)?;

    let body = match untouched {
        Some(body) => body,
        None => encode_payload(&mut parts, inbound.payload, buffered.unwrap_or_default())?,
    };

    let mut response = next.run(Request::from_parts(parts, body)).await;
    apply_headers(response.headers_mut(), &decision);
    Ok(response)
}

fn body_kind(headers: &HeaderMap) -> BodyKind {
    let Some(content_type) = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()) else {
        return BodyKind::Other;
    };

    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    if mime == "application/json" || mime.ends_with("+json") {
        BodyKind::Json
    } else if mime == "application/x-www-form-urlencoded" {
        BodyKind::Form
    } else {
        BodyKind::Other
    }
}

/// Invalid JSON is left opaque so the handler's extractor reports the error.
fn decode_payload(kind: BodyKind, bytes: &Bytes) -> Payload {
    match kind {
        BodyKind::Json if bytes.is_empty() => Payload::Opaque,
        BodyKind::Json => serde_json::from_slice(bytes)
            .map(Payload::Json)
            .unwrap_or(Payload::Opaque),
        BodyKind::Form => Payload::Form(form_urlencoded::parse(bytes).into_owned().collect()),
        BodyKind::Other => Payload::Opaque,
    }
}

fn encode_payload(parts: &mut Parts, payload: Payload, original: Bytes) -> Result<Body, AppError> {
    let bytes = match payload {
        Payload::Json(value) => Bytes::from(
            serde_json::to_vec(&value)
                .map_err(|e| AppError::internal(format!("Failed to re-encode body: {}", e)))?,
        ),
        Payload::Form(pairs) => Bytes::from(
            form_urlencoded::Serializer::new(String::new())
                .extend_pairs(pairs)
                .finish(),
        ),
        Payload::Opaque => original,
    };

    parts
        .headers
        .insert(CONTENT_LENGTH, HeaderValue::from(bytes.len()));

    Ok(Body::from(bytes))
}

/// Writes sanitized segments and query pairs back to the URI.
///
/// Untouched segments keep their original encoding, and the query string is
/// only re-serialized when a value changed.
fn rewrite_uri(
    parts: &mut Parts,
    raw_segments: &[String],
    decoded_segments: &[String],
    query: &[(String, String)],
    inbound: &InboundRequest,
) -> Result<(), AppError> {
    let path_changed = inbound.path_segments.as_slice() != decoded_segments;
    let query_changed = inbound.query.as_slice() != query;

    if !path_changed && !query_changed {
        return Ok(());
    }

    let path = raw_segments
        .iter()
        .zip(decoded_segments)
        .zip(&inbound.path_segments)
        .map(|((raw, before), after)| {
            if before == after {
                Cow::Borrowed(raw.as_str())
            } else {
                Cow::Owned(utf8_percent_encode(after, PATH_SEGMENT).to_string())
            }
        })
        .collect::<Vec<_>>()
        .join("/");

    let query_string = if query_changed {
        Some(
            form_urlencoded::Serializer::new(String::new())
                .extend_pairs(&inbound.query)
                .finish(),
        )
    } else {
        parts.uri.query().map(str::to_string)
    };

    let path_and_query = match query_string {
        Some(q) => format!("{}?{}", path, q),
        None => path,
    };

    let mut uri_parts = parts.uri.clone().into_parts();
    uri_parts.path_and_query = Some(
        PathAndQuery::try_from(path_and_query)
            .map_err(|e| AppError::internal(format!("Failed to rewrite URI: {}", e)))?,
    );
    parts.uri = Uri::from_parts(uri_parts)
        .map_err(|e| AppError::internal(format!("Failed to rewrite URI: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parts_for(uri: &str) -> Parts {
        let (parts, _) = axum::http::Request::builder()
            .uri(uri)
            .body(Body::empty())
            .unwrap()
            .into_parts();
        parts
    }

    #[test]
    fn test_body_kind() {
        let mut headers = HeaderMap::new();
        assert_eq!(body_kind(&headers), BodyKind::Other);

        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=utf-8"),
        );
        assert_eq!(body_kind(&headers), BodyKind::Json);

        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/merge-patch+json"),
        );
        assert_eq!(body_kind(&headers), BodyKind::Json);

        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        assert_eq!(body_kind(&headers), BodyKind::Form);

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        assert_eq!(body_kind(&headers), BodyKind::Other);
    }

    #[test]
    fn test_invalid_json_stays_opaque() {
        let payload = decode_payload(BodyKind::Json, &Bytes::from_static(b"{not json"));
        assert_eq!(payload, Payload::Opaque);
    }

    #[test]
    fn test_form_decoding() {
        let payload = decode_payload(BodyKind::Form, &Bytes::from_static(b"a=1&b=%3Cb%3E"));
        assert_eq!(
            payload,
            Payload::Form(vec![
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "<b>".to_string()),
            ])
        );
    }

    #[test]
    fn test_encode_payload_updates_length() {
        let mut parts = parts_for("/x");
        let body = encode_payload(
            &mut parts,
            Payload::Json(json!({"a": "&lt;b&gt;"})),
            Bytes::new(),
        )
        .unwrap();

        assert_eq!(parts.headers[CONTENT_LENGTH], "17");
        drop(body);
    }

    #[test]
    fn test_rewrite_uri_changed_segment_and_query() {
        let mut parts = parts_for("/api/items/%3Cb%3Ex%3C%2Fb%3E?keep=a%20b&q=%3Ci%3E");
        let raw: Vec<String> = parts.uri.path().split('/').map(str::to_string).collect();
        let decoded: Vec<String> = raw
            .iter()
            .map(|s| percent_decode_str(s).decode_utf8_lossy().into_owned())
            .collect();
        let query: Vec<(String, String)> =
            form_urlencoded::parse(parts.uri.query().unwrap().as_bytes())
                .into_owned()
                .collect();

        let mut inbound = InboundRequest {
            method: parts.method.clone(),
            headers: HeaderMap::new(),
            path_segments: decoded.clone(),
            query: query.clone(),
            payload: Payload::Opaque,
        };
        inbound.sanitize();

        rewrite_uri(&mut parts, &raw, &decoded, &query, &inbound).unwrap();

        assert_eq!(parts.uri.path(), "/api/items/&lt;b&gt;x&lt;%2Fb&gt;");
        assert_eq!(parts.uri.query(), Some("keep=a+b&q=%26lt%3Bi%26gt%3B"));
    }

    #[test]
    fn test_rewrite_uri_untouched() {
        let mut parts = parts_for("/api/csrf-token?x=%20y");
        let raw: Vec<String> = parts.uri.path().split('/').map(str::to_string).collect();
        let decoded = raw.clone();
        let query = vec![("x".to_string(), " y".to_string())];
        let inbound = InboundRequest {
            method: parts.method.clone(),
            headers: HeaderMap::new(),
            path_segments: decoded.clone(),
            query: query.clone(),
            payload: Payload::Opaque,
        };

        rewrite_uri(&mut parts, &raw, &decoded, &query, &inbound).unwrap();

        assert_eq!(parts.uri, "/api/csrf-token?x=%20y");
    }
}
