//! Dispatch pipeline: the per-request state machine.
//!
//! # Data Flow
//! ```text
//! Incoming request
//!     → session resolution (cookie → store.get, never errors)
//!     → CORS (preflight short-circuit / method check)
//!     → route resolution
//!     → authorization (before any body parsing)
//!     → request parsing (per-route mode)
//!     → handler invocation (bounded by timeout)
//!     → response formation (JSON envelope or passthrough)
//!     → error translation (recognized errors unmodified, rest → 500)
//!     → session finalization (unconditional: remove / persist / no-op)
//!     → CORS headers merged onto whatever came out
//! ```
//!
//! # Design Decisions
//! - Finalization is a mandatory step, not best-effort: every path through
//!   the pipeline, error paths included, reaches it
//! - A failed removal of the request's session overrides any prior
//!   success with 401; removing a nonexistent session is suspicious
//! - Preflights are answered before the method check so OPTIONS works
//!   even against rules that do not list it

use std::time::Instant;

use axum::body::Body;
use axum::http::header::{HeaderValue, ALLOW, COOKIE, SET_COOKIE};
use axum::http::request::Parts;
use axum::http::{HeaderMap, Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::Cookie;
use uuid::Uuid;

use crate::app::AppState;
use crate::cors::{CorsRule, PREFLIGHT_FALLBACK_ALLOW};
use crate::error::HttpError;
use crate::observability::metrics;
use crate::request::{parse_request, RequestContext};
use crate::routing::Reply;
use crate::session::SessionHandle;

/// Turn one transport request into a response, running the full state
/// machine. Never panics a worker: everything unrecognized is translated.
pub(crate) async fn dispatch(state: AppState, request: Request<Body>) -> Response {
    let request_id = Uuid::new_v4();
    let started = Instant::now();
    let (parts, body) = request.into_parts();
    let method = parts.method.clone();
    let path = parts.uri.path().to_string();

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %path,
        "Dispatching request"
    );

    // 1. Session resolution. Absence of a cookie yields an unsaved
    // session, never an error.
    let session_id = session_cookie_value(&parts.headers, &state.cookie_name);
    let session = SessionHandle::new(state.sessions.get(session_id.as_deref()).await);

    // 2. CORS. Preflights short-circuit the rest of the machine.
    let cors_rule = state.cors.find_rule(&path);
    let outcome = if method == Method::OPTIONS {
        Ok(preflight_response(cors_rule))
    } else if cors_rule.is_some_and(|rule| !rule.method_allowed(&method)) {
        Err(HttpError::MethodNotAllowed {
            method: method.to_string(),
        })
    } else {
        // 3–6. Route, authorize, parse, invoke, form.
        run_route(&state, parts, body, &session).await
    };

    // 7. Error translation.
    let mut response = match outcome {
        Ok(response) => response,
        Err(error) => {
            if matches!(error, HttpError::Internal(_)) {
                tracing::error!(request_id = %request_id, error = %error, "Request failed");
            } else {
                tracing::debug!(request_id = %request_id, error = %error, "Request rejected");
            }
            error.into_response_with(state.expose_internal_errors)
        }
    };

    // 8. Session finalization, unconditional. A failure here replaces the
    // response: a success report with an unpersisted session would lie.
    if let Err(error) = finalize_session(&state, &session, &mut response).await {
        tracing::warn!(request_id = %request_id, error = %error, "Session finalization failed");
        response = error.into_response_with(state.expose_internal_errors);
    }

    // Policy headers ride on every response for matched paths.
    if let Some(rule) = cors_rule {
        merge_headers(response.headers_mut(), rule.policy_headers());
    }

    metrics::record_request(method.as_str(), response.status().as_u16(), started);
    tracing::debug!(
        request_id = %request_id,
        status = %response.status(),
        "Request complete"
    );
    response
}

/// Steps 3–6 for a non-preflight request.
async fn run_route(
    state: &AppState,
    parts: Parts,
    body: Body,
    session: &SessionHandle,
) -> Result<Response, HttpError> {
    let route = state
        .registry
        .resolve(&parts.method, parts.uri.path())
        .ok_or(HttpError::NotFound)?;

    // 3. Authorization, strictly before parsing: no parse work for
    // requests that will be rejected anyway.
    if let Some(auth) = &route.auth {
        let user = session
            .user()
            .ok_or_else(|| HttpError::Unauthorized("Unauthorized".into()))?;
        if !auth.permits(user.roles()) {
            return Err(HttpError::PermissionDenied);
        }
    }

    // 4. Parsing.
    let (data, raw_body) = parse_request(route.parse_mode, &parts, body).await?;

    // 5. Handler invocation, bounded so a hung handler cannot starve the
    // worker.
    let ctx = RequestContext {
        data,
        session: session.clone(),
        head: parts,
        raw_body,
    };
    let reply = match tokio::time::timeout(state.handler_timeout, (route.handler)(ctx)).await {
        Ok(result) => result?,
        Err(_) => {
            return Err(HttpError::Internal(format!(
                "handler for {} timed out",
                route.path
            )))
        }
    };

    // 6. Response formation.
    Ok(form_response(reply))
}

fn form_response(reply: Reply) -> Response {
    match reply {
        Reply::Raw(response) => response,
        Reply::Json(value) => (StatusCode::OK, axum::Json(value)).into_response(),
    }
}

/// Empty preflight answer: `Allow` lists the rule's methods in declared
/// order, or the fixed default when no rule matches. No auth, no handler,
/// no session mutation.
fn preflight_response(rule: Option<&CorsRule>) -> Response {
    let allow = rule
        .map(|r| r.allow_header_value().clone())
        .unwrap_or_else(|| HeaderValue::from_static(PREFLIGHT_FALLBACK_ALLOW));
    let mut response = StatusCode::OK.into_response();
    response.headers_mut().insert(ALLOW, allow);
    response
}

/// Step 8. Removal wins over persistence; a removal of something the
/// store never had escalates to 401 with no cookie touched.
async fn finalize_session(
    state: &AppState,
    handle: &SessionHandle,
    response: &mut Response,
) -> Result<(), HttpError> {
    let mut session = handle.snapshot();

    if session.pending_removal() {
        let found = state.sessions.remove(&session).await?;
        if !found {
            return Err(HttpError::Unauthorized("Session does not found".into()));
        }
        let cookie = Cookie::build((state.cookie_name.clone(), ""))
            .path("/")
            .http_only(true)
            .max_age(time::Duration::ZERO)
            .build();
        append_cookie(response.headers_mut(), &cookie);
    } else if session.is_dirty() {
        state.sessions.set(&mut session).await?;
        if let Some(id) = session.id() {
            let cookie = Cookie::build((state.cookie_name.clone(), id.to_string()))
                .path("/")
                .http_only(true)
                .build();
            append_cookie(response.headers_mut(), &cookie);
        }
        handle.replace(session);
    }

    Ok(())
}

fn session_cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = headers.get(COOKIE)?.to_str().ok()?;
    Cookie::split_parse(raw)
        .flatten()
        .find(|cookie| cookie.name() == name)
        .map(|cookie| cookie.value().to_string())
}

fn append_cookie(headers: &mut HeaderMap, cookie: &Cookie<'_>) {
    match HeaderValue::from_str(&cookie.to_string()) {
        Ok(value) => {
            headers.append(SET_COOKIE, value);
        }
        // Cookie names are validated at config load; ids are alphanumeric.
        Err(_) => tracing::error!(cookie = %cookie.name(), "Unencodable Set-Cookie dropped"),
    }
}

fn merge_headers(headers: &mut HeaderMap, policy: &HeaderMap) {
    for (name, value) in policy {
        headers.insert(name.clone(), value.clone());
    }
}
