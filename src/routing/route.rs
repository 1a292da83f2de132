//! Route descriptors and handler plumbing.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use axum::http::{Method, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use serde_json::Value;

use crate::auth::Authorization;
use crate::error::HttpError;
use crate::request::{ParseMode, RequestContext};

/// What a handler hands back to the pipeline.
pub enum Reply {
    /// Serialized as a JSON body with the matching content type.
    Json(Value),
    /// A fully-formed response, passed through untouched.
    Raw(Response),
}

impl Reply {
    pub fn json(value: impl Into<Value>) -> Self {
        Reply::Json(value.into())
    }

    /// An empty 200.
    pub fn empty() -> Self {
        Reply::Raw(StatusCode::OK.into_response())
    }

    pub fn html(body: impl Into<String>) -> Self {
        Reply::Raw(Html(body.into()).into_response())
    }
}

impl From<Value> for Reply {
    fn from(value: Value) -> Self {
        Reply::Json(value)
    }
}

impl From<Response> for Reply {
    fn from(response: Response) -> Self {
        Reply::Raw(response)
    }
}

pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<Reply, HttpError>> + Send>>;

/// Uniform handler interface: normalized request context in, reply or
/// recognized error out.
pub type Handler = Arc<dyn Fn(RequestContext) -> HandlerFuture + Send + Sync>;

/// A (method, path) pair bound to a handler and its access metadata.
/// Created once at service registration; immutable thereafter.
#[derive(Clone)]
pub struct Route {
    pub method: Method,
    pub path: String,
    pub handler: Handler,
    pub auth: Option<Authorization>,
    pub parse_mode: ParseMode,
    pub doc_summary: String,
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("auth", &self.auth)
            .field("parse_mode", &self.parse_mode)
            .finish()
    }
}

/// Declarative route list a service builds at construction time.
///
/// Handler names land under `/api/`; the convenience methods pick the
/// customary parse mode per verb (query string for GET/DELETE, JSON body
/// for POST/PUT). `route` is the general form.
#[derive(Default)]
pub struct ServiceRoutes {
    routes: Vec<Route>,
}

impl ServiceRoutes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<F>(
        &mut self,
        name: &str,
        auth: Option<Authorization>,
        doc: &str,
        handler: F,
    ) -> &mut Self
    where
        F: Fn(RequestContext) -> HandlerFuture + Send + Sync + 'static,
    {
        self.route(Method::GET, name, ParseMode::Query, auth, doc, handler)
    }

    pub fn post<F>(
        &mut self,
        name: &str,
        auth: Option<Authorization>,
        doc: &str,
        handler: F,
    ) -> &mut Self
    where
        F: Fn(RequestContext) -> HandlerFuture + Send + Sync + 'static,
    {
        self.route(Method::POST, name, ParseMode::Json, auth, doc, handler)
    }

    pub fn put<F>(
        &mut self,
        name: &str,
        auth: Option<Authorization>,
        doc: &str,
        handler: F,
    ) -> &mut Self
    where
        F: Fn(RequestContext) -> HandlerFuture + Send + Sync + 'static,
    {
        self.route(Method::PUT, name, ParseMode::Json, auth, doc, handler)
    }

    pub fn delete<F>(
        &mut self,
        name: &str,
        auth: Option<Authorization>,
        doc: &str,
        handler: F,
    ) -> &mut Self
    where
        F: Fn(RequestContext) -> HandlerFuture + Send + Sync + 'static,
    {
        self.route(Method::DELETE, name, ParseMode::Query, auth, doc, handler)
    }

    /// Register with an explicit method and parse mode.
    pub fn route<F>(
        &mut self,
        method: Method,
        name: &str,
        parse_mode: ParseMode,
        auth: Option<Authorization>,
        doc: &str,
        handler: F,
    ) -> &mut Self
    where
        F: Fn(RequestContext) -> HandlerFuture + Send + Sync + 'static,
    {
        self.routes.push(Route {
            method,
            path: format!("/api/{name}"),
            handler: Arc::new(handler),
            auth,
            parse_mode,
            doc_summary: doc.to_string(),
        });
        self
    }

    pub(crate) fn into_routes(self) -> Vec<Route> {
        self.routes
    }
}
