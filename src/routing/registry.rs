//! Route lookup.
//!
//! # Responsibilities
//! - Store declared routes, rejecting (method, path) duplicates
//! - Resolve incoming (method, path) pairs to routes
//! - Auto-register the introspection endpoint
//!
//! # Design Decisions
//! - Immutable after build (thread-safe without locks)
//! - O(1) lookup via HashMap; declaration order preserved for listings
//! - Explicit no-match rather than a silent default

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::Method;
use thiserror::Error;

use crate::request::ParseMode;
use crate::routing::route::{Reply, Route, ServiceRoutes};

/// Path of the auto-registered route listing.
pub const INTROSPECT_PATH: &str = "/api/__introspect__";

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("route {method} {path} is already registered")]
    DuplicateRoute { method: Method, path: String },
}

/// Immutable (method, path) → route mapping, built once at startup.
#[derive(Default)]
pub struct RouteRegistry {
    routes: Vec<Route>,
    index: HashMap<(Method, String), usize>,
}

impl RouteRegistry {
    /// Freeze a service's declared routes, adding the system routes.
    pub fn build(service_routes: ServiceRoutes) -> Result<Self, RegistryError> {
        let mut registry = Self::default();
        for route in service_routes.into_routes() {
            registry.register(route)?;
        }
        let introspect = introspect_route(&registry);
        registry.register(introspect)?;
        Ok(registry)
    }

    pub fn register(&mut self, route: Route) -> Result<(), RegistryError> {
        let key = (route.method.clone(), route.path.clone());
        if self.index.contains_key(&key) {
            return Err(RegistryError::DuplicateRoute {
                method: route.method,
                path: route.path,
            });
        }
        self.index.insert(key, self.routes.len());
        self.routes.push(route);
        Ok(())
    }

    pub fn resolve(&self, method: &Method, path: &str) -> Option<&Route> {
        self.index
            .get(&(method.clone(), path.to_string()))
            .map(|&i| &self.routes[i])
    }

    /// All routes in declaration order.
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }
}

// The listing is a build-time snapshot: the registry is immutable once
// serving, so there is nothing to re-render per request.
fn introspect_route(registry: &RouteRegistry) -> Route {
    let html = render_route_listing(registry.routes());
    let html = Arc::new(html);
    Route {
        method: Method::GET,
        path: INTROSPECT_PATH.to_string(),
        handler: Arc::new(move |_ctx| {
            let html = html.clone();
            Box::pin(async move { Ok(Reply::html(html.as_str())) })
        }),
        auth: None,
        parse_mode: ParseMode::Query,
        doc_summary: "List registered API methods.".to_string(),
    }
}

fn render_route_listing(routes: &[Route]) -> String {
    let mut items = String::new();
    for route in routes {
        // System routes stay out of the listing.
        if route.path.starts_with("/api/__") {
            continue;
        }
        let docs = route
            .doc_summary
            .lines()
            .next()
            .filter(|line| !line.trim().is_empty())
            .map(|line| format!("-- {}", line.trim()))
            .unwrap_or_default();
        items.push_str(&format!(
            "<li><b>{}</b>&nbsp;&nbsp;{}&nbsp;&nbsp;{}</li>",
            route.method, route.path, docs
        ));
    }
    if items.is_empty() {
        items = "No one API method found...".to_string();
    }
    format!(
        "<html><body>\n<h1>Available methods:</h1>\n<ul>\n{}\n</ul>\n</body></html>",
        items
    )
}
