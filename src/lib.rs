//! Pavilion: a small web-service framework.
//!
//! Declarative route registration, a composable request-handling pipeline,
//! session lifecycle management and role-based access control, layered on
//! axum as the HTTP transport.
//!
//! ```text
//!                       ┌──────────────────────────────────────────────┐
//!                       │                 APPLICATION                  │
//!   Client Request      │  ┌────────┐   ┌──────────────────────────┐   │
//!   ────────────────────┼─▶│  axum  │──▶│     dispatch pipeline    │   │
//!                       │  │ router │   │ session → CORS → auth →  │   │
//!                       │  └────────┘   │ parse → handler → reply  │   │
//!                       │               └───────────┬──────────────┘   │
//!                       │                           │                  │
//!                       │      ┌────────────┐  ┌────▼─────┐            │
//!   Client Response     │      │  session   │  │  route   │            │
//!   ◀───────────────────┼──────│   store    │  │ registry │            │
//!                       │      └────────────┘  └──────────┘            │
//!                       └──────────────────────────────────────────────┘
//! ```
//!
//! A service declares its handlers once through [`ServiceRoutes`]; the
//! [`Application`] freezes them into a registry and serves every request
//! through the same fixed pipeline: session resolution, CORS enforcement,
//! authorization, parsing, handler invocation, response formation, error
//! translation and session finalization.

// Core subsystems
pub mod config;
pub mod error;
pub mod pipeline;
pub mod request;
pub mod routing;

// Sessions and access control
pub mod auth;
pub mod cors;
pub mod session;

// Cross-cutting concerns
pub mod app;
pub mod observability;

pub use app::{Application, BuildError};
pub use auth::{Authorization, InMemoryUserDirectory, User, UserDirectory};
pub use config::{load_config, AppConfig};
pub use error::HttpError;
pub use request::{mandatory_check, DataBag, ParseMode, RequestContext};
pub use routing::{Reply, ServiceRoutes};
pub use session::{InMemorySessionStore, SessionStore, SessionUser};
