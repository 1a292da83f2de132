//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Pipeline produces:
//!     → tracing events (request lifecycle, rejections, store failures)
//!     → metrics.rs (request counters, latency histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout, file, remote)
//!     → Whatever metrics exporter the deployment installs
//! ```
//!
//! # Design Decisions
//! - Structured logging throughout; a request id flows through every event
//! - Metric updates are cheap (atomic increments); exposition is the
//!   deployment's concern, not the framework's

pub mod metrics;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber. Safe to call more than once; later
/// calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pavilion=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
