//! CORS rule matching and policy-header computation.
//!
//! # Responsibilities
//! - Match request paths against an ordered rule list (last match wins)
//! - Enforce per-rule method allow-lists
//! - Compute the policy headers every response must carry
//! - Answer OPTIONS preflights without touching the handler
//!
//! # Design Decisions
//! - Patterns anchor at the start of the path, full regex syntax otherwise
//! - Rule order is the declaration order; when several rules match a path,
//!   the last one declared governs both the method check and the headers
//! - Policy headers are precomputed at construction; nothing fallible
//!   happens on the request path

use axum::http::header::{HeaderMap, HeaderName, HeaderValue};
use axum::http::Method;
use regex::Regex;
use thiserror::Error;

use crate::config::CorsRuleConfig;

/// Methods assumed when a rule declares none.
pub const DEFAULT_ALLOW_METHODS: &[&str] = &["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"];

/// Headers assumed when a rule declares none.
pub const DEFAULT_ALLOW_HEADERS: &[&str] = &[
    "x-requested-with",
    "content-type",
    "accept",
    "origin",
    "authorization",
    "x-csrftoken",
];

/// `Allow` value for preflights that match no rule.
pub const PREFLIGHT_FALLBACK_ALLOW: &str = "HEAD,GET,PUT,POST,PATCH,DELETE,OPTIONS";

/// A rule failed to build from config.
#[derive(Debug, Error)]
pub enum CorsRuleError {
    #[error("invalid url_regex {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        source: regex::Error,
    },
    #[error("value not usable in a header: {0:?}")]
    HeaderValue(String),
}

/// One URL-pattern → policy mapping.
#[derive(Debug, Clone)]
pub struct CorsRule {
    pattern: Regex,
    allow_methods: Vec<String>,
    allow_value: HeaderValue,
    policy: HeaderMap,
}

impl CorsRule {
    pub fn from_config(config: &CorsRuleConfig) -> Result<Self, CorsRuleError> {
        // Anchor like a prefix match; the non-capturing group keeps
        // top-level alternations inside the anchor.
        let pattern =
            Regex::new(&format!("^(?:{})", config.url_regex)).map_err(|source| {
                CorsRuleError::Pattern {
                    pattern: config.url_regex.clone(),
                    source,
                }
            })?;

        let allow_methods: Vec<String> = config
            .allow_methods
            .clone()
            .unwrap_or_else(|| DEFAULT_ALLOW_METHODS.iter().map(|m| m.to_string()).collect())
            .iter()
            .map(|m| m.to_uppercase())
            .collect();
        let allow_headers = config
            .allow_headers
            .clone()
            .unwrap_or_else(|| DEFAULT_ALLOW_HEADERS.iter().map(|h| h.to_string()).collect());

        let allow_value = header_value(&allow_methods.join(","))?;

        let mut policy = HeaderMap::new();
        policy.insert(
            HeaderName::from_static("access-control-allow-origin"),
            header_value(&config.allow_origin.join(" "))?,
        );
        policy.insert(
            HeaderName::from_static("access-control-allow-credentials"),
            header_value(if config.allow_credentials { "true" } else { "false" })?,
        );
        policy.insert(
            HeaderName::from_static("access-control-allow-methods"),
            header_value(&allow_methods.join(", "))?,
        );
        policy.insert(
            HeaderName::from_static("access-control-allow-headers"),
            header_value(&allow_headers.join(", "))?,
        );

        Ok(Self {
            pattern,
            allow_methods,
            allow_value,
            policy,
        })
    }

    pub fn matches(&self, path: &str) -> bool {
        self.pattern.is_match(path)
    }

    pub fn method_allowed(&self, method: &Method) -> bool {
        self.allow_methods.iter().any(|m| m == method.as_str())
    }

    /// Comma-joined method list for the preflight `Allow` header, in
    /// declared order.
    pub fn allow_header_value(&self) -> &HeaderValue {
        &self.allow_value
    }

    /// The `Access-Control-*` headers merged onto every response for
    /// matching paths.
    pub fn policy_headers(&self) -> &HeaderMap {
        &self.policy
    }
}

fn header_value(value: &str) -> Result<HeaderValue, CorsRuleError> {
    HeaderValue::from_str(value).map_err(|_| CorsRuleError::HeaderValue(value.to_string()))
}

/// Static, ordered rule list; immutable after construction.
#[derive(Debug, Default)]
pub struct CorsRuleSet {
    rules: Vec<CorsRule>,
}

impl CorsRuleSet {
    pub fn from_config(configs: &[CorsRuleConfig]) -> Result<Self, CorsRuleError> {
        let rules = configs
            .iter()
            .map(CorsRule::from_config)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    /// The governing rule for a path: the last match in declared order.
    pub fn find_rule(&self, path: &str) -> Option<&CorsRule> {
        self.rules.iter().rev().find(|rule| rule.matches(path))
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
