//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (TTLs > 0, cookie name is a valid token)
//! - Compile-check CORS patterns before they reach the matcher
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before a config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::AppConfig;

/// One semantic problem found in a config.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn err(field: &str, message: impl Into<String>) -> ValidationError {
    ValidationError {
        field: field.to_string(),
        message: message.into(),
    }
}

// RFC 7230 token characters, the subset a cookie name may use.
fn is_token(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b))
}

/// Check everything serde cannot.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(err(
            "listener.bind_address",
            format!("not a valid socket address: {}", config.listener.bind_address),
        ));
    }
    if !is_token(&config.session.cookie_name) {
        errors.push(err(
            "session.cookie_name",
            format!("not a valid cookie name: {:?}", config.session.cookie_name),
        ));
    }
    if config.session.ttl_secs == 0 {
        errors.push(err("session.ttl_secs", "must be greater than zero"));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(err("timeouts.request_secs", "must be greater than zero"));
    }
    if config.timeouts.handler_secs == 0 {
        errors.push(err("timeouts.handler_secs", "must be greater than zero"));
    }

    for (i, rule) in config.cors.iter().enumerate() {
        let field = format!("cors[{}].url_regex", i);
        if let Err(e) = regex::Regex::new(&rule.url_regex) {
            errors.push(err(&field, format!("invalid pattern: {}", e)));
        }
        if let Some(methods) = &rule.allow_methods {
            if methods.is_empty() {
                errors.push(err(
                    &format!("cors[{}].allow_methods", i),
                    "must not be empty when present",
                ));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::CorsRuleConfig;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_bad_bind_address() {
        let mut config = AppConfig::default();
        config.listener.bind_address = "not-an-address".into();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "listener.bind_address"));
    }

    #[test]
    fn test_bad_cookie_name() {
        let mut config = AppConfig::default();
        config.session.cookie_name = "bad name;".into();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_zero_ttl() {
        let mut config = AppConfig::default();
        config.session.ttl_secs = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_bad_cors_pattern_collected_with_others() {
        let mut config = AppConfig::default();
        config.session.ttl_secs = 0;
        config.cors.push(CorsRuleConfig {
            url_regex: "(".into(),
            allow_origin: vec![],
            allow_credentials: false,
            allow_methods: None,
            allow_headers: None,
        });
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
    }
}
