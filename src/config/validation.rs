//! Configuration validation.
//!
//! Serde handles syntax; this checks the semantic rules, chiefly that every
//! budget nests strictly inside the one enclosing it:
//!
//! ```text
//! race.outer_ms + persistence.budget_ms  <  timeouts.request_ms  <  client.budget_ms
//! ```
//!
//! All errors are collected, not just the first.

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::ServerConfig;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} must be greater than zero")]
    ZeroBudget(&'static str),

    #[error("at least one source is required")]
    NoSources,

    #[error("source '{name}' has an invalid endpoint: {reason}")]
    InvalidEndpoint { name: String, reason: String },

    #[error("invalid address for {field}: {value}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{inner} ({inner_ms}ms) must be strictly less than {outer} ({outer_ms}ms)")]
    BudgetOrder {
        inner: &'static str,
        inner_ms: u64,
        outer: &'static str,
        outer_ms: u64,
    },
}

/// Validate a parsed configuration, returning every problem found.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for (field, value) in [
        ("timeouts.request_ms", config.timeouts.request_ms),
        ("race.per_task_ms", config.race.per_task_ms),
        ("race.outer_ms", config.race.outer_ms),
        ("persistence.budget_ms", config.persistence.budget_ms),
        ("client.budget_ms", config.client.budget_ms),
    ] {
        if value == 0 {
            errors.push(ValidationError::ZeroBudget(field));
        }
    }

    if config.sources.is_empty() {
        errors.push(ValidationError::NoSources);
    }
    for source in &config.sources {
        match url::Url::parse(&source.endpoint) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => errors.push(ValidationError::InvalidEndpoint {
                name: source.name.clone(),
                reason: format!("unsupported scheme '{}'", url.scheme()),
            }),
            Err(e) => errors.push(ValidationError::InvalidEndpoint {
                name: source.name.clone(),
                reason: e.to_string(),
            }),
        }
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    let (inner, inner_ms) = if config.persistence.enabled {
        (
            "race.outer_ms + persistence.budget_ms",
            config.race.outer_ms.saturating_add(config.persistence.budget_ms),
        )
    } else {
        ("race.outer_ms", config.race.outer_ms)
    };
    if inner_ms >= config.timeouts.request_ms {
        errors.push(ValidationError::BudgetOrder {
            inner,
            inner_ms,
            outer: "timeouts.request_ms",
            outer_ms: config.timeouts.request_ms,
        });
    }
    if config.timeouts.request_ms >= config.client.budget_ms {
        errors.push(ValidationError::BudgetOrder {
            inner: "timeouts.request_ms",
            inner_ms: config.timeouts.request_ms,
            outer: "client.budget_ms",
            outer_ms: config.client.budget_ms,
        });
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
    use crate::config::schema::SourceConfig;

    #[test]
    fn test_defaults_are_valid() {
        assert_eq!(validate_config(&ServerConfig::default()), Ok(()));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = ServerConfig::default();
        config.race.per_task_ms = 0;
        config.sources = vec![SourceConfig {
            name: "ftp".into(),
            endpoint: "ftp://example.test/quote".into(),
            pair: "USDBRL".into(),
        }];
        config.listener.bind_address = "not-an-address".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.contains(&ValidationError::ZeroBudget("race.per_task_ms")));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::InvalidEndpoint { name, .. } if name == "ftp")));
    }

    #[test]
    fn test_budgets_must_nest() {
        let mut config = ServerConfig::default();
        config.race.outer_ms = 245;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::BudgetOrder {
                inner: "race.outer_ms + persistence.budget_ms",
                inner_ms: 255,
                outer: "timeouts.request_ms",
                outer_ms: 250,
            }]
        );

        config.persistence.enabled = false;
        assert_eq!(validate_config(&config), Ok(()));

        config.client.budget_ms = 250;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("client.budget_ms"));
    }

    #[test]
    fn test_empty_sources() {
        let mut config = ServerConfig::default();
        config.sources.clear();
        assert_eq!(validate_config(&config), Err(vec![ValidationError::NoSources]));
    }
}
