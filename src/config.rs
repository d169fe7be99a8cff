//! Supervisor coordinates sourced from the process environment.
//!
//! The launching process exports the supervisor's host and port together
//! with the function timeout. When either coordinate is missing the process
//! is running outside the managed environment (local development) and the
//! pipeline is never started.
//!
//! Parsing is kept free of `log` calls: configuration is read while the
//! process-wide pipeline is being built, and that pipeline is what the `log`
//! facade eventually writes into.

use std::time::Duration;

use thiserror::Error;

/// Variable holding the supervisor's hostname.
pub const SUPERVISOR_HOSTNAME_VAR: &str = "SUPERVISOR_HOSTNAME";
/// Variable holding the supervisor's internal port.
pub const SUPERVISOR_PORT_VAR: &str = "SUPERVISOR_INTERNAL_PORT";
/// Variable holding the user function's timeout in whole seconds.
pub const FUNCTION_TIMEOUT_VAR: &str = "FUNCTION_TIMEOUT_SEC";

/// Lower bound for the log delivery timeout.
pub const MIN_LOG_TIMEOUT: Duration = Duration::from_secs(60);

/// Errors raised while reading supervisor configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid {SUPERVISOR_PORT_VAR} value {0:?}")]
    InvalidPort(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SupervisorConfig {
    pub hostname: String,
    pub port: u16,
    pub function_timeout: Duration,
}

impl SupervisorConfig {
    pub fn new(hostname: impl Into<String>, port: u16) -> Self {
        Self {
            hostname: hostname.into(),
            port,
            function_timeout: Duration::ZERO,
        }
    }

    pub fn with_function_timeout(mut self, timeout: Duration) -> Self {
        self.function_timeout = timeout;
        self
    }

    /// Read the configuration from the process environment.
    ///
    /// Returns `Ok(None)` when the hostname or port is unset or empty.
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through an arbitrary variable lookup.
    ///
    /// An unparsable or negative function timeout counts as zero, which
    /// leaves the log timeout at its 60 second floor.
    pub fn from_lookup<F>(lookup: F) -> Result<Option<Self>, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.is_empty());

        let (Some(hostname), Some(port)) =
            (non_empty(SUPERVISOR_HOSTNAME_VAR), non_empty(SUPERVISOR_PORT_VAR))
        else {
            return Ok(None);
        };
        let port = port
            .trim()
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort(port.clone()))?;
        let timeout_secs = non_empty(FUNCTION_TIMEOUT_VAR)
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .map_or(0, |secs| secs.max(0).unsigned_abs());

        Ok(Some(
            Self::new(hostname, port).with_function_timeout(Duration::from_secs(timeout_secs)),
        ))
    }

    /// Timeout for shipping a batch: the function timeout, but never below
    /// [`MIN_LOG_TIMEOUT`], so tail logs outlive the function's own deadline.
    pub fn log_timeout(&self) -> Duration {
        self.function_timeout.max(MIN_LOG_TIMEOUT)
    }

    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.hostname, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[rstest]
    #[case(&[])]
    #[case(&[(SUPERVISOR_HOSTNAME_VAR, "localhost")])]
    #[case(&[(SUPERVISOR_PORT_VAR, "8081")])]
    #[case(&[(SUPERVISOR_HOSTNAME_VAR, ""), (SUPERVISOR_PORT_VAR, "8081")])]
    fn missing_coordinates_disable_supervisor(#[case] vars: &[(&str, &str)]) {
        assert_eq!(SupervisorConfig::from_lookup(lookup(vars)), Ok(None));
    }

    #[test]
    fn reads_all_variables() {
        let config = SupervisorConfig::from_lookup(lookup(&[
            (SUPERVISOR_HOSTNAME_VAR, "supervisor"),
            (SUPERVISOR_PORT_VAR, "8081"),
            (FUNCTION_TIMEOUT_VAR, "540"),
        ]))
        .expect("valid config")
        .expect("supervisor configured");
        assert_eq!(config.hostname, "supervisor");
        assert_eq!(config.port, 8081);
        assert_eq!(config.function_timeout, Duration::from_secs(540));
        assert_eq!(config.base_url(), "http://supervisor:8081");
    }

    #[test]
    fn rejects_unparsable_port() {
        let result = SupervisorConfig::from_lookup(lookup(&[
            (SUPERVISOR_HOSTNAME_VAR, "supervisor"),
            (SUPERVISOR_PORT_VAR, "http"),
        ]));
        assert_eq!(result, Err(ConfigError::InvalidPort("http".into())));
    }

    #[rstest]
    #[case(None, 60)]
    #[case(Some("bogus"), 60)]
    #[case(Some("-5"), 60)]
    #[case(Some("30"), 60)]
    #[case(Some("60"), 60)]
    #[case(Some("540"), 540)]
    fn log_timeout_has_sixty_second_floor(#[case] raw: Option<&str>, #[case] expected: u64) {
        let mut vars = vec![(SUPERVISOR_HOSTNAME_VAR, "h"), (SUPERVISOR_PORT_VAR, "1")];
        if let Some(raw) = raw {
            vars.push((FUNCTION_TIMEOUT_VAR, raw));
        }
        let config = SupervisorConfig::from_lookup(lookup(&vars))
            .expect("valid config")
            .expect("supervisor configured");
        assert_eq!(config.log_timeout(), Duration::from_secs(expected));
    }
}
