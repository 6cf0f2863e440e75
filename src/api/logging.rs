//! Structured logging with correlation tracking for RPC calls
//!
//! Every call gets a correlation id so a request, its outcome and any
//! follow-up warnings can be matched up in the log file.

use crate::error::ConsoleError;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
}

/// Monitoring and logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub request_logging: bool,
    pub log_level: LogLevel,
    /// Calls slower than this are reported as warnings
    pub slow_call_ms: u64,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            request_logging: true,
            log_level: LogLevel::Info,
            slow_call_ms: 5_000,
        }
    }
}

/// Context for a single RPC call
#[derive(Debug, Clone)]
pub struct OperationContext {
    pub correlation_id: String,
    /// Full RPC method, e.g. `model.party.party.read`
    pub method: String,
    pub start_time: Instant,
}

#[derive(Debug, Clone)]
pub struct ApiLogger {
    config: MonitoringConfig,
}

impl ApiLogger {
    pub fn new(config: MonitoringConfig) -> Self {
        Self { config }
    }

    pub fn start_operation(&self, method: &str) -> OperationContext {
        let context = OperationContext {
            correlation_id: uuid::Uuid::new_v4().to_string(),
            method: method.to_string(),
            start_time: Instant::now(),
        };

        if self.config.request_logging && self.should_log(LogLevel::Debug) {
            let log_data = json!({
                "event": "rpc_started",
                "correlation_id": context.correlation_id,
                "method": context.method,
                "timestamp": chrono::Utc::now().to_rfc3339()
            });
            debug!("RPC Call Started: {}", log_data);
        }

        context
    }

    /// Log the outcome of a call
    pub fn complete_operation(&self, context: &OperationContext, outcome: Result<(), &ConsoleError>) {
        let duration = context.start_time.elapsed();
        self.log_slow_call(context, duration);

        if !self.config.request_logging {
            return;
        }

        let log_data = json!({
            "event": "rpc_completed",
            "correlation_id": context.correlation_id,
            "method": context.method,
            "duration_ms": duration.as_millis(),
            "success": outcome.is_ok(),
            "error_message": outcome.err().map(|e| e.to_string()),
            "timestamp": chrono::Utc::now().to_rfc3339()
        });

        match self.completion_level(outcome) {
            Some(LogLevel::Info) => info!("RPC Call Completed: {}", log_data),
            Some(LogLevel::Warn) => warn!("RPC Call Rejected: {}", log_data),
            Some(LogLevel::Error) => error!("RPC Call Failed: {}", log_data),
            Some(LogLevel::Debug) | None => {}
        }
    }

    /// Level a completed call is logged at; `None` when filtered out.
    /// Rejected payloads are warnings, every other failure is an error.
    fn completion_level(&self, outcome: Result<(), &ConsoleError>) -> Option<LogLevel> {
        let level = match outcome {
            Ok(()) => LogLevel::Info,
            Err(ConsoleError::Validation { .. }) => LogLevel::Warn,
            Err(_) => LogLevel::Error,
        };
        self.should_log(level).then_some(level)
    }

    fn is_slow(&self, duration: Duration) -> bool {
        duration >= Duration::from_millis(self.config.slow_call_ms) && self.should_log(LogLevel::Warn)
    }

    fn log_slow_call(&self, context: &OperationContext, duration: Duration) {
        if !self.is_slow(duration) {
            return;
        }
        let threshold = Duration::from_millis(self.config.slow_call_ms);

        let log_data = json!({
            "event": "slow_call",
            "correlation_id": context.correlation_id,
            "method": context.method,
            "duration_ms": duration.as_millis(),
            "threshold_ms": threshold.as_millis(),
        });
        warn!("Slow RPC Call Detected: {}", log_data);
    }

    fn should_log(&self, level: LogLevel) -> bool {
        let rank = |l: LogLevel| match l {
            LogLevel::Error => 0,
            LogLevel::Warn => 1,
            LogLevel::Info => 2,
            LogLevel::Debug => 3,
        };
        rank(level) <= rank(self.config.log_level)
    }
}

/// Mask a session header value for logging
pub fn redact(value: &str) -> String {
    match value.split_once(' ') {
        Some((scheme, _)) => format!("{} [REDACTED]", scheme),
        None => "[REDACTED]".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_context_creation() {
        let logger = ApiLogger::new(MonitoringConfig::default());
        let first = logger.start_operation("model.party.party.read");
        let second = logger.start_operation("model.party.party.read");

        assert_eq!(first.method, "model.party.party.read");
        assert_ne!(first.correlation_id, second.correlation_id);
    }

    #[test]
    fn test_level_filtering() {
        let logger = ApiLogger::new(MonitoringConfig {
            log_level: LogLevel::Warn,
            ..MonitoringConfig::default()
        });
        assert!(logger.should_log(LogLevel::Error));
        assert!(logger.should_log(LogLevel::Warn));
        assert!(!logger.should_log(LogLevel::Info));
    }

    #[test]
    fn test_completion_levels() {
        let logger = ApiLogger::new(MonitoringConfig::default());
        assert_eq!(logger.completion_level(Ok(())), Some(LogLevel::Info));
        assert_eq!(
            logger.completion_level(Err(&ConsoleError::validation("duplicate code"))),
            Some(LogLevel::Warn)
        );
        assert_eq!(logger.completion_level(Err(&ConsoleError::AuthExpired)), Some(LogLevel::Error));

        let quiet = ApiLogger::new(MonitoringConfig {
            log_level: LogLevel::Error,
            ..MonitoringConfig::default()
        });
        assert_eq!(quiet.completion_level(Ok(())), None);
        assert_eq!(quiet.completion_level(Err(&ConsoleError::validation("bad"))), None);
        assert_eq!(
            quiet.completion_level(Err(&ConsoleError::Transport("reset".into()))),
            Some(LogLevel::Error)
        );
    }

    #[test]
    fn test_slow_call_threshold() {
        let logger = ApiLogger::new(MonitoringConfig {
            slow_call_ms: 250,
            ..MonitoringConfig::default()
        });
        assert!(!logger.is_slow(Duration::from_millis(249)));
        assert!(logger.is_slow(Duration::from_millis(250)));

        let quiet = ApiLogger::new(MonitoringConfig {
            slow_call_ms: 250,
            log_level: LogLevel::Error,
            ..MonitoringConfig::default()
        });
        assert!(!quiet.is_slow(Duration::from_secs(10)));
    }

    #[test]
    fn test_redact() {
        assert_eq!(redact("Session YWRtaW46MTphYmM="), "Session [REDACTED]");
        assert_eq!(redact("opaque"), "[REDACTED]");
    }
}
