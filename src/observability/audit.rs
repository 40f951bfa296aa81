/// Audit event framework for judgebox
/// Provides structured logging of security-relevant events for compliance
/// and incident response: evaluation lifecycle, capability decisions, limit
/// violations, and forced terminations, each correlated by run id.
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Mutex, OnceLock};
use std::time::SystemTime;

/// Audit event severity levels
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AuditSeverity {
    Critical,
    High,
    Medium,
    Low,
}

/// Types of audit events we track
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AuditEventType {
    // Lifecycle events
    EvaluationStart,
    EvaluationEnd,

    // Capability and control events
    CapabilityViolation,

    // Limit violation events
    WallTimeLimitViolation,
    OutputLimitViolation,

    // Termination events
    ForcedKill,

    // Infrastructure events
    HostFailure,
}

impl AuditEventType {
    /// Get the default severity for this event type
    pub fn default_severity(&self) -> AuditSeverity {
        match self {
            AuditEventType::HostFailure => AuditSeverity::Critical,
            AuditEventType::CapabilityViolation => AuditSeverity::High,
            AuditEventType::WallTimeLimitViolation => AuditSeverity::Medium,
            AuditEventType::ForcedKill => AuditSeverity::Medium,
            AuditEventType::OutputLimitViolation => AuditSeverity::Low,
            AuditEventType::EvaluationStart => AuditSeverity::Low,
            AuditEventType::EvaluationEnd => AuditSeverity::Low,
        }
    }
}

/// Individual audit event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_type: AuditEventType,
    pub severity: AuditSeverity,
    /// Correlation id for one evaluation request
    pub run_id: Option<String>,
    /// SHA-256 fingerprint of the submission, when known
    pub submission_fingerprint: Option<String>,
    pub details: String,
    pub timestamp: SystemTime,
}

impl AuditEvent {
    pub fn new(event_type: AuditEventType, details: String) -> Self {
        Self {
            event_type,
            severity: event_type.default_severity(),
            run_id: None,
            submission_fingerprint: None,
            details,
            timestamp: SystemTime::now(),
        }
    }

    pub fn with_run_id(mut self, run_id: &str) -> Self {
        self.run_id = Some(run_id.to_string());
        self
    }

    pub fn with_fingerprint(mut self, fingerprint: &str) -> Self {
        self.submission_fingerprint = Some(fingerprint.to_string());
        self
    }
}

/// Number of recent events retained in memory for inspection.
const RETAINED_EVENTS: usize = 256;

/// In-memory sink of recent audit events plus log-facade emission.
struct AuditLog {
    recent: Mutex<VecDeque<AuditEvent>>,
}

static AUDIT_LOG: OnceLock<AuditLog> = OnceLock::new();

fn audit_log() -> &'static AuditLog {
    AUDIT_LOG.get_or_init(|| AuditLog {
        recent: Mutex::new(VecDeque::with_capacity(RETAINED_EVENTS)),
    })
}

/// Record one audit event: emit a structured JSON line through the log
/// facade and retain it in the in-memory ring.
pub fn record(event: AuditEvent) {
    let line = serde_json::to_string(&event)
        .unwrap_or_else(|_| format!("{{\"details\":\"{}\"}}", event.details));

    match event.severity {
        AuditSeverity::Critical => error!(target: "judgebox::audit", "{line}"),
        AuditSeverity::High => warn!(target: "judgebox::audit", "{line}"),
        AuditSeverity::Medium => warn!(target: "judgebox::audit", "{line}"),
        AuditSeverity::Low => info!(target: "judgebox::audit", "{line}"),
    }

    if let Ok(mut recent) = audit_log().recent.lock() {
        if recent.len() == RETAINED_EVENTS {
            recent.pop_front();
        }
        recent.push_back(event);
    }
}

/// Snapshot of recently recorded events, oldest first.
pub fn recent_events() -> Vec<AuditEvent> {
    audit_log()
        .recent
        .lock()
        .map(|recent| recent.iter().cloned().collect())
        .unwrap_or_default()
}

/// Convenience constructors for common audit events
pub mod events {
    use super::*;

    pub fn evaluation_start(run_id: &str, fingerprint: &str, total_tests: usize) {
        record(
            AuditEvent::new(
                AuditEventType::EvaluationStart,
                format!("evaluation started with {total_tests} test case(s)"),
            )
            .with_run_id(run_id)
            .with_fingerprint(fingerprint),
        );
    }

    pub fn evaluation_end(run_id: &str, status: &str, passed: usize, total: usize) {
        record(
            AuditEvent::new(
                AuditEventType::EvaluationEnd,
                format!("evaluation finished: {status} ({passed}/{total})"),
            )
            .with_run_id(run_id),
        );
    }

    pub fn capability_violation(run_id: &str, message: &str) {
        record(
            AuditEvent::new(AuditEventType::CapabilityViolation, message.to_string())
                .with_run_id(run_id),
        );
    }

    pub fn wall_time_limit(run_id: &str, limit_ms: u64) {
        record(
            AuditEvent::new(
                AuditEventType::WallTimeLimitViolation,
                format!("wall clock limit of {limit_ms} ms exceeded"),
            )
            .with_run_id(run_id),
        );
    }

    pub fn forced_kill(run_id: &str, pid: u32) {
        record(
            AuditEvent::new(
                AuditEventType::ForcedKill,
                format!("payload pid {pid} forcibly terminated"),
            )
            .with_run_id(run_id),
        );
    }

    pub fn output_truncated(run_id: &str, stream: &str) {
        record(
            AuditEvent::new(
                AuditEventType::OutputLimitViolation,
                format!("{stream} capture truncated at limit"),
            )
            .with_run_id(run_id),
        );
    }

    pub fn host_failure(run_id: &str, details: &str) {
        record(AuditEvent::new(AuditEventType::HostFailure, details.to_string()).with_run_id(run_id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_severities() {
        assert_eq!(
            AuditEventType::HostFailure.default_severity(),
            AuditSeverity::Critical
        );
        assert_eq!(
            AuditEventType::CapabilityViolation.default_severity(),
            AuditSeverity::High
        );
        assert_eq!(
            AuditEventType::EvaluationEnd.default_severity(),
            AuditSeverity::Low
        );
    }

    #[test]
    fn test_recorded_events_are_retrievable() {
        events::capability_violation("run-test-audit", "import of 'os' is not allowed");
        let recent = recent_events();
        assert!(recent.iter().any(|e| {
            e.event_type == AuditEventType::CapabilityViolation
                && e.run_id.as_deref() == Some("run-test-audit")
        }));
    }

    #[test]
    fn test_event_serializes_to_json_line() {
        let event = AuditEvent::new(
            AuditEventType::WallTimeLimitViolation,
            "wall clock limit of 5000 ms exceeded".to_string(),
        )
        .with_run_id("run-1");
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("WallTimeLimitViolation"));
        assert!(json.contains("run-1"));
    }
}
