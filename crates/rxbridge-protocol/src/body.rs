//! Typed JSON bodies for the seven bridge routes.
//!
//! Field names follow the wire contract the automation client already
//! parses (camelCase), so every struct carries explicit serde renames.

use crate::version::ProtocolVersion;
use chrono::Utc;
use rxbridge_core::{CompletedPrescription, PrescriptionSession, SessionId};
use serde::{Deserialize, Serialize};

/// Action token telling the automation client the drug list is ready to be
/// pasted into the target application.
pub const ACTION_PASTE_AND_ENTER: &str = "PASTE_AND_ENTER";

/// Optional request body for `POST /prescription/start`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    #[serde(default)]
    pub patient_info: String,
}

/// Compact session block embedded in `GET /status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: SessionId,
    pub patient_info: String,
    pub start_time: i64,
    pub drug_count: usize,
}

impl SessionSummary {
    /// Builds a summary for a live session with the current pending count.
    pub fn new(session: &PrescriptionSession, drug_count: usize) -> Self {
        Self {
            session_id: session.id.clone(),
            patient_info: session.patient_info.clone(),
            start_time: session.start_millis(),
            drug_count,
        }
    }
}

/// `GET /status` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusBody {
    pub server: String,
    pub port: u16,
    pub timestamp: i64,
    pub protocol_version: String,
    pub session: Option<SessionSummary>,
}

impl StatusBody {
    /// Builds the status body for a server answering on `port`.
    ///
    /// `server` is always `"running"`: the server can only answer requests
    /// while its accept loop is live.
    pub fn new(port: u16, session: Option<SessionSummary>) -> Self {
        Self {
            server: "running".to_string(),
            port,
            timestamp: Utc::now().timestamp_millis(),
            protocol_version: ProtocolVersion::CURRENT.to_string(),
            session,
        }
    }
}

/// `GET /prescription/current` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentBody {
    pub session_id: SessionId,
    pub patient_info: String,
    pub start_time: i64,
    pub drugs: Vec<String>,
    pub count: usize,
}

impl CurrentBody {
    pub fn new(session: &PrescriptionSession, drugs: Vec<String>) -> Self {
        Self {
            session_id: session.id.clone(),
            patient_info: session.patient_info.clone(),
            start_time: session.start_millis(),
            count: drugs.len(),
            drugs,
        }
    }
}

/// `GET /prescription/drugs` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrugsBody {
    pub drugs: Vec<String>,
    pub count: usize,
}

impl DrugsBody {
    pub fn new(drugs: Vec<String>) -> Self {
        Self {
            count: drugs.len(),
            drugs,
        }
    }
}

/// `POST /prescription/start` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartBody {
    pub session_id: SessionId,
    pub message: String,
    pub patient_info: String,
}

impl StartBody {
    pub fn new(session_id: SessionId, patient_info: String) -> Self {
        Self {
            session_id,
            message: "Prescription session started".to_string(),
            patient_info,
        }
    }
}

/// `POST /prescription/complete` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteBody {
    pub session_id: SessionId,
    pub drug_count: usize,
    pub duration: u64,
    pub message: String,
}

impl CompleteBody {
    pub fn new(completed: &CompletedPrescription) -> Self {
        Self {
            session_id: completed.id.clone(),
            drug_count: completed.drug_count(),
            duration: completed.duration_ms(),
            message: "Prescription session completed".to_string(),
        }
    }
}

/// `POST /prescription/send` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendBody {
    pub drugs: Vec<String>,
    pub count: usize,
    pub message: String,
    pub action: String,
}

impl SendBody {
    pub fn new(drugs: Vec<String>) -> Self {
        Self {
            count: drugs.len(),
            drugs,
            message: "Drugs ready for Windows automation".to_string(),
            action: ACTION_PASTE_AND_ENTER.to_string(),
        }
    }
}

/// `DELETE /prescription/clear` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearBody {
    pub message: String,
}

impl ClearBody {
    pub fn new() -> Self {
        Self {
            message: "Prescription data cleared".to_string(),
        }
    }
}

impl Default for ClearBody {
    fn default() -> Self {
        Self::new()
    }
}

/// Structured error body for 4xx responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: u16,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>, code: u16) -> Self {
        Self {
            error: error.into(),
            code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn test_session() -> PrescriptionSession {
        let started = DateTime::from_timestamp_millis(1_700_000_000_000).unwrap();
        PrescriptionSession::new(SessionId::from_millis(1_700_000_000_000), "", started)
    }

    #[test]
    fn test_status_body_camel_case_fields() {
        let session = test_session();
        let body = StatusBody::new(8080, Some(SessionSummary::new(&session, 2)));
        let json = serde_json::to_string(&body).unwrap();

        assert!(json.contains("\"server\":\"running\""));
        assert!(json.contains("\"port\":8080"));
        assert!(json.contains("\"protocolVersion\":\"1.0\""));
        assert!(json.contains("\"sessionId\":\"1700000000000\""));
        assert!(json.contains("\"startTime\":1700000000000"));
        assert!(json.contains("\"drugCount\":2"));
    }

    #[test]
    fn test_status_body_null_session() {
        let body = StatusBody::new(8081, None);
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("\"session\":null"));
    }

    #[test]
    fn test_send_body_includes_action_token() {
        let body = SendBody::new(vec![
            "Paracetamol 500mg".to_string(),
            "Amoxicillin 250mg".to_string(),
        ]);
        let json = serde_json::to_string(&body).unwrap();

        assert!(json.contains("\"action\":\"PASTE_AND_ENTER\""));
        assert!(json.contains("\"count\":2"));
        assert!(json.contains("\"message\":\"Drugs ready for Windows automation\""));
    }

    #[test]
    fn test_start_request_tolerates_missing_field() {
        let req: StartRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req.patient_info, "");

        let req: StartRequest = serde_json::from_str(r#"{"patientInfo":"Test Patient"}"#).unwrap();
        assert_eq!(req.patient_info, "Test Patient");
    }

    #[test]
    fn test_error_body_shape() {
        let body = ErrorBody::new("No drugs to send", 400);
        let json = serde_json::to_string(&body).unwrap();
        assert_eq!(json, r#"{"error":"No drugs to send","code":400}"#);
    }

    #[test]
    fn test_current_body_preserves_order() {
        let session = test_session();
        let body = CurrentBody::new(&session, vec!["A".to_string(), "B".to_string()]);
        assert_eq!(body.drugs, ["A", "B"]);
        assert_eq!(body.count, 2);
    }
}
