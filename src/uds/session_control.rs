//! Diagnostic Session Control (SID `0x10`): a second worked example of the
//! dispatch-table pattern beyond RDBI - a fixed-subfunction request with a
//! small, statically-shaped positive response, needing no ODX model at all.

use crate::error::{DiagError, DiagResult};
use crate::uds::{check_positive_sid, classify_negative_response, UdsSession};

/// Service ID for Diagnostic Session Control.
pub const SID_REQUEST: u8 = 0x10;
/// Positive response SID (`0x10 + 0x40`).
pub const SID_POSITIVE_RESPONSE: u8 = 0x50;

/// The diagnostic session types defined by ISO 14229-1.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SessionType {
    Default,
    Programming,
    Extended,
    SafetySystem,
    Other(u8),
}

impl From<SessionType> for u8 {
    fn from(session: SessionType) -> Self {
        match session {
            SessionType::Default => 0x01,
            SessionType::Programming => 0x02,
            SessionType::Extended => 0x03,
            SessionType::SafetySystem => 0x04,
            SessionType::Other(x) => x,
        }
    }
}

/// Outcome of a session control request: either the ECU accepted the
/// session (and echoed its timing parameters), or it returned a negative
/// response.
#[derive(Debug, Clone, Copy)]
pub enum SessionControlOutcome {
    Accepted { p2_server_max: u16, p2_star_server_max: u16 },
    Negative { nrc: u8, label: Option<&'static str> },
}

impl UdsSession {
    /// Requests a diagnostic session change.
    pub fn diagnostic_session_control(&self, session: SessionType) -> DiagResult<SessionControlOutcome> {
        let response = self.send(&[SID_REQUEST, session.into()], true, false)?;

        if let Some((nrc, label)) = classify_negative_response(&response, SID_REQUEST) {
            return Ok(SessionControlOutcome::Negative { nrc, label });
        }

        check_positive_sid(&response, SID_POSITIVE_RESPONSE)?;
        if response.len() < 6 {
            return Err(DiagError::ProtocolResponseTooShort);
        }
        Ok(SessionControlOutcome::Accepted {
            p2_server_max: u16::from_be_bytes([response[2], response[3]]),
            p2_star_server_max: u16::from_be_bytes([response[4], response[5]]),
        })
    }
}
