//! ECU Reset (SID `0x11`): simulates power cycling or resetting memory
//! regions. The third worked example of the dispatch-table pattern: a
//! fixed-subfunction request, this time with an optional one-byte payload
//! on its positive response.

use crate::error::DiagResult;
use crate::uds::{check_positive_sid, classify_negative_response, UdsSession};

/// Service ID for ECU Reset.
pub const SID_REQUEST: u8 = 0x11;
/// Positive response SID (`0x11 + 0x40`).
pub const SID_POSITIVE_RESPONSE: u8 = 0x51;

/// Options for resetting the ECU.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum ResetType {
    /// Simulates a forceful power off/on cycle. May re-initialize both
    /// non-volatile and volatile memory.
    HardReset,
    /// Simulates a key off/on cycle. Typically preserves non-volatile
    /// memory but re-initializes volatile memory.
    KeyOffReset,
    /// Reboots the current application. Preserves both memory kinds.
    SoftReset,
    /// Enables rapid power shutdown on the next key-off cycle.
    EnableRapidPowerShutDown,
    /// Disables rapid power shutdown.
    DisableRapidPowerShutDown,
    /// Other OEM-defined power mode.
    Other(u8),
}

impl From<ResetType> for u8 {
    fn from(from: ResetType) -> Self {
        match from {
            ResetType::HardReset => 0x01,
            ResetType::KeyOffReset => 0x02,
            ResetType::SoftReset => 0x03,
            ResetType::EnableRapidPowerShutDown => 0x04,
            ResetType::DisableRapidPowerShutDown => 0x05,
            ResetType::Other(x) => x,
        }
    }
}

/// Outcome of an ECU reset request.
#[derive(Debug, Clone, Copy)]
pub enum EcuResetOutcome {
    /// Accepted, with the optional power-down time echoed back (only
    /// meaningful for [ResetType::EnableRapidPowerShutDown]).
    Accepted { power_down_time: Option<u8> },
    Negative { nrc: u8, label: Option<&'static str> },
}

impl UdsSession {
    /// Sends an ECU reset request of the given [ResetType].
    pub fn ecu_reset(&self, reset_type: ResetType) -> DiagResult<EcuResetOutcome> {
        let response = self.send(&[SID_REQUEST, reset_type.into()], true, false)?;

        if let Some((nrc, label)) = classify_negative_response(&response, SID_REQUEST) {
            return Ok(EcuResetOutcome::Negative { nrc, label });
        }

        check_positive_sid(&response, SID_POSITIVE_RESPONSE)?;
        Ok(EcuResetOutcome::Accepted { power_down_time: response.get(2).copied() })
    }

    /// Convenience wrapper: [ResetType::HardReset].
    pub fn ecu_hard_reset(&self) -> DiagResult<EcuResetOutcome> {
        self.ecu_reset(ResetType::HardReset)
    }

    /// Convenience wrapper: [ResetType::KeyOffReset].
    pub fn ecu_key_off_on_reset(&self) -> DiagResult<EcuResetOutcome> {
        self.ecu_reset(ResetType::KeyOffReset)
    }

    /// Convenience wrapper: [ResetType::SoftReset].
    pub fn ecu_soft_reset(&self) -> DiagResult<EcuResetOutcome> {
        self.ecu_reset(ResetType::SoftReset)
    }
}
