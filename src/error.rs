//! The crate-wide error type. Every public fallible function in this crate
//! returns [DiagResult], composing the per-layer error taxonomy described in
//! the top-level docs. Manual `Display`/`Error` impls are used throughout
//! this crate (matching [crate::bus::BusError]) rather than a derive macro,
//! so this file follows the same pattern.

use crate::bus::BusError;

/// Result type for every fallible operation this crate exposes.
pub type DiagResult<T> = Result<T, DiagError>;

/// The crate-wide error taxonomy.
#[derive(Debug)]
pub enum DiagError {
    /// The compiled service/response model was built inconsistently (e.g.
    /// an unsupported addressing mode, or a `min_length > max_length`).
    ConfigError(String),
    /// A PDU handed to the sender exceeds the 4095 byte ISO-TP PDU limit.
    PayloadTooLarge(usize),
    /// No flow-control frame arrived before the FC wait timer elapsed.
    TimeoutFlowControl,
    /// No further frame arrived before the per-PDU receive timer elapsed.
    TimeoutRx,
    /// The ECU's flow-control frame requested `FS=1` (Wait), which this
    /// client does not implement.
    ProtocolWaitUnsupported,
    /// The ECU's flow-control frame signalled `FS=2` (Overflow).
    ProtocolOverflow,
    /// A flow-control frame was unexpected, or was malformed (unknown `FS`).
    ProtocolUnexpectedFc,
    /// A consecutive frame's sequence number did not match the expected
    /// wrap-16 counter.
    ProtocolCfSequence {
        /// Sequence number the receiver expected.
        expected: u8,
        /// Sequence number actually carried by the frame.
        got: u8,
    },
    /// The response's leading SID byte(s) didn't match what the service
    /// model expected.
    ProtocolBadResponseSid {
        /// SID byte the model expected.
        expected: u8,
        /// SID byte actually present.
        got: u8,
    },
    /// The response's DID field didn't match the DID the request asked for.
    ProtocolBadDid {
        /// DID the model expected.
        expected: u16,
        /// DID actually present.
        got: u16,
    },
    /// A dynamically-terminated parameter hit its terminator before
    /// `min_length` bytes had been consumed.
    ProtocolResponseTooShort,
    /// A dynamically-terminated parameter consumed its entire bound (or the
    /// crate's absolute safety cap) without finding a terminator.
    ProtocolResponseTooLong,
    /// Propagated from the bus adapter.
    BusError(BusError),
}

impl std::fmt::Display for DiagError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiagError::ConfigError(msg) => write!(f, "configuration error: {}", msg),
            DiagError::PayloadTooLarge(n) => {
                write!(f, "PDU of {} bytes exceeds the 4095 byte ISO-TP limit", n)
            }
            DiagError::TimeoutFlowControl => write!(f, "timed out waiting for flow control"),
            DiagError::TimeoutRx => write!(f, "timed out waiting for the remainder of a PDU"),
            DiagError::ProtocolWaitUnsupported => {
                write!(f, "ECU requested FS=WAIT, which is not supported")
            }
            DiagError::ProtocolOverflow => write!(f, "ECU signalled flow-control overflow"),
            DiagError::ProtocolUnexpectedFc => write!(f, "received an unexpected or malformed flow-control frame"),
            DiagError::ProtocolCfSequence { expected, got } => write!(
                f,
                "consecutive frame sequence mismatch: expected {}, got {}",
                expected, got
            ),
            DiagError::ProtocolBadResponseSid { expected, got } => write!(
                f,
                "response SID mismatch: expected 0x{:02X}, got 0x{:02X}",
                expected, got
            ),
            DiagError::ProtocolBadDid { expected, got } => write!(
                f,
                "response DID mismatch: expected 0x{:04X}, got 0x{:04X}",
                expected, got
            ),
            DiagError::ProtocolResponseTooShort => {
                write!(f, "response terminated before the parameter's minimum length")
            }
            DiagError::ProtocolResponseTooLong => {
                write!(f, "response exceeded the parameter's maximum length without a terminator")
            }
            DiagError::BusError(e) => write!(f, "bus error: {}", e),
        }
    }
}

impl std::error::Error for DiagError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DiagError::BusError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<BusError> for DiagError {
    fn from(e: BusError) -> Self {
        DiagError::BusError(e)
    }
}
