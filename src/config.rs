//! Configuration types consumed at construction time.
//!
//! Loading these from a file or environment is an external concern (see the
//! crate's top-level docs); this module only defines the immutable value
//! types and their sane defaults. Nothing here is global - every constructor
//! in [crate::isotp] and [crate::uds] takes its config explicitly and keeps
//! its own copy.

use std::time::Duration;

/// ISO-TP addressing mode. Determines how many payload bytes fit in one CAN
/// frame, and whether an address-extension byte is consumed.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AddressingMode {
    /// Normal addressing: the full frame (minus PCI bytes) is payload.
    Normal,
    /// Normal addressing using the SAE J1939-style "fixed" 29-bit ID scheme.
    /// Payload capacity is identical to [AddressingMode::Normal].
    NormalFixed,
    /// Extended addressing: one byte is consumed by a target address extension.
    Extended,
    /// Mixed addressing: a fixed address-extension byte (`n_ae`) is prepended
    /// to every frame, consuming one payload byte.
    Mixed,
}

impl AddressingMode {
    /// Payload bytes available per classical-CAN (8 byte) frame for this
    /// addressing mode, before any PCI header bytes.
    pub fn extension_bytes(self) -> usize {
        match self {
            AddressingMode::Normal | AddressingMode::NormalFixed => 0,
            AddressingMode::Extended | AddressingMode::Mixed => 1,
        }
    }
}

/// Distinguishes a normal diagnostic request from a remote-diagnostic one.
/// Carried through for parity with the ISO-TP configuration surface; this
/// crate does not alter framing based on it.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MessageType {
    /// A standard UDS diagnostic request/response.
    Diagnostics,
    /// A remote-diagnostics request (relayed through a gateway ECU).
    RemoteDiagnostics,
}

/// Configuration for one ISO-TP binding (one request/response CAN ID pair).
#[derive(Debug, Copy, Clone)]
pub struct IsoTpConfig {
    /// CAN ID this client transmits requests on.
    pub req_id: u32,
    /// CAN ID this client expects responses on.
    pub res_id: u32,
    /// Addressing mode in use.
    pub addressing_mode: AddressingMode,
    /// Address-extension byte, consumed/prepended by [AddressingMode::Extended]
    /// and [AddressingMode::Mixed].
    pub n_ae: u8,
    /// Diagnostic vs. remote-diagnostic message type.
    pub message_type: MessageType,
    /// If true, negative responses are silently discarded by the session
    /// rather than surfaced to the caller as a value.
    pub discard_neg_resp: bool,
    /// Byte used to pad frames up to their DLC.
    pub padding_byte: u8,
    /// Use the CAN-FD DLC ladder `{8,12,16,20,24,32,48,64}` instead of the
    /// classical fixed 8-byte frame.
    pub can_fd: bool,
}

impl Default for IsoTpConfig {
    fn default() -> Self {
        Self {
            req_id: 0x7E0,
            res_id: 0x7E8,
            addressing_mode: AddressingMode::Normal,
            n_ae: 0x00,
            message_type: MessageType::Diagnostics,
            discard_neg_resp: false,
            padding_byte: 0x00,
            can_fd: false,
        }
    }
}

/// Configuration for the UDS session layer sitting on top of one ISO-TP binding.
#[derive(Debug, Copy, Clone)]
pub struct UdsConfig {
    /// Client-side response timeout (ISO 14229 P2_CAN_Client).
    pub p2_can_client: Duration,
    /// Server-side response timeout; reserved for parity with the ECU side,
    /// not enforced by this client.
    pub p2_can_server: Duration,
    /// Human-readable transport name, surfaced in logs only.
    pub transport_name: &'static str,
}

impl Default for UdsConfig {
    fn default() -> Self {
        Self {
            p2_can_client: Duration::from_millis(1000),
            p2_can_server: Duration::from_millis(1000),
            transport_name: "ISO-TP",
        }
    }
}
