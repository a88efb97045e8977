//! A compiled, in-memory stand-in for an ODX diagnostic description: the
//! subset of service/parameter metadata the response decoder needs, built
//! programmatically (ODX/XML parsing is out of scope) through
//! [ServiceBuilder] / [PosResponseBuilder].

pub mod decode;

use std::collections::HashMap;

/// How a request or response's scalar payload should be interpreted once
/// its bytes have been extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseDataType {
    /// `A_ASCIISTRING`: decode bytes as ASCII text.
    AsciiString,
    /// `A_UINT32`: caller interprets the raw bytes as an integer.
    Uint32,
}

/// Byte value (or pseudo-value, for `END_OF_PDU`) that ends a
/// [DiagCodedType::MinMaxLength] parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Ends at the first `0x00` byte.
    Zero,
    /// Ends at the first `0xFF` byte.
    HexFf,
    /// No terminator; the parameter consumes the rest of the PDU (or its
    /// `max_length`, if set).
    EndOfPdu,
}

/// How many bytes of a response a [Param] occupies.
#[derive(Debug, Clone)]
pub enum DiagCodedType {
    /// A fixed-width field.
    StandardLength {
        /// Width in bytes.
        byte_length: usize,
    },
    /// A dynamically-terminated field.
    MinMaxLength {
        /// Minimum width in bytes (a terminator seen before this is an error).
        min_length: usize,
        /// Maximum width in bytes, if bounded.
        max_length: Option<usize>,
        /// How the field's end is recognized.
        termination: Termination,
    },
}

/// One decodable field within a [PosResponse].
#[derive(Debug, Clone)]
pub struct Param {
    pub short_name: String,
    pub diag_coded_type: DiagCodedType,
    pub base_data_type: BaseDataType,
}

impl Param {
    pub fn new(short_name: impl Into<String>, diag_coded_type: DiagCodedType, base_data_type: BaseDataType) -> Self {
        Self { short_name: short_name.into(), diag_coded_type, base_data_type }
    }
}

/// The positive-response layout for one DID: a fixed SID/DID prefix
/// followed by an ordered list of [Param]s.
#[derive(Debug, Clone)]
pub struct PosResponse {
    pub sid: u8,
    pub did: u16,
    pub params: Vec<Param>,
}

/// Incremental builder for a [PosResponse].
#[derive(Debug, Clone)]
pub struct PosResponseBuilder {
    sid: u8,
    did: u16,
    params: Vec<Param>,
}

impl PosResponseBuilder {
    pub fn new(sid: u8, did: u16) -> Self {
        Self { sid, did, params: Vec::new() }
    }

    pub fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    pub fn build(self) -> PosResponse {
        PosResponse { sid: self.sid, did: self.did, params: self.params }
    }
}

/// A fully compiled UDS service: its request SID, the positive-response
/// layouts it can produce (one per DID for a batched RDBI request, one
/// entry for a simple fixed-subfunction service), and its own NRC label
/// table. [decode::decode_response] only ever resolves a negative response's
/// label from this table - there is no crate-wide fallback.
#[derive(Debug, Clone)]
pub struct Service {
    pub name: &'static str,
    pub request_sid: u8,
    pub positive_responses: Vec<PosResponse>,
    pub nrc_labels: HashMap<u8, String>,
}

/// Incremental builder for a [Service], the compiled-model stand-in for an
/// ODX `DIAG-SERVICE` element.
#[derive(Debug, Clone)]
pub struct ServiceBuilder {
    name: &'static str,
    request_sid: u8,
    positive_responses: Vec<PosResponse>,
    nrc_labels: HashMap<u8, String>,
}

impl ServiceBuilder {
    pub fn new(name: &'static str, request_sid: u8) -> Self {
        Self { name, request_sid, positive_responses: Vec::new(), nrc_labels: HashMap::new() }
    }

    pub fn positive_response(mut self, response: PosResponse) -> Self {
        self.positive_responses.push(response);
        self
    }

    pub fn nrc_label(mut self, code: u8, label: impl Into<String>) -> Self {
        self.nrc_labels.insert(code, label.into());
        self
    }

    pub fn build(self) -> Service {
        Service {
            name: self.name,
            request_sid: self.request_sid,
            positive_responses: self.positive_responses,
            nrc_labels: self.nrc_labels,
        }
    }
}
