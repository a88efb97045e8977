//! The response decoder: walks a UDS positive response against one or more
//! compiled [PosResponse] layouts, or recognizes a negative response and
//! looks up its NRC label.

use std::collections::HashMap;

use crate::error::{DiagError, DiagResult};
use crate::odx::{BaseDataType, DiagCodedType, Param, PosResponse, Service, Termination};

/// Upper bound on how far a `ZERO`/`HEX_FF`-terminated [Param] is scanned
/// when its ODX model left `max_length` unset. Guards against a malformed
/// or malicious response with no terminator byte at all.
const UNBOUNDED_SCAN_CAP: usize = 4095;

/// One [Param]'s decoded value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedValue {
    /// `A_ASCIISTRING`, decoded to text.
    Ascii(String),
    /// Anything else: the raw bytes, terminator stripped.
    Raw(Vec<u8>),
}

/// Per-DID decoded parameters, keyed by [Param::short_name].
pub type DidValues = HashMap<String, DecodedValue>;

/// Result of decoding one response PDU.
#[derive(Debug, Clone)]
pub enum DecodeOutcome {
    /// One [DidValues] map per requested DID, in request order.
    Positive(Vec<DidValues>),
    /// The ECU returned `0x7F <SID> <NRC>`.
    Negative {
        /// The negative response code.
        nrc: u8,
        /// Its human-readable label, if known.
        label: Option<String>,
    },
}

/// Decodes `response` against `service`'s compiled model, resolving
/// `requested_dids` to the matching [PosResponse] entries in order.
///
/// A negative response (`0x7F <SID> <NRC>`) never raises: the NRC and its
/// label (from the service's own compiled `nrc_labels`, `None` when it
/// defines none) are always returned, per the dispatch contract's "the
/// matcher never throws" rule.
pub fn decode_response(response: &[u8], service: &Service, requested_dids: &[u16]) -> DiagResult<DecodeOutcome> {
    if response.len() >= 3 && response[0] == 0x7F && response[1] == service.request_sid {
        let nrc = response[2];
        let label = service.nrc_labels.get(&nrc).cloned();
        return Ok(DecodeOutcome::Negative { nrc, label });
    }

    let expected_sid = service.request_sid.wrapping_add(0x40);
    let got_sid = *response.get(0).unwrap_or(&0);
    if response.is_empty() || got_sid != expected_sid {
        return Err(DiagError::ProtocolBadResponseSid { expected: expected_sid, got: got_sid });
    }

    let mut cursor = 1usize;
    let mut results = Vec::with_capacity(requested_dids.len());
    for &did in requested_dids {
        let pos = find_pos_response(service, did)?;
        if response.len() < cursor + 2 {
            return Err(DiagError::ProtocolBadDid { expected: pos.did, got: 0 });
        }
        let got_did = u16::from_be_bytes([response[cursor], response[cursor + 1]]);
        if got_did != pos.did {
            return Err(DiagError::ProtocolBadDid { expected: pos.did, got: got_did });
        }
        cursor += 2;

        let mut values = HashMap::with_capacity(pos.params.len());
        for param in &pos.params {
            let remaining = &response[cursor..];
            let len = param_length(param, remaining)?;
            if cursor + len > response.len() {
                return Err(DiagError::ProtocolResponseTooLong);
            }
            let raw = &response[cursor..cursor + len];
            values.insert(param.short_name.clone(), decode_param(param, raw));
            cursor += len;
        }
        results.push(values);
    }

    Ok(DecodeOutcome::Positive(results))
}

fn find_pos_response(service: &Service, did: u16) -> DiagResult<&PosResponse> {
    service.positive_responses.iter().find(|p| p.did == did).ok_or_else(|| {
        DiagError::ConfigError(format!(
            "service {} has no compiled positive response for DID 0x{:04X}",
            service.name, did
        ))
    })
}

/// Computes a [Param]'s byte length in `remaining` (the response bytes from
/// the param's start position onward), per each [DiagCodedType] variant.
fn param_length(param: &Param, remaining: &[u8]) -> DiagResult<usize> {
    match &param.diag_coded_type {
        DiagCodedType::StandardLength { byte_length } => Ok(*byte_length),
        DiagCodedType::MinMaxLength { min_length: _, max_length, termination: Termination::EndOfPdu } => {
            Ok(match max_length {
                Some(max) => (*max).min(remaining.len()),
                None => remaining.len(),
            })
        }
        DiagCodedType::MinMaxLength { min_length, max_length, termination } => {
            let marker = match termination {
                Termination::Zero => 0x00,
                Termination::HexFf => 0xFF,
                Termination::EndOfPdu => unreachable!("handled above"),
            };
            let cap = max_length.unwrap_or(UNBOUNDED_SCAN_CAP);
            for (i, &b) in remaining.iter().enumerate() {
                if i > cap {
                    return Err(DiagError::ProtocolResponseTooLong);
                }
                if b == marker {
                    if i < *min_length {
                        return Err(DiagError::ProtocolResponseTooShort);
                    }
                    return Ok(i + 1);
                }
            }
            Err(DiagError::ProtocolResponseTooLong)
        }
    }
}

fn decode_param(param: &Param, raw: &[u8]) -> DecodedValue {
    let to_decode = match &param.diag_coded_type {
        DiagCodedType::MinMaxLength { termination: Termination::Zero, .. }
        | DiagCodedType::MinMaxLength { termination: Termination::HexFf, .. } => &raw[..raw.len().saturating_sub(1)],
        _ => raw,
    };
    match param.base_data_type {
        BaseDataType::AsciiString => DecodedValue::Ascii(to_decode.iter().map(|&b| b as char).collect()),
        BaseDataType::Uint32 => DecodedValue::Raw(to_decode.to_vec()),
    }
}
