//! Read Data By Identifier (SID `0x22`): request construction and response
//! decoding for one DID or a batch of DIDs.

use crate::odx::decode::{decode_response, DecodeOutcome};
use crate::odx::Service;
use crate::error::DiagResult;
use crate::uds::UdsSession;

/// Service ID for Read Data By Identifier.
pub const SID_REQUEST: u8 = 0x22;
/// Positive response SID (`0x22 + 0x40`).
pub const SID_POSITIVE_RESPONSE: u8 = 0x62;

/// Builds the RDBI request PDU for one or more DIDs, in the order given:
/// `[0x22, DID1_hi, DID1_lo, DID2_hi, DID2_lo, ...]`.
pub fn build_request(dids: &[u16]) -> Vec<u8> {
    let mut pdu = Vec::with_capacity(1 + dids.len() * 2);
    pdu.push(SID_REQUEST);
    for did in dids {
        pdu.extend_from_slice(&did.to_be_bytes());
    }
    pdu
}

impl UdsSession {
    /// Sends an RDBI request for `dids` (single DID, or a batch) and decodes
    /// the response against `service`'s compiled model.
    pub fn read_data_by_identifier(&self, service: &Service, dids: &[u16]) -> DiagResult<DecodeOutcome> {
        let request = build_request(dids);
        let response = self.send(&request, true, false)?;
        decode_response(&response, service, dids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_did_request_layout() {
        assert_eq!(build_request(&[0xF190]), vec![0x22, 0xF1, 0x90]);
    }

    #[test]
    fn batched_did_request_layout() {
        assert_eq!(build_request(&[0xF190, 0xF18C]), vec![0x22, 0xF1, 0x90, 0xF1, 0x8C]);
    }
}
