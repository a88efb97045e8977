//! Frame-level codec: packs and unpacks single, first, consecutive and
//! flow-control frames, and the CAN-FD DLC quantization ladder.
//!
//! Every function here is pure - no I/O, no timers, no state beyond its
//! arguments. The sender and receiver state machines are the only callers.

use std::time::Duration;

use crate::config::{AddressingMode, IsoTpConfig};
use crate::error::{DiagError, DiagResult};

/// DLC sizes a CAN-FD controller can frame data into.
pub const CAN_FD_DATA_LENGTHS: [usize; 8] = [8, 12, 16, 20, 24, 32, 48, 64];

/// Flow-status values carried in byte 0 (low nibble) of a flow-control frame.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FlowStatus {
    /// `0x0`: continue to send.
    ContinueToSend,
    /// `0x1`: wait - not supported by this client.
    Wait,
    /// `0x2`: overflow, abort.
    Overflow,
}

/// The decoded kind of an inbound CAN frame, classified by its leading PCI nibble.
#[derive(Debug)]
pub enum FrameKind<'a> {
    /// Single frame carrying the whole PDU.
    Single { payload: &'a [u8] },
    /// First frame of a multi-frame PDU.
    First { total_len: usize, payload: &'a [u8] },
    /// Consecutive frame.
    Consecutive { seq: u8, payload: &'a [u8] },
    /// Flow control frame.
    FlowControl { status: FlowStatus, bs: u8, stmin: Duration },
}

/// Returns the smallest legal DLC greater than or equal to `n`.
///
/// Classical CAN frames are always 8 bytes; CAN-FD frames are quantized to
/// the ladder in [CAN_FD_DATA_LENGTHS].
pub fn pad_to_dlc(n: usize, can_fd: bool) -> usize {
    if !can_fd {
        return 8;
    }
    CAN_FD_DATA_LENGTHS
        .iter()
        .copied()
        .find(|&size| size >= n)
        .unwrap_or(*CAN_FD_DATA_LENGTHS.last().unwrap())
}

/// Payload bytes carried by one consecutive/single frame's data region, given
/// addressing mode and whether CAN-FD framing is in use.
pub fn max_pdu_length(cfg: &IsoTpConfig) -> usize {
    let base = if cfg.can_fd { 63 } else { 7 };
    base - cfg.addressing_mode.extension_bytes()
}

/// The classical-encoding single-frame payload threshold: PDUs at or below
/// this length use the 1-nibble length SF; larger ones (under CAN-FD) use
/// the extended SF header, and larger still go through FF/CF.
///
/// This is the 4-bit PCI nibble's own limit (7 bytes, minus any addressing
/// extension byte) and holds regardless of `can_fd` - a classical-CAN-sized
/// payload over CAN-FD still needs the extended header once it exceeds the
/// nibble, since the nibble length and the FF/CF/FC PCI high nibbles share
/// the same byte.
pub fn single_frame_threshold(cfg: &IsoTpConfig) -> usize {
    7 - cfg.addressing_mode.extension_bytes()
}

/// Single-frame payload capacity when using the CAN-FD extended SF header
/// (PCI low nibble `0`, length in the following byte).
pub fn extended_single_frame_capacity(cfg: &IsoTpConfig) -> usize {
    62 - cfg.addressing_mode.extension_bytes()
}

fn ext_offset(cfg: &IsoTpConfig) -> usize {
    cfg.addressing_mode.extension_bytes()
}

/// Builds a single frame. Chooses the classical 1-nibble length encoding
/// when `payload` fits, otherwise (CAN-FD only) the extended SF header.
pub fn make_single_frame(payload: &[u8], cfg: &IsoTpConfig) -> DiagResult<Vec<u8>> {
    let ext = ext_offset(cfg);
    let classical_cap = single_frame_threshold(cfg);
    let mut frame = Vec::new();
    if ext == 1 {
        frame.push(cfg.n_ae);
    }
    if payload.len() <= classical_cap {
        frame.push(payload.len() as u8);
        frame.extend_from_slice(payload);
    } else if cfg.can_fd && payload.len() <= extended_single_frame_capacity(cfg) {
        frame.push(0x00);
        frame.push(payload.len() as u8);
        frame.extend_from_slice(payload);
    } else {
        return Err(DiagError::PayloadTooLarge(payload.len()));
    }
    let dlc = pad_to_dlc(frame.len(), cfg.can_fd);
    frame.resize(dlc, cfg.padding_byte);
    Ok(frame)
}

/// Builds a first frame. `payload` is the full PDU; only the leading chunk
/// that fits is copied in - the caller advances its own cursor by the
/// returned consumed length.
pub fn make_first_frame(payload: &[u8], total_len: usize, cfg: &IsoTpConfig) -> (Vec<u8>, usize) {
    let ext = ext_offset(cfg);
    let mut frame = Vec::new();
    if ext == 1 {
        frame.push(cfg.n_ae);
    }
    frame.push(0x10 | ((total_len >> 8) as u8 & 0x0F));
    frame.push((total_len & 0xFF) as u8);
    let capacity = max_pdu_length(cfg) - 1;
    let take = capacity.min(payload.len());
    frame.extend_from_slice(&payload[..take]);
    let dlc = pad_to_dlc(frame.len(), cfg.can_fd);
    frame.resize(dlc, cfg.padding_byte);
    (frame, take)
}

/// Builds one consecutive frame carrying `chunk` with sequence number `seq`
/// (`seq` is masked to its low nibble; callers are responsible for the 1..15,0
/// wraparound).
pub fn make_consecutive_frame(chunk: &[u8], seq: u8, cfg: &IsoTpConfig) -> Vec<u8> {
    let ext = ext_offset(cfg);
    let mut frame = Vec::new();
    if ext == 1 {
        frame.push(cfg.n_ae);
    }
    frame.push(0x20 | (seq & 0x0F));
    frame.extend_from_slice(chunk);
    let dlc = pad_to_dlc(frame.len(), cfg.can_fd);
    frame.resize(dlc, cfg.padding_byte);
    frame
}

/// Builds a flow-control frame.
pub fn make_flow_control(fs: u8, bs: u8, stmin: Duration, cfg: &IsoTpConfig) -> DiagResult<Vec<u8>> {
    let ext = ext_offset(cfg);
    let mut frame = Vec::new();
    if ext == 1 {
        frame.push(cfg.n_ae);
    }
    frame.push(0x30 | (fs & 0x0F));
    frame.push(bs);
    frame.push(encode_stmin(stmin)?);
    let dlc = pad_to_dlc(frame.len(), cfg.can_fd);
    frame.resize(dlc, cfg.padding_byte);
    Ok(frame)
}

/// Encodes a [Duration] as an ISO-TP STmin byte.
///
/// `1ms..=127ms` encodes as `0x01..=0x7F`; `100us..=900us` encodes as
/// `0xF1..=0xF9`. Any other duration is rejected.
pub fn encode_stmin(d: Duration) -> DiagResult<u8> {
    let micros = d.as_micros();
    if micros >= 1_000 && micros <= 127_000 && micros % 1_000 == 0 {
        Ok((micros / 1_000) as u8)
    } else if micros >= 100 && micros <= 900 && micros % 100 == 0 {
        Ok(0xF0 + (micros / 100) as u8)
    } else {
        Err(DiagError::ConfigError(format!(
            "STmin {:?} is not representable (need 1-127ms or 100-900us in round units)",
            d
        )))
    }
}

/// Decodes an ISO-TP STmin byte to a [Duration].
pub fn decode_stmin(val: u8) -> DiagResult<Duration> {
    if val <= 0x7F {
        Ok(Duration::from_millis(val as u64))
    } else if (0xF1..=0xF9).contains(&val) {
        Ok(Duration::from_micros(100 * (val & 0x0F) as u64))
    } else {
        Err(DiagError::ConfigError(format!("invalid STmin byte 0x{:02X}", val)))
    }
}

/// Classifies one inbound frame's raw bytes (address-extension byte, if any,
/// already stripped by the caller per `cfg.addressing_mode`).
pub fn parse_frame(data: &[u8]) -> DiagResult<FrameKind<'_>> {
    if data.is_empty() {
        return Err(DiagError::ProtocolUnexpectedFc);
    }
    let pci_hi = (data[0] & 0xF0) >> 4;
    match pci_hi {
        0x0 => {
            let len = (data[0] & 0x0F) as usize;
            if len == 0 {
                // CAN-FD extended SF: next byte carries an 8-bit length.
                let len = *data.get(1).ok_or(DiagError::ProtocolResponseTooShort)? as usize;
                let payload = data.get(2..2 + len).ok_or(DiagError::ProtocolResponseTooShort)?;
                Ok(FrameKind::Single { payload })
            } else {
                let payload = data.get(1..1 + len).ok_or(DiagError::ProtocolResponseTooShort)?;
                Ok(FrameKind::Single { payload })
            }
        }
        0x1 => {
            let total_len = (((data[0] & 0x0F) as usize) << 8) | *data.get(1).ok_or(DiagError::ProtocolResponseTooShort)? as usize;
            let payload = data.get(2..).unwrap_or(&[]);
            Ok(FrameKind::First { total_len, payload })
        }
        0x2 => {
            let seq = data[0] & 0x0F;
            let payload = data.get(1..).unwrap_or(&[]);
            Ok(FrameKind::Consecutive { seq, payload })
        }
        0x3 => {
            let fs = data[0] & 0x0F;
            let status = match fs {
                0 => FlowStatus::ContinueToSend,
                1 => FlowStatus::Wait,
                2 => FlowStatus::Overflow,
                _ => return Err(DiagError::ProtocolUnexpectedFc),
            };
            let bs = *data.get(1).ok_or(DiagError::ProtocolUnexpectedFc)?;
            let stmin = decode_stmin(*data.get(2).ok_or(DiagError::ProtocolUnexpectedFc)?)?;
            Ok(FrameKind::FlowControl { status, bs, stmin })
        }
        _ => Err(DiagError::ProtocolUnexpectedFc),
    }
}

/// Strips the address-extension byte from an inbound frame when the
/// addressing mode consumes one, returning the remaining frame bytes.
pub fn strip_extension<'a>(data: &'a [u8], cfg: &IsoTpConfig) -> &'a [u8] {
    match cfg.addressing_mode {
        AddressingMode::Extended | AddressingMode::Mixed => data.get(1..).unwrap_or(&[]),
        AddressingMode::Normal | AddressingMode::NormalFixed => data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dlc_quantization_classical_is_always_eight() {
        for n in 1..=8 {
            assert_eq!(pad_to_dlc(n, false), 8);
        }
    }

    #[test]
    fn dlc_quantization_can_fd_picks_minimum_ladder_step() {
        assert_eq!(pad_to_dlc(1, true), 8);
        assert_eq!(pad_to_dlc(8, true), 8);
        assert_eq!(pad_to_dlc(9, true), 12);
        assert_eq!(pad_to_dlc(20, true), 20);
        assert_eq!(pad_to_dlc(21, true), 24);
        assert_eq!(pad_to_dlc(48, true), 48);
        assert_eq!(pad_to_dlc(49, true), 64);
        assert_eq!(pad_to_dlc(64, true), 64);
    }

    #[test]
    fn stmin_round_trip_millis() {
        for ms in 1u64..=127 {
            let d = Duration::from_millis(ms);
            assert_eq!(decode_stmin(encode_stmin(d).unwrap()).unwrap(), d);
        }
    }

    #[test]
    fn stmin_round_trip_micros() {
        for step in 1u64..=9 {
            let d = Duration::from_micros(step * 100);
            assert_eq!(decode_stmin(encode_stmin(d).unwrap()).unwrap(), d);
        }
    }

    #[test]
    fn stmin_rejects_out_of_range() {
        assert!(encode_stmin(Duration::from_millis(128)).is_err());
        assert!(encode_stmin(Duration::from_micros(950)).is_err());
    }

    #[test]
    fn single_frame_classical_layout() {
        let cfg = IsoTpConfig::default();
        let frame = make_single_frame(&[0x22, 0xF1, 0x8C], &cfg).unwrap();
        assert_eq!(frame[0], 0x03);
        assert_eq!(&frame[1..4], &[0x22, 0xF1, 0x8C]);
        assert_eq!(frame.len(), 8);
    }

    #[test]
    fn first_frame_matches_scenario_six() {
        // total_len = 500 = 0x1F4: high nibble 0x1 goes into PCI byte 0,
        // 0xF4 is the low byte - standard 12-bit ISO-TP length encoding.
        let cfg = IsoTpConfig::default();
        let payload = vec![0xAAu8; 500];
        let (frame, consumed) = make_first_frame(&payload, 500, &cfg);
        assert_eq!(frame[0], 0x11);
        assert_eq!(frame[1], 0xF4);
        assert_eq!(consumed, 6);
        assert_eq!(frame.len(), 8);
    }

    #[test]
    fn consecutive_frame_sequence_nibble() {
        let cfg = IsoTpConfig::default();
        let frame = make_consecutive_frame(&[1, 2, 3], 1, &cfg);
        assert_eq!(frame[0], 0x21);
        let frame = make_consecutive_frame(&[1, 2, 3], 0, &cfg);
        assert_eq!(frame[0], 0x20);
    }

    #[test]
    fn flow_control_layout_matches_scenario_six() {
        let cfg = IsoTpConfig::default();
        let frame = make_flow_control(0, 20, Duration::from_millis(1), &cfg).unwrap();
        assert_eq!(&frame[0..3], &[0x30, 20, 0x01]);
    }

    #[test]
    fn can_fd_single_frame_over_nibble_cap_uses_extended_header() {
        // A 30-byte payload is past the classical nibble cap (7) but well
        // under the extended SF capacity, so it must take the `[0x00, len,
        // ...]` branch rather than being misread as a First Frame.
        let cfg = IsoTpConfig { can_fd: true, ..IsoTpConfig::default() };
        let payload: Vec<u8> = (0..30u8).collect();
        let frame = make_single_frame(&payload, &cfg).unwrap();
        assert_eq!(frame[0], 0x00);
        assert_eq!(frame[1], 30);
        assert_eq!(&frame[2..32], &payload[..]);
        assert_eq!(frame.len(), 32);

        let parsed = parse_frame(&frame).unwrap();
        match parsed {
            FrameKind::Single { payload: decoded } => assert_eq!(decoded, &payload[..]),
            other => panic!("expected Single, got {:?}", other),
        }
    }

    #[test]
    fn can_fd_single_frame_within_nibble_cap_still_uses_classical_header() {
        let cfg = IsoTpConfig { can_fd: true, ..IsoTpConfig::default() };
        let payload = vec![0x11, 0x22, 0x33];
        let frame = make_single_frame(&payload, &cfg).unwrap();
        assert_eq!(frame[0], 0x03);
        assert_eq!(&frame[1..4], &payload[..]);

        let parsed = parse_frame(&frame).unwrap();
        match parsed {
            FrameKind::Single { payload: decoded } => assert_eq!(decoded, &payload[..]),
            other => panic!("expected Single, got {:?}", other),
        }
    }
}
