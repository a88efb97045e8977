//! ISO-TP sender: segments one UDS PDU into CAN frames, honoring flow
//! control from the ECU.
//!
//! `IDLE -> SEND_SINGLE_FRAME` (done) or
//! `IDLE -> SEND_FIRST_FRAME -> WAIT_FLOW_CONTROL -> SEND_CONSECUTIVE_FRAME -> (WAIT_FLOW_CONTROL | done)`.

use std::time::{Duration, Instant};

use crate::bus::{BusAdapter, CanFrame};
use crate::config::IsoTpConfig;
use crate::error::{DiagError, DiagResult};
use crate::isotp::frame::{self, FlowStatus, FrameKind};
use crate::isotp::queue::FrameQueue;

/// Maximum UDS PDU length ISO-TP can carry (12-bit first-frame length field).
pub const CANTP_MAX_PAYLOAD_LENGTH: usize = 4095;

/// Safety cap on the number of consecutive frames sent in one block when the
/// ECU's flow control signals `BS=0` ("send everything"). True ISO-TP
/// semantics treat `BS=0` as unbounded; this cap exists only so a
/// misbehaving ECU can't make a send loop forever.
pub const BS_ZERO_SAFETY_CAP: usize = 585;

/// Default time to wait for a flow-control frame before giving up.
pub const DEFAULT_FC_TIMEOUT: Duration = Duration::from_millis(1000);

/// Sends `pdu` over `bus`, consuming flow-control frames from `queue`.
/// Blocks until the whole PDU has been transmitted or a protocol error /
/// timeout occurs.
pub fn send(pdu: &[u8], bus: &mut dyn BusAdapter, queue: &FrameQueue, cfg: &IsoTpConfig) -> DiagResult<()> {
    if pdu.len() > CANTP_MAX_PAYLOAD_LENGTH {
        return Err(DiagError::PayloadTooLarge(pdu.len()));
    }

    let classical_cap = frame::single_frame_threshold(cfg);
    let fits_single = pdu.len() <= classical_cap
        || (cfg.can_fd && pdu.len() <= frame::extended_single_frame_capacity(cfg));

    if fits_single {
        let sf = frame::make_single_frame(pdu, cfg)?;
        log::trace!("tx SF ({} bytes)", pdu.len());
        bus.transmit(&CanFrame::new(cfg.req_id, &sf, false))?;
        return Ok(());
    }

    let (ff, mut sent) = frame::make_first_frame(pdu, pdu.len(), cfg);
    log::debug!("tx FF, total_len={}", pdu.len());
    bus.transmit(&CanFrame::new(cfg.req_id, &ff, false))?;

    let max_pdu = frame::max_pdu_length(cfg);
    let mut seq: u8 = 1;

    while sent < pdu.len() {
        let deadline = Instant::now() + DEFAULT_FC_TIMEOUT;
        let (_, raw) = queue.pop(deadline).ok_or(DiagError::TimeoutFlowControl)?;
        let data = frame::strip_extension(&raw, cfg);
        let (status, bs, stmin) = match frame::parse_frame(data)? {
            FrameKind::FlowControl { status, bs, stmin } => (status, bs, stmin),
            _ => {
                log::warn!("expected flow control, got something else; aborting send");
                return Err(DiagError::ProtocolUnexpectedFc);
            }
        };

        match status {
            FlowStatus::Wait => return Err(DiagError::ProtocolWaitUnsupported),
            FlowStatus::Overflow => return Err(DiagError::ProtocolOverflow),
            FlowStatus::ContinueToSend => {}
        }

        let block_size = if bs == 0 { BS_ZERO_SAFETY_CAP } else { bs as usize };
        log::debug!("rx FC: bs={}, stmin={:?}", bs, stmin);

        for _ in 0..block_size {
            if sent >= pdu.len() {
                break;
            }
            std::thread::sleep(stmin);
            let end = (sent + max_pdu).min(pdu.len());
            let chunk = &pdu[sent..end];
            let cf = frame::make_consecutive_frame(chunk, seq, cfg);
            bus.transmit(&CanFrame::new(cfg.req_id, &cf, false))?;
            log::trace!("tx CF seq={} ({} bytes)", seq, chunk.len());
            sent = end;
            seq = if seq == 15 { 0 } else { seq + 1 };
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loopback::LoopbackBus;

    #[test]
    fn single_frame_payload_sends_one_frame() {
        let cfg = IsoTpConfig::default();
        let mut bus = LoopbackBus::new();
        let queue = FrameQueue::new(8);
        send(&[0x22, 0xF1, 0x8C], &mut bus, &queue, &cfg).unwrap();
        let sent = bus.take_sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].data()[0], 0x03);
    }

    #[test]
    fn multi_frame_send_with_bs_zero_sends_everything_after_one_fc() {
        let cfg = IsoTpConfig::default();
        let mut bus = LoopbackBus::new();
        let queue = FrameQueue::new(8);
        let payload = vec![0xAAu8; 500];

        // BS=0: true ISO-TP semantics mean "send everything", so one FC
        // should be enough for the whole 500-byte payload.
        queue.push(0x7E8, vec![0x30, 0x00, 0x01, 0, 0, 0, 0, 0]);

        send(&payload, &mut bus, &queue, &cfg).unwrap();
        let sent = bus.take_sent();
        // 1 FF (6 bytes) + 71 CF (7 bytes each) covers the remaining 494 bytes.
        assert_eq!(sent.len(), 72);
        assert_eq!(sent[0].data()[0], 0x11);
        assert_eq!(sent[0].data()[1], 0xF4);
        assert_eq!(sent[1].data()[0], 0x21);
        let last = sent.last().unwrap();
        assert_eq!(last.data()[0] & 0xF0, 0x20);
    }

    #[test]
    fn multi_frame_send_honors_block_size_and_requests_more_fc() {
        let cfg = IsoTpConfig::default();
        let mut bus = LoopbackBus::new();
        let queue = FrameQueue::new(8);
        // 6 (FF) + 7*20 = 146 bytes needs exactly one block of 20 CFs.
        let payload = vec![0xAAu8; 146];

        queue.push(0x7E8, vec![0x30, 20, 0x01, 0, 0, 0, 0, 0]);

        send(&payload, &mut bus, &queue, &cfg).unwrap();
        let sent = bus.take_sent();
        assert_eq!(sent.len(), 21); // 1 FF + 20 CF, block exactly exhausted
    }
}
