//! ISO-TP receiver: reassembles one UDS PDU from an inbound SF or FF+CF
//! sequence, emitting its own flow control for multi-frame messages.
//!
//! `IDLE -> done` (SF) or `IDLE -> SEND_FLOW_CONTROL -> RECEIVING_CONSECUTIVE_FRAME -> done` (FF).

use std::time::{Duration, Instant};

use crate::bus::{BusAdapter, CanFrame};
use crate::config::IsoTpConfig;
use crate::error::{DiagError, DiagResult};
use crate::isotp::frame::{self, FrameKind};
use crate::isotp::queue::FrameQueue;

/// STmin this client advertises to the sender in its own flow-control frames.
pub const DEFAULT_RX_STMIN: Duration = Duration::from_millis(30);

/// Waits for and reassembles one PDU from `queue`, emitting flow control on
/// `bus` if the inbound message is multi-frame. `timeout` bounds how long
/// the receiver waits for each contributing frame; it is restarted whenever
/// a frame advances the reassembly.
pub fn receive(
    bus: &mut dyn BusAdapter,
    queue: &FrameQueue,
    cfg: &IsoTpConfig,
    timeout: Duration,
) -> DiagResult<Vec<u8>> {
    loop {
        let deadline = Instant::now() + timeout;
        let (_, raw) = queue.pop(deadline).ok_or(DiagError::TimeoutRx)?;
        let data = frame::strip_extension(&raw, cfg);
        match frame::parse_frame(data)? {
            FrameKind::Single { payload } => {
                log::trace!("rx SF ({} bytes)", payload.len());
                return Ok(payload.to_vec());
            }
            FrameKind::First { total_len, payload } => {
                log::debug!("rx FF, total_len={}", total_len);
                return receive_consecutive(bus, queue, cfg, timeout, total_len, payload.to_vec());
            }
            FrameKind::Consecutive { .. } | FrameKind::FlowControl { .. } => {
                log::warn!("unexpected frame while idle; dropping");
                continue;
            }
        }
    }
}

fn receive_consecutive(
    bus: &mut dyn BusAdapter,
    queue: &FrameQueue,
    cfg: &IsoTpConfig,
    timeout: Duration,
    total_len: usize,
    mut buf: Vec<u8>,
) -> DiagResult<Vec<u8>> {
    let fc = frame::make_flow_control(0, 0, DEFAULT_RX_STMIN, cfg)?;
    bus.transmit(&CanFrame::new(cfg.req_id, &fc, false))?;

    let mut expected_seq: u8 = 1;
    while buf.len() < total_len {
        let deadline = Instant::now() + timeout;
        let (_, raw) = queue.pop(deadline).ok_or(DiagError::TimeoutRx)?;
        let data = frame::strip_extension(&raw, cfg);
        match frame::parse_frame(data)? {
            FrameKind::Consecutive { seq, payload } => {
                if seq != expected_seq {
                    return Err(DiagError::ProtocolCfSequence { expected: expected_seq, got: seq });
                }
                buf.extend_from_slice(payload);
                expected_seq = if expected_seq == 15 { 0 } else { expected_seq + 1 };
                log::trace!("rx CF seq={}, total buffered={}", seq, buf.len());
            }
            _ => {
                log::warn!("unexpected frame while reassembling; dropping");
                continue;
            }
        }
    }
    buf.truncate(total_len);
    Ok(buf)
}
