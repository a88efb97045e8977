//! The UDS (ISO 14229) session layer: request/response correlation over an
//! [crate::isotp::IsoTpLink], response-pending (`NRC 0x78`) retransmit
//! absorption, and the dispatch-table pattern services like
//! [rdbi]/[ecu_reset] are built on.
//!
//! Unlike the reference implementation this crate's client layer started
//! from, there is no background server thread or command channel: `send`
//! is a synchronous call on the caller's thread. A tester-present loop, if
//! the caller wants one, is the caller's own thread coordinating through
//! [UdsSession::is_transmitting].

pub mod ecu_reset;
pub mod nrc;
pub mod rdbi;
pub mod session_control;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::config::UdsConfig;
use crate::error::{DiagError, DiagResult};
use crate::isotp::IsoTpLink;
use crate::uds::nrc::NRC_RESPONSE_PENDING;

/// Timing and pending-response bookkeeping recorded for the last [UdsSession::send] call.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExchangeStats {
    /// Total wall-clock time from request transmission to the final response.
    pub round_trip: Duration,
    /// How many `NRC 0x78` (response pending) frames were absorbed.
    pub pending_count: u32,
    /// Time elapsed between the request and the first pending echo, if any.
    pub first_pending_gap: Option<Duration>,
}

/// A single logical UDS client bound to one [IsoTpLink].
///
/// Only one request may be outstanding at a time: [UdsSession::send] takes a
/// coarse mutex for its duration. [UdsSession::is_transmitting] lets an
/// external tester-present thread check whether it should defer without
/// blocking on that mutex itself.
pub struct UdsSession {
    link: Mutex<IsoTpLink>,
    cfg: UdsConfig,
    is_transmitting: AtomicBool,
    last_stats: Mutex<ExchangeStats>,
}

impl UdsSession {
    pub fn new(link: IsoTpLink, cfg: UdsConfig) -> Self {
        Self {
            link: Mutex::new(link),
            cfg,
            is_transmitting: AtomicBool::new(false),
            last_stats: Mutex::new(ExchangeStats::default()),
        }
    }

    /// True while a [UdsSession::send] call is in flight on another thread.
    pub fn is_transmitting(&self) -> bool {
        self.is_transmitting.load(Ordering::Acquire)
    }

    /// Timing/pending-count data from the most recently completed exchange.
    pub fn last_exchange_stats(&self) -> ExchangeStats {
        *self.last_stats.lock().expect("stats mutex poisoned")
    }

    /// Sends `pdu` and, if `response_required`, waits for its final response.
    ///
    /// `functional` requests are fire-and-forget: no response is awaited
    /// regardless of `response_required`. Otherwise, `NRC 0x78` ("response
    /// correctly received, response pending") responses are absorbed here -
    /// the loop keeps waiting rather than returning them to the caller.
    pub fn send(&self, pdu: &[u8], response_required: bool, functional: bool) -> DiagResult<Vec<u8>> {
        let link = self.link.lock().expect("isotp link mutex poisoned");
        self.is_transmitting.store(true, Ordering::Release);
        let start = Instant::now();
        let result = self.send_locked(&link, pdu, response_required, functional, start);
        self.is_transmitting.store(false, Ordering::Release);
        result
    }

    fn send_locked(
        &self,
        link: &IsoTpLink,
        pdu: &[u8],
        response_required: bool,
        functional: bool,
        start: Instant,
    ) -> DiagResult<Vec<u8>> {
        link.flush_stale_frames();
        link.send(pdu)?;

        if functional || !response_required {
            log::debug!("sent {} bytes, no response expected", pdu.len());
            return Ok(Vec::new());
        }

        let discard_neg_resp = link.config().discard_neg_resp;
        let mut pending_count = 0u32;
        let mut first_pending_gap = None;
        loop {
            let response = link.receive(self.cfg.p2_can_client)?;
            if response.len() >= 3 && response[0] == 0x7F && response[2] == NRC_RESPONSE_PENDING {
                pending_count += 1;
                let gap = start.elapsed();
                if first_pending_gap.is_none() {
                    first_pending_gap = Some(gap);
                }
                log::debug!("ECU signalled response pending (#{}, {:?} elapsed)", pending_count, gap);
                continue;
            }

            if discard_neg_resp && response.len() >= 2 && response[0] == 0x7F {
                log::debug!("discarding negative response (NRC 0x{:02X}) per configuration", response.get(2).copied().unwrap_or(0));
                continue;
            }

            let round_trip = start.elapsed();
            log::debug!("exchange complete in {:?} ({} pending responses)", round_trip, pending_count);
            *self.last_stats.lock().expect("stats mutex poisoned") =
                ExchangeStats { round_trip, pending_count, first_pending_gap };
            return Ok(response);
        }
    }
}

/// Checks whether `response` is a negative response for `request_sid`, and
/// if so extracts its NRC and label. The dispatch contract is total: this
/// never raises, it only classifies.
pub fn classify_negative_response(response: &[u8], request_sid: u8) -> Option<(u8, Option<&'static str>)> {
    if response.len() >= 3 && response[0] == 0x7F && response[1] == request_sid {
        let nrc = response[2];
        Some((nrc, nrc::lookup(nrc)))
    } else {
        None
    }
}

/// Error helper for dispatch functions that need a hard failure rather than
/// the "never throws" negative-response classification (e.g. a response too
/// short to contain even a SID byte).
pub fn check_positive_sid(response: &[u8], expected_sid: u8) -> DiagResult<()> {
    match response.first() {
        Some(&sid) if sid == expected_sid => Ok(()),
        Some(&sid) => Err(DiagError::ProtocolBadResponseSid { expected: expected_sid, got: sid }),
        None => Err(DiagError::ProtocolResponseTooShort),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::BusAdapter;
    use crate::config::IsoTpConfig;
    use crate::loopback::LoopbackBus;
    use std::sync::Arc;

    fn session_with_loopback() -> (UdsSession, LoopbackBus) {
        let bus = LoopbackBus::new();
        let bus_clone = bus.clone();
        let link = IsoTpLink::new(Arc::new(Mutex::new(bus_clone)), IsoTpConfig::default()).unwrap();
        (UdsSession::new(link, UdsConfig::default()), bus)
    }

    #[test]
    fn functional_send_does_not_wait_for_response() {
        let (session, _bus) = session_with_loopback();
        let result = session.send(&[0x22, 0xF1, 0x90], false, true).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn pending_response_is_absorbed_and_retried() {
        let (session, bus) = session_with_loopback();
        // Inject: one pending (0x78), then the real response, both addressed
        // to this session's res_id as single frames.
        let bus_for_injection = bus.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(5));
            bus_for_injection.inject(0x7E8, &[0x03, 0x7F, 0x22, 0x78, 0, 0, 0, 0]);
            std::thread::sleep(Duration::from_millis(5));
            bus_for_injection.inject(0x7E8, &[0x03, 0x62, 0xF1, 0x8C, 0, 0, 0, 0]);
        });
        let response = session.send(&[0x22, 0xF1, 0x8C], true, false).unwrap();
        handle.join().unwrap();
        assert_eq!(response, vec![0x62, 0xF1, 0x8C]);
        assert_eq!(session.last_exchange_stats().pending_count, 1);
    }
}
