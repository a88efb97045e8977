//! ISO-TP (ISO 15765-2) transport: frame codec, sender/receiver state
//! machines, and the ingress queue that couples them to a [crate::bus::BusAdapter].

pub mod frame;
pub mod queue;
pub mod receiver;
pub mod sender;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::bus::BusAdapter;
use crate::config::IsoTpConfig;
use crate::error::DiagResult;
use queue::FrameQueue;

/// Bundles a bus adapter, its ingress queue, and an ISO-TP configuration
/// into the single handle the UDS session layer sends and receives through.
///
/// Registers itself as the bus adapter's receive callback on construction:
/// every inbound frame on `cfg.res_id` (or `cfg.req_id`, for frames this
/// link addresses to itself) is pushed onto the shared queue for the
/// sender/receiver functions to consume.
pub struct IsoTpLink {
    bus: Arc<Mutex<dyn BusAdapter>>,
    queue: Arc<FrameQueue>,
    cfg: IsoTpConfig,
}

impl IsoTpLink {
    /// Wraps `bus`, registering a receive callback that filters for frames
    /// addressed to `cfg.res_id` and feeds them into a fresh [FrameQueue].
    pub fn new(bus: Arc<Mutex<dyn BusAdapter>>, cfg: IsoTpConfig) -> DiagResult<Self> {
        let queue = Arc::new(FrameQueue::default());
        let accept_id = cfg.res_id;
        {
            let queue = queue.clone();
            let mut guard = bus.lock().expect("bus mutex poisoned");
            guard.register_receiver(Box::new(move |id, data| {
                if id == accept_id {
                    queue.push(id, data.to_vec());
                }
            }))?;
        }
        Ok(Self { bus, queue, cfg })
    }

    /// Segments and transmits `pdu`, blocking until fully sent.
    pub fn send(&self, pdu: &[u8]) -> DiagResult<()> {
        let mut guard = self.bus.lock().expect("bus mutex poisoned");
        sender::send(pdu, &mut *guard, &self.queue, &self.cfg)
    }

    /// Waits for and reassembles one inbound PDU, bounded by `timeout`.
    pub fn receive(&self, timeout: Duration) -> DiagResult<Vec<u8>> {
        let mut guard = self.bus.lock().expect("bus mutex poisoned");
        receiver::receive(&mut *guard, &self.queue, &self.cfg, timeout)
    }

    /// Drops any frames buffered in the ingress queue. Used before sending a
    /// new request, so a stale response from a previous exchange can't be
    /// mistaken for the new one.
    pub fn flush_stale_frames(&self) {
        self.queue.clear();
    }

    /// The addressing/session configuration this link was built with.
    pub fn config(&self) -> &IsoTpConfig {
        &self.cfg
    }
}
