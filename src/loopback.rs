//! An in-process [BusAdapter] used by this crate's own tests, and usable
//! as a template for a real adapter's `transmit`/`register_receiver` pairing.
//!
//! No physical bus is available in a unit test, so every Testable Property in
//! this crate is exercised against a [LoopbackBus] instead: frames handed to
//! `transmit` are captured, and a test (or a tiny ECU simulator) replays bytes
//! back in by calling [LoopbackBus::inject], which drives whatever callback
//! was installed via `register_receiver` - exactly as a real driver's I/O
//! thread would.

use std::sync::{Arc, Mutex};

use crate::bus::{BusAdapter, BusError, BusResult, CanFrame};

type Callback = Box<dyn FnMut(u32, &[u8]) + Send>;

/// A loopback bus adapter: captures transmitted frames, and lets a caller
/// inject inbound frames to drive the registered receiver callback.
#[derive(Clone)]
pub struct LoopbackBus {
    sent: Arc<Mutex<Vec<CanFrame>>>,
    callback: Arc<Mutex<Option<Callback>>>,
}

impl LoopbackBus {
    /// Creates a new, empty loopback bus.
    pub fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            callback: Arc::new(Mutex::new(None)),
        }
    }

    /// Drains and returns every frame handed to [BusAdapter::transmit] so far.
    pub fn take_sent(&self) -> Vec<CanFrame> {
        std::mem::take(&mut *self.sent.lock().unwrap())
    }

    /// Feeds `data` addressed to `can_id` to the registered receiver callback,
    /// as if it had just arrived on the wire.
    pub fn inject(&self, can_id: u32, data: &[u8]) {
        if let Some(cb) = self.callback.lock().unwrap().as_mut() {
            cb(can_id, data);
        }
    }
}

impl Default for LoopbackBus {
    fn default() -> Self {
        Self::new()
    }
}

impl BusAdapter for LoopbackBus {
    fn transmit(&mut self, frame: &CanFrame) -> BusResult<()> {
        self.sent.lock().unwrap().push(frame.clone());
        Ok(())
    }

    fn register_receiver(&mut self, callback: Callback) -> BusResult<()> {
        *self.callback.lock().map_err(|_| BusError::Other("loopback mutex poisoned".into()))? = Some(callback);
        Ok(())
    }
}
