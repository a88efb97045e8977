//! A [crate::bus::BusAdapter] backed by a Linux SocketCAN interface, via the
//! `socketcan` crate. Entirely optional - gated behind the `socketcan`
//! feature - since the ISO-TP and UDS layers only depend on the
//! [crate::bus::BusAdapter] trait, not on any particular transport.

use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use socketcan::{CanFrame as SocketCanFrame, CanSocket, EmbeddedFrame, ExtendedId, Frame, Socket, StandardId};

use crate::bus::{BusAdapter, BusError, BusResult, CanFrame};

type Callback = Box<dyn FnMut(u32, &[u8]) + Send>;

/// A [BusAdapter] over a SocketCAN interface (e.g. `can0`, `vcan0`).
///
/// Spawns a background thread that blocks on `read_frame` and forwards
/// every received frame to whatever callback was last passed to
/// [BusAdapter::register_receiver].
pub struct SocketCanBus {
    iface: String,
    socket: CanSocket,
    callback: Arc<Mutex<Option<Callback>>>,
    reader: Option<JoinHandle<()>>,
}

impl SocketCanBus {
    /// Opens `iface` (e.g. `"can0"`) for reading and writing.
    pub fn open(iface: &str) -> BusResult<Self> {
        let socket = CanSocket::open(iface).map_err(|e| BusError::Other(e.to_string()))?;
        Ok(Self { iface: iface.to_string(), socket, callback: Arc::new(Mutex::new(None)), reader: None })
    }
}

impl BusAdapter for SocketCanBus {
    fn transmit(&mut self, frame: &CanFrame) -> BusResult<()> {
        let can_frame = if frame.is_extended() {
            let id = ExtendedId::new(frame.id()).ok_or(BusError::ConfigurationError)?;
            SocketCanFrame::new(id, frame.data()).ok_or(BusError::ConfigurationError)?
        } else {
            let id = StandardId::new(frame.id() as u16).ok_or(BusError::ConfigurationError)?;
            SocketCanFrame::new(id, frame.data()).ok_or(BusError::ConfigurationError)?
        };
        self.socket.write_frame(&can_frame).map_err(|e| BusError::IOError(e))?;
        Ok(())
    }

    fn register_receiver(&mut self, callback: Callback) -> BusResult<()> {
        *self.callback.lock().map_err(|_| BusError::Other("socketcan callback mutex poisoned".into()))? = Some(callback);
        if self.reader.is_none() {
            // Opened independently rather than sharing `self.socket`, so the
            // reader thread's blocking `read_frame` can't stall `transmit`.
            let socket = CanSocket::open(&self.iface).map_err(|e| BusError::Other(e.to_string()))?;
            let callback = self.callback.clone();
            self.reader = Some(std::thread::spawn(move || loop {
                match socket.read_frame() {
                    Ok(frame) => {
                        let id = match frame.id() {
                            socketcan::Id::Standard(s) => s.as_raw() as u32,
                            socketcan::Id::Extended(e) => e.as_raw(),
                        };
                        if let Some(cb) = callback.lock().expect("socketcan callback mutex poisoned").as_mut() {
                            cb(id, frame.data());
                        }
                    }
                    Err(_) => break,
                }
            }));
        }
        Ok(())
    }
}
