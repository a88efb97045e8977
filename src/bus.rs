//! The CAN bus boundary: the raw hardware/driver interface this crate's ISO-TP
//! stack is built on top of.
//!
//! Unlike a channel that speaks ISO-TP natively (as some CAN adapters do), the
//! [BusAdapter] trait here is deliberately thin: it moves single CAN frames in
//! and out. Everything above it - framing, flow control, reassembly - lives in
//! [crate::isotp] and is implemented by this crate, not delegated to hardware.

use std::{
    borrow::BorrowMut,
    sync::{Arc, Mutex},
};

/// Result type for [BusAdapter] operations.
pub type BusResult<T> = Result<T, BusError>;

/// Error produced by a bus adapter.
#[derive(Debug)]
pub enum BusError {
    /// Underlying IO error talking to the adapter (serial port, socket, ...).
    IOError(std::io::Error),
    /// Timeout writing a frame to the bus.
    WriteTimeout,
    /// The interface is not open.
    InterfaceNotOpen,
    /// Adapter rejected the requested CAN/CAN-FD configuration.
    ConfigurationError,
    /// Catch-all for adapter-specific failures that don't fit the above.
    Other(String),
}

impl std::fmt::Display for BusError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BusError::IOError(e) => write!(f, "bus IO error: {}", e),
            BusError::WriteTimeout => write!(f, "timeout writing frame to bus"),
            BusError::InterfaceNotOpen => write!(f, "bus interface is not open"),
            BusError::ConfigurationError => write!(f, "bus adapter rejected configuration"),
            BusError::Other(s) => write!(f, "bus error: {}", s),
        }
    }
}

impl std::error::Error for BusError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BusError::IOError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for BusError {
    fn from(e: std::io::Error) -> Self {
        BusError::IOError(e)
    }
}

/// One CAN or CAN-FD frame: an arbitration ID plus up to 64 bytes of data.
///
/// Classical CAN frames use at most 8 bytes; CAN-FD frames are quantized to
/// one of `{8, 12, 16, 20, 24, 32, 48, 64}` by [crate::isotp::frame::pad_to_dlc].
#[derive(Debug, Clone)]
pub struct CanFrame {
    id: u32,
    len: u8,
    data: [u8; 64],
    ext: bool,
}

impl CanFrame {
    /// Creates a new frame. `data` is truncated to 64 bytes if longer.
    ///
    /// If `id` is greater than `0x7FF`, extended (29-bit) addressing is
    /// implied regardless of `is_ext`.
    pub fn new(id: u32, data: &[u8], is_ext: bool) -> Self {
        let max = std::cmp::min(64, data.len());
        let mut tmp = [0u8; 64];
        tmp[0..max].copy_from_slice(&data[0..max]);
        Self {
            id,
            len: max as u8,
            data: tmp,
            ext: is_ext || id > 0x7FF,
        }
    }

    /// The CAN arbitration ID.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// The frame's data bytes (length equals the frame's DLC-decoded byte count).
    pub fn data(&self) -> &[u8] {
        &self.data[0..self.len as usize]
    }

    /// True if this frame uses 29-bit (extended) addressing.
    pub fn is_extended(&self) -> bool {
        self.ext
    }
}

/// The external collaborator: a CAN/CAN-FD bus driver.
///
/// A bus adapter knows nothing about ISO-TP; it only moves whole frames.
/// `transmit` sends one frame; `register_receiver` installs a callback the
/// adapter invokes (from whatever thread owns its I/O) for every inbound
/// frame. The ISO-TP receiver filters on `res_id` itself - the adapter is not
/// expected to pre-filter.
pub trait BusAdapter: Send + Sync {
    /// Sends a single frame on the bus.
    fn transmit(&mut self, frame: &CanFrame) -> BusResult<()>;

    /// Registers the callback invoked for every inbound frame.
    ///
    /// Calling this again replaces the previous callback. Implementations
    /// must not block the calling thread - the callback is expected to be
    /// invoked from the adapter's own I/O thread.
    fn register_receiver(&mut self, callback: Box<dyn FnMut(u32, &[u8]) + Send>) -> BusResult<()>;
}

impl<T: BusAdapter + ?Sized> BusAdapter for Box<T> {
    fn transmit(&mut self, frame: &CanFrame) -> BusResult<()> {
        T::transmit(self, frame)
    }

    fn register_receiver(&mut self, callback: Box<dyn FnMut(u32, &[u8]) + Send>) -> BusResult<()> {
        T::register_receiver(self, callback)
    }
}

impl<T: BusAdapter + ?Sized> BusAdapter for Arc<Mutex<T>> {
    fn transmit(&mut self, frame: &CanFrame) -> BusResult<()> {
        T::transmit(self.lock().map_err(|_| BusError::Other("adapter mutex poisoned".into()))?.borrow_mut(), frame)
    }

    fn register_receiver(&mut self, callback: Box<dyn FnMut(u32, &[u8]) + Send>) -> BusResult<()> {
        T::register_receiver(self.lock().map_err(|_| BusError::Other("adapter mutex poisoned".into()))?.borrow_mut(), callback)
    }
}
