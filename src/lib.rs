//! A UDS (ISO 14229) client stack implemented directly on top of ISO-TP
//! (ISO 15765-2), for classical CAN and CAN-FD.
//!
//! Where many diagnostic crates delegate ISO-TP segmentation to a kernel
//! socket or vendor driver, this crate implements the sender and receiver
//! state machines itself, against the minimal [bus::BusAdapter] boundary.
//! That keeps the protocol logic testable against [loopback::LoopbackBus]
//! without any hardware, and portable to whatever adapter a caller has -
//! the `socketcan` feature wires one in for Linux SocketCAN/CAN-FD
//! interfaces, but it's optional.
//!
//! Module map:
//! - [bus] / [loopback]: the hardware boundary and its in-process double.
//! - [isotp]: frame codec, sender, receiver, and the ingress queue gluing
//!   them to a bus adapter.
//! - [odx]: the compiled service/parameter model the response decoder
//!   walks, and the decoder itself.
//! - [uds]: the session layer built on [isotp::IsoTpLink] - request/response
//!   correlation, response-pending retransmit, and the services built on it.

pub mod bus;
pub mod config;
pub mod error;
pub mod isotp;
pub mod loopback;
pub mod odx;
pub mod uds;

#[cfg(feature = "socketcan")]
pub mod socketcan_bus;

pub use bus::{BusAdapter, BusError, BusResult, CanFrame};
pub use config::{AddressingMode, IsoTpConfig, MessageType, UdsConfig};
pub use error::{DiagError, DiagResult};
pub use isotp::IsoTpLink;
pub use uds::UdsSession;
