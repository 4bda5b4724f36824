#![no_std]

mod advertising;
mod ble;
mod bridge;
mod codec;
mod config;
mod encode;
mod fanout;
mod frame;
mod gatt;
mod line;
mod link;
mod whitelist;

// Transmit, Standard, 7FF, DLC = 8, 0xFF * 8, CR
// t 7FF 8 FFFFFFFFFFFFFFFF \r

pub const MAX_DATA_LENGTH: usize = 8;

pub const MAX_LINE_LENGTH: usize = encode::encoded_len(MAX_DATA_LENGTH);
/// Room for the longest line plus a NUL terminator
pub const LINE_BUFFER_SIZE: usize = MAX_LINE_LENGTH + 1;

pub use advertising::*;
pub use ble::*;
pub use bridge::*;
pub use config::*;
pub use encode::*;
pub use fanout::{BleSink, Delivery, FanOut, GattNotifier, NotifyError, SinkOutcome, WiredSink};
pub use frame::*;
pub use gatt::*;
pub use line::*;
pub use link::*;
pub use whitelist::*;

pub use embedded_can::{ExtendedId, Frame, Id, StandardId};
