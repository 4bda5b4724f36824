use core::{fmt::Debug, time::Duration};

use embedded_can::{Frame, Id};
use log::{debug, info, warn};

use crate::{
    encode::{encode_into, EncodeError},
    fanout::{Delivery, FanOut, GattNotifier, WiredSink},
    whitelist::{self, WHITELIST_BYPASSED},
    BridgeConfig, FirmwareInfo, LINE_BUFFER_SIZE,
};

/// Why a receive produced no frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReceiveError<E> {
    /// Nothing arrived within the timeout
    Timeout,
    /// A recoverable bus or driver condition; retried on the next iteration
    Transient(E),
    /// The driver is gone; the bridge cannot continue
    Unavailable(E),
}

/// The CAN controller's receive queue
pub trait CanReceiver {
    type Frame: Frame;
    type Error: Debug;

    /// Blocks for at most `timeout` waiting for the next frame.
    fn receive(&mut self, timeout: Duration) -> Result<Self::Frame, ReceiveError<Self::Error>>;
}

impl<T: CanReceiver + ?Sized> CanReceiver for &mut T {
    type Frame = T::Frame;
    type Error = T::Error;

    fn receive(&mut self, timeout: Duration) -> Result<Self::Frame, ReceiveError<Self::Error>> {
        T::receive(self, timeout)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BridgeError<E: Debug> {
    #[error("CAN driver unavailable ({0:?})")]
    CanUnavailable(E),
}

/// Why a received frame was not forwarded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DropReason {
    ExtendedFrame,
    RemoteFrame,
    NotWhitelisted,
    Encode(EncodeError),
}

/// Result of one bridge iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Step {
    /// Timeout or transient receive error
    Idle,
    Dropped(DropReason),
    Forwarded(Delivery),
}

/// Pulls frames from the CAN controller, filters and encodes them, and hands
/// the lines to the fan-out.
pub struct Bridge<'a, R, W, N> {
    can: R,
    fanout: FanOut<'a, W, N>,
    config: BridgeConfig,
    wired_connected: bool,
}

impl<'a, R, W, N> Bridge<'a, R, W, N>
where
    R: CanReceiver,
    W: WiredSink,
    N: GattNotifier,
{
    pub fn new(can: R, fanout: FanOut<'a, W, N>, config: BridgeConfig) -> Self {
        let firmware = FirmwareInfo::CURRENT;
        info!(
            "{} v{} ({})",
            firmware.name, firmware.version, firmware.revision
        );

        if WHITELIST_BYPASSED {
            warn!("whitelist bypassed: forwarding ALL standard CAN frames (no filtering)");
        }

        Self {
            can,
            fanout,
            config,
            wired_connected: false,
        }
    }

    /// Runs until the CAN driver becomes unavailable.
    pub fn run(&mut self) -> BridgeError<R::Error> {
        info!("SLCAN bridge running");

        loop {
            if let Err(e) = self.poll() {
                return e;
            }
        }
    }

    /// One iteration: wired-connection edge check, bounded receive, filter,
    /// encode and fan-out.
    pub fn poll(&mut self) -> Result<Step, BridgeError<R::Error>> {
        let now_connected = self.fanout.wired_connected();
        if now_connected != self.wired_connected {
            info!("CDC connected: {}", if now_connected { "yes" } else { "no" });
            self.wired_connected = now_connected;
        }

        let frame = match self.can.receive(self.config.receive_timeout) {
            Ok(frame) => frame,
            Err(ReceiveError::Timeout) => return Ok(Step::Idle),
            Err(ReceiveError::Transient(e)) => {
                debug!("CAN receive error: {:?}", e);
                return Ok(Step::Idle);
            }
            Err(ReceiveError::Unavailable(e)) => return Err(BridgeError::CanUnavailable(e)),
        };

        Ok(self.forward(&frame))
    }

    fn forward(&mut self, frame: &R::Frame) -> Step {
        let id = match frame.id() {
            Id::Standard(id) => id,
            Id::Extended(_) => return Step::Dropped(DropReason::ExtendedFrame),
        };

        if frame.is_remote_frame() {
            return Step::Dropped(DropReason::RemoteFrame);
        }

        if !whitelist::is_allowed(id) {
            return Step::Dropped(DropReason::NotWhitelisted);
        }

        let mut buf = [0u8; LINE_BUFFER_SIZE];
        let len = match encode_into(frame, &mut buf) {
            Ok(len) => len,
            Err(e) => {
                debug!("frame {:03X} not encoded: {}", id.as_raw(), e);
                return Step::Dropped(DropReason::Encode(e));
            }
        };

        Step::Forwarded(self.fanout.send(&buf[..len]))
    }
}
