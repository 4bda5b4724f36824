use core::fmt::Debug;

use log::{debug, warn};

use crate::{AttrHandle, BleLink, ConnHandle};

/// The wired serial endpoint (USB CDC-ACM on the reference hardware)
pub trait WiredSink {
    type Error: Debug;

    /// A host currently has the port open.
    fn is_connected(&mut self) -> bool;

    /// Queues bytes for transmission and returns how many were accepted.
    fn write_queue(&mut self, data: &[u8]) -> Result<usize, Self::Error>;

    /// Pushes queued bytes out without waiting for completion.
    fn flush(&mut self) -> Result<(), Self::Error>;
}

impl<T: WiredSink + ?Sized> WiredSink for &mut T {
    type Error = T::Error;

    fn is_connected(&mut self) -> bool {
        T::is_connected(self)
    }

    fn write_queue(&mut self, data: &[u8]) -> Result<usize, Self::Error> {
        T::write_queue(self, data)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        T::flush(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NotifyError {
    /// The host's outgoing buffer pool is exhausted
    #[error("BLE stack congested")]
    Congested,
    #[error("Notification failed (rc={0})")]
    Other(i32),
}

/// Sends GATT notifications on behalf of the bridge context
pub trait GattNotifier {
    fn notify(
        &mut self,
        conn_handle: ConnHandle,
        value_handle: AttrHandle,
        data: &[u8],
    ) -> Result<(), NotifyError>;
}

impl<T: GattNotifier + ?Sized> GattNotifier for &mut T {
    fn notify(
        &mut self,
        conn_handle: ConnHandle,
        value_handle: AttrHandle,
        data: &[u8],
    ) -> Result<(), NotifyError> {
        T::notify(self, conn_handle, value_handle, data)
    }
}

/// What happened to a line on one sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SinkOutcome {
    Sent,
    /// Sink absent or no peer ready; the line was dropped
    NotReady,
    /// Dropped for this cycle, no retry
    Congested,
    Failed,
}

/// Per-sink outcome of one [`FanOut::send`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Delivery {
    pub wired: SinkOutcome,
    pub ble: SinkOutcome,
}

/// BLE side of the fan-out, reading readiness from the shared [`BleLink`].
pub struct BleSink<'a, N> {
    link: &'a BleLink,
    notifier: N,
}

impl<'a, N: GattNotifier> BleSink<'a, N> {
    pub fn new(link: &'a BleLink, notifier: N) -> Self {
        Self { link, notifier }
    }

    pub fn is_ready(&self) -> bool {
        self.link.is_ready()
    }

    /// Best-effort notification of one line to the subscribed peer.
    ///
    /// Lines longer than the current MTU allows go out as consecutive
    /// notifications. The first chunk that fails drops the rest of the line.
    pub fn send(&mut self, line: &[u8]) -> SinkOutcome {
        if line.is_empty() || !self.link.is_ready() {
            return SinkOutcome::NotReady;
        }

        let (Some(conn_handle), Some(value_handle)) =
            (self.link.conn_handle(), self.link.value_handle())
        else {
            return SinkOutcome::NotReady;
        };

        let chunk_size = self.link.max_notify_payload();
        for (i, chunk) in line.chunks(chunk_size).enumerate() {
            match self.notifier.notify(conn_handle, value_handle, chunk) {
                Ok(()) => {}
                Err(NotifyError::Congested) => {
                    debug!("BLE stack congested ({} of {} bytes sent)", i * chunk_size, line.len());
                    return SinkOutcome::Congested;
                }
                Err(e) => {
                    warn!("notify failed: {}", e);
                    return SinkOutcome::Failed;
                }
            }
        }

        SinkOutcome::Sent
    }
}

/// Writes each encoded line to the wired sink and, when present, the BLE sink.
/// The sinks are independent: neither retries and a failure on one never
/// affects the other.
pub struct FanOut<'a, W, N> {
    wired: W,
    ble: Option<BleSink<'a, N>>,
}

impl<'a, W: WiredSink, N: GattNotifier> FanOut<'a, W, N> {
    pub fn new(wired: W, ble: Option<BleSink<'a, N>>) -> Self {
        Self { wired, ble }
    }

    pub fn wired_connected(&mut self) -> bool {
        self.wired.is_connected()
    }

    pub fn send(&mut self, line: &[u8]) -> Delivery {
        Delivery {
            wired: self.send_wired(line),
            ble: match &mut self.ble {
                Some(ble) => ble.send(line),
                None => SinkOutcome::NotReady,
            },
        }
    }

    fn send_wired(&mut self, line: &[u8]) -> SinkOutcome {
        if !self.wired.is_connected() {
            return SinkOutcome::NotReady;
        }

        let result = self.wired.write_queue(line).and_then(|accepted| {
            if accepted < line.len() {
                return Ok(Some(accepted));
            }
            self.wired.flush().map(|()| None)
        });

        match result {
            Ok(None) => SinkOutcome::Sent,
            Ok(Some(accepted)) => {
                debug!("wired queue full ({} of {} bytes accepted)", accepted, line.len());
                SinkOutcome::Failed
            }
            Err(e) => {
                warn!("wired write failed: {:?}", e);
                SinkOutcome::Failed
            }
        }
    }
}
