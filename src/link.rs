use core::sync::atomic::{AtomicBool, AtomicU16, Ordering};

/// Connection handle assigned by the BLE host stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConnHandle(pub u16);

impl ConnHandle {
    /// Reserved value meaning "no connection"
    pub const NONE: ConnHandle = ConnHandle(0xFFFF);
}

/// GATT attribute handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AttrHandle(pub u16);

/// Default ATT MTU before any exchange
pub const DEFAULT_ATT_MTU: u16 = 23;

/// Opcode and attribute handle in front of every notification value
pub const ATT_NOTIFY_OVERHEAD: usize = 3;

/// Link fields shared between the BLE event context (sole writer, through
/// [`BlePeripheral`](crate::BlePeripheral)) and the bridge context (reader,
/// through [`BleSink`](crate::BleSink)).
///
/// Every field is a single atomic so a reader never observes a torn value.
#[derive(Debug)]
pub struct BleLink {
    conn_handle: AtomicU16,
    notify_enabled: AtomicBool,
    value_handle: AtomicU16,
    mtu: AtomicU16,
}

impl BleLink {
    pub const fn new() -> Self {
        Self {
            conn_handle: AtomicU16::new(ConnHandle::NONE.0),
            notify_enabled: AtomicBool::new(false),
            value_handle: AtomicU16::new(0),
            mtu: AtomicU16::new(DEFAULT_ATT_MTU),
        }
    }

    /// A peer is connected and has subscribed to the data characteristic.
    pub fn is_ready(&self) -> bool {
        self.conn_handle().is_some() && self.notify_enabled()
    }

    pub fn conn_handle(&self) -> Option<ConnHandle> {
        match self.conn_handle.load(Ordering::Acquire) {
            raw if raw == ConnHandle::NONE.0 => None,
            raw => Some(ConnHandle(raw)),
        }
    }

    pub fn notify_enabled(&self) -> bool {
        self.notify_enabled.load(Ordering::Acquire)
    }

    /// Value handle of the data characteristic, known once the service is registered.
    pub fn value_handle(&self) -> Option<AttrHandle> {
        match self.value_handle.load(Ordering::Acquire) {
            0 => None,
            raw => Some(AttrHandle(raw)),
        }
    }

    pub fn mtu(&self) -> u16 {
        self.mtu.load(Ordering::Relaxed)
    }

    /// Largest value a single notification carries at the current MTU.
    pub fn max_notify_payload(&self) -> usize {
        self.mtu().max(DEFAULT_ATT_MTU) as usize - ATT_NOTIFY_OVERHEAD
    }

    pub(crate) fn set_value_handle(&self, handle: AttrHandle) {
        self.value_handle.store(handle.0, Ordering::Release);
    }

    pub(crate) fn set_connected(&self, handle: ConnHandle) {
        self.conn_handle.store(handle.0, Ordering::Release);
    }

    pub(crate) fn set_notify_enabled(&self, enabled: bool) {
        self.notify_enabled.store(enabled, Ordering::Release);
    }

    pub(crate) fn set_mtu(&self, mtu: u16) {
        self.mtu.store(mtu, Ordering::Relaxed);
    }

    /// Back to "no connection": handle cleared, subscription and MTU reset.
    pub(crate) fn clear(&self) {
        self.notify_enabled.store(false, Ordering::Release);
        self.conn_handle.store(ConnHandle::NONE.0, Ordering::Release);
        self.mtu.store(DEFAULT_ATT_MTU, Ordering::Relaxed);
    }
}

impl Default for BleLink {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readiness_needs_connection_and_subscription() {
        let link = BleLink::new();
        assert!(!link.is_ready());

        // Subscription alone is never enough
        link.set_notify_enabled(true);
        assert!(!link.is_ready());
        assert_eq!(link.conn_handle(), None);

        link.set_connected(ConnHandle(1));
        assert!(link.is_ready());

        link.set_notify_enabled(false);
        assert!(!link.is_ready());

        link.set_notify_enabled(true);
        link.set_mtu(185);
        link.clear();
        assert!(!link.is_ready());
        assert!(!link.notify_enabled());
        assert_eq!(link.mtu(), DEFAULT_ATT_MTU);
    }

    #[test]
    fn notify_payload_follows_mtu() {
        let link = BleLink::new();
        assert_eq!(link.max_notify_payload(), 20);

        link.set_mtu(185);
        assert_eq!(link.max_notify_payload(), 182);

        // Below the ATT minimum is treated as the default
        link.set_mtu(5);
        assert_eq!(link.max_notify_payload(), 20);
    }
}
