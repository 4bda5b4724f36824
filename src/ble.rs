use core::fmt::Write;

use heapless::String;
use log::{debug, error, info, warn};
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::{
    advertising::{shorten_name, AdvError, AdvFields, AdvParams, AdvPayload},
    gatt::{GattService, GAP_SERVICE_UUID16, SERVICE_UUID},
    AttrHandle, BleConfig, BleLink, ConnHandle,
};

pub const MAX_DEVICE_NAME_LEN: usize = 31;

pub type DeviceName = String<MAX_DEVICE_NAME_LEN>;

/// Own address type used when advertising
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum OwnAddrType {
    #[default]
    Public = 0,
    RandomStatic = 1,
}

/// Device address as stored by the host, least significant byte first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BdAddr(pub [u8; 6]);

/// Status code reported by the BLE host stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[error("BLE host returned rc={0}")]
pub struct HostError(pub i32);

/// The BLE host stack as seen by the peripheral state machine
pub trait BleHost {
    /// Picks the address type to advertise with, optionally allowing privacy.
    fn infer_own_addr_type(&mut self, privacy: bool) -> Result<OwnAddrType, HostError>;

    fn own_address(&mut self, addr_type: OwnAddrType) -> Result<BdAddr, HostError>;

    fn set_device_name(&mut self, name: &str) -> Result<(), HostError>;

    /// Registers the service and returns the value handle of its data characteristic.
    fn register_service(&mut self, service: &GattService) -> Result<AttrHandle, HostError>;

    fn set_adv_data(&mut self, payload: &[u8]) -> Result<(), HostError>;

    fn set_scan_response_data(&mut self, payload: &[u8]) -> Result<(), HostError>;

    fn start_advertising(
        &mut self,
        own_addr_type: OwnAddrType,
        params: &AdvParams,
    ) -> Result<(), HostError>;
}

impl<T: BleHost + ?Sized> BleHost for &mut T {
    fn infer_own_addr_type(&mut self, privacy: bool) -> Result<OwnAddrType, HostError> {
        T::infer_own_addr_type(self, privacy)
    }

    fn own_address(&mut self, addr_type: OwnAddrType) -> Result<BdAddr, HostError> {
        T::own_address(self, addr_type)
    }

    fn set_device_name(&mut self, name: &str) -> Result<(), HostError> {
        T::set_device_name(self, name)
    }

    fn register_service(&mut self, service: &GattService) -> Result<AttrHandle, HostError> {
        T::register_service(self, service)
    }

    fn set_adv_data(&mut self, payload: &[u8]) -> Result<(), HostError> {
        T::set_adv_data(self, payload)
    }

    fn set_scan_response_data(&mut self, payload: &[u8]) -> Result<(), HostError> {
        T::set_scan_response_data(self, payload)
    }

    fn start_advertising(
        &mut self,
        own_addr_type: OwnAddrType,
        params: &AdvParams,
    ) -> Result<(), HostError> {
        T::start_advertising(self, own_addr_type, params)
    }
}

/// Link-layer and GATT events delivered by the host stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GapEvent {
    /// Host and controller are synchronized
    Sync,
    /// Connection attempt finished, `Err` carries the failure status
    Connect(Result<ConnHandle, i32>),
    Disconnect { reason: i32 },
    Subscribe {
        attr_handle: AttrHandle,
        cur_notify: bool,
        cur_indicate: bool,
    },
    Mtu { conn_handle: ConnHandle, mtu: u16 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BleState {
    Uninitialized,
    /// Service registered, waiting for the host to sync
    Syncing,
    Advertising,
    Connected { notify: bool },
    /// Not connected and not advertising; resumes on the next external event
    Idle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BleError {
    #[error("Service registration failed ({0})")]
    ServiceRegistration(HostError),
    #[error("Own address type could not be inferred ({0})")]
    AddressInference(HostError),
    #[error("Advertising fields rejected ({0})")]
    AdvFields(HostError),
    #[error("Shortened advertising fields do not fit ({0})")]
    AdvPayload(AdvError),
    #[error("Advertising could not start ({0})")]
    AdvStart(HostError),
    #[error("Event not valid in state {0:?}")]
    UnexpectedEvent(BleState),
}

/// Which name variant ended up in the advertising payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdvName {
    Complete,
    Shortened,
}

/// `<prefix><addr[2]><addr[1]><addr[0]><suffix>` in lowercase hex.
pub fn device_name(addr: &BdAddr, config: &BleConfig) -> DeviceName {
    let mut name = DeviceName::new();
    let [b0, b1, b2, ..] = addr.0;

    if write!(
        name,
        "{}{b2:02x}{b1:02x}{b0:02x}{}",
        config.name_prefix, config.name_suffix
    )
    .is_err()
    {
        warn!("device name truncated to {} bytes", MAX_DEVICE_NAME_LEN);
    }

    name
}

/// BLE peripheral connection state machine.
///
/// Owned by the BLE event context; every transition goes through
/// [`handle_event`](Self::handle_event). The connection fields are published to
/// the bridge context through the shared [`BleLink`].
pub struct BlePeripheral<'a, H> {
    host: H,
    link: &'a BleLink,
    config: BleConfig,
    state: BleState,
    own_addr_type: OwnAddrType,
    device_name: DeviceName,
    value_handle: Option<AttrHandle>,
}

impl<'a, H: BleHost> BlePeripheral<'a, H> {
    pub fn new(host: H, link: &'a BleLink, config: BleConfig) -> Self {
        let device_name = device_name(&BdAddr::default(), &config);

        Self {
            host,
            link,
            config,
            state: BleState::Uninitialized,
            own_addr_type: OwnAddrType::default(),
            device_name,
            value_handle: None,
        }
    }

    /// Sets the placeholder name and registers the GATT service, then waits for
    /// the host to sync.
    pub fn init(&mut self) -> Result<(), BleError> {
        if self.state != BleState::Uninitialized {
            return Err(BleError::UnexpectedEvent(self.state));
        }

        if let Err(e) = self.host.set_device_name(&self.device_name) {
            warn!("initial device name rejected: {}", e);
        }

        let value_handle = self
            .host
            .register_service(&GattService::bridge())
            .map_err(|e| {
                error!("gatt add svcs: {}", e);
                BleError::ServiceRegistration(e)
            })?;

        self.value_handle = Some(value_handle);
        self.link.set_value_handle(value_handle);
        self.state = BleState::Syncing;

        info!(
            "GATT service {:032x} added; data value handle={}",
            SERVICE_UUID, value_handle.0
        );

        Ok(())
    }

    pub fn state(&self) -> BleState {
        self.state
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn own_addr_type(&self) -> OwnAddrType {
        self.own_addr_type
    }

    pub fn link(&self) -> &'a BleLink {
        self.link
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Applies one host event. Errors are already logged; the returned value is
    /// informational and never requires action from the caller.
    pub fn handle_event(&mut self, event: GapEvent) -> Result<(), BleError> {
        match event {
            GapEvent::Sync => self.on_sync(),
            GapEvent::Connect(Ok(handle)) => {
                self.link.set_notify_enabled(false);
                self.link.set_connected(handle);
                self.state = BleState::Connected { notify: false };
                info!("Connected, handle={}", handle.0);
                Ok(())
            }
            GapEvent::Connect(Err(status)) => {
                warn!("Connect failed; status={}", status);
                self.link.clear();
                self.advertise().map(|_| ())
            }
            GapEvent::Disconnect { reason } => {
                info!("Disconnected; reason={}", reason);
                self.link.clear();
                self.advertise().map(|_| ())
            }
            GapEvent::Subscribe {
                attr_handle,
                cur_notify,
                cur_indicate,
            } => {
                if Some(attr_handle) != self.value_handle {
                    return Ok(());
                }

                let BleState::Connected { .. } = self.state else {
                    return Err(BleError::UnexpectedEvent(self.state));
                };

                let notify = cur_notify || cur_indicate;
                self.link.set_notify_enabled(notify);
                self.state = BleState::Connected { notify };
                info!("TX notify {}", if notify { "enabled" } else { "disabled" });
                Ok(())
            }
            GapEvent::Mtu { conn_handle, mtu } => {
                if self.link.conn_handle() == Some(conn_handle) {
                    self.link.set_mtu(mtu);
                }
                info!("MTU update: {}", mtu);
                Ok(())
            }
        }
    }

    fn on_sync(&mut self) -> Result<(), BleError> {
        if self.state == BleState::Uninitialized {
            return Err(BleError::UnexpectedEvent(self.state));
        }

        self.state = BleState::Syncing;

        let own_addr_type = match self.host.infer_own_addr_type(false) {
            Ok(addr_type) => addr_type,
            Err(e) => {
                warn!("infer_auto failed {}, retry with privacy", e);
                self.host.infer_own_addr_type(true).map_err(|e| {
                    error!("own address type inference (privacy): {}", e);
                    BleError::AddressInference(e)
                })?
            }
        };
        self.own_addr_type = own_addr_type;

        // An unreadable address still advertises, under the all-zero name
        let addr = self.host.own_address(own_addr_type).unwrap_or_else(|e| {
            warn!("own address copy failed {}, advertising as placeholder", e);
            BdAddr::default()
        });

        self.device_name = device_name(&addr, &self.config);
        if let Err(e) = self.host.set_device_name(&self.device_name) {
            warn!("device name rejected: {}", e);
        }

        let [b0, b1, b2, b3, b4, b5] = addr.0;
        info!(
            "BLE own addr type={:?} addr={:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X} name={}",
            own_addr_type, b5, b4, b3, b2, b1, b0, self.device_name
        );

        self.advertise().map(|_| ())
    }

    /// Sets the advertising and scan-response payloads and starts advertising.
    /// On failure the machine parks in [`BleState::Idle`] until the next event.
    fn advertise(&mut self) -> Result<AdvName, BleError> {
        self.state = BleState::Idle;

        let name = self.apply_adv_fields()?;

        match AdvFields::scan_response(&[SERVICE_UUID]).encode() {
            Ok(payload) => {
                if let Err(e) = self.host.set_scan_response_data(&payload) {
                    warn!("scan response rejected ({}); continuing without it", e);
                }
            }
            Err(e) => warn!("scan response not encodable ({}); continuing without it", e),
        }

        let params = AdvParams::from_config(&self.config);
        if let Err(e) = self.host.start_advertising(self.own_addr_type, &params) {
            error!(
                "adv_start {} (own_addr_type={:?})",
                e, self.own_addr_type
            );
            return Err(BleError::AdvStart(e));
        }

        self.state = BleState::Advertising;
        info!("Advertising started (own_addr_type={:?})", self.own_addr_type);

        Ok(name)
    }

    /// Full field set first; if it does not fit, the name is shortened and
    /// flagged incomplete.
    fn apply_adv_fields(&mut self) -> Result<AdvName, BleError> {
        let uuids16 = [GAP_SERVICE_UUID16];

        let full = AdvFields::primary(&self.device_name, true, &uuids16, &self.config);
        let attempt = match full.encode() {
            Ok(payload) => self.host.set_adv_data(&payload).map_err(BleError::AdvFields),
            Err(e) => Err(BleError::AdvPayload(e)),
        };

        let Err(e) = attempt else {
            return Ok(AdvName::Complete);
        };
        warn!("adv fields: {}, trying shortened name fallback", e);

        let short_name = shorten_name(&self.device_name, self.config.short_name_len);
        let payload: AdvPayload =
            AdvFields::primary(short_name, false, &uuids16, &self.config)
                .encode()
                .map_err(|e| {
                    error!("adv fields (fallback): {}", e);
                    BleError::AdvPayload(e)
                })?;

        if let Err(e) = self.host.set_adv_data(&payload) {
            error!("adv fields (fallback): {}", e);
            return Err(BleError::AdvFields(e));
        }

        debug!("advertising shortened name {}", short_name);
        Ok(AdvName::Shortened)
    }
}
