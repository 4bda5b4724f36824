use core::ops::BitOr;

use log::debug;
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// `0000ffe0-0000-1000-8000-00805f9b34fb`, HM-10 style serial service
pub const SERVICE_UUID: u128 = 0x0000FFE0_0000_1000_8000_00805F9B34FB;

/// `0000ffe1-0000-1000-8000-00805f9b34fb`, the single data characteristic
pub const DATA_CHAR_UUID: u128 = 0x0000FFE1_0000_1000_8000_00805F9B34FB;

/// Generic Access service, advertised so scanners see a 16-bit UUID
pub const GAP_SERVICE_UUID16: u16 = 0x1800;

/// Characteristic property bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CharProperties(u8);

impl CharProperties {
    pub const READ: Self = Self(0x02);
    pub const WRITE_NO_RSP: Self = Self(0x04);
    pub const WRITE: Self = Self(0x08);
    pub const NOTIFY: Self = Self(0x10);
    pub const INDICATE: Self = Self(0x20);

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for CharProperties {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Characteristic {
    pub uuid: u128,
    pub properties: CharProperties,
}

/// Primary service registered with the host stack at bring-up. The host
/// adds the client configuration descriptor for notify/indicate itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GattService {
    pub uuid: u128,
    pub data: Characteristic,
}

impl GattService {
    pub const fn bridge() -> Self {
        Self {
            uuid: SERVICE_UUID,
            data: Characteristic {
                uuid: DATA_CHAR_UUID,
                properties: CharProperties(
                    CharProperties::READ.0
                        | CharProperties::WRITE.0
                        | CharProperties::WRITE_NO_RSP.0
                        | CharProperties::NOTIFY.0,
                ),
            },
        }
    }
}

/// An access to the data characteristic issued by a connected peer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GattAccess<'a> {
    ReadCharacteristic,
    WriteCharacteristic(&'a [u8]),
    ReadDescriptor,
    WriteDescriptor(&'a [u8]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum AttError {
    #[error("Unlikely error")]
    Unlikely = 0x0E,
}

/// Serves an access to the data characteristic. Reads return an empty value and
/// writes are accepted with their payload discarded.
pub fn handle_access(access: GattAccess<'_>) -> Result<&'static [u8], AttError> {
    match access {
        GattAccess::ReadCharacteristic => Ok(&[]),
        GattAccess::WriteCharacteristic(payload) => {
            debug!("RX write, len={}", payload.len());
            Ok(&[])
        }
        GattAccess::ReadDescriptor | GattAccess::WriteDescriptor(_) => Err(AttError::Unlikely),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bridge_service_layout() {
        let service = GattService::bridge();
        let props = service.data.properties;

        assert!(props.contains(CharProperties::READ | CharProperties::NOTIFY));
        assert!(props.contains(CharProperties::WRITE));
        assert!(props.contains(CharProperties::WRITE_NO_RSP));
        assert!(!props.contains(CharProperties::INDICATE));
        assert_eq!(props.bits(), 0x1E);

        assert_eq!(&SERVICE_UUID.to_le_bytes()[12..14], &[0xE0, 0xFF]);
        assert_eq!(&DATA_CHAR_UUID.to_le_bytes()[12..14], &[0xE1, 0xFF]);
    }

    #[test]
    fn access_semantics() {
        assert_eq!(handle_access(GattAccess::ReadCharacteristic), Ok(&[][..]));
        assert_eq!(
            handle_access(GattAccess::WriteCharacteristic(b"C\r")),
            Ok(&[][..])
        );
        assert_eq!(
            handle_access(GattAccess::ReadDescriptor),
            Err(AttError::Unlikely)
        );
        assert_eq!(u8::from(AttError::Unlikely), 0x0E);
        assert!(AttError::try_from(0x11).is_err());
    }
}
