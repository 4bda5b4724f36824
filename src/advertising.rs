use heapless::Vec;
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::BleConfig;

/// Legacy advertising and scan-response payloads are capped at 31 bytes.
pub const MAX_ADV_PAYLOAD: usize = 31;

pub type AdvPayload = Vec<u8, MAX_ADV_PAYLOAD>;

/// LE General Discoverable Mode
pub const ADV_FLAG_DISC_GEN: u8 = 0x02;
/// BR/EDR Not Supported
pub const ADV_FLAG_BREDR_UNSUP: u8 = 0x04;

/// AD structure types used by the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum AdType {
    Flags = 0x01,
    IncompleteUuids16 = 0x02,
    CompleteUuids16 = 0x03,
    IncompleteUuids128 = 0x06,
    CompleteUuids128 = 0x07,
    ShortenedName = 0x08,
    CompleteName = 0x09,
    TxPowerLevel = 0x0A,
    Appearance = 0x19,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ConnMode {
    NonConnectable = 0,
    Directed = 1,
    #[default]
    Undirected = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum DiscMode {
    NonDiscoverable = 0,
    Limited = 1,
    #[default]
    General = 2,
}

/// Parameters handed to the host stack when advertising starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AdvParams {
    pub conn_mode: ConnMode,
    pub disc_mode: DiscMode,
    /// 0.625 ms units
    pub interval_min: u16,
    pub interval_max: u16,
}

impl AdvParams {
    pub fn from_config(config: &BleConfig) -> Self {
        Self {
            conn_mode: ConnMode::Undirected,
            disc_mode: DiscMode::General,
            interval_min: config.adv_interval_min,
            interval_max: config.adv_interval_max,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdvError {
    #[error("Advertising fields need {0} bytes, more than the payload budget")]
    PayloadTooLong(usize),
}

/// One advertising or scan-response field set. Absent fields are not emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AdvFields<'a> {
    pub flags: Option<u8>,
    pub name: Option<&'a str>,
    pub name_is_complete: bool,
    pub tx_power: Option<i8>,
    pub appearance: Option<u16>,
    pub uuids16: &'a [u16],
    pub uuids16_is_complete: bool,
    pub uuids128: &'a [u128],
    pub uuids128_is_complete: bool,
}

impl<'a> AdvFields<'a> {
    /// Primary advertising set: flags, name, tx power, appearance and 16-bit UUIDs.
    pub fn primary(
        name: &'a str,
        name_is_complete: bool,
        uuids16: &'a [u16],
        config: &BleConfig,
    ) -> Self {
        Self {
            flags: Some(ADV_FLAG_DISC_GEN | ADV_FLAG_BREDR_UNSUP),
            name: Some(name),
            name_is_complete,
            tx_power: Some(config.tx_power),
            appearance: Some(config.appearance),
            uuids16,
            uuids16_is_complete: true,
            ..Self::default()
        }
    }

    /// Scan-response set carrying only complete 128-bit service UUIDs.
    pub fn scan_response(uuids128: &'a [u128]) -> Self {
        Self {
            uuids128,
            uuids128_is_complete: true,
            ..Self::default()
        }
    }

    /// Size of the serialized AD structures.
    pub fn encoded_len(&self) -> usize {
        let mut len = 0;

        if self.flags.is_some() {
            len += 3;
        }
        if let Some(name) = self.name {
            len += 2 + name.len();
        }
        if self.tx_power.is_some() {
            len += 3;
        }
        if self.appearance.is_some() {
            len += 4;
        }
        if !self.uuids16.is_empty() {
            len += 2 + 2 * self.uuids16.len();
        }
        if !self.uuids128.is_empty() {
            len += 2 + 16 * self.uuids128.len();
        }

        len
    }

    /// Serializes into length-type-value AD structures, multi-byte values little-endian.
    pub fn encode(&self) -> Result<AdvPayload, AdvError> {
        let needed = self.encoded_len();
        if needed > MAX_ADV_PAYLOAD {
            return Err(AdvError::PayloadTooLong(needed));
        }

        let mut payload = AdvPayload::new();
        let mut put = |ad_type: AdType, value: &[u8]| -> Result<(), AdvError> {
            let overflow = AdvError::PayloadTooLong(needed);
            payload.push(value.len() as u8 + 1).map_err(|_| overflow)?;
            payload.push(ad_type.into()).map_err(|_| overflow)?;
            payload.extend_from_slice(value).map_err(|_| overflow)
        };

        if let Some(flags) = self.flags {
            put(AdType::Flags, &[flags])?;
        }

        if let Some(name) = self.name {
            let kind = if self.name_is_complete {
                AdType::CompleteName
            } else {
                AdType::ShortenedName
            };
            put(kind, name.as_bytes())?;
        }

        if let Some(tx_power) = self.tx_power {
            put(AdType::TxPowerLevel, &tx_power.to_le_bytes())?;
        }

        if let Some(appearance) = self.appearance {
            put(AdType::Appearance, &appearance.to_le_bytes())?;
        }

        if !self.uuids16.is_empty() {
            let kind = if self.uuids16_is_complete {
                AdType::CompleteUuids16
            } else {
                AdType::IncompleteUuids16
            };
            let mut raw: Vec<u8, MAX_ADV_PAYLOAD> = Vec::new();
            for uuid in self.uuids16 {
                raw.extend_from_slice(&uuid.to_le_bytes())
                    .map_err(|_| AdvError::PayloadTooLong(needed))?;
            }
            put(kind, raw.as_slice())?;
        }

        if !self.uuids128.is_empty() {
            let kind = if self.uuids128_is_complete {
                AdType::CompleteUuids128
            } else {
                AdType::IncompleteUuids128
            };
            let mut raw: Vec<u8, MAX_ADV_PAYLOAD> = Vec::new();
            for uuid in self.uuids128 {
                raw.extend_from_slice(&uuid.to_le_bytes())
                    .map_err(|_| AdvError::PayloadTooLong(needed))?;
            }
            put(kind, raw.as_slice())?;
        }

        debug_assert_eq!(payload.len(), needed);
        Ok(payload)
    }
}

/// Leading `max_len` characters of `name`, on a char boundary.
pub fn shorten_name(name: &str, max_len: usize) -> &str {
    if name.len() <= max_len {
        return name;
    }

    let mut end = max_len;
    while !name.is_char_boundary(end) {
        end -= 1;
    }

    &name[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GAP_SERVICE_UUID16, SERVICE_UUID};

    #[test]
    fn default_name_fills_payload_exactly() {
        let config = BleConfig::default();
        let fields = AdvFields::primary("SLCAN-a1b2c3-LE", true, &[GAP_SERVICE_UUID16], &config);

        assert_eq!(fields.encoded_len(), MAX_ADV_PAYLOAD);

        let payload = fields.encode().unwrap();
        assert_eq!(&payload[..3], &[0x02, 0x01, 0x06]);
        assert_eq!(&payload[3..5], &[16, 0x09]);
        assert_eq!(&payload[5..20], b"SLCAN-a1b2c3-LE");
        assert_eq!(&payload[20..23], &[0x02, 0x0A, 0x00]);
        assert_eq!(&payload[23..27], &[0x03, 0x19, 0x00, 0x00]);
        assert_eq!(&payload[27..31], &[0x03, 0x03, 0x00, 0x18]);
    }

    #[test]
    fn long_name_does_not_fit() {
        let config = BleConfig::default();
        let fields = AdvFields::primary("SLCAN-BRIDGE-a1b2c3-LE", true, &[GAP_SERVICE_UUID16], &config);

        assert_eq!(fields.encode(), Err(AdvError::PayloadTooLong(38)));

        let short = AdvFields::primary(
            shorten_name("SLCAN-BRIDGE-a1b2c3-LE", 12),
            false,
            &[GAP_SERVICE_UUID16],
            &config,
        );
        let payload = short.encode().unwrap();
        assert_eq!(&payload[3..5], &[13, 0x08]);
        assert_eq!(&payload[5..17], b"SLCAN-BRIDGE");
    }

    #[test]
    fn scan_response_carries_service_uuid() {
        let payload = AdvFields::scan_response(&[SERVICE_UUID]).encode().unwrap();

        assert_eq!(payload.len(), 18);
        assert_eq!(&payload[..2], &[17, 0x07]);
        assert_eq!(&payload[2..], &SERVICE_UUID.to_le_bytes());
    }

    #[test]
    fn encoded_length_matches_prediction() {
        let config = BleConfig::default();
        let uuids16 = [GAP_SERVICE_UUID16, 0x180A];
        let sets = [
            AdvFields::default(),
            AdvFields::primary("SLCAN", true, &[], &config),
            AdvFields::primary("SLCAN-a1b2c3", false, &uuids16, &config),
            AdvFields::scan_response(&[SERVICE_UUID]),
        ];

        for fields in sets {
            assert_eq!(fields.encode().unwrap().len(), fields.encoded_len());
        }

        let two_uuids = [SERVICE_UUID, SERVICE_UUID];
        let too_long = AdvFields::scan_response(&two_uuids);
        assert_eq!(too_long.encode(), Err(AdvError::PayloadTooLong(34)));
    }

    #[test]
    fn shortening_keeps_short_names() {
        assert_eq!(shorten_name("SLCAN", 12), "SLCAN");
        assert_eq!(shorten_name("SLCAN-a1b2c3-LE", 12), "SLCAN-a1b2c3");
    }
}
