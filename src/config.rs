use core::time::Duration;

/// Name, version and revision of the running firmware, fixed at build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FirmwareInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub revision: &'static str,
}

impl FirmwareInfo {
    pub const CURRENT: Self = Self {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        revision: match option_env!("GIT_REVISION") {
            Some(revision) => revision,
            None => "unknown",
        },
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Upper bound on a single CAN receive. Expiry is how the loop notices
    /// wired-connection changes on a silent bus.
    pub receive_timeout: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            receive_timeout: Duration::from_millis(1000),
        }
    }
}

/// Identity and advertising settings of the BLE peripheral
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BleConfig {
    /// Device name is `<prefix><6 hex digits of the address><suffix>`
    pub name_prefix: &'static str,
    pub name_suffix: &'static str,
    /// Characters kept when the complete name does not fit the advertising payload
    pub short_name_len: usize,
    /// Advertising interval bounds in 0.625 ms units
    pub adv_interval_min: u16,
    pub adv_interval_max: u16,
    /// dBm
    pub tx_power: i8,
    pub appearance: u16,
}

impl Default for BleConfig {
    fn default() -> Self {
        Self {
            name_prefix: "SLCAN-",
            name_suffix: "-LE",
            short_name_len: 12,
            adv_interval_min: 0x00F8,
            adv_interval_max: 0x0140,
            tx_power: 0,
            appearance: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        assert_eq!(BridgeConfig::default().receive_timeout.as_millis(), 1000);

        let ble = BleConfig::default();
        // 155 ms and 200 ms
        assert_eq!(ble.adv_interval_min as u32 * 625 / 1000, 155);
        assert_eq!(ble.adv_interval_max as u32 * 625 / 1000, 200);

        assert_eq!(FirmwareInfo::CURRENT.name, "slcan-bridge");
        assert!(!FirmwareInfo::CURRENT.revision.is_empty());
    }
}
