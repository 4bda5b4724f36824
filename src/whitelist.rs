use embedded_can::StandardId;
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// `true` when the crate was built with the `ignore-whitelist` feature and forwards
/// every standard frame.
pub const WHITELIST_BYPASSED: bool = cfg!(feature = "ignore-whitelist");

/// Telemetry identifiers forwarded to the host (CANaerospace assignments used by
/// XCSoar). Keep in sync with XCSoar's `canaerospace/message.h`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum TelemetryId {
    BodyLongitudinalAcceleration = 300,
    BodyLateralAcceleration = 301,
    BodyNormalAcceleration = 302,
    IndicatedAirspeed = 315,
    TrueAirspeed = 316,
    /// QNH
    BaroCorrection = 319,
    HeadingAngle = 321,
    StandardAltitude = 322,
    StaticPressure = 326,
    /// m/s
    WindSpeed = 333,
    /// Degrees
    WindDirection = 334,
    OutsideAirTemperature = 335,
    /// Airmass vertical speed, earth NED (negative is lift)
    AirmassSpeedVertical = 354,

    GpsAircraftLatitude = 1036,
    GpsAircraftLongitude = 1037,
    GpsAircraftHeightAboveEllipsoid = 1038,
    GpsGroundSpeed = 1039,
    GpsTrueTrack = 1040,
    Utc = 1200,

    FlarmState = 1300,
    FlarmObjectAl3 = 1301,
    FlarmObjectAl2 = 1302,
    FlarmObjectAl1 = 1303,
    FlarmObjectAl0 = 1304,
    AdsbState = 1305,

    VarioMode = 1510,
    MacCreadyValue = 1518,
    /// Meters, `alt_qnh = alt_std + value`
    BaroAltitudeCorrection = 1519,
}

impl TelemetryId {
    pub const ALL: [TelemetryId; 28] = [
        Self::BodyLongitudinalAcceleration,
        Self::BodyLateralAcceleration,
        Self::BodyNormalAcceleration,
        Self::IndicatedAirspeed,
        Self::TrueAirspeed,
        Self::BaroCorrection,
        Self::HeadingAngle,
        Self::StandardAltitude,
        Self::StaticPressure,
        Self::WindSpeed,
        Self::WindDirection,
        Self::OutsideAirTemperature,
        Self::AirmassSpeedVertical,
        Self::GpsAircraftLatitude,
        Self::GpsAircraftLongitude,
        Self::GpsAircraftHeightAboveEllipsoid,
        Self::GpsGroundSpeed,
        Self::GpsTrueTrack,
        Self::Utc,
        Self::FlarmState,
        Self::FlarmObjectAl3,
        Self::FlarmObjectAl2,
        Self::FlarmObjectAl1,
        Self::FlarmObjectAl0,
        Self::AdsbState,
        Self::VarioMode,
        Self::MacCreadyValue,
        Self::BaroAltitudeCorrection,
    ];

    pub fn id(self) -> StandardId {
        // All discriminants are below 0x800
        StandardId::new(self.into()).unwrap_or(StandardId::ZERO)
    }
}

/// Returns whether frames with this identifier are forwarded to the host.
#[cfg(not(feature = "ignore-whitelist"))]
#[inline]
pub fn is_allowed(id: StandardId) -> bool {
    TelemetryId::try_from(id.as_raw()).is_ok()
}

/// Returns whether frames with this identifier are forwarded to the host.
#[cfg(feature = "ignore-whitelist")]
#[inline]
pub fn is_allowed(_id: StandardId) -> bool {
    true
}

#[cfg(test)]
mod tests {
    use embedded_can::StandardId;

    use super::*;

    #[test]
    fn every_telemetry_id_is_allowed() {
        for telemetry in TelemetryId::ALL {
            assert!(is_allowed(telemetry.id()), "{telemetry:?}");
        }

        assert_eq!(TelemetryId::BodyLongitudinalAcceleration.id().as_raw(), 0x12C);
    }

    #[cfg(not(feature = "ignore-whitelist"))]
    #[test]
    fn unknown_ids_are_denied() {
        let allowed = (0..=StandardId::MAX.as_raw())
            .filter_map(StandardId::new)
            .filter(|id| is_allowed(*id))
            .count();

        assert_eq!(allowed, TelemetryId::ALL.len());
        assert!(!is_allowed(StandardId::new(0x001).unwrap()));
        assert!(!is_allowed(StandardId::ZERO));
        assert!(!is_allowed(StandardId::MAX));
        assert!(!is_allowed(StandardId::new(1520).unwrap()));
    }

    #[cfg(feature = "ignore-whitelist")]
    #[test]
    fn bypass_allows_everything() {
        assert!(WHITELIST_BYPASSED);
        assert!(is_allowed(StandardId::new(0x001).unwrap()));
    }
}
