//! # Diagnostics for rejected port requests
//!
//! Every public operation validates its inputs up front. A violation is handed
//! to a [`DiagnosticSink`] together with the module and service identifiers
//! and is also returned to the caller as an [`Error`]. A rejected request never
//! touches the hardware.
//!
//! The checks exist only with the `dev-error-detect` feature. Builds without
//! it trade the checks for code size: an out-of-range pin index panics and
//! the mode value is truncated to four bits.

/// Module ID reported with every diagnostic
pub const MODULE_ID: u16 = 124;
/// Instance ID reported with every diagnostic
pub const INSTANCE_ID: u8 = 0;
/// Vendor ID returned by the version query
pub const VENDOR_ID: u16 = 1000;

pub const SW_MAJOR_VERSION: u8 = 1;
pub const SW_MINOR_VERSION: u8 = 0;
pub const SW_PATCH_VERSION: u8 = 0;

#[cfg(any(feature = "set-pin-direction-api", feature = "set-pin-mode-api"))]
pub(crate) const DEV_ERROR_DETECT: bool = cfg!(feature = "dev-error-detect");

/// Port driver error type
///
/// The discriminants are the diagnostic codes handed to the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Error {
    /// Pin index outside the active configuration table
    ParamPin = 0x0A,
    /// Pin is not configured with a changeable direction
    DirectionUnchangeable = 0x0B,
    /// The configuration table is absent or invalid
    ParamConfig = 0x0C,
    /// Requested mode lies outside the 4-bit mode domain
    ParamInvalidMode = 0x0D,
    /// Pin is not configured with a changeable mode
    ModeUnchangeable = 0x0E,
    /// Service called before the driver was initialized
    Uninit = 0x0F,
    /// Output reference is absent
    ParamPointer = 0x10,
}

impl Error {
    #[inline]
    pub const fn code(self) -> u8 {
        self as u8
    }
}

/// Identifies the public service that detected an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ServiceId {
    Init = 0x00,
    SetPinDirection = 0x01,
    RefreshPortDirection = 0x02,
    GetVersionInfo = 0x03,
    SetPinMode = 0x04,
}

/// Receiver for development errors
///
/// Implementations must return. The driver continues as a no-op after
/// reporting.
pub trait DiagnosticSink {
    fn report(&mut self, module_id: u16, instance_id: u8, service: ServiceId, error: Error);
}

/// Discards every report
impl DiagnosticSink for () {
    #[inline]
    fn report(&mut self, _: u16, _: u8, _: ServiceId, _: Error) {}
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for &mut S {
    #[inline]
    fn report(&mut self, module_id: u16, instance_id: u8, service: ServiceId, error: Error) {
        (**self).report(module_id, instance_id, service, error)
    }
}

/// Hand `error` to the sink with this module's identifiers and pass it back
#[cfg(any(
    test,
    feature = "set-pin-direction-api",
    feature = "set-pin-mode-api",
    feature = "version-info-api"
))]
#[inline]
pub(crate) fn report<S: DiagnosticSink>(sink: &mut S, service: ServiceId, error: Error) -> Error {
    warn!("port: service {=u8} rejected with code {=u8}", service as u8, error.code());
    sink.report(MODULE_ID, INSTANCE_ID, service, error);
    error
}

/// Version record filled by the version query
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct VersionInfo {
    pub vendor_id: u16,
    pub module_id: u16,
    pub sw_major_version: u8,
    pub sw_minor_version: u8,
    pub sw_patch_version: u8,
}

impl VersionInfo {
    /// Version of this driver
    pub const CURRENT: VersionInfo = VersionInfo {
        vendor_id: VENDOR_ID,
        module_id: MODULE_ID,
        sw_major_version: SW_MAJOR_VERSION,
        sw_minor_version: SW_MINOR_VERSION,
        sw_patch_version: SW_PATCH_VERSION,
    };
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Records every report for later inspection
    #[derive(Default)]
    pub struct RecordingSink {
        pub reports: Vec<(u16, u8, ServiceId, Error)>,
    }

    impl DiagnosticSink for RecordingSink {
        fn report(&mut self, module_id: u16, instance_id: u8, service: ServiceId, error: Error) {
            self.reports.push((module_id, instance_id, service, error));
        }
    }

    impl RecordingSink {
        pub fn errors(&self) -> Vec<(ServiceId, Error)> {
            self.reports.iter().map(|r| (r.2, r.3)).collect()
        }
    }

    #[test]
    fn codes_match_diagnostic_table() {
        assert_eq!(Error::ParamPin.code(), 0x0A);
        assert_eq!(Error::DirectionUnchangeable.code(), 0x0B);
        assert_eq!(Error::ParamConfig.code(), 0x0C);
        assert_eq!(Error::ParamInvalidMode.code(), 0x0D);
        assert_eq!(Error::ModeUnchangeable.code(), 0x0E);
        assert_eq!(Error::Uninit.code(), 0x0F);
        assert_eq!(Error::ParamPointer.code(), 0x10);
    }

    #[test]
    fn report_forwards_identifiers() {
        let mut sink = RecordingSink::default();
        let err = report(&mut sink, ServiceId::SetPinMode, Error::ModeUnchangeable);
        assert_eq!(err, Error::ModeUnchangeable);
        assert_eq!(
            sink.reports,
            vec![(124, 0, ServiceId::SetPinMode, Error::ModeUnchangeable)]
        );
    }

    #[test]
    fn reference_sink_forwards() {
        let mut sink = RecordingSink::default();
        report(&mut &mut sink, ServiceId::Init, Error::ParamConfig);
        assert_eq!(sink.errors(), vec![(ServiceId::Init, Error::ParamConfig)]);
    }
}
