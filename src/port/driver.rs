//! # Port configurator
//!
//! [`Port`] is the only way to reach the run-time services. It is obtained
//! from [`Port::init`], which programs every pin of the supplied table, so a
//! service can never run against unconfigured hardware.
//!
//! ## Initialization sequence
//!
//! For every table entry, in table order:
//!
//! 1. The port's clock is gated on and read back before the block is touched.
//! 2. PD7 and PF0 are unlocked and committed.
//! 3. PC0..PC3 (JTAG/SWD) are skipped.
//! 4. Direction is set, followed by the initial level for outputs or the pull
//!    resistors for inputs.
//! 5. The mux is switched to the configured [`PinMode`].
//!
//! ## Concurrency
//!
//! The services take `&mut self` and perform unsynchronized read-modify-write
//! cycles on shared port registers. Callers that use the driver from more than
//! one execution context need external mutual exclusion, for example
//! [`SharedPort`](crate::shared::SharedPort).

use super::config::{PinIndex, PortConfig};
use super::pins::{Direction, PinConfig, PinMode};
use super::reg::{pctl_mask, ClockGate, PortRegisters, Register};
#[cfg(any(
    feature = "set-pin-direction-api",
    feature = "set-pin-mode-api",
    feature = "version-info-api"
))]
use crate::diag::{self, Error, ServiceId};
#[cfg(any(feature = "set-pin-direction-api", feature = "set-pin-mode-api"))]
use crate::diag::DEV_ERROR_DETECT;
use crate::diag::{DiagnosticSink, VersionInfo};

/// Configured pin multiplexer
///
/// Borrows the configuration table for `'c` and owns the register backend
/// `R` and the diagnostic sink `S`.
pub struct Port<'c, R: PortRegisters, S: DiagnosticSink = ()> {
    regs: R,
    pins: &'c [PinConfig],
    sink: S,
}

impl<'c, R: PortRegisters, S: DiagnosticSink> Port<'c, R, S> {
    /// Program every pin in `config` and return the configured driver
    ///
    /// Service ID 0x00. Running the initialization again on registers that
    /// were already configured from the same table leaves them unchanged.
    pub fn init<C: ClockGate, const N: usize>(
        regs: R,
        clocks: &mut C,
        config: &'c PortConfig<N>,
        sink: S,
    ) -> Self {
        let mut port = Port {
            regs,
            pins: config.pins(),
            sink,
        };
        port.configure_all(clocks);
        port
    }

    /// Make `config` the active table and program every pin from it
    ///
    /// Runs the same sequence as [`Port::init`] on the registers this driver
    /// already owns.
    pub fn reconfigure<C: ClockGate, const N: usize>(
        &mut self,
        clocks: &mut C,
        config: &'c PortConfig<N>,
    ) {
        self.pins = config.pins();
        self.configure_all(clocks);
    }

    fn configure_all<C: ClockGate>(&mut self, clocks: &mut C) {
        debug!("port: configuring {=usize} pins", self.pins.len());
        let pins = self.pins;
        for cfg in pins {
            let (port, pin) = (cfg.port, cfg.pin);
            clocks.enable_port_clock(port);
            if cfg.is_protected() {
                self.regs.unlock_commit(port, pin);
            } else if cfg.is_debug() {
                debug!("port: skipping debug pin {=u8}", pin);
                continue;
            }

            self.regs.set_dir(port, pin, cfg.direction);
            match cfg.direction {
                Direction::Out => self.regs.write_level(port, pin, cfg.initial_level),
                Direction::In => self.regs.set_resistor(port, pin, cfg.resistor),
            }
            self.regs.change_mode(port, pin, cfg.initial_mode);
        }
    }

    #[cfg(any(
        feature = "set-pin-direction-api",
        feature = "set-pin-mode-api",
        feature = "version-info-api"
    ))]
    #[inline]
    fn report(&mut self, service: ServiceId, error: Error) -> Error {
        diag::report(&mut self.sink, service, error)
    }

    /// Look up a table entry, reporting [`Error::ParamPin`] if it does not
    /// exist
    ///
    /// # Panics
    ///
    /// Without `dev-error-detect` an out-of-range index panics.
    #[cfg(any(feature = "set-pin-direction-api", feature = "set-pin-mode-api"))]
    fn checked_pin(&mut self, pin: PinIndex, service: ServiceId) -> Result<PinConfig, Error> {
        if DEV_ERROR_DETECT && pin as usize >= self.pins.len() {
            return Err(self.report(service, Error::ParamPin));
        }
        Ok(self.pins[pin as usize])
    }

    /// Change the direction of one pin
    ///
    /// Service ID 0x01. Requires the entry to be configured with a changeable
    /// direction. Debug pins are left untouched. Only the direction register
    /// is written.
    #[cfg(feature = "set-pin-direction-api")]
    pub fn set_pin_direction(&mut self, pin: PinIndex, direction: Direction) -> Result<(), Error> {
        let service = ServiceId::SetPinDirection;
        let cfg = self.checked_pin(pin, service)?;
        if DEV_ERROR_DETECT && !cfg.direction_changeable {
            return Err(self.report(service, Error::DirectionUnchangeable));
        }
        if cfg.is_debug() {
            debug!("port: direction change on debug pin {=u8} ignored", pin);
            return Ok(());
        }
        self.regs.set_dir(cfg.port, cfg.pin, direction);
        Ok(())
    }

    /// Restore the configured direction of every pin whose direction is not
    /// changeable
    ///
    /// Service ID 0x02. Pins with a changeable direction keep whatever
    /// direction they currently have.
    pub fn refresh_port_direction(&mut self) {
        debug!("port: refreshing directions");
        for cfg in self.pins {
            if cfg.is_debug() || cfg.direction_changeable {
                continue;
            }
            self.regs.set_dir(cfg.port, cfg.pin, cfg.direction);
        }
    }

    /// Change the mux mode of one pin
    ///
    /// Service ID 0x04. `mode` is the raw mode value, see
    /// [`PinMode::from_raw`]. Requires the entry to be configured with a
    /// changeable mode. Debug pins are left untouched.
    ///
    /// Without `dev-error-detect` only the low four bits of `mode` are used.
    #[cfg(feature = "set-pin-mode-api")]
    pub fn set_pin_mode(&mut self, pin: PinIndex, mode: u8) -> Result<(), Error> {
        let service = ServiceId::SetPinMode;
        let cfg = self.checked_pin(pin, service)?;
        let mode = if DEV_ERROR_DETECT {
            PinMode::from_raw(mode).map_err(|e| self.report(service, e))?
        } else {
            PinMode::from_nibble(mode)
        };
        if DEV_ERROR_DETECT && !cfg.mode_changeable {
            return Err(self.report(service, Error::ModeUnchangeable));
        }
        if cfg.is_debug() {
            debug!("port: mode change on debug pin {=u8} ignored", pin);
            return Ok(());
        }
        self.regs.change_mode(cfg.port, cfg.pin, mode);
        Ok(())
    }

    /// Fill `info` with the identifiers and version of this driver
    ///
    /// Service ID 0x03. An absent `info` is reported as
    /// [`Error::ParamPointer`].
    #[cfg(feature = "version-info-api")]
    pub fn version_info(&mut self, info: Option<&mut VersionInfo>) -> Result<(), Error> {
        match info {
            Some(info) => {
                *info = VersionInfo::CURRENT;
                Ok(())
            }
            None => Err(self.report(ServiceId::GetVersionInfo, Error::ParamPointer)),
        }
    }

    /// Identifiers and version of this driver
    #[inline]
    pub const fn version(&self) -> VersionInfo {
        VersionInfo::CURRENT
    }

    /// Active configuration table
    #[inline]
    pub fn config(&self) -> &'c [PinConfig] {
        self.pins
    }

    /// Direction currently programmed for a table entry
    pub fn pin_direction(&self, pin: PinIndex) -> Option<Direction> {
        let cfg = self.pins.get(pin as usize)?;
        let out = self.regs.read(cfg.port, Register::Dir) & cfg.mask() != 0;
        Some(if out { Direction::Out } else { Direction::In })
    }

    /// Mux mode currently programmed for a table entry
    pub fn pin_mode(&self, pin: PinIndex) -> Option<PinMode> {
        let cfg = self.pins.get(pin as usize)?;
        let (port, mask) = (cfg.port, cfg.mask());
        if self.regs.read(port, Register::Amsel) & mask != 0 {
            return Some(PinMode::Analog);
        }
        if self.regs.read(port, Register::Afsel) & mask == 0 {
            return Some(PinMode::Dio);
        }
        let nibble = (self.regs.read(port, Register::Pctl) & pctl_mask(cfg.pin)) >> (cfg.pin * 4);
        Some(PinMode::from_nibble(nibble as u8))
    }

    #[inline]
    pub fn registers(&self) -> &R {
        &self.regs
    }

    #[inline]
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Consumes the driver and returns the register backend and the sink
    pub fn release(self) -> (R, S) {
        (self.regs, self.sink)
    }
}

#[cfg(all(
    test,
    feature = "dev-error-detect",
    feature = "set-pin-direction-api",
    feature = "set-pin-mode-api",
    feature = "version-info-api"
))]
mod tests {
    use super::*;
    use crate::diag::tests::RecordingSink;
    use crate::port::config::{PORT_CONFIGURATION, PC0, PD7, PF0, PF1, PF4};
    use crate::port::mock::{Access, MockClocks, MockPorts};
    use crate::port::pins::{Level, PortId, Resistor};

    type TestPort<'c> = Port<'c, MockPorts, RecordingSink>;

    fn init<const N: usize>(config: &PortConfig<N>) -> TestPort<'_> {
        Port::init(
            MockPorts::new(),
            &mut MockClocks::default(),
            config,
            RecordingSink::default(),
        )
    }

    const MIXED: PortConfig<8> = PortConfig::new([
        PinConfig::new(PortId::A, 2).output(Level::High),
        PinConfig::new(PortId::A, 3).output(Level::Low),
        PinConfig::new(PortId::B, 0).input(Resistor::PullUp),
        PinConfig::new(PortId::B, 1).input(Resistor::PullDown),
        PinConfig::new(PortId::B, 2).input(Resistor::Off),
        PinConfig::new(PortId::E, 3)
            .mode(PinMode::Analog)
            .mode_changeable(false),
        PinConfig::new(PortId::D, 6)
            .output(Level::Low)
            .mode(PinMode::ALT7)
            .direction_changeable(false),
        PinConfig::new(PortId::C, 2).output(Level::High),
    ]);

    #[test]
    fn output_levels() {
        let port = init(&MIXED);
        let regs = port.registers();
        assert!(regs.bit(PortId::A, Register::Dir, 2));
        assert!(regs.bit(PortId::A, Register::Data, 2));
        assert!(regs.bit(PortId::A, Register::Dir, 3));
        assert!(!regs.bit(PortId::A, Register::Data, 3));
    }

    #[test]
    fn input_resistors() {
        let port = init(&MIXED);
        let regs = port.registers();
        assert!(!regs.bit(PortId::B, Register::Dir, 0));
        assert!(regs.bit(PortId::B, Register::Pur, 0));
        assert!(!regs.bit(PortId::B, Register::Pdr, 0));
        assert!(!regs.bit(PortId::B, Register::Pur, 1));
        assert!(regs.bit(PortId::B, Register::Pdr, 1));
        assert!(!regs.bit(PortId::B, Register::Pur, 2));
        assert!(!regs.bit(PortId::B, Register::Pdr, 2));
    }

    #[test]
    fn modes_after_init() {
        let port = init(&MIXED);
        let regs = port.registers();
        // Analog
        assert!(regs.bit(PortId::E, Register::Amsel, 3));
        assert!(regs.bit(PortId::E, Register::Afsel, 3));
        assert!(!regs.bit(PortId::E, Register::Den, 3));
        // Alternate function 7
        assert!(regs.bit(PortId::D, Register::Afsel, 6));
        assert!(regs.bit(PortId::D, Register::Den, 6));
        assert_eq!(regs.get(PortId::D, Register::Pctl), 0x0700_0000);
        // Digital I/O
        assert!(!regs.bit(PortId::A, Register::Afsel, 2));
        assert!(regs.bit(PortId::A, Register::Den, 2));
        assert_eq!(port.pin_mode(5), Some(PinMode::Analog));
        assert_eq!(port.pin_mode(6), Some(PinMode::ALT7));
        assert_eq!(port.pin_mode(0), Some(PinMode::Dio));
    }

    #[test]
    fn clocks_enabled_for_every_pin() {
        let mut clocks = MockClocks::default();
        let _port = Port::init(MockPorts::new(), &mut clocks, &MIXED, ());
        let expected = PortId::A.clock_mask()
            | PortId::B.clock_mask()
            | PortId::C.clock_mask()
            | PortId::D.clock_mask()
            | PortId::E.clock_mask();
        assert_eq!(clocks.enabled, expected);
        assert_eq!(clocks.enable_count(), 8);
    }

    #[test]
    fn clock_enabled_before_port_access() {
        let regs = MockPorts::new();
        let mut clocks = regs.clocks();
        let port = Port::init(regs, &mut clocks, &PORT_CONFIGURATION, ());
        let log = port.registers().accesses();
        for id in PortId::ALL {
            let clock = log.iter().position(|a| *a == Access::Clock(id));
            let write = log
                .iter()
                .position(|a| matches!(a, Access::Write(p, ..) if *p == id));
            match (clock, write) {
                (Some(clock), Some(write)) => assert!(clock < write, "port {:?}", id),
                other => panic!("port {:?}: {:?}", id, other),
            }
        }
        assert_eq!(clocks.enable_count(), 43);
    }

    #[test]
    fn reconfigure_applies_new_table() {
        let mut port = init(&MIXED);
        let table = PortConfig::new([PinConfig::new(PortId::A, 2)
            .input(Resistor::PullDown)
            .mode(PinMode::ALT5)]);
        let mut clocks = port.registers().clocks();
        port.reconfigure(&mut clocks, &table);
        assert_eq!(port.config().len(), 1);
        assert_eq!(port.pin_direction(0), Some(Direction::In));
        assert_eq!(port.pin_mode(0), Some(PinMode::ALT5));
        assert!(port.registers().bit(PortId::A, Register::Pdr, 2));
        assert_eq!(port.pin_direction(1), None);
        assert!(port.sink().reports.is_empty());
    }

    #[test]
    fn protected_pins_unlocked_before_configuration() {
        let config = PortConfig::new([
            PinConfig::new(PortId::F, 0).input(Resistor::PullUp),
            PinConfig::new(PortId::D, 7).mode(PinMode::Analog),
        ]);
        let port = init(&config);
        let regs = port.registers();
        for port_id in [PortId::F, PortId::D] {
            let writes = regs.writes_to(port_id);
            assert_eq!(&writes[..2], &[Register::Lock, Register::Cr]);
        }
        // Both only stick if the commit went through
        assert!(regs.bit(PortId::F, Register::Pur, 0));
        assert!(regs.bit(PortId::F, Register::Den, 0));
        assert!(regs.bit(PortId::D, Register::Afsel, 7));
        assert!(regs.bit(PortId::D, Register::Amsel, 7));
    }

    #[test]
    fn board_table_switch_and_led() {
        let port = init(&PORT_CONFIGURATION);
        let regs = port.registers();
        assert!(regs.bit(PortId::F, Register::Pur, 4));
        assert!(regs.bit(PortId::F, Register::Den, 0));
        assert_eq!(port.pin_direction(PF1), Some(Direction::Out));
        assert_eq!(port.pin_direction(PF4), Some(Direction::In));
        assert_eq!(port.pin_direction(PF0), Some(Direction::In));
        assert_eq!(port.pin_mode(PD7), Some(PinMode::Dio));
        assert!(port.sink().reports.is_empty());
    }

    #[test]
    fn debug_pins_never_touched() {
        let config = PortConfig::new([
            PinConfig::new(PortId::C, 0).output(Level::High),
            PinConfig::new(PortId::C, 1).input(Resistor::PullDown),
            PinConfig::new(PortId::C, 2)
                .mode(PinMode::Analog)
                .direction_changeable(false),
            PinConfig::new(PortId::C, 3).mode(PinMode::ALT14),
        ]);
        let reset = MockPorts::new().snapshot();
        let mut port = init(&config);
        assert!(port.registers().writes_to(PortId::C).is_empty());

        port.set_pin_direction(0, Direction::Out).unwrap();
        port.set_pin_mode(1, PinMode::ALT2.into()).unwrap();
        port.set_pin_mode(3, 0).unwrap();
        port.refresh_port_direction();
        assert_eq!(port.registers().write_count(), 0);
        assert_eq!(port.registers().snapshot(), reset);
    }

    #[test]
    fn board_debug_pins_keep_jtag() {
        let port = init(&PORT_CONFIGURATION);
        assert_eq!(port.pin_mode(PC0), Some(PinMode::ALT1));
        let writes = port.registers().writes_to(PortId::C);
        assert!(!writes.is_empty());
        let regs = port.registers();
        assert_eq!(regs.get(PortId::C, Register::Afsel) & 0x0F, 0x0F);
        assert_eq!(regs.get(PortId::C, Register::Pctl) & 0xFFFF, 0x1111);
    }

    #[test]
    fn set_direction_changes_only_dir() {
        let mut port = init(&MIXED);
        let before = port.registers().write_count();
        port.set_pin_direction(2, Direction::Out).unwrap();
        assert_eq!(port.pin_direction(2), Some(Direction::Out));
        let regs = port.registers();
        assert_eq!(regs.write_count(), before + 1);
        assert_eq!(regs.writes_to(PortId::B).last(), Some(&Register::Dir));
        assert!(regs.bit(PortId::B, Register::Pur, 0));
    }

    #[test]
    fn set_direction_unchangeable_rejected() {
        let mut port = init(&MIXED);
        let before = port.registers().write_count();
        let res = port.set_pin_direction(6, Direction::In);
        assert_eq!(res, Err(Error::DirectionUnchangeable));
        assert_eq!(port.pin_direction(6), Some(Direction::Out));
        assert_eq!(port.registers().write_count(), before);
        assert_eq!(
            port.sink().errors(),
            vec![(ServiceId::SetPinDirection, Error::DirectionUnchangeable)]
        );
    }

    #[test]
    fn set_direction_out_of_range() {
        let mut port = init(&MIXED);
        let before = port.registers().write_count();
        assert_eq!(
            port.set_pin_direction(8, Direction::Out),
            Err(Error::ParamPin)
        );
        assert_eq!(port.registers().write_count(), before);
        assert_eq!(
            port.sink().errors(),
            vec![(ServiceId::SetPinDirection, Error::ParamPin)]
        );
    }

    #[test]
    fn refresh_restores_fixed_pins_only() {
        let mut port = init(&MIXED);
        // A changeable pin moved at run time
        port.set_pin_direction(0, Direction::In).unwrap();
        // A fixed pin corrupted behind the driver's back
        let pins = port.config();
        let dir = port.registers().get(PortId::D, Register::Dir);
        let (mut regs, sink) = port.release();
        regs.poke(PortId::D, Register::Dir, dir & !(1 << 6));
        let mut port = Port { regs, pins, sink };
        assert_eq!(port.pin_direction(6), Some(Direction::In));

        port.refresh_port_direction();
        assert_eq!(port.pin_direction(6), Some(Direction::Out));
        assert_eq!(port.pin_direction(0), Some(Direction::In));
        assert!(port.sink().reports.is_empty());
    }

    #[test]
    fn set_mode_switches_mux() {
        let mut port = init(&MIXED);
        port.set_pin_mode(4, PinMode::ALT9.into()).unwrap();
        assert_eq!(port.pin_mode(4), Some(PinMode::ALT9));
        port.set_pin_mode(4, PinMode::Analog.into()).unwrap();
        assert_eq!(port.pin_mode(4), Some(PinMode::Analog));
        assert!(!port.registers().bit(PortId::B, Register::Den, 2));
        port.set_pin_mode(4, PinMode::Dio.into()).unwrap();
        assert_eq!(port.pin_mode(4), Some(PinMode::Dio));
        assert!(!port.registers().bit(PortId::B, Register::Amsel, 2));
        assert_eq!(port.registers().get(PortId::B, Register::Pctl), 0);
    }

    #[test]
    fn set_mode_invalid_value() {
        let mut port = init(&MIXED);
        let before = port.registers().write_count();
        assert_eq!(port.set_pin_mode(4, 16), Err(Error::ParamInvalidMode));
        assert_eq!(port.set_pin_mode(4, 0xFF), Err(Error::ParamInvalidMode));
        assert_eq!(port.registers().write_count(), before);
        assert_eq!(
            port.sink().errors(),
            vec![
                (ServiceId::SetPinMode, Error::ParamInvalidMode),
                (ServiceId::SetPinMode, Error::ParamInvalidMode),
            ]
        );
    }

    #[test]
    fn set_mode_unchangeable_rejected() {
        let mut port = init(&MIXED);
        let before = port.registers().write_count();
        assert_eq!(port.set_pin_mode(5, 0), Err(Error::ModeUnchangeable));
        assert_eq!(port.set_pin_mode(9, 0), Err(Error::ParamPin));
        assert_eq!(port.registers().write_count(), before);
        assert_eq!(port.pin_mode(5), Some(PinMode::Analog));
    }

    #[test]
    fn init_twice_is_idempotent() {
        let once = init(&PORT_CONFIGURATION);
        let snapshot = once.registers().snapshot();
        let (regs, sink) = once.release();
        let twice = Port::init(regs, &mut MockClocks::default(), &PORT_CONFIGURATION, sink);
        assert_eq!(twice.registers().snapshot(), snapshot);

        let mixed = init(&MIXED);
        let snapshot = mixed.registers().snapshot();
        let (regs, sink) = mixed.release();
        let twice = Port::init(regs, &mut MockClocks::default(), &MIXED, sink);
        assert_eq!(twice.registers().snapshot(), snapshot);
    }

    #[test]
    fn version_info_filled() {
        let mut port = init(&MIXED);
        let mut info = VersionInfo::default();
        port.version_info(Some(&mut info)).unwrap();
        assert_eq!(info.module_id, 124);
        assert_eq!(info.vendor_id, 1000);
        assert_eq!(
            (info.sw_major_version, info.sw_minor_version, info.sw_patch_version),
            (1, 0, 0)
        );
        assert_eq!(info, port.version());
        assert_eq!(port.version_info(None), Err(Error::ParamPointer));
        assert_eq!(
            port.sink().errors(),
            vec![(ServiceId::GetVersionInfo, Error::ParamPointer)]
        );
    }

    #[test]
    fn introspection_out_of_range() {
        let port = init(&MIXED);
        assert_eq!(port.pin_direction(8), None);
        assert_eq!(port.pin_mode(200), None);
        assert_eq!(port.config().len(), 8);
    }
}

#[cfg(all(
    test,
    not(feature = "dev-error-detect"),
    feature = "set-pin-direction-api",
    feature = "set-pin-mode-api"
))]
mod unchecked_tests {
    use super::*;
    use crate::diag::tests::RecordingSink;
    use crate::port::mock::MockPorts;
    use crate::port::pins::{Level, PortId};

    const FIXED: PortConfig<2> = PortConfig::new([
        PinConfig::new(PortId::B, 4)
            .output(Level::Low)
            .direction_changeable(false)
            .mode_changeable(false),
        PinConfig::new(PortId::D, 2),
    ]);

    fn init() -> Port<'static, MockPorts, RecordingSink> {
        let regs = MockPorts::new();
        let mut clocks = regs.clocks();
        Port::init(regs, &mut clocks, &FIXED, RecordingSink::default())
    }

    #[test]
    fn changeable_flags_not_enforced() {
        let mut port = init();
        port.set_pin_direction(0, Direction::In).unwrap();
        assert_eq!(port.pin_direction(0), Some(Direction::In));
        assert!(!port.registers().bit(PortId::B, Register::Dir, 4));
        port.set_pin_mode(0, PinMode::ALT2.into()).unwrap();
        assert_eq!(port.pin_mode(0), Some(PinMode::ALT2));
        assert!(port.sink().reports.is_empty());
    }

    #[test]
    fn mode_truncated_to_nibble() {
        let mut port = init();
        port.set_pin_mode(1, 0x13).unwrap();
        assert_eq!(port.pin_mode(1), Some(PinMode::ALT3));
        assert_eq!(port.registers().get(PortId::D, Register::Pctl), 0x300);
        port.set_pin_mode(1, 0xF0).unwrap();
        assert_eq!(port.pin_mode(1), Some(PinMode::Dio));
        assert!(port.sink().reports.is_empty());
    }

    #[test]
    #[should_panic]
    fn out_of_range_direction_panics() {
        let mut port = init();
        let _ = port.set_pin_direction(2, Direction::Out);
    }

    #[test]
    #[should_panic]
    fn out_of_range_mode_panics() {
        let mut port = init();
        let _ = port.set_pin_mode(200, 0);
    }
}
