//! In-memory register model for host tests
//!
//! Reproduces the reset state and the lock/commit protection of the
//! TM4C123GH6PM port blocks and records every access in order. Clock
//! enables from [`MockPorts::clocks`] land in the same log as the register
//! writes.

use std::cell::RefCell;
use std::rc::Rc;

use super::pins::{is_debug, is_protected, PortId};
#[cfg(all(feature = "set-pin-direction-api", feature = "set-pin-mode-api"))]
use super::reg::ClockGate;
use super::reg::{PortRegisters, Register, UNLOCK_KEY};

/// Registers gated by the commit register
const COMMITTED: [Register; 4] = [Register::Afsel, Register::Pur, Register::Pdr, Register::Den];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Write(PortId, Register, u32),
    #[cfg(all(feature = "set-pin-direction-api", feature = "set-pin-mode-api"))]
    Clock(PortId),
}

pub type AccessLog = Rc<RefCell<Vec<Access>>>;

#[derive(Debug)]
pub struct MockPorts {
    regs: [[u32; 10]; 6],
    unlocked: [bool; 6],
    log: AccessLog,
}

impl MockPorts {
    /// Register state after a power-on reset
    pub fn new() -> Self {
        let mut regs = [[0; 10]; 6];
        for port in PortId::ALL {
            regs[port.index()][Register::Cr.index()] = 0xFF;
        }
        let c = PortId::C.index();
        regs[c][Register::Afsel.index()] = 0x0F;
        regs[c][Register::Den.index()] = 0x0F;
        regs[c][Register::Pur.index()] = 0x0F;
        regs[c][Register::Pctl.index()] = 0x1111;
        regs[c][Register::Cr.index()] = 0xF0;
        regs[PortId::D.index()][Register::Cr.index()] = 0x7F;
        regs[PortId::F.index()][Register::Cr.index()] = 0xFE;
        MockPorts {
            regs,
            unlocked: [false; 6],
            log: AccessLog::default(),
        }
    }

    /// Clock gate that records into this model's access log
    #[cfg(all(feature = "set-pin-direction-api", feature = "set-pin-mode-api"))]
    pub fn clocks(&self) -> MockClocks {
        MockClocks {
            enabled: 0,
            log: Rc::clone(&self.log),
        }
    }

    /// Every recorded access, in order
    #[cfg(all(feature = "set-pin-direction-api", feature = "set-pin-mode-api"))]
    pub fn accesses(&self) -> Vec<Access> {
        self.log.borrow().clone()
    }

    /// Current register value, without logging
    pub fn get(&self, port: PortId, reg: Register) -> u32 {
        if reg == Register::Lock {
            return (!self.unlocked[port.index()]) as u32;
        }
        self.regs[port.index()][reg.index()]
    }

    #[cfg(all(feature = "set-pin-direction-api", feature = "set-pin-mode-api"))]
    pub fn bit(&self, port: PortId, reg: Register, pin: u8) -> bool {
        self.get(port, reg) & (1 << pin) != 0
    }

    /// Overwrite a register behind the driver's back
    #[cfg(all(feature = "set-pin-direction-api", feature = "set-pin-mode-api"))]
    pub fn poke(&mut self, port: PortId, reg: Register, value: u32) {
        self.regs[port.index()][reg.index()] = value;
    }

    /// Registers written on `port`, in order
    pub fn writes_to(&self, port: PortId) -> Vec<Register> {
        self.log
            .borrow()
            .iter()
            .filter_map(|a| match a {
                Access::Write(p, reg, _) if *p == port => Some(*reg),
                _ => None,
            })
            .collect()
    }

    #[cfg(all(feature = "set-pin-direction-api", feature = "set-pin-mode-api"))]
    pub fn write_count(&self) -> usize {
        self.log
            .borrow()
            .iter()
            .filter(|a| matches!(a, Access::Write(..)))
            .count()
    }

    #[cfg(all(feature = "set-pin-direction-api", feature = "set-pin-mode-api"))]
    pub fn snapshot(&self) -> [[u32; 10]; 6] {
        self.regs
    }
}

impl PortRegisters for MockPorts {
    fn read(&self, port: PortId, reg: Register) -> u32 {
        self.get(port, reg)
    }

    fn write(&mut self, port: PortId, reg: Register, value: u32) {
        self.log.borrow_mut().push(Access::Write(port, reg, value));
        let p = port.index();
        match reg {
            Register::Lock => self.unlocked[p] = value == UNLOCK_KEY,
            Register::Cr => {
                if self.unlocked[p] {
                    self.regs[p][reg.index()] = value & 0xFF;
                }
            }
            _ if COMMITTED.contains(&reg) => {
                // Bits of NMI and JTAG pins keep their value unless committed
                let mut keep = 0;
                for pin in 0..8 {
                    let committed = self.regs[p][Register::Cr.index()] & (1 << pin) != 0;
                    if (is_protected(port, pin) || is_debug(port, pin)) && !committed {
                        keep |= 1 << pin;
                    }
                }
                let old = self.regs[p][reg.index()];
                self.regs[p][reg.index()] = (old & keep) | (value & !keep);
            }
            _ => self.regs[p][reg.index()] = value,
        }
    }
}

/// Records clock enables, into the log of a [`MockPorts`] when created by
/// [`MockPorts::clocks`] and into a private log otherwise
#[cfg(all(feature = "set-pin-direction-api", feature = "set-pin-mode-api"))]
#[derive(Debug, Default)]
pub struct MockClocks {
    pub enabled: u32,
    log: AccessLog,
}

#[cfg(all(feature = "set-pin-direction-api", feature = "set-pin-mode-api"))]
impl MockClocks {
    pub fn enable_count(&self) -> usize {
        self.log
            .borrow()
            .iter()
            .filter(|a| matches!(a, Access::Clock(_)))
            .count()
    }
}

#[cfg(all(feature = "set-pin-direction-api", feature = "set-pin-mode-api"))]
impl ClockGate for MockClocks {
    fn enable_port_clock(&mut self, port: PortId) {
        self.enabled |= port.clock_mask();
        self.log.borrow_mut().push(Access::Clock(port));
    }
}

#[test]
fn protected_bits_need_commit() {
    let mut regs = MockPorts::new();
    regs.write(PortId::F, Register::Den, 0x1F);
    assert_eq!(regs.get(PortId::F, Register::Den), 0x1E);
    // Commit is ignored while locked
    regs.write(PortId::F, Register::Cr, 0xFF);
    assert_eq!(regs.get(PortId::F, Register::Cr), 0xFE);
    regs.write(PortId::F, Register::Lock, UNLOCK_KEY);
    assert_eq!(regs.get(PortId::F, Register::Lock), 0);
    regs.write(PortId::F, Register::Cr, 0xFF);
    regs.write(PortId::F, Register::Den, 0x1F);
    assert_eq!(regs.get(PortId::F, Register::Den), 0x1F);
}
