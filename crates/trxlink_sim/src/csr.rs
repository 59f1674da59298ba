//! Control/status register map.
//!
//! Registers are 32 bits wide at 4-byte strides. Field encodings:
//!
//! | Address | Register | Fields |
//! |---|---|---|
//! | `0x00` | `control` | bit0 reset, bit1 power_down, bit8 tx_enable, bit9 rx_enable, bit16 loopback |
//! | `0x04` | `status` | bit0 rx_clk_active, bit1 rx_frame_active (reads 0), bit2 rx_frame_aligned |
//! | `0x08` | `delay` | bits[0:5) tx tap, bits[8:13) rx tap |
//! | `0x0c` | `tx_pattern_control` | bit0 enable, bit1 mode |
//! | `0x10` | `rx_pattern_control` | bit0 enable, bit1 mode |
//! | `0x14` | `rx_pattern_errors` | 32-bit error count |
//! | `0x18` | `cycles_latch` | write strobe |
//! | `0x1c` | `cycles` | latched link cycle count |

use crate::error::SimError;
use crate::pattern::PatternMode;
use trxlink_common::DelayTap;

/// `control` register address.
pub const CONTROL: u32 = 0x00;
/// `status` register address.
pub const STATUS: u32 = 0x04;
/// `delay` register address.
pub const DELAY: u32 = 0x08;
/// `tx_pattern_control` register address.
pub const TX_PATTERN_CONTROL: u32 = 0x0c;
/// `rx_pattern_control` register address.
pub const RX_PATTERN_CONTROL: u32 = 0x10;
/// `rx_pattern_errors` register address.
pub const RX_PATTERN_ERRORS: u32 = 0x14;
/// `cycles_latch` register address.
pub const CYCLES_LATCH: u32 = 0x18;
/// `cycles` register address.
pub const CYCLES: u32 = 0x1c;

/// How software may access a register.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    /// Read/write storage.
    ReadWrite,
    /// Read-only status; writes are ignored.
    ReadOnly,
    /// Write strobe; reads return 0.
    Strobe,
}

/// One entry of the register map.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegisterInfo {
    /// Register name.
    pub name: &'static str,
    /// Byte address.
    pub addr: u32,
    /// Access type.
    pub access: Access,
}

/// The full register map in address order.
pub const REGISTERS: [RegisterInfo; 8] = [
    RegisterInfo { name: "control", addr: CONTROL, access: Access::ReadWrite },
    RegisterInfo { name: "status", addr: STATUS, access: Access::ReadOnly },
    RegisterInfo { name: "delay", addr: DELAY, access: Access::ReadWrite },
    RegisterInfo { name: "tx_pattern_control", addr: TX_PATTERN_CONTROL, access: Access::ReadWrite },
    RegisterInfo { name: "rx_pattern_control", addr: RX_PATTERN_CONTROL, access: Access::ReadWrite },
    RegisterInfo { name: "rx_pattern_errors", addr: RX_PATTERN_ERRORS, access: Access::ReadOnly },
    RegisterInfo { name: "cycles_latch", addr: CYCLES_LATCH, access: Access::Strobe },
    RegisterInfo { name: "cycles", addr: CYCLES, access: Access::ReadOnly },
];

/// Looks up a register by address.
pub fn lookup(addr: u32) -> Result<&'static RegisterInfo, SimError> {
    REGISTERS
        .iter()
        .find(|r| r.addr == addr)
        .ok_or(SimError::UnmappedRegister { addr })
}

/// Word-addressed register access.
pub trait RegisterBus {
    /// Reads the register at byte address `addr`.
    fn read(&self, addr: u32) -> Result<u32, SimError>;

    /// Writes the register at byte address `addr`.
    fn write(&mut self, addr: u32, value: u32) -> Result<(), SimError>;
}

fn bit(value: u32, offset: u32) -> bool {
    value >> offset & 1 != 0
}

/// `control` register fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ControlReg {
    /// Hold the transceiver in reset.
    pub reset: bool,
    /// Power the transceiver down.
    pub power_down: bool,
    /// Enable the transceiver TX path.
    pub tx_enable: bool,
    /// Enable the transceiver RX path.
    pub rx_enable: bool,
    /// Mirror TX link data into the RX path.
    pub loopback: bool,
}

impl ControlReg {
    /// Bit offset of `reset`.
    pub const RESET: u32 = 0;
    /// Bit offset of `power_down`.
    pub const POWER_DOWN: u32 = 1;
    /// Bit offset of `tx_enable`.
    pub const TX_ENABLE: u32 = 8;
    /// Bit offset of `rx_enable`.
    pub const RX_ENABLE: u32 = 9;
    /// Bit offset of `loopback`.
    pub const LOOPBACK: u32 = 16;

    /// Decodes a register value; unused bits are ignored.
    pub fn from_bits(value: u32) -> Self {
        Self {
            reset: bit(value, Self::RESET),
            power_down: bit(value, Self::POWER_DOWN),
            tx_enable: bit(value, Self::TX_ENABLE),
            rx_enable: bit(value, Self::RX_ENABLE),
            loopback: bit(value, Self::LOOPBACK),
        }
    }

    /// Encodes the register value.
    pub fn bits(&self) -> u32 {
        u32::from(self.reset) << Self::RESET
            | u32::from(self.power_down) << Self::POWER_DOWN
            | u32::from(self.tx_enable) << Self::TX_ENABLE
            | u32::from(self.rx_enable) << Self::RX_ENABLE
            | u32::from(self.loopback) << Self::LOOPBACK
    }
}

impl Default for ControlReg {
    /// Reset value `0x300`: both directions enabled, nothing else.
    fn default() -> Self {
        Self {
            reset: false,
            power_down: false,
            tx_enable: true,
            rx_enable: true,
            loopback: false,
        }
    }
}

/// `status` register fields.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatusReg {
    /// The link clock toggled during the last activity window.
    pub rx_clk_active: bool,
    /// Reserved.
    pub rx_frame_active: bool,
    /// The RX frame bits are aligned.
    pub rx_frame_aligned: bool,
}

impl StatusReg {
    /// Encodes the register value.
    pub fn bits(&self) -> u32 {
        u32::from(self.rx_clk_active)
            | u32::from(self.rx_frame_active) << 1
            | u32::from(self.rx_frame_aligned) << 2
    }

    /// Decodes a register value.
    pub fn from_bits(value: u32) -> Self {
        Self {
            rx_clk_active: bit(value, 0),
            rx_frame_active: bit(value, 1),
            rx_frame_aligned: bit(value, 2),
        }
    }
}

/// `delay` register fields.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DelayReg {
    /// TX output clock tap.
    pub tx: DelayTap,
    /// RX data and frame tap.
    pub rx: DelayTap,
}

impl DelayReg {
    /// Bit offset of the RX tap field.
    pub const RX_OFFSET: u32 = 8;

    /// Decodes a register value, truncating each tap to its 5-bit field.
    pub fn from_bits(value: u32) -> Self {
        Self {
            tx: DelayTap::from_field(value),
            rx: DelayTap::from_field(value >> Self::RX_OFFSET),
        }
    }

    /// Encodes the register value.
    pub fn bits(&self) -> u32 {
        u32::from(self.tx.value()) | u32::from(self.rx.value()) << Self::RX_OFFSET
    }
}

/// `tx_pattern_control` / `rx_pattern_control` fields.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PatternControl {
    /// Run the generator or checker.
    pub enable: bool,
    /// Pattern selection.
    pub mode: PatternMode,
}

impl PatternControl {
    /// Decodes a register value.
    pub fn from_bits(value: u32) -> Self {
        Self {
            enable: bit(value, 0),
            mode: PatternMode::from_bit(bit(value, 1)),
        }
    }

    /// Encodes the register value.
    pub fn bits(&self) -> u32 {
        u32::from(self.enable) | u32::from(self.mode.bit()) << 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_is_word_aligned_and_unique() {
        for (i, reg) in REGISTERS.iter().enumerate() {
            assert_eq!(reg.addr, 4 * i as u32);
        }
    }

    #[test]
    fn lookup_rejects_unmapped() {
        assert_eq!(lookup(DELAY).unwrap().name, "delay");
        assert!(matches!(
            lookup(0x20),
            Err(SimError::UnmappedRegister { addr: 0x20 })
        ));
        assert!(matches!(lookup(0x02), Err(SimError::UnmappedRegister { .. })));
    }

    #[test]
    fn control_reset_value() {
        assert_eq!(ControlReg::default().bits(), 0x300);
    }

    #[test]
    fn control_fields_roundtrip() {
        let c = ControlReg::from_bits(0x1_0003);
        assert!(c.reset && c.power_down && c.loopback);
        assert!(!c.tx_enable && !c.rx_enable);
        assert_eq!(c.bits(), 0x1_0003);
        assert_eq!(ControlReg::from_bits(0xffff_ffff).bits(), 0x1_0303);
    }

    #[test]
    fn delay_fields_truncate() {
        let d = DelayReg::from_bits(0x1f10);
        assert_eq!(d.tx.value(), 16);
        assert_eq!(d.rx.value(), 31);
        assert_eq!(d.bits(), 0x1f10);
        let d = DelayReg::from_bits(0x0000_2025);
        assert_eq!(d.tx.value(), 5);
        assert_eq!(d.rx.value(), 0);
    }

    #[test]
    fn pattern_control_bits() {
        let p = PatternControl::from_bits(0b11);
        assert!(p.enable);
        assert_eq!(p.mode, PatternMode::Prbs);
        assert_eq!(PatternControl::from_bits(0b01).mode, PatternMode::Count);
        assert_eq!(p.bits(), 0b11);
    }

    #[test]
    fn status_bits() {
        let s = StatusReg {
            rx_clk_active: true,
            rx_frame_active: false,
            rx_frame_aligned: true,
        };
        assert_eq!(s.bits(), 0b101);
        assert_eq!(StatusReg::from_bits(0b101), s);
    }
}
