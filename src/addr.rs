//! # Address Module
//!
//! Provides the [`Addr`] type, a load address inside the debuggee.
//!
//! Addresses are captured once from the host and never change afterwards. They are displayed
//! as fixed-width lowercase hex (`0x` and 16 digits), which keeps backtrace columns aligned.

use std::fmt::Display;
use std::num::ParseIntError;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A load-time instruction or data address in the debuggee
#[derive(Hash, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Addr(u64);

impl Addr {
    pub fn u64(&self) -> u64 {
        self.0
    }

    /// `self + rhs`, or [`None`] if that leaves the address space
    pub fn checked_add(&self, rhs: u64) -> Option<Addr> {
        self.0.checked_add(rhs).map(Addr)
    }

    /// `self + rhs`, clamped to the highest address
    pub fn saturating_add(&self, rhs: u64) -> Addr {
        Addr(self.0.saturating_add(rhs))
    }

    /// Distance in bytes from `start` up to this address
    ///
    /// Returns [`None`] if `start` lies behind this address, which happens when the host hands
    /// out a symbol that does not actually contain the address.
    pub fn offset_from(&self, start: Addr) -> Option<u64> {
        self.0.checked_sub(start.0)
    }
}

impl Display for Addr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

impl std::fmt::Debug for Addr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

impl std::fmt::LowerHex for Addr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::LowerHex::fmt(&self.0, f)
    }
}

impl From<u64> for Addr {
    fn from(value: u64) -> Self {
        Addr(value)
    }
}

impl From<usize> for Addr {
    fn from(value: usize) -> Self {
        Addr(value as u64)
    }
}

impl From<Addr> for u64 {
    fn from(value: Addr) -> Self {
        value.0
    }
}

/// Accepts `0x`-prefixed hex or plain decimal, the two forms users type into the console
impl FromStr for Addr {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let value = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => u64::from_str_radix(hex, 16)?,
            None => s.parse::<u64>()?,
        };
        Ok(Addr(value))
    }
}
