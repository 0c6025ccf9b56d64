//! Amounts in leor, the smallest HAR unit

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;

use crate::constants::LEOR_PER_HARBI;

/// Display unit for amounts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountUnit {
    MegaHarbi,
    KiloHarbi,
    Harbi,
    MilliHarbi,
    MicroHarbi,
    Leor,
}

impl AmountUnit {
    /// Power of ten relative to one HAR
    fn exponent(self) -> i32 {
        match self {
            AmountUnit::MegaHarbi => 6,
            AmountUnit::KiloHarbi => 3,
            AmountUnit::Harbi => 0,
            AmountUnit::MilliHarbi => -3,
            AmountUnit::MicroHarbi => -6,
            AmountUnit::Leor => -8,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            AmountUnit::MegaHarbi => "MHAR",
            AmountUnit::KiloHarbi => "kHAR",
            AmountUnit::Harbi => "HAR",
            AmountUnit::MilliHarbi => "mHAR",
            AmountUnit::MicroHarbi => "uHAR",
            AmountUnit::Leor => "Leor",
        }
    }
}

/// Amount of leor
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Amount(pub u64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub fn from_harbi(harbi: u64) -> Self {
        Amount(harbi * LEOR_PER_HARBI)
    }

    pub fn leor(self) -> u64 {
        self.0
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    /// Format in the given unit with the unit's symbol
    pub fn format(self, unit: AmountUnit) -> String {
        let decimals = (unit.exponent() + 8).max(0) as usize;
        if decimals == 0 {
            let divisor = 10u64.pow((-(unit.exponent() + 8)) as u32);
            return format!("{} {}", self.0 / divisor, unit.symbol());
        }
        let scale = 10u64.pow(decimals as u32);
        format!(
            "{}.{:0width$} {}",
            self.0 / scale,
            self.0 % scale,
            unit.symbol(),
            width = decimals
        )
    }
}

impl From<u64> for Amount {
    fn from(leor: u64) -> Self {
        Amount(leor)
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Self {
        Amount(iter.map(|a| a.0).sum())
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(AmountUnit::Harbi))
    }
}
