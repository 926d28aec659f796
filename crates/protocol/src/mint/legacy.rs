//! The pre-fork FCT mint calculator.
//!
//! Before the v2 fork, FCT issuance was a fixed-point function of L1 data gas
//! alone: a per-gas rate that halves on a block schedule. No periods, no
//! supply cap. Kept only for deriving historical blocks.

use alloy_primitives::U256;

use crate::config::ChainConfig;

/// The legacy fixed-point mint calculator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegacyMintCalculator {
    /// FCT wei minted per unit of L1 data gas at launch.
    initial_rate: u128,
    /// The rate halves every this many L1 blocks.
    halving_period: u64,
    /// The L1 block the halving schedule starts at.
    start_block: u64,
}

impl LegacyMintCalculator {
    /// Creates the calculator for the given chain.
    pub const fn new(cfg: &ChainConfig) -> Self {
        Self {
            initial_rate: cfg.legacy_initial_rate,
            halving_period: cfg.legacy_halving_period,
            start_block: cfg.l1_genesis_block,
        }
    }

    /// The per-data-gas rate at the given L1 block.
    pub const fn rate_at(&self, l1_block: u64) -> u128 {
        let halvings = l1_block.saturating_sub(self.start_block) / self.halving_period;
        if halvings >= 128 {
            return 0;
        }
        self.initial_rate >> halvings
    }

    /// The FCT minted for the given data gas at the given L1 block.
    pub fn mint_for(&self, data_gas: u128, l1_block: u64) -> U256 {
        U256::from(data_gas) * U256::from(self.rate_at(l1_block))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calculator() -> LegacyMintCalculator {
        LegacyMintCalculator { initial_rate: 1_000, halving_period: 100, start_block: 50 }
    }

    #[test]
    fn test_rate_halves_on_schedule() {
        let calc = calculator();
        assert_eq!(calc.rate_at(50), 1_000);
        assert_eq!(calc.rate_at(149), 1_000);
        assert_eq!(calc.rate_at(150), 500);
        assert_eq!(calc.rate_at(250), 250);
    }

    #[test]
    fn test_rate_exhausts() {
        let calc = calculator();
        assert_eq!(calc.rate_at(50 + 100 * 128), 0);
    }

    #[test]
    fn test_mint_is_linear_in_data_gas() {
        let calc = calculator();
        assert_eq!(calc.mint_for(7, 50), U256::from(7_000u64));
        assert_eq!(calc.mint_for(0, 50), U256::ZERO);
    }
}
