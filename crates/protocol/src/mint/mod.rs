//! FCT mint accounting.
//!
//! Every facet transaction burns L1 data costs (`data_gas × base_fee`) and
//! mints FCT in exchange. Issuance runs in rolling periods with a quota; the
//! rate re-calibrates at every period rollover, and the per-period target
//! halves as cumulative issuance crosses the halving schedule. All arithmetic
//! is exact big-integer multiply-then-floor-divide; a single drifting wei
//! would compound over millions of blocks.

mod legacy;
pub use legacy::LegacyMintCalculator;

use alloy_primitives::U256;

use crate::{
    config::{ChainConfig, MAX_MINT_RATE, MIN_MINT_RATE},
    derive::DerivedTransaction,
};

/// Why a mint period rolled over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RolloverReason {
    /// The period minted its full quota before its block count expired.
    QuotaExhausted,
    /// The period's block count expired below quota.
    PeriodExpired,
}

/// The rolling mint state, snapshotted into every facet block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct MintState {
    /// FCT wei minted per wei burned.
    pub rate: U256,
    /// Cumulative FCT issuance, in FCT wei.
    pub total_minted: U256,
    /// The L2 block the current period started at.
    pub period_start_block: u64,
    /// FCT minted within the current period.
    pub period_minted: U256,
    /// L1 data gas consumed within the current period.
    pub period_l1_data_gas: u128,
    /// The current period's issuance quota.
    pub target_per_period: U256,
    /// The supply cap, carried for snapshot completeness.
    pub max_supply: U256,
}

impl MintState {
    /// The number of supply halvings that have occurred: threshold `k` sits at
    /// `max_supply - max_supply >> (k + 1)`, i.e. each halving splits the
    /// remaining distance to the cap.
    pub fn halvings(total_minted: U256, max_supply: U256) -> u32 {
        let mut k = 0u32;
        while k < 200 && total_minted >= max_supply - (max_supply >> (k + 1)) {
            k += 1;
        }
        k
    }

    /// The period target at the given cumulative issuance.
    pub fn target_at(cfg: &ChainConfig, total_minted: U256) -> U256 {
        cfg.initial_target_per_period >> Self::halvings(total_minted, cfg.max_supply)
    }

    /// Bootstraps the rational state at the v2 fork block. The legacy rate is
    /// denominated per L1 gas; dividing by the fork block's base fee converts
    /// it to per wei burned.
    pub fn bootstrap(
        cfg: &ChainConfig,
        l2_block: u64,
        legacy_rate_per_gas: u128,
        base_fee: U256,
        total_minted: U256,
    ) -> Self {
        let base_fee = base_fee.max(U256::ONE);
        let rate = (U256::from(legacy_rate_per_gas) / base_fee).clamp(MIN_MINT_RATE, MAX_MINT_RATE);
        Self {
            rate,
            total_minted,
            period_start_block: l2_block,
            period_minted: U256::ZERO,
            period_l1_data_gas: 0,
            target_per_period: Self::target_at(cfg, total_minted),
            max_supply: cfg.max_supply,
        }
    }

    /// Rolls the period if its block count has expired. Called once at the
    /// start of every block, before any transaction is processed.
    pub fn begin_block(&mut self, cfg: &ChainConfig, l2_block: u64) {
        if l2_block.saturating_sub(self.period_start_block) >= cfg.target_period_length {
            self.roll_period(cfg, RolloverReason::PeriodExpired, l2_block);
        }
    }

    /// Consumes a burn amount against the current period and supply caps,
    /// returning the FCT minted. May roll the period several times for a
    /// single large burn.
    pub fn mint_for_burn(&mut self, cfg: &ChainConfig, burn: U256, l2_block: u64) -> U256 {
        let mut remaining = burn;
        let mut minted = U256::ZERO;
        while !remaining.is_zero() {
            let supply_left = cfg.max_supply - self.total_minted;
            if supply_left.is_zero() {
                break;
            }
            // Late in the halving schedule the target shifts to zero while
            // supply remains; quotas stop binding and only the cap applies.
            let quota_left = if self.target_per_period.is_zero() {
                supply_left
            } else {
                let left = self.target_per_period.saturating_sub(self.period_minted);
                if left.is_zero() {
                    self.roll_period(cfg, RolloverReason::QuotaExhausted, l2_block);
                    continue;
                }
                left
            };
            // A 256-bit overflow of `burn × rate` means the caps bind.
            let amount = match remaining.checked_mul(self.rate) {
                Some(mintable) => mintable.min(quota_left).min(supply_left),
                None => quota_left.min(supply_left),
            };
            // Floor division. When the full burn was mintable the product is
            // exact and this returns `remaining` with no remainder.
            let burn_used = amount / self.rate;
            self.period_minted += amount;
            self.total_minted += amount;
            minted += amount;
            remaining -= burn_used.min(remaining);
            if !self.target_per_period.is_zero() && self.period_minted >= self.target_per_period {
                self.roll_period(cfg, RolloverReason::QuotaExhausted, l2_block);
            }
        }
        minted
    }

    /// Records L1 data gas against the current period.
    pub fn note_data_gas(&mut self, data_gas: u128) {
        self.period_l1_data_gas = self.period_l1_data_gas.saturating_add(data_gas);
    }

    /// Starts a new period, re-calibrating the rate:
    ///
    /// - quota exhausted after `e` of `L` target blocks:
    ///   `rate ×= clamp(e / L, 1/4, 1)`
    /// - block count expired at `m` of `t` target issuance:
    ///   `rate ×= min(t / m, 4)` (×4 when nothing minted)
    ///
    /// The new rate is clamped to `[MIN_MINT_RATE, MAX_MINT_RATE]`.
    pub fn roll_period(&mut self, cfg: &ChainConfig, reason: RolloverReason, l2_block: u64) {
        let new_rate = match reason {
            RolloverReason::QuotaExhausted => {
                let elapsed = U256::from(l2_block.saturating_sub(self.period_start_block));
                let length = U256::from(cfg.target_period_length);
                if elapsed >= length {
                    self.rate
                } else if elapsed * U256::from(4) <= length {
                    self.rate / U256::from(4)
                } else {
                    self.rate * elapsed / length
                }
            }
            RolloverReason::PeriodExpired => {
                let ceiling = self.rate * U256::from(4);
                if self.period_minted.is_zero() {
                    ceiling
                } else {
                    match self.rate.checked_mul(self.target_per_period) {
                        Some(product) => (product / self.period_minted).min(ceiling),
                        None => ceiling,
                    }
                }
            }
        };
        self.rate = new_rate.clamp(MIN_MINT_RATE, MAX_MINT_RATE);
        self.period_start_block = l2_block;
        self.period_minted = U256::ZERO;
        self.period_l1_data_gas = 0;
        self.target_per_period = Self::target_at(cfg, self.total_minted);
    }
}

/// The per-block mint strategy: legacy fixed-point below the v2 fork, the
/// rational period engine at and above it. The variant is chosen once per
/// block by number comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MintEngine {
    /// Pre-fork: per-gas fixed-point issuance, tracking the running total for
    /// the fork bootstrap.
    Legacy {
        /// The fixed-point calculator.
        calc: LegacyMintCalculator,
        /// Cumulative issuance so far.
        total_minted: U256,
    },
    /// Post-fork: the rational period engine.
    Rational {
        /// The rolling mint state.
        state: MintState,
    },
}

impl MintEngine {
    /// A fresh engine starting in legacy mode.
    pub fn new(cfg: &ChainConfig) -> Self {
        Self::Legacy { calc: LegacyMintCalculator::new(cfg), total_minted: U256::ZERO }
    }

    /// Resumes the rational engine from a snapshot (e.g. decoded from the
    /// engine head's attributes transaction).
    pub const fn from_state(state: MintState) -> Self {
        Self::Rational { state }
    }

    /// Assigns mint amounts to every transaction of a block, in order, and
    /// returns the mint-state snapshot for the block. Transitions from the
    /// legacy to the rational engine at the v2 fork.
    pub fn process_block(
        &mut self,
        cfg: &ChainConfig,
        l2_block: u64,
        base_fee: U256,
        txs: &mut [DerivedTransaction],
    ) -> MintState {
        if let Self::Legacy { calc, total_minted } = self {
            if cfg.is_v2_active(l2_block) {
                let rate_per_gas = calc.rate_at(cfg.l1_block_for(l2_block));
                let state =
                    MintState::bootstrap(cfg, l2_block, rate_per_gas, base_fee, *total_minted);
                *self = Self::Rational { state };
            }
        }
        match self {
            Self::Legacy { calc, total_minted } => {
                let l1_block = cfg.l1_block_for(l2_block);
                let mut block_data_gas = 0u128;
                for tx in txs.iter_mut() {
                    let mint = calc.mint_for(tx.data_gas, l1_block);
                    tx.deposit.mint = mint;
                    *total_minted += mint;
                    block_data_gas = block_data_gas.saturating_add(tx.data_gas);
                }
                MintState {
                    rate: U256::from(calc.rate_at(l1_block)),
                    total_minted: *total_minted,
                    period_start_block: l2_block,
                    period_minted: U256::ZERO,
                    period_l1_data_gas: block_data_gas,
                    target_per_period: U256::ZERO,
                    max_supply: cfg.max_supply,
                }
            }
            Self::Rational { state } => {
                state.begin_block(cfg, l2_block);
                for tx in txs.iter_mut() {
                    let burn = U256::from(tx.data_gas) * base_fee;
                    tx.deposit.mint = state.mint_for_burn(cfg, burn, l2_block);
                    state.note_data_gas(tx.data_gas);
                }
                *state
            }
        }
    }

    /// The cumulative issuance so far.
    pub const fn total_minted(&self) -> U256 {
        match self {
            Self::Legacy { total_minted, .. } => *total_minted,
            Self::Rational { state } => state.total_minted,
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::Rng;

    use super::*;

    fn test_config() -> ChainConfig {
        ChainConfig {
            max_supply: U256::from(1_000_000u64),
            initial_target_per_period: U256::from(1_000u64),
            target_period_length: 10_000,
            ..ChainConfig::mainnet()
        }
    }

    fn state_with(cfg: &ChainConfig, rate: u64, period_minted: u64, start: u64) -> MintState {
        MintState {
            rate: U256::from(rate),
            total_minted: U256::from(period_minted),
            period_start_block: start,
            period_minted: U256::from(period_minted),
            period_l1_data_gas: 0,
            target_per_period: cfg.initial_target_per_period,
            max_supply: cfg.max_supply,
        }
    }

    #[test]
    fn test_quota_straddling_burn() {
        // Quota 1000 with 600 already minted, rate 2, burn 600 wei: 400 FCT
        // fill the old period (200 wei burn-equivalent), the period rolls at
        // half its target length (factor 1/2 halves the rate to 1), and the
        // remaining 400 wei mint 400 FCT against the new period.
        let cfg = test_config();
        let mut state = state_with(&cfg, 2, 600, 0);
        let minted = state.mint_for_burn(&cfg, U256::from(600u64), 5_000);
        assert_eq!(minted, U256::from(800u64));
        assert_eq!(state.rate, U256::from(1u64));
        assert_eq!(state.period_minted, U256::from(400u64));
        assert_eq!(state.period_start_block, 5_000);
        assert_eq!(state.total_minted, U256::from(1_400u64));
    }

    #[test]
    fn test_single_burn_rolls_multiple_periods() {
        let cfg = ChainConfig {
            initial_target_per_period: U256::from(100u64),
            ..test_config()
        };
        let mut state = state_with(&cfg, 16, 0, 0);
        state.target_per_period = cfg.initial_target_per_period;
        // Huge burn: every rollover happens at elapsed 0, quartering the rate.
        let minted = state.mint_for_burn(&cfg, U256::from(1_000u64), 0);
        // Each period mints exactly its quota until the rate floors out.
        assert!(minted > U256::from(300u64));
        assert!(state.rate >= MIN_MINT_RATE);
        assert!(state.rate < U256::from(16u64));
    }

    #[test]
    fn test_mint_conservation_randomized() {
        let cfg = test_config();
        let mut state = state_with(&cfg, 3, 0, 0);
        let mut rng = rand::thread_rng();
        let mut total = U256::ZERO;
        for block in 0..2_000u64 {
            state.begin_block(&cfg, block);
            let before = state.total_minted;
            let burn = U256::from(rng.gen_range(0..5_000u64));
            let minted = state.mint_for_burn(&cfg, burn, block);
            assert_eq!(state.total_minted - before, minted, "mint must equal Δtotal");
            total += minted;
            assert!(state.total_minted <= cfg.max_supply);
            assert!(state.rate >= MIN_MINT_RATE && state.rate <= MAX_MINT_RATE);
        }
        assert_eq!(total, state.total_minted);
    }

    #[test]
    fn test_zero_target_tail_mints_against_supply() {
        // 938 of 1000 minted crosses four halvings, shifting the target
        // (initial 4) to zero with 62 wei of supply still left. Burns in that
        // regime must mint against the cap and terminate, not spin on an
        // empty quota.
        let cfg = ChainConfig {
            max_supply: U256::from(1_000u64),
            initial_target_per_period: U256::from(4u64),
            ..test_config()
        };
        let total = U256::from(938u64);
        let mut state = MintState {
            rate: U256::from(2u64),
            total_minted: total,
            period_start_block: 0,
            period_minted: U256::ZERO,
            period_l1_data_gas: 0,
            target_per_period: MintState::target_at(&cfg, total),
            max_supply: cfg.max_supply,
        };
        assert_eq!(state.target_per_period, U256::ZERO);

        let minted = state.mint_for_burn(&cfg, U256::from(10u64), 100);
        assert_eq!(minted, U256::from(20u64));
        assert_eq!(state.total_minted, U256::from(958u64));

        // The cap still binds on the way out.
        let rest = state.mint_for_burn(&cfg, U256::from(u64::MAX), 101);
        assert_eq!(rest, U256::from(42u64));
        assert_eq!(state.total_minted, cfg.max_supply);
        assert_eq!(state.mint_for_burn(&cfg, U256::from(10u64), 102), U256::ZERO);
    }

    #[test]
    fn test_supply_cap_is_hard() {
        let cfg = ChainConfig { max_supply: U256::from(500u64), ..test_config() };
        let mut state = state_with(&cfg, 1_000, 0, 0);
        state.max_supply = cfg.max_supply;
        state.target_per_period = U256::from(1_000u64);
        let minted = state.mint_for_burn(&cfg, U256::from(u64::MAX), 0);
        assert_eq!(minted, U256::from(500u64));
        assert_eq!(state.total_minted, cfg.max_supply);
        // Further burns mint nothing.
        assert_eq!(state.mint_for_burn(&cfg, U256::from(100u64), 1), U256::ZERO);
    }

    #[test]
    fn test_expiry_rollover_raises_rate() {
        let cfg = test_config();
        // Period expired with a quarter of the target minted: rate ×4 exactly.
        let mut state = state_with(&cfg, 8, 250, 0);
        state.begin_block(&cfg, cfg.target_period_length);
        assert_eq!(state.rate, U256::from(32u64));
        assert_eq!(state.period_minted, U256::ZERO);

        // Nothing minted at all: capped at ×4.
        let mut idle = state_with(&cfg, 8, 0, 0);
        idle.period_minted = U256::ZERO;
        idle.begin_block(&cfg, cfg.target_period_length);
        assert_eq!(idle.rate, U256::from(32u64));
    }

    #[test]
    fn test_rate_bounds_under_random_rollovers() {
        let cfg = test_config();
        let mut state = state_with(&cfg, 1, 0, 0);
        let mut rng = rand::thread_rng();
        let mut block = 0u64;
        for _ in 0..5_000 {
            block += rng.gen_range(0..cfg.target_period_length * 2);
            let reason = if rng.gen_bool(0.5) {
                RolloverReason::QuotaExhausted
            } else {
                RolloverReason::PeriodExpired
            };
            state.period_minted = U256::from(rng.gen_range(0..1_001u64));
            state.roll_period(&cfg, reason, block);
            assert!(state.rate >= MIN_MINT_RATE);
            assert!(state.rate <= MAX_MINT_RATE);
        }
    }

    #[test]
    fn test_halving_schedule() {
        let max = U256::from(1_000u64);
        assert_eq!(MintState::halvings(U256::ZERO, max), 0);
        assert_eq!(MintState::halvings(U256::from(499u64), max), 0);
        // 50% of the cap: first halving.
        assert_eq!(MintState::halvings(U256::from(500u64), max), 1);
        // 75%: second halving.
        assert_eq!(MintState::halvings(U256::from(750u64), max), 2);
        // 999/1000: every shifted threshold up to `max >> 11 == 0` is crossed.
        assert_eq!(MintState::halvings(U256::from(999u64), max), 10);
    }

    #[test]
    fn test_bootstrap_converts_rate_units() {
        let cfg = test_config();
        // 1e18 FCT per gas at 25 gwei: 4e7 FCT per wei burned.
        let state =
            MintState::bootstrap(&cfg, 10, 10u128.pow(18), U256::from(25_000_000_000u64), U256::ZERO);
        assert_eq!(state.rate, U256::from(40_000_000u64));
        assert_eq!(state.target_per_period, cfg.initial_target_per_period);
    }

    #[test]
    fn test_burn_used_floor_rounding() {
        // Quota 10 left at rate 3: mints 10, consumes floor(10/3) = 3 wei of
        // burn; the 1-wei remainder stays burnable in the next period.
        let cfg = ChainConfig {
            initial_target_per_period: U256::from(10u64),
            ..test_config()
        };
        let mut state = state_with(&cfg, 3, 0, 0);
        state.target_per_period = U256::from(10u64);
        let minted = state.mint_for_burn(&cfg, U256::from(4u64), 0);
        // First iteration: amount = 10 (quota-capped), burn_used = 3, roll.
        // Second: remaining 1 wei mints 1 × new_rate.
        assert!(minted >= U256::from(10u64));
        assert_eq!(state.total_minted, minted);
    }
}
