//! Chain configuration and protocol constants.

use alloy_primitives::{address, Address, U256};

/// The L1 inbox address. Calldata sent here (and inbox events emitted by
/// contracts) carry candidate facet transactions.
pub const INBOX_ADDRESS: Address = address!("00000000000000000000000000000000000FacE7");

/// The type byte prefixing every inbox payload.
pub const INBOX_TX_TYPE: u8 = 0x46;

/// The EIP-2718 type byte of a facet deposit transaction.
pub const DEPOSIT_TX_TYPE: u8 = 0x7E;

/// The offset applied to an L1 contract address that originates a deposit,
/// separating contract- and EOA-origin address spaces on L2.
pub const ALIAS_OFFSET: Address = address!("1111000000000000000000000000000000001111");

/// The depositor account of the per-block L1 attributes transaction.
pub const L1_INFO_DEPOSITOR: Address = address!("DeaDDEaDDeAdDeAdDEAdDEaddeAddEAdDEAd0001");

/// The L2 predeploy receiving the L1 attributes transaction.
pub const L1_BLOCK_PREDEPLOY: Address = address!("4200000000000000000000000000000000000015");

/// Gas limit of the per-block L1 attributes transaction.
pub const L1_INFO_TX_GAS: u64 = 1_000_000;

/// Lower bound of the FCT mint rate (wei of FCT per wei burned).
pub const MIN_MINT_RATE: U256 = U256::ONE;

/// Upper bound of the FCT mint rate: `2^128 - 1`.
pub const MAX_MINT_RATE: U256 = U256::from_limbs([u64::MAX, u64::MAX, 0, 0]);

/// An L2 block is "safe" once its epoch is this many L1 blocks behind the tip.
pub const SAFE_EPOCH_LAG: u64 = 32;

/// An L2 block is "finalized" once its epoch is this many L1 blocks behind the
/// tip. Caches are pruned below this watermark.
pub const FINALIZED_EPOCH_LAG: u64 = 64;

/// Per-chain protocol parameters.
///
/// Everything the derivation pipeline needs to turn L1 blocks into facet
/// blocks: addressing, the L1/L2 block-number mapping, and the FCT issuance
/// schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct ChainConfig {
    /// The facet chain id, checked against every inbox payload.
    pub l2_chain_id: u64,
    /// The L1 inbox address.
    pub inbox_address: Address,
    /// The L1 block whose derived L2 block has number 0.
    pub l1_genesis_block: u64,
    /// The first L2 block processed by the rational mint engine (and carrying
    /// the extended attributes layout). Blocks below it use the legacy
    /// fixed-point calculator.
    pub v2_fork_block: u64,
    /// Hard cap on cumulative FCT issuance, in FCT wei.
    pub max_supply: U256,
    /// Issuance quota of the first mint period, in FCT wei. Halves with the
    /// supply-threshold schedule.
    pub initial_target_per_period: U256,
    /// Target length of a mint period, in blocks.
    pub target_period_length: u64,
    /// Legacy calculator: FCT wei minted per unit of L1 data gas at launch.
    pub legacy_initial_rate: u128,
    /// Legacy calculator: the rate halves every this many L1 blocks.
    pub legacy_halving_period: u64,
    /// Gas limit requested for every facet block.
    pub block_gas_limit: u64,
}

impl ChainConfig {
    /// The facet mainnet configuration.
    pub fn mainnet() -> Self {
        Self {
            l2_chain_id: 0xface7,
            inbox_address: INBOX_ADDRESS,
            l1_genesis_block: 19_135_000,
            v2_fork_block: 1_200_000,
            // 21B FCT.
            max_supply: U256::from(21_000_000_000u128 * 10u128.pow(18)),
            // 400k FCT per period.
            initial_target_per_period: U256::from(400_000u128 * 10u128.pow(18)),
            target_period_length: 10_000,
            legacy_initial_rate: 10u128.pow(18),
            legacy_halving_period: 2_630_000,
            block_gas_limit: 50_000_000,
        }
    }

    /// The L1 block owning the epoch of the given L2 block.
    pub const fn l1_block_for(&self, l2_number: u64) -> u64 {
        self.l1_genesis_block + l2_number
    }

    /// The L2 block derived from the given L1 block. Pre-genesis L1 numbers
    /// saturate to the L2 genesis.
    pub const fn l2_block_for(&self, l1_number: u64) -> u64 {
        l1_number.saturating_sub(self.l1_genesis_block)
    }

    /// Whether the given L2 block uses the rational mint engine and the
    /// extended attributes layout.
    pub const fn is_v2_active(&self, l2_number: u64) -> bool {
        l2_number >= self.v2_fork_block
    }
}
