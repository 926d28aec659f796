//! The L1 attributes transaction calldata codec.
//!
//! Every facet block opens with a system deposit to the L1 block predeploy
//! whose calldata snapshots the epoch's L1 observables and the mint state.
//! Two fixed layouts exist: the 196-byte base layout used below the v2 fork
//! and the 260-byte extended layout that appends the rational mint-state
//! fields. Re-deriving a block must reproduce the calldata byte for byte, and
//! a resyncing node recovers its mint state by decoding it back.

use alloy_primitives::{Bytes, B256, U256};

use crate::{
    block::L1BlockInfo,
    config::ChainConfig,
    mint::MintState,
};

/// The 4-byte selector prefixing the attributes calldata.
pub const L1_INFO_TX_SELECTOR: [u8; 4] = [0x44, 0x0a, 0x5e, 0x20];

/// Byte length of the base attributes layout.
pub const BASE_ATTRIBUTES_LEN: usize = 196;

/// Byte length of the extended attributes layout.
pub const EXTENDED_ATTRIBUTES_LEN: usize = 260;

/// An attributes codec error.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AttributesError {
    /// The calldata is neither the base nor the extended length.
    #[error("invalid attributes calldata length: {0}")]
    InvalidLength(usize),
    /// The calldata does not start with the attributes selector.
    #[error("invalid attributes selector: {0:#010x}")]
    InvalidSelector(u32),
    /// A field does not fit its wire width.
    #[error("attributes field overflows its encoding: {0}")]
    FieldOverflow(&'static str),
}

/// The rational mint-state fields appended by the extended layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MintStateFields {
    /// The L2 block the current mint period started at.
    pub period_start_block: u128,
    /// Cumulative FCT issuance, in FCT wei.
    pub total_minted: u128,
    /// FCT minted within the current period.
    pub period_minted: U256,
}

/// The decoded attributes calldata.
///
/// Layout (big-endian, after the selector): `base_fee_scalar` u32,
/// `blob_base_fee_scalar` u32, `sequence_number` u64, `timestamp` u64,
/// `number` u64, `base_fee` u256, `blob_base_fee` u256, `block_hash` b256,
/// `batcher_hash` b256, `mint_period_l1_data_gas` u128, `mint_rate` u128,
/// then optionally [`MintStateFields`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct L1BlockAttributes {
    /// Fee scalar, carried for layout compatibility. Always zero.
    pub base_fee_scalar: u32,
    /// Blob fee scalar, carried for layout compatibility. Always zero.
    pub blob_base_fee_scalar: u32,
    /// The sequence number of the L2 block within its epoch.
    pub sequence_number: u64,
    /// The epoch's L1 timestamp.
    pub timestamp: u64,
    /// The epoch's L1 block number.
    pub number: u64,
    /// The epoch's L1 base fee.
    pub base_fee: U256,
    /// The epoch's L1 blob base fee.
    pub blob_base_fee: U256,
    /// The epoch's L1 block hash.
    pub block_hash: B256,
    /// Batcher hash, carried for layout compatibility. Always zero.
    pub batcher_hash: B256,
    /// L1 data gas consumed within the current mint period.
    pub mint_period_l1_data_gas: u128,
    /// The current FCT mint rate.
    pub mint_rate: u128,
    /// The extended-layout mint fields, absent below the v2 fork.
    pub mint_state: Option<MintStateFields>,
}

impl L1BlockAttributes {
    /// Builds the attributes for a block from its epoch observables and mint
    /// snapshot. The extended layout is selected at and above the v2 fork.
    pub fn from_block(
        cfg: &ChainConfig,
        info: &L1BlockInfo,
        sequence_number: u64,
        l2_block: u64,
        mint: &MintState,
    ) -> Result<Self, AttributesError> {
        let mint_rate = u128::try_from(mint.rate)
            .map_err(|_| AttributesError::FieldOverflow("mint_rate"))?;
        let mint_state = if cfg.is_v2_active(l2_block) {
            Some(MintStateFields {
                period_start_block: u128::from(mint.period_start_block),
                total_minted: u128::try_from(mint.total_minted)
                    .map_err(|_| AttributesError::FieldOverflow("total_minted"))?,
                period_minted: mint.period_minted,
            })
        } else {
            None
        };
        Ok(Self {
            base_fee_scalar: 0,
            blob_base_fee_scalar: 0,
            sequence_number,
            timestamp: info.timestamp,
            number: info.number,
            base_fee: info.base_fee,
            blob_base_fee: info.blob_base_fee,
            block_hash: info.hash,
            batcher_hash: B256::ZERO,
            mint_period_l1_data_gas: mint.period_l1_data_gas,
            mint_rate,
            mint_state,
        })
    }

    /// Encodes the calldata, selecting the layout by the presence of the
    /// extended fields.
    pub fn encode_calldata(&self) -> Bytes {
        let len = if self.mint_state.is_some() {
            EXTENDED_ATTRIBUTES_LEN
        } else {
            BASE_ATTRIBUTES_LEN
        };
        let mut buf = Vec::with_capacity(len);
        buf.extend_from_slice(&L1_INFO_TX_SELECTOR);
        buf.extend_from_slice(&self.base_fee_scalar.to_be_bytes());
        buf.extend_from_slice(&self.blob_base_fee_scalar.to_be_bytes());
        buf.extend_from_slice(&self.sequence_number.to_be_bytes());
        buf.extend_from_slice(&self.timestamp.to_be_bytes());
        buf.extend_from_slice(&self.number.to_be_bytes());
        buf.extend_from_slice(&self.base_fee.to_be_bytes::<32>());
        buf.extend_from_slice(&self.blob_base_fee.to_be_bytes::<32>());
        buf.extend_from_slice(self.block_hash.as_slice());
        buf.extend_from_slice(self.batcher_hash.as_slice());
        buf.extend_from_slice(&self.mint_period_l1_data_gas.to_be_bytes());
        buf.extend_from_slice(&self.mint_rate.to_be_bytes());
        if let Some(state) = &self.mint_state {
            buf.extend_from_slice(&state.period_start_block.to_be_bytes());
            buf.extend_from_slice(&state.total_minted.to_be_bytes());
            buf.extend_from_slice(&state.period_minted.to_be_bytes::<32>());
        }
        buf.into()
    }

    /// Decodes the calldata of an attributes transaction. The layout is
    /// selected by length.
    pub fn decode_calldata(data: &[u8]) -> Result<Self, AttributesError> {
        let extended = match data.len() {
            BASE_ATTRIBUTES_LEN => false,
            EXTENDED_ATTRIBUTES_LEN => true,
            n => return Err(AttributesError::InvalidLength(n)),
        };
        if data[0..4] != L1_INFO_TX_SELECTOR {
            let mut selector = [0u8; 4];
            selector.copy_from_slice(&data[0..4]);
            return Err(AttributesError::InvalidSelector(u32::from_be_bytes(selector)));
        }

        let u32_at = |at: usize| {
            let mut word = [0u8; 4];
            word.copy_from_slice(&data[at..at + 4]);
            u32::from_be_bytes(word)
        };
        let u64_at = |at: usize| {
            let mut word = [0u8; 8];
            word.copy_from_slice(&data[at..at + 8]);
            u64::from_be_bytes(word)
        };
        let u128_at = |at: usize| {
            let mut word = [0u8; 16];
            word.copy_from_slice(&data[at..at + 16]);
            u128::from_be_bytes(word)
        };

        let mint_state = extended.then(|| MintStateFields {
            period_start_block: u128_at(196),
            total_minted: u128_at(212),
            period_minted: U256::from_be_slice(&data[228..260]),
        });

        Ok(Self {
            base_fee_scalar: u32_at(4),
            blob_base_fee_scalar: u32_at(8),
            sequence_number: u64_at(12),
            timestamp: u64_at(20),
            number: u64_at(28),
            base_fee: U256::from_be_slice(&data[36..68]),
            blob_base_fee: U256::from_be_slice(&data[68..100]),
            block_hash: B256::from_slice(&data[100..132]),
            batcher_hash: B256::from_slice(&data[132..164]),
            mint_period_l1_data_gas: u128_at(164),
            mint_rate: u128_at(180),
            mint_state,
        })
    }

    /// Reconstructs the mint-state snapshot carried by extended-layout
    /// calldata. Quota and supply cap are re-derived from the chain config.
    pub fn to_mint_state(&self, cfg: &ChainConfig) -> Result<Option<MintState>, AttributesError> {
        let Some(fields) = &self.mint_state else {
            return Ok(None);
        };
        let period_start_block = u64::try_from(fields.period_start_block)
            .map_err(|_| AttributesError::FieldOverflow("period_start_block"))?;
        let total_minted = U256::from(fields.total_minted);
        Ok(Some(MintState {
            rate: U256::from(self.mint_rate),
            total_minted,
            period_start_block,
            period_minted: fields.period_minted,
            period_l1_data_gas: self.mint_period_l1_data_gas,
            target_per_period: MintState::target_at(cfg, total_minted),
            max_supply: cfg.max_supply,
        }))
    }
}
