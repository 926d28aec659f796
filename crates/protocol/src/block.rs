//! Block types.
//!
//! Plain data carriers decoupled from RPC response types; the node crate owns
//! the conversion from `alloy` RPC blocks and receipts.

use alloy_primitives::{Address, Bytes, B256, U256};
use derive_more::Display;

use crate::mint::MintState;

/// Block header info.
#[derive(Debug, Clone, Display, Copy, Eq, Hash, PartialEq, Default)]
#[display(
    "BlockInfo {{ hash: {hash}, number: {number}, parent_hash: {parent_hash}, timestamp: {timestamp} }}"
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct BlockInfo {
    /// The block hash.
    pub hash: B256,
    /// The block number.
    pub number: u64,
    /// The parent block hash.
    pub parent_hash: B256,
    /// The block timestamp.
    pub timestamp: u64,
}

impl BlockInfo {
    /// Instantiates a new [`BlockInfo`].
    pub const fn new(hash: B256, number: u64, parent_hash: B256, timestamp: u64) -> Self {
        Self { hash, number, parent_hash, timestamp }
    }

    /// Returns `true` if this block is the direct parent of the given block.
    pub fn is_parent_of(&self, block: &Self) -> bool {
        self.number + 1 == block.number && self.hash == block.parent_hash
    }
}

/// An L1 block header plus the fields the derivation pipeline consumes.
#[derive(Debug, Clone, Eq, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct L1BlockInfo {
    /// The block number.
    pub number: u64,
    /// The block hash.
    pub hash: B256,
    /// The parent block hash.
    pub parent_hash: B256,
    /// The block timestamp.
    pub timestamp: u64,
    /// The base fee per gas.
    pub base_fee: U256,
    /// The mix hash (post-merge: prevRandao).
    pub mix_hash: B256,
    /// The blob base fee, zero before EIP-4844.
    pub blob_base_fee: U256,
    /// The parent beacon block root, if the block carries one (EIP-4788).
    pub parent_beacon_block_root: Option<B256>,
}

impl L1BlockInfo {
    /// Returns the header info of this block.
    pub const fn block_info(&self) -> BlockInfo {
        BlockInfo::new(self.hash, self.number, self.parent_hash, self.timestamp)
    }
}

/// An event log emitted by an L1 transaction.
#[derive(Debug, Clone, Eq, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct L1Log {
    /// The emitting contract.
    pub address: Address,
    /// The log topics.
    pub topics: Vec<B256>,
    /// The log data.
    pub data: Bytes,
    /// The log index within the block.
    pub log_index: u64,
    /// Set when the log was removed by a reorg of the serving node.
    pub removed: bool,
}

/// An L1 transaction with its receipt logs, in block order.
#[derive(Debug, Clone, Eq, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct L1Transaction {
    /// The transaction hash.
    pub hash: B256,
    /// The recovered sender.
    pub from: Address,
    /// The call target; `None` for contract creations.
    pub to: Option<Address>,
    /// The calldata.
    pub input: Bytes,
    /// The receipt logs, ascending by log index.
    pub logs: Vec<L1Log>,
}

/// An L1 block with its transactions, ready for derivation.
#[derive(Debug, Clone, Eq, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct L1Block {
    /// The header fields.
    pub info: L1BlockInfo,
    /// The transactions with their logs.
    pub transactions: Vec<L1Transaction>,
}

/// The L1 epoch a facet block is derived from.
#[derive(Debug, Clone, Display, Copy, Eq, PartialEq, Default)]
#[display("Epoch {{ number: {number}, hash: {hash}, timestamp: {timestamp} }}")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Epoch {
    /// The L1 block number.
    pub number: u64,
    /// The L1 block hash.
    pub hash: B256,
    /// The L1 block timestamp.
    pub timestamp: u64,
    /// The L1 base fee per gas.
    pub base_fee: U256,
}

impl From<&L1BlockInfo> for Epoch {
    fn from(info: &L1BlockInfo) -> Self {
        Self {
            number: info.number,
            hash: info.hash,
            timestamp: info.timestamp,
            base_fee: info.base_fee,
        }
    }
}

/// A committed facet block: header info, its L1 epoch, its position within the
/// epoch, and the mint state after processing it.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct FacetBlock {
    /// The block header info.
    pub block_info: BlockInfo,
    /// The L1 epoch this block was derived from.
    pub epoch: Epoch,
    /// The position of this block within its epoch.
    pub seq_num: u64,
    /// Snapshot of the mint state after this block.
    pub mint: MintState,
}

impl FacetBlock {
    /// Returns the block hash.
    pub const fn hash(&self) -> B256 {
        self.block_info.hash
    }

    /// Returns the block number.
    pub const fn number(&self) -> u64 {
        self.block_info.number
    }
}
