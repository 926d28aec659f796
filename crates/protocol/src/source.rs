//! Deposit source hashes.
//!
//! Every facet deposit is authenticated by a deterministic source hash instead
//! of a signature: `keccak256(zero_pad32(domain) ++ keccak256(payload))`,
//! where the payload binds the deposit to the exact L1 observation it was
//! derived from.

use alloy_primitives::{keccak256, B256, U256};

/// The domains separating deposit source hashes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DepositSourceDomain {
    /// A user deposit, derived from an inbox call or inbox event.
    User = 0,
    /// The per-block L1 attributes deposit.
    L1Info = 1,
    /// A one-off upgrade deposit injected at a fork block.
    Upgrade = 2,
}

fn domain_source_hash(domain: DepositSourceDomain, payload_hash: B256) -> B256 {
    let mut buf = [0u8; 64];
    buf[..32].copy_from_slice(&U256::from(domain as u8).to_be_bytes::<32>());
    buf[32..].copy_from_slice(payload_hash.as_slice());
    keccak256(buf)
}

/// The source of a user deposit: the L1 block and transaction it was observed
/// in, disambiguated by log index for event-derived deposits (zero for the
/// calldata path).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserDepositSource {
    /// The hash of the L1 block containing the deposit.
    pub l1_block_hash: B256,
    /// The hash of the L1 transaction carrying the payload.
    pub l1_tx_hash: B256,
    /// The index of the inbox event log, or zero for inbox calls.
    pub log_index: u64,
}

impl UserDepositSource {
    /// Creates a new [`UserDepositSource`].
    pub const fn new(l1_block_hash: B256, l1_tx_hash: B256, log_index: u64) -> Self {
        Self { l1_block_hash, l1_tx_hash, log_index }
    }

    /// Computes the source hash.
    pub fn source_hash(&self) -> B256 {
        let mut payload = [0u8; 96];
        payload[..32].copy_from_slice(self.l1_block_hash.as_slice());
        payload[32..64].copy_from_slice(self.l1_tx_hash.as_slice());
        payload[64..].copy_from_slice(&U256::from(self.log_index).to_be_bytes::<32>());
        domain_source_hash(DepositSourceDomain::User, keccak256(payload))
    }
}

/// The source of the per-block L1 attributes deposit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct L1InfoDepositSource {
    /// The hash of the epoch's L1 block.
    pub l1_block_hash: B256,
    /// The sequence number of the L2 block within its epoch.
    pub seq_number: u64,
}

impl L1InfoDepositSource {
    /// Creates a new [`L1InfoDepositSource`].
    pub const fn new(l1_block_hash: B256, seq_number: u64) -> Self {
        Self { l1_block_hash, seq_number }
    }

    /// Computes the source hash.
    pub fn source_hash(&self) -> B256 {
        let mut payload = [0u8; 64];
        payload[..32].copy_from_slice(self.l1_block_hash.as_slice());
        payload[32..].copy_from_slice(&U256::from(self.seq_number).to_be_bytes::<32>());
        domain_source_hash(DepositSourceDomain::L1Info, keccak256(payload))
    }
}

/// The source of a one-off upgrade deposit, identified by its intent string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UpgradeDepositSource {
    /// The unique intent of the upgrade, e.g. `"Facet: FCT v2 migration"`.
    pub intent: String,
}

impl UpgradeDepositSource {
    /// Creates a new [`UpgradeDepositSource`].
    pub const fn new(intent: String) -> Self {
        Self { intent }
    }

    /// Computes the source hash.
    pub fn source_hash(&self) -> B256 {
        domain_source_hash(DepositSourceDomain::Upgrade, keccak256(self.intent.as_bytes()))
    }
}
