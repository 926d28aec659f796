//! Derivation of facet deposit transactions from L1 blocks.
//!
//! Each L1 transaction yields at most one candidate deposit, via one of two
//! paths:
//!
//! - **Inbox call**: the transaction is addressed to the inbox and its
//!   calldata is the payload. The L2 sender is the L1 sender, unaliased.
//! - **Inbox event**: the transaction is addressed elsewhere, but a contract
//!   emitted the inbox event; the event's `bytes` argument is the payload and
//!   the emitting contract becomes the (aliased) L2 sender. Only the first
//!   decodable event of a transaction counts.
//!
//! Malformed candidates are excluded silently; rejection is never an error.

use std::sync::LazyLock;

use alloy_primitives::{keccak256, Address, Bytes, TxKind, B256, U256};
use alloy_rlp::{Decodable, Header};
use tracing::debug;

use crate::{
    block::L1Transaction,
    config::{
        ChainConfig, ALIAS_OFFSET, INBOX_TX_TYPE, L1_BLOCK_PREDEPLOY, L1_INFO_DEPOSITOR,
        L1_INFO_TX_GAS,
    },
    deposit::DepositTransaction,
    source::{L1InfoDepositSource, UpgradeDepositSource, UserDepositSource},
};

/// The inbox event ABI signature.
pub const INBOX_EVENT_ABI: &str = "FacetLogInboxMessage(bytes)";

/// The inbox event topic: `keccak256` of [`INBOX_EVENT_ABI`]. Inbox events
/// carry exactly this one topic.
pub static INBOX_EVENT_TOPIC: LazyLock<B256> =
    LazyLock::new(|| keccak256(INBOX_EVENT_ABI.as_bytes()));

/// Intent of the one-off mint-state migration deposit at the v2 fork.
pub const V2_MIGRATION_INTENT: &str = "Facet: FCT v2 mint state migration";

/// Where a candidate deposit originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepositOrigin {
    /// Derived from calldata sent by an EOA directly to the inbox.
    Eoa,
    /// Derived from an inbox event emitted by a contract.
    Contract,
}

/// A candidate deposit with its L1 data-cost accounting. The mint amount is
/// assigned later by the mint engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedTransaction {
    /// The deposit, with `mint` still zero.
    pub deposit: DepositTransaction,
    /// The L1 data gas attributed to this deposit.
    pub data_gas: u128,
    /// The derivation path that produced it.
    pub origin: DepositOrigin,
}

/// A candidate-payload validation error. Any of these simply excludes the
/// candidate.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DerivationError {
    /// The payload is empty.
    #[error("empty inbox payload")]
    EmptyPayload,
    /// The payload does not start with the `0x46` type byte.
    #[error("invalid inbox payload type byte: {0:#04x}")]
    InvalidTypeByte(u8),
    /// The RLP body is malformed or non-canonical (leading-zero integers
    /// included).
    #[error("malformed inbox payload rlp: {0}")]
    Rlp(#[from] alloy_rlp::Error),
    /// Bytes remain after the RLP list.
    #[error("trailing bytes after inbox payload list")]
    TrailingBytes,
    /// The list carries more than the five expected fields.
    #[error("unexpected extra fields in inbox payload list")]
    ExtraFields,
    /// The payload names a different chain.
    #[error("chain id mismatch: got {got}, expected {expected}")]
    ChainIdMismatch {
        /// The chain id carried by the payload.
        got: U256,
        /// The configured facet chain id.
        expected: u64,
    },
    /// The `to` field is neither empty nor 20 bytes.
    #[error("invalid `to` field length: {0}")]
    InvalidToLength(usize),
    /// The gas limit does not fit a `u64`.
    #[error("gas limit overflows u64")]
    GasLimitOverflow,
    /// The event log carries the wrong number of topics.
    #[error("unexpected number of inbox event topics: {0}")]
    UnexpectedTopicsLen(usize),
    /// The event data is shorter than the ABI head.
    #[error("incomplete inbox event data: {0} bytes")]
    IncompleteEventData(usize),
    /// The event data is not 32-byte aligned.
    #[error("unaligned inbox event data: {0} bytes")]
    UnalignedEventData(usize),
    /// The ABI offset of the `bytes` argument is not 32.
    #[error("invalid inbox event data offset")]
    InvalidEventDataOffset,
    /// The declared `bytes` length does not fit the data.
    #[error("inbox event data length {declared} exceeds available {available}")]
    EventDataOverflow {
        /// The declared content length.
        declared: usize,
        /// The bytes actually present after the ABI head.
        available: usize,
    },
    /// The padding after the `bytes` content is wrong.
    #[error("invalid inbox event data padding")]
    InvalidEventDataPadding,
}

/// A decoded inbox payload: `0x46 ++ rlp([chain_id, to, value, gas_limit, data])`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboxMessage {
    /// The call target, or create when the `to` field is empty.
    pub to: TxKind,
    /// The value transferred.
    pub value: U256,
    /// The gas limit.
    pub gas_limit: u64,
    /// The calldata.
    pub data: Bytes,
}

/// Decodes and validates an inbox payload. Integer fields must be canonical
/// RLP (a leading zero byte rejects the candidate), the `to` field must be
/// empty or exactly 20 bytes, and the chain id must match.
pub fn decode_inbox_payload(
    payload: &[u8],
    l2_chain_id: u64,
) -> Result<InboxMessage, DerivationError> {
    let (&tag, mut body) = payload.split_first().ok_or(DerivationError::EmptyPayload)?;
    if tag != INBOX_TX_TYPE {
        return Err(DerivationError::InvalidTypeByte(tag));
    }

    let header = Header::decode(&mut body)?;
    if !header.list {
        return Err(DerivationError::Rlp(alloy_rlp::Error::UnexpectedString));
    }
    if body.len() > header.payload_length {
        return Err(DerivationError::TrailingBytes);
    }

    let fields = &mut &body[..];
    let chain_id = U256::decode(fields)?;
    if chain_id != U256::from(l2_chain_id) {
        return Err(DerivationError::ChainIdMismatch { got: chain_id, expected: l2_chain_id });
    }
    let to_bytes = Bytes::decode(fields)?;
    let to = match to_bytes.len() {
        0 => TxKind::Create,
        20 => TxKind::Call(Address::from_slice(&to_bytes)),
        n => return Err(DerivationError::InvalidToLength(n)),
    };
    let value = U256::decode(fields)?;
    let gas_limit_raw = U256::decode(fields)?;
    let gas_limit =
        u64::try_from(gas_limit_raw).map_err(|_| DerivationError::GasLimitOverflow)?;
    let data = Bytes::decode(fields)?;
    if !fields.is_empty() {
        return Err(DerivationError::ExtraFields);
    }

    Ok(InboxMessage { to, value, gas_limit, data })
}

/// Extracts the tightly-packed payload from the ABI-encoded `bytes` argument
/// of an inbox event: a 32-byte offset (always 32), a 32-byte length, the
/// content, and zero padding up to the next 32-byte boundary.
pub fn decode_event_payload(data: &[u8]) -> Result<&[u8], DerivationError> {
    if data.len() < 64 {
        return Err(DerivationError::IncompleteEventData(data.len()));
    }
    if data.len() % 32 != 0 {
        return Err(DerivationError::UnalignedEventData(data.len()));
    }

    if U256::from_be_slice(&data[0..32]) != U256::from(32) {
        return Err(DerivationError::InvalidEventDataOffset);
    }
    let declared = U256::from_be_slice(&data[32..64]);
    let declared = usize::try_from(declared).map_err(|_| DerivationError::EventDataOverflow {
        declared: usize::MAX,
        available: data.len() - 64,
    })?;

    let content = data.get(64..64 + declared).ok_or(DerivationError::EventDataOverflow {
        declared,
        available: data.len() - 64,
    })?;

    // The content is padded to the next multiple of 32 and nothing may follow.
    let padded = declared.div_ceil(32) * 32;
    if data.len() != 64 + padded {
        return Err(DerivationError::InvalidEventDataPadding);
    }
    if !data[64 + declared..].iter().all(|&b| b == 0) {
        return Err(DerivationError::InvalidEventDataPadding);
    }

    Ok(content)
}

/// Applies the contract-address alias: `l2 = (l1 + offset) mod 2^160`.
pub fn alias_contract_address(l1: Address) -> Address {
    let sum = U256::from_be_slice(l1.as_slice()) + U256::from_be_slice(ALIAS_OFFSET.as_slice());
    Address::from_slice(&sum.to_be_bytes::<32>()[12..])
}

/// The L1 data gas attributed to a payload: calldata pricing for EOA-origin
/// deposits, a flat per-byte price (no sparse-data discount) for
/// contract-origin deposits.
pub fn payload_data_gas(payload: &[u8], origin: DepositOrigin) -> u128 {
    match origin {
        DepositOrigin::Eoa => {
            let zeros = payload.iter().filter(|&&b| b == 0).count() as u128;
            let nonzeros = payload.len() as u128 - zeros;
            4 * zeros + 16 * nonzeros
        }
        DepositOrigin::Contract => 8 * payload.len() as u128,
    }
}

/// Derives the candidate deposit of a single L1 transaction, if any.
pub fn derive_transaction(
    cfg: &ChainConfig,
    l1_block_hash: B256,
    tx: &L1Transaction,
) -> Option<DerivedTransaction> {
    if tx.to == Some(cfg.inbox_address) {
        return match decode_inbox_payload(&tx.input, cfg.l2_chain_id) {
            Ok(message) => {
                let source = UserDepositSource::new(l1_block_hash, tx.hash, 0);
                Some(build_user_deposit(
                    message,
                    tx.from,
                    source.source_hash(),
                    &tx.input,
                    DepositOrigin::Eoa,
                ))
            }
            Err(err) => {
                debug!(target: "facet::derive", tx = %tx.hash, %err, "skipping malformed inbox call");
                None
            }
        };
    }

    // Event path: first decodable inbox event wins, in log-index order.
    for log in &tx.logs {
        if log.removed {
            continue;
        }
        if log.topics.len() != 1 || log.topics[0] != *INBOX_EVENT_TOPIC {
            continue;
        }
        let payload = match decode_event_payload(&log.data) {
            Ok(payload) => payload,
            Err(err) => {
                debug!(target: "facet::derive", tx = %tx.hash, log_index = log.log_index, %err, "skipping malformed inbox event");
                continue;
            }
        };
        match decode_inbox_payload(payload, cfg.l2_chain_id) {
            Ok(message) => {
                let source = UserDepositSource::new(l1_block_hash, tx.hash, log.log_index);
                return Some(build_user_deposit(
                    message,
                    alias_contract_address(log.address),
                    source.source_hash(),
                    payload,
                    DepositOrigin::Contract,
                ));
            }
            Err(err) => {
                debug!(target: "facet::derive", tx = %tx.hash, log_index = log.log_index, %err, "skipping malformed inbox event payload");
            }
        }
    }
    None
}

/// Derives the candidate deposits of a whole L1 block, in transaction order.
pub fn derive_transactions(
    cfg: &ChainConfig,
    l1_block_hash: B256,
    txs: &[L1Transaction],
) -> Vec<DerivedTransaction> {
    txs.iter().filter_map(|tx| derive_transaction(cfg, l1_block_hash, tx)).collect()
}

fn build_user_deposit(
    message: InboxMessage,
    from: Address,
    source_hash: B256,
    payload: &[u8],
    origin: DepositOrigin,
) -> DerivedTransaction {
    DerivedTransaction {
        deposit: DepositTransaction {
            source_hash,
            from,
            to: message.to,
            mint: U256::ZERO,
            value: message.value,
            gas_limit: message.gas_limit,
            is_system_transaction: false,
            input: message.data,
        },
        data_gas: payload_data_gas(payload, origin),
        origin,
    }
}

/// Builds the per-block L1 attributes deposit. Always the first transaction
/// of a facet block.
pub fn l1_attributes_deposit(
    l1_block_hash: B256,
    seq_number: u64,
    calldata: Bytes,
) -> DepositTransaction {
    DepositTransaction {
        source_hash: L1InfoDepositSource::new(l1_block_hash, seq_number).source_hash(),
        from: L1_INFO_DEPOSITOR,
        to: TxKind::Call(L1_BLOCK_PREDEPLOY),
        mint: U256::ZERO,
        value: U256::ZERO,
        gas_limit: L1_INFO_TX_GAS,
        is_system_transaction: true,
        input: calldata,
    }
}

/// The one-off upgrade deposits injected at the given block, if any. Each
/// carries an intent-derived source hash, so re-deriving the block reproduces
/// it exactly.
pub fn upgrade_transactions(cfg: &ChainConfig, l2_block: u64) -> Vec<DepositTransaction> {
    if l2_block != cfg.v2_fork_block {
        return Vec::new();
    }
    let selector = &keccak256("migrateMintState()".as_bytes())[..4];
    vec![DepositTransaction {
        source_hash: UpgradeDepositSource::new(V2_MIGRATION_INTENT.to_string()).source_hash(),
        from: L1_INFO_DEPOSITOR,
        to: TxKind::Call(L1_BLOCK_PREDEPLOY),
        mint: U256::ZERO,
        value: U256::ZERO,
        gas_limit: 200_000,
        is_system_transaction: true,
        input: Bytes::copy_from_slice(selector),
    }]
}
