//! The facet deposit transaction envelope.

use alloy_primitives::{keccak256, Address, Bytes, TxKind, B256, U256};
use alloy_rlp::{Decodable, Encodable, RlpDecodable, RlpEncodable};

use crate::config::DEPOSIT_TX_TYPE;

/// A deposit-transaction decoding error.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DepositTxError {
    /// The envelope does not start with the `0x7E` type byte.
    #[error("invalid deposit type byte: {0:#04x}")]
    InvalidTypeByte(u8),
    /// The envelope is empty.
    #[error("empty deposit envelope")]
    Empty,
    /// The RLP body is malformed.
    #[error("malformed deposit rlp: {0}")]
    Rlp(#[from] alloy_rlp::Error),
    /// Bytes remain after the RLP body.
    #[error("trailing bytes after deposit body")]
    TrailingBytes,
}

/// A facet deposit transaction: type byte `0x7E` followed by the RLP list
/// `[source_hash, from, to, mint, value, gas_limit, is_system_tx, data]`.
///
/// Deposits are authenticated by their source hash; there is no signature.
#[derive(Debug, Clone, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct DepositTransaction {
    /// The deterministic identity of this deposit.
    pub source_hash: B256,
    /// The L2 sender (aliased for contract-originated deposits).
    pub from: Address,
    /// The call target, or create.
    pub to: TxKind,
    /// The FCT amount minted to `from` before execution, in FCT wei.
    pub mint: U256,
    /// The value transferred to `to`.
    pub value: U256,
    /// The gas limit, prepaid on L1.
    pub gas_limit: u64,
    /// Set on the attributes and upgrade transactions.
    pub is_system_transaction: bool,
    /// The calldata.
    pub input: Bytes,
}

impl DepositTransaction {
    /// Encodes the transaction as an EIP-2718 typed envelope.
    pub fn encoded_2718(&self) -> Bytes {
        let mut buf = Vec::with_capacity(1 + self.length());
        buf.push(DEPOSIT_TX_TYPE);
        self.encode(&mut buf);
        buf.into()
    }

    /// Decodes an EIP-2718 typed envelope.
    pub fn decode_2718(envelope: &[u8]) -> Result<Self, DepositTxError> {
        let (&tag, mut body) = envelope.split_first().ok_or(DepositTxError::Empty)?;
        if tag != DEPOSIT_TX_TYPE {
            return Err(DepositTxError::InvalidTypeByte(tag));
        }
        let tx = Self::decode(&mut body)?;
        if !body.is_empty() {
            return Err(DepositTxError::TrailingBytes);
        }
        Ok(tx)
    }

    /// The transaction hash: `keccak256` of the typed envelope.
    pub fn tx_hash(&self) -> B256 {
        keccak256(self.encoded_2718())
    }
}
