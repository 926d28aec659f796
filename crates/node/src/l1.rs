//! L1 data access.
//!
//! Derivation needs full blocks joined with their receipt logs. The provider
//! trait returns the plain `facet-protocol` block types so the pipeline and
//! its tests never touch RPC response shapes.

use alloy_consensus::{Transaction as _, TxReceipt as _};
use alloy_eips::eip4844::calc_blob_gasprice;
use alloy_primitives::U256;
use alloy_provider::{Provider, RootProvider};
use alloy_rpc_types_eth::{Block, BlockTransactions, TransactionReceipt};
use async_trait::async_trait;
use facet_protocol::{L1Block, L1BlockInfo, L1Log, L1Transaction};
use url::Url;

use crate::errors::L1ProviderError;

/// Read access to the L1 chain.
#[async_trait]
pub trait L1Provider: Send + Sync {
    /// The latest L1 block number the serving node knows.
    async fn latest_block_number(&self) -> Result<u64, L1ProviderError>;

    /// The block at the given height with its transactions and receipt logs,
    /// or `None` when the chain has not reached it yet.
    async fn block_with_receipts(&self, number: u64) -> Result<Option<L1Block>, L1ProviderError>;
}

/// The [`L1Provider`] backed by an `alloy` HTTP provider.
#[derive(Debug, Clone)]
pub struct AlloyL1Provider {
    provider: RootProvider,
}

impl AlloyL1Provider {
    /// Connects to the given L1 RPC endpoint.
    pub fn new(l1_rpc_url: Url) -> Self {
        Self { provider: RootProvider::new_http(l1_rpc_url) }
    }
}

#[async_trait]
impl L1Provider for AlloyL1Provider {
    async fn latest_block_number(&self) -> Result<u64, L1ProviderError> {
        Ok(self.provider.get_block_number().await?)
    }

    async fn block_with_receipts(&self, number: u64) -> Result<Option<L1Block>, L1ProviderError> {
        let Some(block) = self.provider.get_block_by_number(number.into()).full().await? else {
            return Ok(None);
        };
        let receipts = self
            .provider
            .get_block_receipts(number.into())
            .await?
            .ok_or(L1ProviderError::ReceiptsNotFound(number))?;
        join_block(number, block, receipts).map(Some)
    }
}

/// Joins an RPC block with its receipts into an [`L1Block`]. Sender and
/// target come from the receipt, so no signature recovery happens here.
fn join_block(
    number: u64,
    block: Block,
    receipts: Vec<TransactionReceipt>,
) -> Result<L1Block, L1ProviderError> {
    let header = &block.header;
    let info = L1BlockInfo {
        number: header.number,
        hash: header.hash,
        parent_hash: header.parent_hash,
        timestamp: header.timestamp,
        base_fee: U256::from(header.base_fee_per_gas.unwrap_or_default()),
        mix_hash: header.mix_hash,
        blob_base_fee: header
            .excess_blob_gas
            .map(|excess| U256::from(calc_blob_gasprice(excess)))
            .unwrap_or_default(),
        parent_beacon_block_root: header.parent_beacon_block_root,
    };

    let BlockTransactions::Full(txs) = block.transactions else {
        return Err(L1ProviderError::InconsistentBlock(number, "expected full transactions"));
    };
    if txs.len() != receipts.len() {
        return Err(L1ProviderError::InconsistentBlock(number, "receipt count mismatch"));
    }

    let transactions = txs
        .into_iter()
        .zip(receipts)
        .map(|(tx, receipt)| L1Transaction {
            hash: receipt.transaction_hash,
            from: receipt.from,
            to: receipt.to,
            input: tx.input().clone(),
            logs: receipt
                .inner
                .logs()
                .iter()
                .map(|log| L1Log {
                    address: log.inner.address,
                    topics: log.inner.data.topics().to_vec(),
                    data: log.inner.data.data.clone(),
                    log_index: log.log_index.unwrap_or_default(),
                    removed: log.removed,
                })
                .collect(),
        })
        .collect();

    Ok(L1Block { info, transactions })
}
