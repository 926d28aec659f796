//! Concurrent L1 block prefetching.
//!
//! The importer consumes L1 blocks strictly in order, but fetching a block
//! with its receipts costs two round trips. The prefetcher keeps a sliding
//! window of fetches in flight so the importer only ever waits on the oldest
//! one. Each task also derives the block's candidate deposits; derivation is
//! pure per block, so it parallelizes for free. Consumption order stays
//! sequential; only the I/O and decoding overlap.

use std::{collections::BTreeMap, sync::Arc};

use backon::Retryable;
use tokio::task::JoinHandle;
use tracing::warn;

use facet_protocol::{derive_transactions, ChainConfig, DerivedTransaction, L1BlockInfo};

use crate::{
    errors::{ImportError, L1ProviderError},
    l1::L1Provider,
    retry::RetryConfig,
};

/// An L1 block with its candidate deposits already derived. Mint amounts are
/// still zero; the importer assigns them sequentially.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefetchedBlock {
    /// The L1 header fields.
    pub info: L1BlockInfo,
    /// The candidate deposits, in L1 transaction order.
    pub transactions: Vec<DerivedTransaction>,
}

type FetchResult = Result<Option<PrefetchedBlock>, L1ProviderError>;

/// A sliding-window prefetcher over an [`L1Provider`].
///
/// Not internally synchronized. The importer serializes access by owning the
/// prefetcher behind its import-step lock.
#[derive(Debug)]
pub struct Prefetcher<P> {
    provider: Arc<P>,
    config: Arc<ChainConfig>,
    retry: RetryConfig,
    window: u64,
    tasks: BTreeMap<u64, JoinHandle<FetchResult>>,
}

impl<P: L1Provider + 'static> Prefetcher<P> {
    /// Creates a prefetcher with the given window.
    pub fn new(
        provider: Arc<P>,
        config: Arc<ChainConfig>,
        retry: RetryConfig,
        window: u64,
    ) -> Self {
        Self { provider, config, retry, window: window.max(1), tasks: BTreeMap::new() }
    }

    /// Fetches and derives the block at `number`, keeping the window behind
    /// it in flight. Returns `None` when L1 has not produced the block yet.
    pub async fn fetch(&mut self, number: u64) -> Result<Option<PrefetchedBlock>, ImportError> {
        self.discard_below(number);
        for n in number..number + self.window {
            self.schedule(n);
        }

        // schedule() above guarantees a task for `number` exists. Awaiting a
        // finished handle returns immediately.
        let Some(handle) = self.tasks.remove(&number) else {
            return Err(ImportError::Cancelled);
        };
        let result = handle.await.map_err(|err| {
            warn!(target: "facet::prefetch", number, %err, "prefetch task died");
            ImportError::Cancelled
        })?;
        Ok(result?)
    }

    /// The serving node's current L1 height.
    pub async fn latest_block_number(&self) -> Result<u64, L1ProviderError> {
        self.provider.latest_block_number().await
    }

    /// Aborts in-flight fetches below `number`.
    pub fn discard_below(&mut self, number: u64) {
        let stale: Vec<u64> = self.tasks.range(..number).map(|(&n, _)| n).collect();
        for n in stale {
            if let Some(handle) = self.tasks.remove(&n) {
                handle.abort();
            }
        }
    }

    /// Aborts everything in flight. Used when a resync rewinds the importer
    /// to an arbitrary height.
    pub fn reset(&mut self) {
        for (_, handle) in std::mem::take(&mut self.tasks) {
            handle.abort();
        }
    }

    fn schedule(&mut self, number: u64) {
        if self.tasks.contains_key(&number) {
            return;
        }
        let provider = Arc::clone(&self.provider);
        let config = Arc::clone(&self.config);
        let backoff = self.retry.backoff();
        let handle = tokio::spawn(async move {
            let block = (|| async { provider.block_with_receipts(number).await })
                .retry(backoff)
                .when(|err| matches!(err, L1ProviderError::Rpc(_)))
                .await?;
            Ok(block.map(|block| PrefetchedBlock {
                transactions: derive_transactions(
                    &config,
                    block.info.hash,
                    &block.transactions,
                ),
                info: block.info,
            }))
        });
        self.tasks.insert(number, handle);
    }
}

impl<P> Drop for Prefetcher<P> {
    fn drop(&mut self) {
        for handle in self.tasks.values() {
            handle.abort();
        }
    }
}
