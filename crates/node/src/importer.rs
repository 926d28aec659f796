//! Sequential facet block import.
//!
//! One L1 block becomes exactly one facet block: the attributes deposit,
//! any one-off upgrade deposits, then the user deposits derived from the
//! inbox. The importer walks L1 in order, drives the engine for each block,
//! and tracks the L1/L2 caches the forkchoice labels are computed from.
//!
//! Import steps are serialized by the prefetcher's async lock; the cache
//! state sits behind a sync lock that is never held across an RPC call.

use std::{collections::BTreeMap, sync::Arc, time::Instant};

use alloy_primitives::{B256, U256};
use alloy_rpc_types_engine::ForkchoiceState;
use parking_lot::Mutex;
use tracing::{info, warn};

use facet_protocol::{
    l1_attributes_deposit, upgrade_transactions, BlockInfo, ChainConfig, Epoch, FacetBlock,
    L1BlockAttributes, MintEngine, MintState, FINALIZED_EPOCH_LAG, SAFE_EPOCH_LAG,
};

use crate::{
    engine::{BlockBuildInput, EngineApi, EngineBlock, EngineDriver},
    errors::ImportError,
    l1::L1Provider,
    prefetch::{PrefetchedBlock, Prefetcher},
};

/// The importer's chain view, rebuilt on resync and pruned as blocks
/// finalize.
#[derive(Debug)]
struct ImporterState {
    /// L1 header infos by number, for reorg detection.
    l1_blocks: BTreeMap<u64, BlockInfo>,
    /// Imported facet blocks by number, for forkchoice label selection.
    l2_blocks: BTreeMap<u64, FacetBlock>,
    /// The mint engine positioned after the newest imported block.
    mint: MintEngine,
    /// The highest L1 height observed, for safe/finalized selection.
    l1_tip: u64,
}

/// Imports facet blocks derived from L1, one at a time, in order.
#[derive(Debug)]
pub struct BlockImporter<P, E> {
    config: Arc<ChainConfig>,
    driver: EngineDriver<E>,
    /// Owns the prefetcher; locking it serializes the whole import step.
    prefetcher: tokio::sync::Mutex<Prefetcher<P>>,
    state: Mutex<Option<ImporterState>>,
}

impl<P: L1Provider + 'static, E: EngineApi> BlockImporter<P, E> {
    /// Creates an importer. It holds no chain state until
    /// [`resync_from_engine`](Self::resync_from_engine) runs.
    pub fn new(config: Arc<ChainConfig>, driver: EngineDriver<E>, prefetcher: Prefetcher<P>) -> Self {
        Self {
            config,
            driver,
            prefetcher: tokio::sync::Mutex::new(prefetcher),
            state: Mutex::new(None),
        }
    }

    /// Rebuilds the chain view from the engine's own labels. Called on
    /// startup and after a detected L1 reorg; the engine is the source of
    /// truth, the importer simply re-derives on top of whatever it reports.
    pub async fn resync_from_engine(&self) -> Result<(), ImportError> {
        let mut prefetcher = self.prefetcher.lock().await;
        let sync = self.driver.sync_state().await?;

        let head = self.read_back(&sync.head).await?;
        let safe = if sync.safe.hash == sync.head.hash {
            head
        } else {
            self.read_back(&sync.safe).await?
        };
        let finalized = if sync.finalized.hash == sync.safe.hash {
            safe
        } else {
            self.read_back(&sync.finalized).await?
        };

        // Below the fork the attributes carry no resumable mint state; the
        // engine restarts the legacy calculator from scratch.
        let mint = if self.config.is_v2_active(head.number()) {
            MintEngine::from_state(head.mint)
        } else {
            MintEngine::new(&self.config)
        };
        let l1_tip = match prefetcher.latest_block_number().await {
            Ok(tip) => tip,
            Err(err) => {
                warn!(target: "facet::import", %err, "l1 height unavailable during resync");
                head.epoch.number
            }
        };

        let mut state = ImporterState {
            l1_blocks: BTreeMap::new(),
            l2_blocks: BTreeMap::new(),
            mint,
            l1_tip,
        };
        for block in [finalized, safe, head] {
            state.l2_blocks.insert(block.number(), block);
            if block.epoch.hash != B256::ZERO {
                state.l1_blocks.insert(
                    block.epoch.number,
                    BlockInfo::new(
                        block.epoch.hash,
                        block.epoch.number,
                        B256::ZERO,
                        block.epoch.timestamp,
                    ),
                );
            }
        }
        info!(
            target: "facet::import",
            head = head.number(),
            safe = safe.number(),
            finalized = finalized.number(),
            l1_tip,
            "resynced from engine"
        );
        *self.state.lock() = Some(state);
        prefetcher.reset();
        Ok(())
    }

    /// Derives and imports the facet block of the next L1 block.
    ///
    /// A [`ImportError::NotYetAvailable`] means L1 has not produced the
    /// block yet; retry later. A [`ImportError::ReorgDetected`] is fatal for
    /// the current view; resync and re-derive.
    pub async fn import_next_block(&self) -> Result<FacetBlock, ImportError> {
        let mut prefetcher = self.prefetcher.lock().await;

        let (parent, mut mint, cached_parent_l1) = {
            let guard = self.state.lock();
            let state = guard.as_ref().ok_or(ImportError::NotInitialized)?;
            let (_, parent) =
                state.l2_blocks.iter().next_back().ok_or(ImportError::NotInitialized)?;
            let l1_parent = self.config.l1_block_for(parent.number() + 1) - 1;
            (*parent, state.mint.clone(), state.l1_blocks.get(&l1_parent).map(|b| b.hash))
        };
        let l2_number = parent.number() + 1;
        let l1_number = self.config.l1_block_for(l2_number);

        let Some(PrefetchedBlock { info, transactions: mut user_txs }) =
            prefetcher.fetch(l1_number).await?
        else {
            return Err(ImportError::NotYetAvailable(l1_number));
        };
        if let Some(state) = self.state.lock().as_mut() {
            state.l1_tip = state.l1_tip.max(l1_number);
        }
        if let Some(expected) = cached_parent_l1 {
            if expected != info.parent_hash {
                warn!(
                    target: "facet::import",
                    number = l1_number,
                    %expected,
                    actual = %info.parent_hash,
                    "l1 reorg detected"
                );
                return Err(ImportError::ReorgDetected {
                    number: l1_number,
                    expected,
                    actual: info.parent_hash,
                });
            }
        }

        // Mints are assigned on a scratch engine; state is only committed
        // once the engine has canonicalized the block.
        let mint_state = mint.process_block(&self.config, l2_number, info.base_fee, &mut user_txs);
        let attributes =
            L1BlockAttributes::from_block(&self.config, &info, 0, l2_number, &mint_state)?;
        let attributes_tx = l1_attributes_deposit(info.hash, 0, attributes.encode_calldata());
        let upgrades = upgrade_transactions(&self.config, l2_number);

        let mut transactions = Vec::with_capacity(1 + upgrades.len() + user_txs.len());
        transactions.push(attributes_tx.encoded_2718());
        transactions.extend(upgrades.iter().map(|tx| tx.encoded_2718()));
        transactions.extend(user_txs.iter().map(|tx| tx.deposit.encoded_2718()));
        let tx_count = transactions.len();

        let forkchoice = self.forkchoice_state()?;
        let built = self
            .driver
            .build_block(
                forkchoice,
                BlockBuildInput {
                    timestamp: info.timestamp,
                    prev_randao: info.mix_hash,
                    parent_beacon_block_root: info.parent_beacon_block_root,
                    transactions,
                    gas_limit: self.config.block_gas_limit,
                },
            )
            .await?;
        if built.number != l2_number {
            return Err(ImportError::BlockNumberMismatch { expected: l2_number, got: built.number });
        }

        let facet_block =
            FacetBlock { block_info: built, epoch: (&info).into(), seq_num: 0, mint: mint_state };
        {
            let mut guard = self.state.lock();
            let state = guard.as_mut().ok_or(ImportError::NotInitialized)?;
            state.l1_blocks.insert(l1_number, info.block_info());
            state.l2_blocks.insert(l2_number, facet_block);
            state.mint = mint;
            let keep_from = l2_number.saturating_sub(FINALIZED_EPOCH_LAG);
            state.l2_blocks.retain(|&n, _| n >= keep_from);
            let keep_l1_from = self.config.l1_block_for(keep_from).saturating_sub(1);
            state.l1_blocks.retain(|&n, _| n >= keep_l1_from);
        }
        info!(
            target: "facet::import",
            number = l2_number,
            hash = %facet_block.hash(),
            epoch = l1_number,
            txs = tx_count,
            "imported block"
        );
        Ok(facet_block)
    }

    /// Imports blocks until L1 runs out, returning how many were imported.
    pub async fn import_blocks_until_done(&self) -> Result<u64, ImportError> {
        let started = Instant::now();
        let mut imported = 0u64;
        loop {
            match self.import_next_block().await {
                Ok(block) => {
                    imported += 1;
                    if imported % 100 == 0 {
                        info!(
                            target: "facet::import",
                            imported,
                            head = block.number(),
                            elapsed = ?started.elapsed(),
                            "import progress"
                        );
                    }
                }
                Err(err) if err.is_not_yet_available() => break,
                Err(err) => return Err(err),
            }
        }
        Ok(imported)
    }

    /// The forkchoice labels for the next build. Head is the newest imported
    /// block; safe is the newest whose epoch lags the L1 tip by at least 32
    /// blocks, finalized by 64. A cache that does not reach that far back
    /// (cold start) falls back to its oldest entry.
    pub(crate) fn forkchoice_state(&self) -> Result<ForkchoiceState, ImportError> {
        let guard = self.state.lock();
        let state = guard.as_ref().ok_or(ImportError::NotInitialized)?;
        let head = state.l2_blocks.values().next_back().ok_or(ImportError::NotInitialized)?;
        let pick = |lag: u64| {
            let cut = state.l1_tip.saturating_sub(lag);
            state
                .l2_blocks
                .values()
                .rev()
                .find(|block| block.epoch.number <= cut)
                .or_else(|| state.l2_blocks.values().next())
                .map_or(head.hash(), FacetBlock::hash)
        };
        Ok(ForkchoiceState {
            head_block_hash: head.hash(),
            safe_block_hash: pick(SAFE_EPOCH_LAG),
            finalized_block_hash: pick(FINALIZED_EPOCH_LAG),
        })
    }

    /// Rebuilds a [`FacetBlock`] from an engine block by decoding its
    /// attributes transaction. A block with no transactions is the L2
    /// genesis, which carries no attributes.
    async fn read_back(&self, block: &EngineBlock) -> Result<FacetBlock, ImportError> {
        let info = block.block_info();
        let Some(&attributes_tx) = block.transactions.first() else {
            return Ok(FacetBlock {
                block_info: info,
                epoch: Epoch {
                    number: self.config.l1_block_for(info.number),
                    hash: B256::ZERO,
                    timestamp: info.timestamp,
                    base_fee: U256::ZERO,
                },
                seq_num: 0,
                mint: MintState::default(),
            });
        };
        let input = self.driver.transaction_input(attributes_tx).await?;
        let attributes = L1BlockAttributes::decode_calldata(&input)?;
        let epoch = Epoch {
            number: attributes.number,
            hash: attributes.block_hash,
            timestamp: attributes.timestamp,
            base_fee: attributes.base_fee,
        };
        let mint = attributes.to_mint_state(&self.config)?.unwrap_or_default();
        Ok(FacetBlock { block_info: info, epoch, seq_num: attributes.sequence_number, mint })
    }
}
