//! Node error types.

use alloy_eips::BlockNumberOrTag;
use alloy_primitives::B256;
use alloy_rpc_types_engine::PayloadStatusEnum;
use alloy_transport::{RpcError, TransportErrorKind};
use facet_protocol::AttributesError;

/// An error reading L1 data.
#[derive(Debug, thiserror::Error)]
pub enum L1ProviderError {
    /// The RPC transport failed.
    #[error("l1 rpc error: {0}")]
    Rpc(#[from] RpcError<TransportErrorKind>),
    /// The node served a block without its receipts.
    #[error("receipts missing for l1 block {0}")]
    ReceiptsNotFound(u64),
    /// The block and its receipts disagree.
    #[error("inconsistent l1 block {0}: {1}")]
    InconsistentBlock(u64, &'static str),
}

/// An error driving the execution engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The RPC transport failed.
    #[error("engine rpc error: {0}")]
    Rpc(#[from] RpcError<TransportErrorKind>),
    /// The engine rejected the forkchoice update.
    #[error("forkchoice update rejected: {status:?}")]
    InvalidForkchoice {
        /// The status returned by the engine.
        status: PayloadStatusEnum,
    },
    /// The engine accepted the forkchoice update but returned no payload id.
    #[error("forkchoice update returned no payload id")]
    MissingPayloadId,
    /// The built payload carries no transactions.
    #[error("built payload has no transactions")]
    EmptyPayload,
    /// The engine rejected the payload it just built.
    #[error("payload rejected: {status:?}")]
    InvalidPayload {
        /// The status returned by the engine.
        status: PayloadStatusEnum,
    },
    /// The engine validated a different hash than the payload it returned.
    #[error("latest valid hash {got:?} does not match built block {expected}")]
    LatestValidHashMismatch {
        /// The hash of the built block.
        expected: B256,
        /// The hash the engine reported as latest valid.
        got: Option<B256>,
    },
    /// The engine has no block at the given label.
    #[error("engine has no block at label {0}")]
    MissingBlock(BlockNumberOrTag),
    /// The engine has no transaction with the given hash.
    #[error("engine has no transaction {0}")]
    MissingTransaction(B256),
}

/// An error importing a facet block.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    /// The next L1 block has not been produced yet. Retryable.
    #[error("l1 block {0} is not yet available")]
    NotYetAvailable(u64),
    /// The fetched L1 block does not extend the cached chain. Fatal; the
    /// importer must resync from the engine.
    #[error("l1 reorg at block {number}: cached {expected}, new parent {actual}")]
    ReorgDetected {
        /// The reorged L1 block number.
        number: u64,
        /// The cached hash of the parent block.
        expected: B256,
        /// The parent hash carried by the fetched block.
        actual: B256,
    },
    /// The engine driver failed.
    #[error(transparent)]
    Engine(#[from] EngineError),
    /// The L1 provider failed.
    #[error(transparent)]
    L1(#[from] L1ProviderError),
    /// A prefetch task was cancelled or panicked.
    #[error("prefetch task cancelled")]
    Cancelled,
    /// The engine built a block at an unexpected height.
    #[error("engine built block {got}, expected {expected}")]
    BlockNumberMismatch {
        /// The height the importer asked for.
        expected: u64,
        /// The height the engine built.
        got: u64,
    },
    /// Attributes calldata failed to encode or decode.
    #[error("attributes calldata: {0}")]
    Attributes(#[from] AttributesError),
    /// The importer has no chain state; call `resync_from_engine` first.
    #[error("importer not initialized")]
    NotInitialized,
}

impl ImportError {
    /// Whether the import should simply be retried later.
    pub const fn is_not_yet_available(&self) -> bool {
        matches!(self, Self::NotYetAvailable(_))
    }
}
