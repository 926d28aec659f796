//! The execution-engine driver.
//!
//! The engine owns the L2 chain; this node never constructs L2 blocks itself.
//! It hands the engine a deposit-only payload over the authenticated Engine
//! API and insists on the full handshake: forkchoice update with attributes,
//! payload retrieval, payload validation, then the canonicalizing forkchoice
//! update. Any deviation is an error, never a partial import.

use alloy_eips::BlockNumberOrTag;
use alloy_primitives::{Address, Bytes, B256, U64};
use alloy_rpc_client::RpcClient;
use alloy_rpc_types_engine::{
    ExecutionPayloadEnvelopeV2, ExecutionPayloadFieldV2, ExecutionPayloadInputV2,
    ExecutionPayloadV3, ForkchoiceState, ForkchoiceUpdated, JwtSecret, PayloadAttributes,
    PayloadId, PayloadStatus,
};
use alloy_transport_http::{
    hyper_util::{
        client::legacy::{connect::HttpConnector, Client},
        rt::TokioExecutor,
    },
    AuthLayer, AuthService, Http, HyperClient,
};
use async_trait::async_trait;
use facet_protocol::BlockInfo;
use http_body_util::Full;
use op_alloy_rpc_types_engine::{OpExecutionPayloadEnvelopeV3, OpPayloadAttributes};
use serde::Deserialize;
use tower::ServiceBuilder;
use tracing::{debug, trace};
use url::Url;

use crate::errors::EngineError;

/// A Hyper HTTP client with a JWT authentication layer.
pub type HyperAuthClient<B = Full<Bytes>> = HyperClient<B, AuthService<Client<HttpConnector, B>>>;

/// An L2 block header with its transaction hashes, as served by the engine.
///
/// Blocks are always fetched with hashes only; facet deposits use a custom
/// transaction type the standard RPC transaction shape does not cover.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineBlock {
    /// The block hash.
    pub hash: B256,
    /// The block number.
    pub number: U64,
    /// The parent block hash.
    pub parent_hash: B256,
    /// The block timestamp.
    pub timestamp: U64,
    /// The transaction hashes, in block order.
    pub transactions: Vec<B256>,
}

impl EngineBlock {
    /// The header info of this block.
    pub fn block_info(&self) -> BlockInfo {
        BlockInfo::new(self.hash, self.number.to(), self.parent_hash, self.timestamp.to())
    }
}

/// The engine's view of the chain, read back label by label on startup.
#[derive(Debug, Clone)]
pub struct EngineSyncBlocks {
    /// The block at the `latest` label.
    pub head: EngineBlock,
    /// The block at the `safe` label, falling back to `head`.
    pub safe: EngineBlock,
    /// The block at the `finalized` label, falling back to `safe`.
    pub finalized: EngineBlock,
}

/// The Engine API surface the driver needs. Exists for mocking; the only
/// production implementation is [`EngineClient`].
#[async_trait]
pub trait EngineApi: Send + Sync {
    /// `engine_forkchoiceUpdatedV2`.
    async fn fork_choice_updated_v2(
        &self,
        state: ForkchoiceState,
        attributes: Option<OpPayloadAttributes>,
    ) -> Result<ForkchoiceUpdated, EngineError>;

    /// `engine_forkchoiceUpdatedV3`.
    async fn fork_choice_updated_v3(
        &self,
        state: ForkchoiceState,
        attributes: Option<OpPayloadAttributes>,
    ) -> Result<ForkchoiceUpdated, EngineError>;

    /// `engine_getPayloadV2`.
    async fn get_payload_v2(
        &self,
        payload_id: PayloadId,
    ) -> Result<ExecutionPayloadEnvelopeV2, EngineError>;

    /// `engine_getPayloadV3`.
    async fn get_payload_v3(
        &self,
        payload_id: PayloadId,
    ) -> Result<OpExecutionPayloadEnvelopeV3, EngineError>;

    /// `engine_newPayloadV2`.
    async fn new_payload_v2(
        &self,
        payload: ExecutionPayloadInputV2,
    ) -> Result<PayloadStatus, EngineError>;

    /// `engine_newPayloadV3`.
    async fn new_payload_v3(
        &self,
        payload: ExecutionPayloadV3,
        parent_beacon_block_root: B256,
    ) -> Result<PayloadStatus, EngineError>;

    /// `eth_getBlockByNumber` with transaction hashes only.
    async fn block_by_label(
        &self,
        label: BlockNumberOrTag,
    ) -> Result<Option<EngineBlock>, EngineError>;

    /// The calldata of the given L2 transaction.
    async fn transaction_input(&self, hash: B256) -> Result<Option<Bytes>, EngineError>;
}

/// A JWT-authenticated Engine API client.
#[derive(Debug, Clone)]
pub struct EngineClient {
    client: RpcClient,
}

impl EngineClient {
    /// Creates a client for the given engine endpoint and JWT secret.
    pub fn new(engine_url: Url, jwt: JwtSecret) -> Self {
        let hyper_client = Client::builder(TokioExecutor::new()).build_http::<Full<Bytes>>();
        let auth_layer = AuthLayer::new(jwt);
        let service = ServiceBuilder::new().layer(auth_layer).service(hyper_client);
        let layer_transport = HyperClient::with_service(service);
        let http_hyper = Http::with_client(layer_transport, engine_url);
        Self { client: RpcClient::new(http_hyper, false) }
    }
}

/// The `input`-only transaction view used to read back attributes calldata.
#[derive(Debug, Deserialize)]
struct TransactionInput {
    input: Bytes,
}

#[async_trait]
impl EngineApi for EngineClient {
    async fn fork_choice_updated_v2(
        &self,
        state: ForkchoiceState,
        attributes: Option<OpPayloadAttributes>,
    ) -> Result<ForkchoiceUpdated, EngineError> {
        Ok(self.client.request("engine_forkchoiceUpdatedV2", (state, attributes)).await?)
    }

    async fn fork_choice_updated_v3(
        &self,
        state: ForkchoiceState,
        attributes: Option<OpPayloadAttributes>,
    ) -> Result<ForkchoiceUpdated, EngineError> {
        Ok(self.client.request("engine_forkchoiceUpdatedV3", (state, attributes)).await?)
    }

    async fn get_payload_v2(
        &self,
        payload_id: PayloadId,
    ) -> Result<ExecutionPayloadEnvelopeV2, EngineError> {
        Ok(self.client.request("engine_getPayloadV2", (payload_id,)).await?)
    }

    async fn get_payload_v3(
        &self,
        payload_id: PayloadId,
    ) -> Result<OpExecutionPayloadEnvelopeV3, EngineError> {
        Ok(self.client.request("engine_getPayloadV3", (payload_id,)).await?)
    }

    async fn new_payload_v2(
        &self,
        payload: ExecutionPayloadInputV2,
    ) -> Result<PayloadStatus, EngineError> {
        Ok(self.client.request("engine_newPayloadV2", (payload,)).await?)
    }

    async fn new_payload_v3(
        &self,
        payload: ExecutionPayloadV3,
        parent_beacon_block_root: B256,
    ) -> Result<PayloadStatus, EngineError> {
        Ok(self
            .client
            .request("engine_newPayloadV3", (payload, Vec::<B256>::new(), parent_beacon_block_root))
            .await?)
    }

    async fn block_by_label(
        &self,
        label: BlockNumberOrTag,
    ) -> Result<Option<EngineBlock>, EngineError> {
        Ok(self.client.request("eth_getBlockByNumber", (label, false)).await?)
    }

    async fn transaction_input(&self, hash: B256) -> Result<Option<Bytes>, EngineError> {
        let tx: Option<TransactionInput> =
            self.client.request("eth_getTransactionByHash", (hash,)).await?;
        Ok(tx.map(|tx| tx.input))
    }
}

/// Everything needed to ask the engine for one new block.
#[derive(Debug, Clone)]
pub struct BlockBuildInput {
    /// The block timestamp, copied from the epoch's L1 block.
    pub timestamp: u64,
    /// The prev-randao value, copied from the epoch's L1 mix hash.
    pub prev_randao: B256,
    /// The epoch's parent beacon block root. Its presence selects the V3
    /// Engine API; L1 blocks before EIP-4788 go through V2.
    pub parent_beacon_block_root: Option<B256>,
    /// The EIP-2718 encoded deposit transactions, in final block order.
    pub transactions: Vec<Bytes>,
    /// The block gas limit.
    pub gas_limit: u64,
}

/// Drives the execution engine through the block-building handshake.
#[derive(Debug)]
pub struct EngineDriver<E> {
    engine: E,
}

impl<E: EngineApi> EngineDriver<E> {
    /// Wraps the given engine client.
    pub const fn new(engine: E) -> Self {
        Self { engine }
    }

    /// Builds and canonicalizes one block on top of the given forkchoice
    /// head, returning its header info.
    ///
    /// Steps, each checked: forkchoice update carrying the payload
    /// attributes (`no_tx_pool`, the exact transaction list), payload
    /// retrieval by id, payload validation, and the final forkchoice update
    /// moving the head to the new block.
    pub async fn build_block(
        &self,
        forkchoice: ForkchoiceState,
        input: BlockBuildInput,
    ) -> Result<BlockInfo, EngineError> {
        let attributes = OpPayloadAttributes {
            payload_attributes: PayloadAttributes {
                timestamp: input.timestamp,
                prev_randao: input.prev_randao,
                suggested_fee_recipient: Address::ZERO,
                withdrawals: Some(Vec::new()),
                parent_beacon_block_root: input.parent_beacon_block_root,
            },
            transactions: Some(input.transactions),
            no_tx_pool: Some(true),
            gas_limit: Some(input.gas_limit),
            ..Default::default()
        };
        trace!(target: "facet::engine", timestamp = input.timestamp, "requesting payload");
        match input.parent_beacon_block_root {
            Some(root) => self.build_v3(forkchoice, attributes, root).await,
            None => self.build_v2(forkchoice, attributes).await,
        }
    }

    /// The engine's current chain labels, with fallbacks for labels a young
    /// chain has not set yet.
    pub async fn sync_state(&self) -> Result<EngineSyncBlocks, EngineError> {
        let head = self
            .engine
            .block_by_label(BlockNumberOrTag::Latest)
            .await?
            .ok_or(EngineError::MissingBlock(BlockNumberOrTag::Latest))?;
        let safe =
            self.engine.block_by_label(BlockNumberOrTag::Safe).await?.unwrap_or_else(|| head.clone());
        let finalized = self
            .engine
            .block_by_label(BlockNumberOrTag::Finalized)
            .await?
            .unwrap_or_else(|| safe.clone());
        Ok(EngineSyncBlocks { head, safe, finalized })
    }

    /// The calldata of the given L2 transaction.
    pub async fn transaction_input(&self, hash: B256) -> Result<Bytes, EngineError> {
        self.engine.transaction_input(hash).await?.ok_or(EngineError::MissingTransaction(hash))
    }

    async fn build_v3(
        &self,
        forkchoice: ForkchoiceState,
        attributes: OpPayloadAttributes,
        parent_beacon_block_root: B256,
    ) -> Result<BlockInfo, EngineError> {
        let updated = self.engine.fork_choice_updated_v3(forkchoice, Some(attributes)).await?;
        let payload_id = require_payload_id(updated)?;

        let envelope = self.engine.get_payload_v3(payload_id).await?;
        let payload = envelope.execution_payload;
        let info = {
            let inner = &payload.payload_inner.payload_inner;
            if inner.transactions.is_empty() {
                return Err(EngineError::EmptyPayload);
            }
            BlockInfo::new(inner.block_hash, inner.block_number, inner.parent_hash, inner.timestamp)
        };

        let status = self.engine.new_payload_v3(payload, parent_beacon_block_root).await?;
        require_canonical(status, info.hash)?;

        let updated = self
            .engine
            .fork_choice_updated_v3(
                ForkchoiceState { head_block_hash: info.hash, ..forkchoice },
                None,
            )
            .await?;
        require_valid_forkchoice(updated)?;

        debug!(target: "facet::engine", number = info.number, hash = %info.hash, "block canonicalized");
        Ok(info)
    }

    async fn build_v2(
        &self,
        forkchoice: ForkchoiceState,
        attributes: OpPayloadAttributes,
    ) -> Result<BlockInfo, EngineError> {
        let updated = self.engine.fork_choice_updated_v2(forkchoice, Some(attributes)).await?;
        let payload_id = require_payload_id(updated)?;

        let envelope = self.engine.get_payload_v2(payload_id).await?;
        let (inner, withdrawals) = match envelope.execution_payload {
            ExecutionPayloadFieldV2::V2(payload) => {
                (payload.payload_inner, Some(payload.withdrawals))
            }
            ExecutionPayloadFieldV2::V1(payload) => (payload, None),
        };
        if inner.transactions.is_empty() {
            return Err(EngineError::EmptyPayload);
        }
        let info =
            BlockInfo::new(inner.block_hash, inner.block_number, inner.parent_hash, inner.timestamp);

        let status = self
            .engine
            .new_payload_v2(ExecutionPayloadInputV2 { execution_payload: inner, withdrawals })
            .await?;
        require_canonical(status, info.hash)?;

        let updated = self
            .engine
            .fork_choice_updated_v2(
                ForkchoiceState { head_block_hash: info.hash, ..forkchoice },
                None,
            )
            .await?;
        require_valid_forkchoice(updated)?;

        debug!(target: "facet::engine", number = info.number, hash = %info.hash, "block canonicalized");
        Ok(info)
    }
}

fn require_payload_id(updated: ForkchoiceUpdated) -> Result<PayloadId, EngineError> {
    if !updated.payload_status.status.is_valid() {
        return Err(EngineError::InvalidForkchoice { status: updated.payload_status.status });
    }
    updated.payload_id.ok_or(EngineError::MissingPayloadId)
}

fn require_valid_forkchoice(updated: ForkchoiceUpdated) -> Result<(), EngineError> {
    if !updated.payload_status.status.is_valid() {
        return Err(EngineError::InvalidForkchoice { status: updated.payload_status.status });
    }
    Ok(())
}

fn require_canonical(status: PayloadStatus, block_hash: B256) -> Result<(), EngineError> {
    if !status.status.is_valid() {
        return Err(EngineError::InvalidPayload { status: status.status });
    }
    if status.latest_valid_hash != Some(block_hash) {
        return Err(EngineError::LatestValidHashMismatch {
            expected: block_hash,
            got: status.latest_valid_hash,
        });
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use alloy_primitives::{keccak256, Bloom, U256};
    use alloy_rpc_types_engine::{
        ExecutionPayloadV1, ExecutionPayloadV2, PayloadStatusEnum,
    };
    use parking_lot::Mutex;

    use super::*;

    /// Which step of the handshake a [`MockEngine`] should botch.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub(crate) enum Botch {
        None,
        NoPayloadId,
        EmptyPayload,
        InvalidPayload,
        HashMismatch,
        FinalForkchoiceInvalid,
    }

    /// A scripted engine that fabricates blocks from the attributes it was
    /// handed: block `n+1` on top of the forkchoice head, hash derived from
    /// the number.
    pub(crate) struct MockEngine {
        pub(crate) botch: Botch,
        pub(crate) head_number: Mutex<u64>,
        pub(crate) pending: Mutex<Option<(ForkchoiceState, OpPayloadAttributes)>>,
        pub(crate) labels: Mutex<Vec<(BlockNumberOrTag, EngineBlock)>>,
        pub(crate) tx_inputs: Mutex<Vec<(B256, Bytes)>>,
    }

    impl MockEngine {
        pub(crate) fn new(head_number: u64) -> Self {
            Self {
                botch: Botch::None,
                head_number: Mutex::new(head_number),
                pending: Mutex::new(None),
                labels: Mutex::new(Vec::new()),
                tx_inputs: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn mock_hash(number: u64) -> B256 {
            keccak256(number.to_be_bytes())
        }

        fn fabricate(&self) -> (ForkchoiceState, OpPayloadAttributes, ExecutionPayloadV1) {
            let (state, attributes) =
                self.pending.lock().clone().expect("getPayload before forkchoiceUpdated");
            let number = *self.head_number.lock() + 1;
            let transactions = if self.botch == Botch::EmptyPayload {
                vec![]
            } else {
                attributes.transactions.clone().unwrap_or_default()
            };
            let payload = ExecutionPayloadV1 {
                parent_hash: state.head_block_hash,
                fee_recipient: Address::ZERO,
                state_root: B256::ZERO,
                receipts_root: B256::ZERO,
                logs_bloom: Bloom::ZERO,
                prev_randao: attributes.payload_attributes.prev_randao,
                block_number: number,
                gas_limit: attributes.gas_limit.unwrap_or_default(),
                gas_used: 21_000,
                timestamp: attributes.payload_attributes.timestamp,
                extra_data: Bytes::new(),
                base_fee_per_gas: U256::from(7u64),
                block_hash: Self::mock_hash(number),
                transactions,
            };
            (state, attributes, payload)
        }

        fn payload_status(&self, block_hash: B256) -> PayloadStatus {
            match self.botch {
                Botch::InvalidPayload => PayloadStatus {
                    status: PayloadStatusEnum::Invalid {
                        validation_error: "mock rejection".to_string(),
                    },
                    latest_valid_hash: None,
                },
                Botch::HashMismatch => PayloadStatus {
                    status: PayloadStatusEnum::Valid,
                    latest_valid_hash: Some(B256::with_last_byte(0xEE)),
                },
                _ => PayloadStatus {
                    status: PayloadStatusEnum::Valid,
                    latest_valid_hash: Some(block_hash),
                },
            }
        }

        fn forkchoice_response(
            &self,
            state: ForkchoiceState,
            attributes: Option<OpPayloadAttributes>,
        ) -> ForkchoiceUpdated {
            match attributes {
                Some(attributes) => {
                    *self.pending.lock() = Some((state, attributes));
                    let payload_id = (self.botch != Botch::NoPayloadId)
                        .then(|| PayloadId::new([0x42; 8]));
                    ForkchoiceUpdated {
                        payload_status: PayloadStatus {
                            status: PayloadStatusEnum::Valid,
                            latest_valid_hash: Some(state.head_block_hash),
                        },
                        payload_id,
                    }
                }
                None => {
                    let status = if self.botch == Botch::FinalForkchoiceInvalid {
                        PayloadStatusEnum::Invalid { validation_error: "mock".to_string() }
                    } else {
                        *self.head_number.lock() += 1;
                        PayloadStatusEnum::Valid
                    };
                    ForkchoiceUpdated {
                        payload_status: PayloadStatus {
                            status,
                            latest_valid_hash: Some(state.head_block_hash),
                        },
                        payload_id: None,
                    }
                }
            }
        }
    }

    #[async_trait]
    impl EngineApi for MockEngine {
        async fn fork_choice_updated_v2(
            &self,
            state: ForkchoiceState,
            attributes: Option<OpPayloadAttributes>,
        ) -> Result<ForkchoiceUpdated, EngineError> {
            Ok(self.forkchoice_response(state, attributes))
        }

        async fn fork_choice_updated_v3(
            &self,
            state: ForkchoiceState,
            attributes: Option<OpPayloadAttributes>,
        ) -> Result<ForkchoiceUpdated, EngineError> {
            Ok(self.forkchoice_response(state, attributes))
        }

        async fn get_payload_v2(
            &self,
            _payload_id: PayloadId,
        ) -> Result<ExecutionPayloadEnvelopeV2, EngineError> {
            let (_, _, payload) = self.fabricate();
            Ok(ExecutionPayloadEnvelopeV2 {
                execution_payload: ExecutionPayloadFieldV2::V2(ExecutionPayloadV2 {
                    payload_inner: payload,
                    withdrawals: vec![],
                }),
                block_value: U256::ZERO,
            })
        }

        async fn get_payload_v3(
            &self,
            _payload_id: PayloadId,
        ) -> Result<OpExecutionPayloadEnvelopeV3, EngineError> {
            let (_, attributes, payload) = self.fabricate();
            Ok(OpExecutionPayloadEnvelopeV3 {
                execution_payload: ExecutionPayloadV3 {
                    payload_inner: ExecutionPayloadV2 {
                        payload_inner: payload,
                        withdrawals: vec![],
                    },
                    blob_gas_used: 0,
                    excess_blob_gas: 0,
                },
                block_value: U256::ZERO,
                blobs_bundle: Default::default(),
                should_override_builder: false,
                parent_beacon_block_root: attributes
                    .payload_attributes
                    .parent_beacon_block_root
                    .unwrap_or_default(),
            })
        }

        async fn new_payload_v2(
            &self,
            payload: ExecutionPayloadInputV2,
        ) -> Result<PayloadStatus, EngineError> {
            Ok(self.payload_status(payload.execution_payload.block_hash))
        }

        async fn new_payload_v3(
            &self,
            payload: ExecutionPayloadV3,
            _parent_beacon_block_root: B256,
        ) -> Result<PayloadStatus, EngineError> {
            Ok(self.payload_status(payload.payload_inner.payload_inner.block_hash))
        }

        async fn block_by_label(
            &self,
            label: BlockNumberOrTag,
        ) -> Result<Option<EngineBlock>, EngineError> {
            Ok(self.labels.lock().iter().find(|(l, _)| *l == label).map(|(_, b)| b.clone()))
        }

        async fn transaction_input(&self, hash: B256) -> Result<Option<Bytes>, EngineError> {
            Ok(self.tx_inputs.lock().iter().find(|(h, _)| *h == hash).map(|(_, i)| i.clone()))
        }
    }

    fn build_input(parent_beacon_block_root: Option<B256>) -> BlockBuildInput {
        BlockBuildInput {
            timestamp: 1_700_000_000,
            prev_randao: B256::with_last_byte(0x11),
            parent_beacon_block_root,
            transactions: vec![Bytes::from_static(&[0x7E, 0x01, 0x02])],
            gas_limit: 50_000_000,
        }
    }

    fn forkchoice(head: B256) -> ForkchoiceState {
        ForkchoiceState {
            head_block_hash: head,
            safe_block_hash: head,
            finalized_block_hash: head,
        }
    }

    #[tokio::test]
    async fn test_build_block_v3() {
        let driver = EngineDriver::new(MockEngine::new(7));
        let built = driver
            .build_block(
                forkchoice(MockEngine::mock_hash(7)),
                build_input(Some(B256::with_last_byte(0x22))),
            )
            .await
            .unwrap();
        assert_eq!(built.number, 8);
        assert_eq!(built.hash, MockEngine::mock_hash(8));
        assert_eq!(built.parent_hash, MockEngine::mock_hash(7));
    }

    #[tokio::test]
    async fn test_build_block_v2_without_beacon_root() {
        let driver = EngineDriver::new(MockEngine::new(3));
        let built =
            driver.build_block(forkchoice(MockEngine::mock_hash(3)), build_input(None)).await.unwrap();
        assert_eq!(built.number, 4);
    }

    #[tokio::test]
    async fn test_missing_payload_id_is_an_error() {
        let mut engine = MockEngine::new(7);
        engine.botch = Botch::NoPayloadId;
        let driver = EngineDriver::new(engine);
        let err = driver
            .build_block(forkchoice(MockEngine::mock_hash(7)), build_input(Some(B256::ZERO)))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::MissingPayloadId));
    }

    #[tokio::test]
    async fn test_empty_payload_is_an_error() {
        let mut engine = MockEngine::new(7);
        engine.botch = Botch::EmptyPayload;
        let driver = EngineDriver::new(engine);
        let err = driver
            .build_block(forkchoice(MockEngine::mock_hash(7)), build_input(Some(B256::ZERO)))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::EmptyPayload));
    }

    #[tokio::test]
    async fn test_invalid_payload_is_an_error() {
        let mut engine = MockEngine::new(7);
        engine.botch = Botch::InvalidPayload;
        let driver = EngineDriver::new(engine);
        let err = driver
            .build_block(forkchoice(MockEngine::mock_hash(7)), build_input(Some(B256::ZERO)))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidPayload { .. }));
    }

    #[tokio::test]
    async fn test_latest_valid_hash_mismatch_is_an_error() {
        let mut engine = MockEngine::new(7);
        engine.botch = Botch::HashMismatch;
        let driver = EngineDriver::new(engine);
        let err = driver
            .build_block(forkchoice(MockEngine::mock_hash(7)), build_input(Some(B256::ZERO)))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::LatestValidHashMismatch { .. }));
    }

    #[tokio::test]
    async fn test_rejected_final_forkchoice_is_an_error() {
        let mut engine = MockEngine::new(7);
        engine.botch = Botch::FinalForkchoiceInvalid;
        let driver = EngineDriver::new(engine);
        let err = driver
            .build_block(forkchoice(MockEngine::mock_hash(7)), build_input(Some(B256::ZERO)))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidForkchoice { .. }));
    }

    #[tokio::test]
    async fn test_sync_state_falls_back_through_labels() {
        let engine = MockEngine::new(0);
        let head = EngineBlock {
            hash: MockEngine::mock_hash(9),
            number: U64::from(9),
            parent_hash: MockEngine::mock_hash(8),
            timestamp: U64::from(1_700_000_000u64),
            transactions: vec![],
        };
        engine.labels.lock().push((BlockNumberOrTag::Latest, head.clone()));
        let driver = EngineDriver::new(engine);
        let sync = driver.sync_state().await.unwrap();
        // Safe and finalized fall back to the head when unset.
        assert_eq!(sync.safe.hash, head.hash);
        assert_eq!(sync.finalized.hash, head.hash);
    }
}
