//! Node configuration.

use alloy_rpc_types_engine::JwtSecret;
use facet_protocol::ChainConfig;
use url::Url;

use crate::retry::RetryConfig;

/// How many L1 blocks the prefetcher keeps in flight ahead of the importer.
pub const DEFAULT_PREFETCH_WINDOW: u64 = 16;

/// Runtime configuration of a facet node.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// The L1 execution client RPC endpoint.
    pub l1_rpc_url: Url,
    /// The L2 execution engine endpoint (authenticated Engine API).
    pub engine_url: Url,
    /// The JWT secret shared with the engine.
    pub jwt_secret: JwtSecret,
    /// The prefetch window, in L1 blocks.
    pub prefetch_window: u64,
    /// The RPC retry policy.
    pub retry: RetryConfig,
    /// The chain parameters.
    pub chain: ChainConfig,
}

impl NodeConfig {
    /// Creates a mainnet configuration with default window and retry policy.
    pub fn new(l1_rpc_url: Url, engine_url: Url, jwt_secret: JwtSecret) -> Self {
        Self {
            l1_rpc_url,
            engine_url,
            jwt_secret,
            prefetch_window: DEFAULT_PREFETCH_WINDOW,
            retry: RetryConfig::default(),
            chain: ChainConfig::mainnet(),
        }
    }
}
