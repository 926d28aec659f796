#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs, rustdoc::all)]

pub mod config;
pub use config::{NodeConfig, DEFAULT_PREFETCH_WINDOW};

pub mod engine;
pub use engine::{
    BlockBuildInput, EngineApi, EngineBlock, EngineClient, EngineDriver, EngineSyncBlocks,
    HyperAuthClient,
};

pub mod errors;
pub use errors::{EngineError, ImportError, L1ProviderError};

pub mod importer;
pub use importer::BlockImporter;

pub mod l1;
pub use l1::{AlloyL1Provider, L1Provider};

pub mod prefetch;
pub use prefetch::{PrefetchedBlock, Prefetcher};

pub mod retry;
pub use retry::RetryConfig;

use std::sync::Arc;

/// Wires a production importer from a [`NodeConfig`]: an authenticated
/// engine client, an L1 provider, and the prefetcher.
pub fn build_importer(config: NodeConfig) -> BlockImporter<AlloyL1Provider, EngineClient> {
    let chain = Arc::new(config.chain);
    let driver = EngineDriver::new(EngineClient::new(config.engine_url, config.jwt_secret));
    let provider = Arc::new(AlloyL1Provider::new(config.l1_rpc_url));
    let prefetcher =
        Prefetcher::new(provider, Arc::clone(&chain), config.retry, config.prefetch_window);
    BlockImporter::new(chain, driver, prefetcher)
}
