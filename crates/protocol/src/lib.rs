#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs, rustdoc::all)]

pub mod attributes;
pub use attributes::{
    AttributesError, L1BlockAttributes, MintStateFields, BASE_ATTRIBUTES_LEN,
    EXTENDED_ATTRIBUTES_LEN, L1_INFO_TX_SELECTOR,
};

pub mod block;
pub use block::{BlockInfo, Epoch, FacetBlock, L1Block, L1BlockInfo, L1Log, L1Transaction};

pub mod config;
pub use config::{
    ChainConfig, ALIAS_OFFSET, DEPOSIT_TX_TYPE, FINALIZED_EPOCH_LAG, INBOX_ADDRESS, INBOX_TX_TYPE,
    L1_BLOCK_PREDEPLOY, L1_INFO_DEPOSITOR, L1_INFO_TX_GAS, MAX_MINT_RATE, MIN_MINT_RATE,
    SAFE_EPOCH_LAG,
};

pub mod deposit;
pub use deposit::{DepositTransaction, DepositTxError};

pub mod derive;
pub use derive::{
    alias_contract_address, decode_event_payload, decode_inbox_payload, derive_transaction,
    derive_transactions, l1_attributes_deposit, payload_data_gas, upgrade_transactions,
    DepositOrigin, DerivationError, DerivedTransaction, InboxMessage, INBOX_EVENT_ABI,
    INBOX_EVENT_TOPIC,
};

pub mod mint;
pub use mint::{LegacyMintCalculator, MintEngine, MintState, RolloverReason};

pub mod source;
pub use source::{
    DepositSourceDomain, L1InfoDepositSource, UpgradeDepositSource, UserDepositSource,
};
