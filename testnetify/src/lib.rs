//! Convert a Juno mainnet state export into a local testnet genesis.
//!
//! The pipeline impersonates one mainnet validator with a locally held key,
//! credits a test account with stake, and rebalances supply and voting power
//! so the resulting ledger stays internally consistent.

pub mod amount;
pub mod error;
pub mod execute;
pub mod genesis;
pub mod post_genesis;
pub mod storage;
pub mod utils;

pub use error::{GenesisError, Result};
pub use execute::{TestnetifyReport, testnetify};
pub use genesis::{AccountIdentity, TestnetConfig, TestnetParams, ValidatorIdentity};
