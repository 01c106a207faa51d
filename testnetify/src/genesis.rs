use std::{fs, path::Path};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    error::Result,
    utils::{
        BONDED_TOKENS_POOL_MODULE_ADDRESS, GOVERNANCE_VOTING_PERIOD, NATIVE_DENOM,
        NEW_VALIDATOR_MONIKER, POWER_DELTA, TOKEN_DELTA,
    },
};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ValidatorIdentity {
    pub moniker: String,
    /// Base64 ed25519 consensus key.
    pub pubkey: String,
    #[serde(rename = "hexAddress")]
    pub hex_address: String,
    #[serde(rename = "operatorAddress")]
    pub operator_address: String,
    #[serde(rename = "consensusAddress")]
    pub consensus_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AccountIdentity {
    pub pubkey: String,
    pub address: String,
}

impl ValidatorIdentity {
    /// The mainnet validator the testnet node impersonates (`notional`, from ping.pub).
    pub fn juno_mainnet() -> Self {
        Self {
            moniker: "notional".to_string(),
            pubkey: "ux/IM9uD+a/4rhIurbRiudh9K+M6tH1cNfffpX48Lrw=".to_string(),
            hex_address: "6EC804DBB72380D0AA5AC6A82650A1FA75FBABC5".to_string(),
            operator_address: "junovaloper1083svrca4t350mphfv9x45wq9asrs60cpqzg0y".to_string(),
            consensus_address: "junovalcons1dmyqfkahywqdp2j6c65zv59plf6lh279unewtr".to_string(),
        }
    }
}

impl AccountIdentity {
    /// Self-delegation account of [`ValidatorIdentity::juno_mainnet`].
    pub fn juno_mainnet() -> Self {
        Self {
            pubkey: "Ah8/EMTRW6D+Gk3xZghbcoRkKeRA43S8Qo9J+lzf2HnK".to_string(),
            address: "juno1083svrca4t350mphfv9x45wq9asrs60c7a585a".to_string(),
        }
    }
}

/// Chain-specific knobs that do not come from the command line.
///
/// Every field has a Juno default, so a config file only needs the keys it
/// wants to change.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TestnetParams {
    #[serde(rename = "governanceVotingPeriod")]
    pub governance_voting_period: String,
    #[serde(rename = "nativeDenom")]
    pub native_denom: String,
    #[serde(rename = "bondedTokensPoolAddress")]
    pub bonded_tokens_pool_address: String,
    #[serde(rename = "tokenDelta")]
    pub token_delta: u64,
    #[serde(rename = "powerDelta")]
    pub power_delta: u64,
    #[serde(rename = "newValidatorMoniker")]
    pub new_validator_moniker: String,
    #[serde(rename = "oldValidator")]
    pub old_validator: ValidatorIdentity,
    #[serde(rename = "oldAccount")]
    pub old_account: AccountIdentity,
}

impl Default for TestnetParams {
    fn default() -> Self {
        Self {
            governance_voting_period: GOVERNANCE_VOTING_PERIOD.to_string(),
            native_denom: NATIVE_DENOM.to_string(),
            bonded_tokens_pool_address: BONDED_TOKENS_POOL_MODULE_ADDRESS.to_string(),
            token_delta: TOKEN_DELTA,
            power_delta: POWER_DELTA,
            new_validator_moniker: NEW_VALIDATOR_MONIKER.to_string(),
            old_validator: ValidatorIdentity::juno_mainnet(),
            old_account: AccountIdentity::juno_mainnet(),
        }
    }
}

impl TestnetParams {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Reading testnet parameters from: {}", path.display());
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Everything one pipeline run needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestnetConfig {
    pub chain_id: String,
    pub prune_ibc: bool,
    pub params: TestnetParams,
    pub new_validator: ValidatorIdentity,
    pub new_account: AccountIdentity,
}

impl TestnetConfig {
    pub fn old_validator(&self) -> &ValidatorIdentity {
        &self.params.old_validator
    }

    pub fn old_account(&self) -> &AccountIdentity {
        &self.params.old_account
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_params_fall_back_to_defaults() {
        let params: TestnetParams = serde_json::from_str(
            r#"{"nativeDenom": "ustake", "tokenDelta": 5, "oldAccount": {"pubkey": "pk", "address": "addr"}}"#,
        )
        .unwrap();
        assert_eq!(params.native_denom, "ustake");
        assert_eq!(params.token_delta, 5);
        assert_eq!(params.old_account.address, "addr");
        assert_eq!(params.power_delta, POWER_DELTA);
        assert_eq!(params.old_validator, ValidatorIdentity::juno_mainnet());
        assert_eq!(params.governance_voting_period, "180s");
    }

    #[test]
    fn test_params_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.json");
        fs::write(&path, r#"{"governanceVotingPeriod": "60s"}"#).unwrap();
        let params = TestnetParams::from_file(&path).unwrap();
        assert_eq!(params.governance_voting_period, "60s");
        assert_eq!(params.bonded_tokens_pool_address, BONDED_TOKENS_POOL_MODULE_ADDRESS);
    }
}
