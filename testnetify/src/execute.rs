//! The testnetify pipeline: every edit that turns a state export into a
//! runnable single-validator testnet genesis.
//!
//! Lookups scan lists linearly and stop at the first match. A miss leaves
//! the document untouched and is reported as `false`.

use alloy_primitives::U256;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    amount::{add_dec, add_int},
    error::{GenesisError, Result},
    genesis::{AccountIdentity, TestnetConfig, ValidatorIdentity},
    utils::{
        IBC_CHANNEL_STATE_KEYS, IBC_CLIENT_STATE_KEYS, array_mut, field_mut, find_entry_mut,
        object_mut, replace_str, set_str, str_field, update_str,
    },
};

/// Which pipeline steps found their target.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TestnetifyReport {
    pub previous_chain_id: String,
    pub ibc_pruned: bool,
    /// Leaves rewritten by validator and account substitution.
    pub replaced_values: usize,
    pub validator_set_key_updated: bool,
    pub staking_validator_key_updated: bool,
    pub staking_validator_credited: bool,
    pub delegation_credited: bool,
    pub starting_info_credited: bool,
    pub validator_power_updated: bool,
    pub last_validator_power_updated: bool,
    pub account_balance_credited: bool,
    pub bonded_pool_credited: bool,
    pub supply_updated: bool,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ValidatorReplacement {
    pub replaced_values: usize,
    /// `validators[].pub_key.value` rewritten.
    pub validator_set_updated: bool,
    /// `app_state.staking.validators[].consensus_pubkey.key` rewritten.
    pub staking_validator_updated: bool,
}

pub fn set_chain_id(genesis: &mut Value, chain_id: &str) -> Result<String> {
    let previous = set_str(genesis, &["chain_id"], chain_id)?;
    info!("Replace chain-id {} with {}", previous, chain_id);
    Ok(previous)
}

/// Shorten the governance voting period in both the legacy
/// `voting_params` and the newer `params` layout, whichever exist.
pub fn shorten_voting_period(genesis: &mut Value, voting_period: &str) -> Result<()> {
    info!("=== Update gov module ===");
    let gov = object_mut(genesis, &["app_state", "gov"])?;
    let mut updated = false;
    for section in ["voting_params", "params"] {
        if let Some(period) = gov
            .get_mut(section)
            .and_then(|params| params.get_mut("voting_period"))
        {
            info!(
                "\tModify {}.voting_period from {} to {}",
                section, period, voting_period
            );
            *period = Value::from(voting_period);
            updated = true;
        }
    }
    if !updated {
        return Err(GenesisError::MissingField {
            path: "app_state.gov.voting_params.voting_period".to_string(),
        });
    }
    Ok(())
}

/// Empty every IBC channel and client list. Returns `false` when the
/// export has no `ibc` module.
pub fn prune_ibc(genesis: &mut Value) -> Result<bool> {
    if genesis.pointer("/app_state/ibc").is_none() {
        warn!("No ibc module in app_state, nothing to prune");
        return Ok(false);
    }
    info!("=== Pruning IBC module ===");

    let channel_genesis = object_mut(genesis, &["app_state", "ibc", "channel_genesis"])?;
    for key in IBC_CHANNEL_STATE_KEYS {
        channel_genesis.insert(key.to_string(), Value::Array(Vec::new()));
    }
    let client_genesis = object_mut(genesis, &["app_state", "ibc", "client_genesis"])?;
    for key in IBC_CLIENT_STATE_KEYS {
        client_genesis.insert(key.to_string(), Value::Array(Vec::new()));
    }
    Ok(true)
}

/// Swap the consensus identity of `old` for `new` across the document.
///
/// The operator address is not substituted: rewriting it leaves the
/// application-layer delegation records inconsistent and the node fails
/// to start.
pub fn replace_validator(
    genesis: &mut Value,
    old: &ValidatorIdentity,
    new: &ValidatorIdentity,
) -> Result<ValidatorReplacement> {
    info!("=== Replace validator ===");
    info!("\t{:20} {}", "Pubkey", new.pubkey);
    info!("\t{:20} {}", "Consensus address", new.consensus_address);
    info!("\t{:20} {}", "Operator address", new.operator_address);
    info!("\t{:20} {}", "Hex address", new.hex_address);

    let mut replaced_values = replace_str(genesis, &old.hex_address, &new.hex_address);
    replaced_values += replace_str(genesis, &old.consensus_address, &new.consensus_address);
    replaced_values += replace_str(genesis, &old.pubkey, &new.pubkey);
    debug!("Substituted {} validator values", replaced_values);

    let validators = array_mut(genesis, &["validators"])?;
    let validator_set_updated = match find_entry_mut(validators, &["name"], &old.moniker) {
        Some(validator) => {
            *field_mut(validator, &["pub_key", "value"])? = Value::from(new.pubkey.as_str());
            true
        }
        None => {
            warn!("Validator {} not found in validator set", old.moniker);
            false
        }
    };

    let staking_validators = array_mut(genesis, &["app_state", "staking", "validators"])?;
    let staking_validator_updated =
        match find_entry_mut(staking_validators, &["description", "moniker"], &old.moniker) {
            Some(validator) => {
                *field_mut(validator, &["consensus_pubkey", "key"])? =
                    Value::from(new.pubkey.as_str());
                true
            }
            None => {
                warn!("Validator {} not found in staking module", old.moniker);
                false
            }
        };

    Ok(ValidatorReplacement {
        replaced_values,
        validator_set_updated,
        staking_validator_updated,
    })
}

pub fn replace_account(
    genesis: &mut Value,
    old: &AccountIdentity,
    new: &AccountIdentity,
) -> usize {
    info!("=== Replace account ===");
    info!("\t{:20} {}", "Pubkey", new.pubkey);
    info!("\t{:20} {}", "Address", new.address);

    let replaced = replace_str(genesis, &old.address, &new.address)
        + replace_str(genesis, &old.pubkey, &new.pubkey);
    debug!("Substituted {} account values", replaced);
    replaced
}

/// Add `delta` to the staking validator's delegator shares and tokens.
pub fn credit_staking_validator(genesis: &mut Value, moniker: &str, delta: U256) -> Result<bool> {
    let validators = array_mut(genesis, &["app_state", "staking", "validators"])?;
    let Some(validator) = find_entry_mut(validators, &["description", "moniker"], moniker) else {
        warn!("Validator {} not found in staking module, shares unchanged", moniker);
        return Ok(false);
    };

    let shares = update_str(validator, &["delegator_shares"], |path, shares| {
        add_dec(path, shares, delta)
    })?;
    info!("\tUpdate delegator shares to {}", shares);

    let tokens = update_str(validator, &["tokens"], |path, tokens| add_int(path, tokens, delta))?;
    info!("\tUpdate tokens to {}", tokens);
    Ok(true)
}

/// Add `delta` to the first delegation made by `delegator`.
pub fn credit_delegation(genesis: &mut Value, delegator: &str, delta: U256) -> Result<bool> {
    let delegations = array_mut(genesis, &["app_state", "staking", "delegations"])?;
    let Some(delegation) = find_entry_mut(delegations, &["delegator_address"], delegator) else {
        warn!("No delegation from {}", delegator);
        return Ok(false);
    };

    let shares = update_str(delegation, &["shares"], |path, shares| add_dec(path, shares, delta))?;
    info!(
        "\tUpdate {} delegation shares to {} to {}",
        delegator,
        str_field(delegation, &["validator_address"]).unwrap_or("<unknown>"),
        shares
    );
    Ok(true)
}

pub fn credit_starting_info(genesis: &mut Value, delegator: &str, delta: U256) -> Result<bool> {
    let infos = array_mut(
        genesis,
        &["app_state", "distribution", "delegator_starting_infos"],
    )?;
    let Some(starting_info) = find_entry_mut(infos, &["delegator_address"], delegator) else {
        warn!("No delegator starting info for {}", delegator);
        return Ok(false);
    };

    let stake = update_str(starting_info, &["starting_info", "stake"], |path, stake| {
        add_dec(path, stake, delta)
    })?;
    info!("\tUpdate {} stake to {}", delegator, stake);
    Ok(true)
}

/// Raise `validators[].power` of the validator named `moniker`.
pub fn add_validator_power(genesis: &mut Value, moniker: &str, delta: U256) -> Result<bool> {
    let validators = array_mut(genesis, &["validators"])?;
    let Some(validator) = find_entry_mut(validators, &["name"], moniker) else {
        warn!("Validator {} not found in validator set, power unchanged", moniker);
        return Ok(false);
    };

    let power = update_str(validator, &["power"], |path, power| add_int(path, power, delta))?;
    info!(
        "\tUpdate {} validator power to {}",
        str_field(validator, &["address"]).unwrap_or(moniker),
        power
    );
    Ok(true)
}

pub fn add_last_validator_power(
    genesis: &mut Value,
    operator_address: &str,
    delta: U256,
) -> Result<bool> {
    let powers = array_mut(genesis, &["app_state", "staking", "last_validator_powers"])?;
    let Some(entry) = find_entry_mut(powers, &["address"], operator_address) else {
        warn!("No last_validator_power for {}", operator_address);
        return Ok(false);
    };

    let power = update_str(entry, &["power"], |path, power| add_int(path, power, delta))?;
    info!("\tUpdate {} last_validator_power to {}", operator_address, power);
    Ok(true)
}

pub fn add_last_total_power(genesis: &mut Value, delta: U256) -> Result<String> {
    let total = update_str(
        genesis,
        &["app_state", "staking", "last_total_power"],
        |path, total| add_int(path, total, delta),
    )?;
    info!("\tUpdate last_total_power to {}", total);
    Ok(total)
}

/// Add `delta` to the `denom` coin held by `address` in the bank module.
///
/// Only the first balance entry for `address` is considered.
pub fn credit_balance(genesis: &mut Value, address: &str, denom: &str, delta: U256) -> Result<bool> {
    let balances = array_mut(genesis, &["app_state", "bank", "balances"])?;
    let Some(balance) = find_entry_mut(balances, &["address"], address) else {
        warn!("No bank balance for {}", address);
        return Ok(false);
    };
    let coins = array_mut(balance, &["coins"])?;
    let Some(coin) = find_entry_mut(coins, &["denom"], denom) else {
        warn!("{} holds no {}", address, denom);
        return Ok(false);
    };

    let amount = update_str(coin, &["amount"], |path, amount| add_int(path, amount, delta))?;
    info!("\tUpdate {} {} balance to {}", address, denom, amount);
    Ok(true)
}

pub fn add_supply(genesis: &mut Value, denom: &str, delta: U256) -> Result<bool> {
    let supply = array_mut(genesis, &["app_state", "bank", "supply"])?;
    let Some(coin) = find_entry_mut(supply, &["denom"], denom) else {
        warn!("No total supply entry for {}", denom);
        return Ok(false);
    };

    let amount = update_str(coin, &["amount"], |path, amount| add_int(path, amount, delta))?;
    info!("\tUpdate total {} supply to {}", denom, amount);
    Ok(true)
}

/// Run the whole pipeline over `genesis` in place.
///
/// Ledger deltas are not idempotent: running twice credits twice.
pub fn testnetify(genesis: &mut Value, config: &TestnetConfig) -> Result<TestnetifyReport> {
    let params = &config.params;
    let token_delta = U256::from(params.token_delta);
    let power_delta = U256::from(params.power_delta);
    let old_validator = config.old_validator();
    let new_account = &config.new_account;
    let mut report = TestnetifyReport {
        previous_chain_id: set_chain_id(genesis, &config.chain_id)?,
        ..TestnetifyReport::default()
    };

    shorten_voting_period(genesis, &params.governance_voting_period)?;

    if config.prune_ibc {
        report.ibc_pruned = prune_ibc(genesis)?;
    }

    let replacement = replace_validator(genesis, old_validator, &config.new_validator)?;
    report.validator_set_key_updated = replacement.validator_set_updated;
    report.staking_validator_key_updated = replacement.staking_validator_updated;
    report.replaced_values = replacement.replaced_values
        + replace_account(genesis, config.old_account(), new_account);

    info!("=== Update staking module ===");
    report.staking_validator_credited =
        credit_staking_validator(genesis, &old_validator.moniker, token_delta)?;
    report.delegation_credited = credit_delegation(genesis, &new_account.address, token_delta)?;
    report.starting_info_credited =
        credit_starting_info(genesis, &new_account.address, token_delta)?;

    info!("=== Update validator power ===");
    report.validator_power_updated =
        add_validator_power(genesis, &old_validator.moniker, power_delta)?;
    report.last_validator_power_updated =
        add_last_validator_power(genesis, &old_validator.operator_address, power_delta)?;
    add_last_total_power(genesis, power_delta)?;

    info!("=== Update bank module ===");
    report.account_balance_credited =
        credit_balance(genesis, &new_account.address, &params.native_denom, token_delta)?;
    report.bonded_pool_credited = credit_balance(
        genesis,
        &params.bonded_tokens_pool_address,
        &params.native_denom,
        token_delta,
    )?;
    report.supply_updated = add_supply(genesis, &params.native_denom, token_delta * U256::from(2u64))?;

    debug!("Pipeline report: {:?}", report);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn staking_fixture() -> Value {
        json!({
            "validators": [
                {"name": "other", "power": "10", "address": "AAAA", "pub_key": {"value": "k0"}},
                {"name": "notional", "power": "100", "address": "6EC8", "pub_key": {"value": "k1"}}
            ],
            "app_state": {
                "staking": {
                    "validators": [
                        {
                            "description": {"moniker": "notional"},
                            "consensus_pubkey": {"key": "k1"},
                            "delegator_shares": "1000.000000000000000000",
                            "tokens": "1000"
                        }
                    ],
                    "last_validator_powers": [{"address": "valoper1", "power": "100"}],
                    "last_total_power": "110"
                }
            }
        })
    }

    #[test]
    fn test_credit_staking_validator() {
        let mut genesis = staking_fixture();
        let delta = U256::from(1_000_000_000_000_000u64);
        assert!(credit_staking_validator(&mut genesis, "notional", delta).unwrap());

        let validator = &genesis["app_state"]["staking"]["validators"][0];
        assert_eq!(validator["delegator_shares"], "1000000000001000.000000000000000000");
        assert_eq!(validator["tokens"], "1000000000001000");
    }

    #[test]
    fn test_lookup_miss_leaves_document_unchanged() {
        let mut genesis = staking_fixture();
        let original = genesis.clone();
        let delta = U256::from(5u64);

        assert!(!credit_staking_validator(&mut genesis, "nobody", delta).unwrap());
        assert!(!add_validator_power(&mut genesis, "nobody", delta).unwrap());
        assert!(!add_last_validator_power(&mut genesis, "valoper9", delta).unwrap());
        assert_eq!(genesis, original);
    }

    #[test]
    fn test_power_updates() {
        let mut genesis = staking_fixture();
        let delta = U256::from(1_000_000_000u64);
        assert!(add_validator_power(&mut genesis, "notional", delta).unwrap());
        assert!(add_last_validator_power(&mut genesis, "valoper1", delta).unwrap());
        assert_eq!(add_last_total_power(&mut genesis, delta).unwrap(), "1000000110");

        assert_eq!(genesis["validators"][0]["power"], "10");
        assert_eq!(genesis["validators"][1]["power"], "1000000100");
        assert_eq!(
            genesis["app_state"]["staking"]["last_validator_powers"][0]["power"],
            "1000000100"
        );
    }

    #[test]
    fn test_replace_validator_skips_operator_address() {
        let mut genesis = json!({
            "validators": [{"name": "notional", "address": "HEX0", "pub_key": {"value": "PK0"}}],
            "app_state": {
                "staking": {
                    "validators": [{
                        "operator_address": "valoper0",
                        "description": {"moniker": "notional"},
                        "consensus_pubkey": {"key": "PK0"}
                    }]
                },
                "slashing": {"signing_infos": [{"address": "valcons0"}]}
            }
        });
        let old = ValidatorIdentity {
            moniker: "notional".into(),
            pubkey: "PK0".into(),
            hex_address: "HEX0".into(),
            operator_address: "valoper0".into(),
            consensus_address: "valcons0".into(),
        };
        let new = ValidatorIdentity {
            moniker: "val".into(),
            pubkey: "PK1".into(),
            hex_address: "HEX1".into(),
            operator_address: "valoper1".into(),
            consensus_address: "valcons1".into(),
        };

        let outcome = replace_validator(&mut genesis, &old, &new).unwrap();
        assert_eq!(outcome.replaced_values, 4);
        assert!(outcome.validator_set_updated);
        assert!(outcome.staking_validator_updated);
        assert_eq!(genesis["validators"][0]["address"], "HEX1");
        assert_eq!(genesis["validators"][0]["pub_key"]["value"], "PK1");
        assert_eq!(
            genesis["app_state"]["slashing"]["signing_infos"][0]["address"],
            "valcons1"
        );
        let staking = &genesis["app_state"]["staking"]["validators"][0];
        assert_eq!(staking["consensus_pubkey"]["key"], "PK1");
        assert_eq!(staking["operator_address"], "valoper0");
        assert_eq!(staking["description"]["moniker"], "notional");
    }

    #[test]
    fn test_voting_period_in_both_layouts() {
        let mut genesis = json!({"app_state": {"gov": {
            "voting_params": {"voting_period": "1209600s"},
            "params": {"voting_period": "1209600s", "quorum": "0.33"}
        }}});
        shorten_voting_period(&mut genesis, "180s").unwrap();
        assert_eq!(genesis["app_state"]["gov"]["voting_params"]["voting_period"], "180s");
        assert_eq!(genesis["app_state"]["gov"]["params"]["voting_period"], "180s");
        assert_eq!(genesis["app_state"]["gov"]["params"]["quorum"], "0.33");

        let mut missing = json!({"app_state": {"gov": {}}});
        assert!(matches!(
            shorten_voting_period(&mut missing, "180s"),
            Err(GenesisError::MissingField { .. })
        ));
    }

    #[test]
    fn test_prune_without_ibc_module() {
        let mut genesis = json!({"app_state": {"bank": {}}});
        assert!(!prune_ibc(&mut genesis).unwrap());
        assert_eq!(genesis, json!({"app_state": {"bank": {}}}));
    }

    #[test]
    fn test_credit_balance_only_touches_denom() {
        let mut genesis = json!({"app_state": {"bank": {"balances": [
            {"address": "juno1a", "coins": [
                {"denom": "ibc/ABC", "amount": "7"},
                {"denom": "ujuno", "amount": "10"}
            ]}
        ]}}});
        assert!(credit_balance(&mut genesis, "juno1a", "ujuno", U256::from(5u64)).unwrap());
        assert!(!credit_balance(&mut genesis, "juno1a", "uatom", U256::from(5u64)).unwrap());
        assert!(!credit_balance(&mut genesis, "juno1b", "ujuno", U256::from(5u64)).unwrap());

        let coins = &genesis["app_state"]["bank"]["balances"][0]["coins"];
        assert_eq!(coins[0]["amount"], "7");
        assert_eq!(coins[1]["amount"], "15");
    }

    #[test]
    fn test_malformed_amount_is_an_error() {
        let mut genesis = staking_fixture();
        genesis["app_state"]["staking"]["last_total_power"] = json!(110);
        assert!(matches!(
            add_last_total_power(&mut genesis, U256::from(1u64)),
            Err(GenesisError::UnexpectedType { expected: "string", .. })
        ));
    }
}
