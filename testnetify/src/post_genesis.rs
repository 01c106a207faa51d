//! Ledger consistency checks run on the transformed document before it is
//! written out.

use alloy_primitives::U256;
use serde_json::Value;
use tracing::{info, warn};

use crate::{
    amount::parse_int,
    error::{GenesisError, Result},
    genesis::TestnetConfig,
    utils::{array, display_path, field, find_entry},
};

/// Aggregates that the pipeline must move in lockstep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub supply: Option<U256>,
    pub account_balance: Option<U256>,
    pub pool_balance: Option<U256>,
    pub last_total_power: Option<U256>,
}

fn coin_amount(coins: &[Value], denom: &str, path: &str) -> Result<Option<U256>> {
    match find_entry(coins, &["denom"], denom) {
        Some(coin) => match coin.get("amount").and_then(Value::as_str) {
            Some(amount) => parse_int(path, amount).map(Some),
            None => Ok(None),
        },
        None => Ok(None),
    }
}

/// Total `denom` held across every balance entry owned by one of `addresses`.
///
/// Summing rather than taking the first entry keeps the check valid when the
/// new account already had a balance of its own before the rename.
fn balance_of(genesis: &Value, addresses: &[&str], denom: &str) -> Result<Option<U256>> {
    let balances = array(genesis, &["app_state", "bank", "balances"])?;
    let mut total: Option<U256> = None;
    for balance in balances {
        let Some(address) = balance.get("address").and_then(Value::as_str) else {
            continue;
        };
        if !addresses.contains(&address) {
            continue;
        }
        let Some(coins) = balance.get("coins").and_then(Value::as_array) else {
            continue;
        };
        let path = format!("app_state.bank.balances[{address}]");
        if let Some(amount) = coin_amount(coins, denom, &path)? {
            total = Some(total.unwrap_or_default().saturating_add(amount));
        }
    }
    Ok(total)
}

impl LedgerSnapshot {
    /// `accounts` are summed into `account_balance`.
    pub fn capture(genesis: &Value, accounts: &[&str], pool: &str, denom: &str) -> Result<Self> {
        let supply_path = ["app_state", "bank", "supply"];
        let supply = coin_amount(array(genesis, &supply_path)?, denom, &display_path(&supply_path))?;

        let power_path = ["app_state", "staking", "last_total_power"];
        let last_total_power = match field(genesis, &power_path).ok().and_then(Value::as_str) {
            Some(power) => Some(parse_int(&display_path(&power_path), power)?),
            None => None,
        };

        Ok(Self {
            supply,
            account_balance: balance_of(genesis, accounts, denom)?,
            pool_balance: balance_of(genesis, &[pool], denom)?,
            last_total_power,
        })
    }

    /// Snapshot keyed on the identities present before the pipeline runs.
    ///
    /// Any balance the new account already holds is included, since the
    /// rename folds the old account into the same address.
    pub fn before(genesis: &Value, config: &TestnetConfig) -> Result<Self> {
        Self::capture(
            genesis,
            &[
                config.old_account().address.as_str(),
                config.new_account.address.as_str(),
            ],
            &config.params.bonded_tokens_pool_address,
            &config.params.native_denom,
        )
    }

    /// Snapshot keyed on the identities installed by the pipeline.
    pub fn after(genesis: &Value, config: &TestnetConfig) -> Result<Self> {
        Self::capture(
            genesis,
            &[config.new_account.address.as_str()],
            &config.params.bonded_tokens_pool_address,
            &config.params.native_denom,
        )
    }
}

fn expect_eq(what: &'static str, expected: U256, actual: U256) -> Result<()> {
    if expected != actual {
        return Err(GenesisError::LedgerMismatch {
            what,
            expected: expected.to_string(),
            actual: actual.to_string(),
        });
    }
    info!("\t{} consistent at {}", what, actual);
    Ok(())
}

/// Check that every credit was mirrored in the aggregate it belongs to.
///
/// Checks whose inputs are missing from either snapshot are skipped.
pub fn verify_ledger(
    before: &LedgerSnapshot,
    after: &LedgerSnapshot,
    token_delta: U256,
    power_delta: U256,
) -> Result<()> {
    info!("=== Verifying ledger consistency ===");
    let credited = token_delta.saturating_mul(U256::from(2u64));

    match (before.supply, after.supply) {
        (Some(old), Some(new)) => expect_eq("native supply", old.saturating_add(credited), new)?,
        _ => warn!("Native supply not found, skipping supply check"),
    }

    match (
        before.account_balance,
        before.pool_balance,
        after.account_balance,
        after.pool_balance,
    ) {
        (Some(old_account), Some(old_pool), Some(new_account), Some(new_pool)) => expect_eq(
            "account and bonded pool balances",
            old_account.saturating_add(old_pool).saturating_add(credited),
            new_account.saturating_add(new_pool),
        )?,
        _ => warn!("Account or bonded pool balance not found, skipping balance check"),
    }

    match (before.last_total_power, after.last_total_power) {
        (Some(old), Some(new)) => {
            expect_eq("last total power", old.saturating_add(power_delta), new)?
        }
        _ => warn!("last_total_power not found, skipping power check"),
    }
    Ok(())
}

/// Compare `genesis` against the snapshot taken before the pipeline ran.
pub fn verify_result(genesis: &Value, before: &LedgerSnapshot, config: &TestnetConfig) -> Result<()> {
    let after = LedgerSnapshot::after(genesis, config)?;
    verify_ledger(
        before,
        &after,
        U256::from(config.params.token_delta),
        U256::from(config.params.power_delta),
    )
}
