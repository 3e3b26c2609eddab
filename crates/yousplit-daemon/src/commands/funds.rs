//! Deposit, withdrawal and stable-token handlers.

use std::sync::Arc;

use serde_json::Value;
use yousplit_db::queries::history::SettlementKind;
use yousplit_splitter::SplitterError;
use yousplit_types::events::PoolEvent;
use yousplit_types::Asset;

use super::{amount_json, param_address, param_amount, Result};
use crate::auth::Session;
use crate::rpc::RpcError;
use crate::state::{DaemonState, SettlementOutbox};

/// Native value arriving at the pool from the session's caller.
pub async fn deposit(state: &Arc<DaemonState>, session: &Session, params: &Value) -> Result {
    let from = session.caller()?;
    let amount = param_amount(params, "amount")?;

    state
        .mutate(|pool, effects| {
            pool.splitter.credit_native(amount)?;
            effects.settle(SettlementKind::Deposit, Asset::Native, from, amount);
            effects.events.push(PoolEvent::FundsReceived { from, amount });
            Ok(serde_json::json!({
                "total": amount_json(pool.splitter.total_balance()),
            }))
        })
        .await
}

/// Pay the caller its full native withdrawable amount.
pub async fn withdraw(state: &Arc<DaemonState>, session: &Session) -> Result {
    let caller = session.caller()?;

    state
        .mutate(|pool, effects| {
            let amount = {
                let mut outbox = SettlementOutbox::new(effects);
                pool.splitter.withdraw(&caller, &mut outbox)?
            };
            effects.events.push(PoolEvent::Withdrawn {
                beneficiary: caller,
                asset: Asset::Native,
                amount,
            });
            Ok(serde_json::json!({"amount": amount_json(amount)}))
        })
        .await
}

/// Pay the caller its full stable withdrawable amount.
pub async fn withdraw_stable(state: &Arc<DaemonState>, session: &Session) -> Result {
    let caller = session.caller()?;

    state
        .mutate(|pool, effects| {
            let token = pool.token.as_mut();
            let amount = match token {
                Some(token) => pool.splitter.withdraw_stable(&caller, token)?,
                None => return Err(SplitterError::StableTokenNotConfigured.into()),
            };
            effects.settle(SettlementKind::Withdraw, Asset::Stable, caller, amount);
            effects.events.push(PoolEvent::Withdrawn {
                beneficiary: caller,
                asset: Asset::Stable,
                amount,
            });
            Ok(serde_json::json!({"amount": amount_json(amount)}))
        })
        .await
}

/// Owner pulls approved stable units into the pool.
pub async fn onramp_royalties(
    state: &Arc<DaemonState>,
    session: &Session,
    params: &Value,
) -> Result {
    let caller = session.caller()?;
    let amount = param_amount(params, "amount")?;

    state
        .mutate(|pool, effects| {
            match pool.token.as_mut() {
                Some(token) => pool.splitter.onramp_royalties(&caller, amount, token)?,
                None => return Err(SplitterError::StableTokenNotConfigured.into()),
            }
            effects.settle(SettlementKind::Onramp, Asset::Stable, caller, amount);
            effects.events.push(PoolEvent::RoyaltiesOnramped { amount });
            Ok(serde_json::json!({
                "total_funds": amount_json(pool.splitter.get_total_funds()),
            }))
        })
        .await
}

/// Set the stable-token allowance the session's caller grants `spender`.
pub async fn token_approve(
    state: &Arc<DaemonState>,
    session: &Session,
    params: &Value,
) -> Result {
    let owner = session.caller()?;
    let spender = param_address(params, "spender")?;
    let amount = param_amount(params, "amount")?;

    state
        .mutate(|pool, _effects| {
            pool.token_mut()?.approve(&owner, &spender, amount);
            Ok(serde_json::json!({"allowance": amount_json(amount)}))
        })
        .await
}

/// Credit stable units out of thin air. Only routed when `advanced.dev_mode`.
pub async fn dev_token_mint(state: &Arc<DaemonState>, params: &Value) -> Result {
    let to = param_address(params, "to")?;
    let amount = param_amount(params, "amount")?;

    state
        .mutate(|pool, _effects| {
            pool.token_mut()?
                .mint(&to, amount)
                .map_err(|e| RpcError::invalid_params(&e.to_string()))?;
            Ok(serde_json::json!({"minted": amount_json(amount)}))
        })
        .await
}
