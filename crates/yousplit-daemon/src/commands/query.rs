//! Read-only query handlers.

use std::sync::Arc;

use serde_json::Value;
use yousplit_db::queries::history;
use yousplit_splitter::token::StableToken;

use super::{amount_json, param_address, Result};
use crate::rpc::RpcError;
use crate::state::DaemonState;

const DEFAULT_HISTORY_LIMIT: u32 = 100;

pub async fn owner(state: &Arc<DaemonState>) -> Result {
    let pool = state.pool.lock().await;
    Ok(serde_json::json!({"owner": pool.splitter.owner().to_string()}))
}

/// Native units currently held by the pool.
pub async fn total_balance(state: &Arc<DaemonState>) -> Result {
    let pool = state.pool.lock().await;
    Ok(serde_json::json!({"total": amount_json(pool.splitter.total_balance())}))
}

/// Stable units currently held by the pool.
pub async fn get_total_funds(state: &Arc<DaemonState>) -> Result {
    let pool = state.pool.lock().await;
    Ok(serde_json::json!({"total": amount_json(pool.splitter.get_total_funds())}))
}

pub async fn beneficiaries(state: &Arc<DaemonState>, params: &Value) -> Result {
    let address = param_address(params, "address")?;
    let pool = state.pool.lock().await;
    let record = pool.splitter.beneficiaries(&address);
    Ok(serde_json::json!({
        "share_bps": record.share_bps,
        "withdrawn_native": amount_json(record.withdrawn_native),
        "eligible": record.eligible,
    }))
}

pub async fn get_beneficiaries(state: &Arc<DaemonState>) -> Result {
    let pool = state.pool.lock().await;
    let list = pool.splitter.get_beneficiaries();
    Ok(serde_json::json!({
        "addresses": list.addresses.iter().map(|a| a.to_string()).collect::<Vec<_>>(),
        "shares": list.shares,
        "withdrawn": list.withdrawn.iter().copied().map(amount_json).collect::<Vec<_>>(),
        "eligible": list.eligible,
    }))
}

pub async fn get_beneficiary_info(state: &Arc<DaemonState>, params: &Value) -> Result {
    let address = param_address(params, "address")?;
    let pool = state.pool.lock().await;
    let info = pool.splitter.get_beneficiary_info(&address);
    Ok(serde_json::json!({
        "share_bps": info.share_bps,
        "withdrawn_native": amount_json(info.withdrawn_native),
        "withdrawn_stable": amount_json(info.withdrawn_stable),
        "eligible": info.eligible,
        "eligible_amount": amount_json(info.eligible_amount),
        "stable_eligible_amount": amount_json(info.stable_eligible_amount),
    }))
}

/// Balance of `holder` on the stable-token ledger.
pub async fn token_balance(state: &Arc<DaemonState>, params: &Value) -> Result {
    let holder = param_address(params, "holder")?;
    let pool = state.pool.lock().await;
    let token = pool.token()?;
    Ok(serde_json::json!({"balance": amount_json(token.balance_of(&holder))}))
}

/// Settlement rows, oldest first, optionally for one party.
pub async fn get_settlement_history(state: &Arc<DaemonState>, params: &Value) -> Result {
    let party = match params.get("party") {
        None | Some(Value::Null) => None,
        Some(_) => Some(param_address(params, "party")?),
    };
    let limit = params
        .get("limit")
        .and_then(|v| v.as_u64())
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(DEFAULT_HISTORY_LIMIT);

    let db = state.db.lock().await;
    let rows = history::list(&db, party.as_ref(), limit)
        .map_err(|e| RpcError::internal_error(&format!("db error: {e}")))?;

    let result: Vec<Value> = rows
        .iter()
        .map(|row| {
            serde_json::json!({
                "seq": row.seq,
                "receipt_hash": hex::encode(row.receipt_hash),
                "kind": row.kind.as_str(),
                "asset": row.asset.as_str(),
                "party": row.party.to_string(),
                "amount": amount_json(row.amount),
                "timestamp": row.timestamp,
            })
        })
        .collect();

    Ok(serde_json::json!(result))
}
