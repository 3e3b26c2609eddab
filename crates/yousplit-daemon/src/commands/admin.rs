//! Registry administration handlers (owner only).

use std::sync::Arc;

use serde_json::Value;
use yousplit_types::events::PoolEvent;

use super::{param_address, param_bool, param_bps, Result};
use crate::auth::Session;
use crate::state::DaemonState;

/// Insert or update a beneficiary.
pub async fn set_beneficiary(
    state: &Arc<DaemonState>,
    session: &Session,
    params: &Value,
) -> Result {
    let caller = session.caller()?;
    let address = param_address(params, "address")?;
    let share_bps = param_bps(params, "share_bps")?;
    let eligible = param_bool(params, "eligible")?;

    state
        .mutate(|pool, effects| {
            pool.splitter
                .set_beneficiary(&caller, address, share_bps, eligible)?;
            effects.events.push(PoolEvent::BeneficiaryUpdated {
                beneficiary: address,
                share_bps,
                eligible,
            });
            Ok(serde_json::json!({
                "active_share_bps": pool.splitter.active_share_bps(),
            }))
        })
        .await
}

pub async fn remove_beneficiary(
    state: &Arc<DaemonState>,
    session: &Session,
    params: &Value,
) -> Result {
    let caller = session.caller()?;
    let address = param_address(params, "address")?;

    state
        .mutate(|pool, effects| {
            pool.splitter.remove_beneficiary(&caller, &address)?;
            effects
                .events
                .push(PoolEvent::BeneficiaryRemoved { beneficiary: address });
            Ok(serde_json::json!({
                "active_share_bps": pool.splitter.active_share_bps(),
            }))
        })
        .await
}

/// Stop the daemon. Owner only.
pub async fn shutdown(state: &Arc<DaemonState>, session: &Session) -> Result {
    let caller = session.caller()?;
    {
        let pool = state.pool.lock().await;
        if caller != pool.splitter.owner() {
            return Err(yousplit_splitter::SplitterError::NotOwner.into());
        }
    }
    tracing::info!(%caller, "shutdown requested");
    // No receiver only means the server loop is already gone.
    let _ = state.shutdown_tx.send(());
    Ok(serde_json::json!({"stopping": true}))
}
