//! Daemon-wide shared state and the mutation pipeline.
//!
//! All pool mutations go through [`DaemonState::mutate`]: the pool lock is
//! held for the whole operation, the result is persisted together with its
//! settlement rows in one SQLite transaction, and only then are events
//! emitted. If persistence fails the in-memory state is rolled back.

use std::sync::Arc;

use rusqlite::Connection;
use tokio::sync::{broadcast, Mutex};
use tracing::{error, info, warn};
use yousplit_db::queries::history::{self, SettlementKind};
use yousplit_splitter::token::MemoryTokenLedger;
use yousplit_splitter::{NativeTransfer, Splitter, SplitterError, TransferError};
use yousplit_types::events::PoolEvent;
use yousplit_types::{Address, Amount, Asset};

use crate::config::DaemonConfig;
use crate::events::EventBus;
use crate::rpc::RpcError;

/// The pool plus the in-process stable-token ledger it settles against.
#[derive(Clone, Debug)]
pub struct PoolState {
    pub splitter: Splitter,
    /// `None` for a native-only pool.
    pub token: Option<MemoryTokenLedger>,
}

impl PoolState {
    /// The stable-token ledger, or the error the splitter would raise.
    pub fn token_mut(&mut self) -> Result<&mut MemoryTokenLedger, SplitterError> {
        self.token
            .as_mut()
            .ok_or(SplitterError::StableTokenNotConfigured)
    }

    pub fn token(&self) -> Result<&MemoryTokenLedger, SplitterError> {
        self.token
            .as_ref()
            .ok_or(SplitterError::StableTokenNotConfigured)
    }
}

/// A settlement waiting to be written alongside the snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingSettlement {
    pub kind: SettlementKind,
    pub asset: Asset,
    pub party: Address,
    pub amount: Amount,
}

/// Side effects collected by one mutation.
#[derive(Debug, Default)]
pub struct Effects {
    pub settlements: Vec<PendingSettlement>,
    pub events: Vec<PoolEvent>,
}

impl Effects {
    pub fn settle(&mut self, kind: SettlementKind, asset: Asset, party: Address, amount: Amount) {
        self.settlements.push(PendingSettlement {
            kind,
            asset,
            party,
            amount,
        });
    }
}

/// Native payouts leave the daemon as settlement rows.
///
/// The row is written in the same transaction as the snapshot that debits
/// the pool, so a payout is recorded if and only if the withdrawal commits.
pub struct SettlementOutbox<'a> {
    effects: &'a mut Effects,
}

impl<'a> SettlementOutbox<'a> {
    pub fn new(effects: &'a mut Effects) -> Self {
        Self { effects }
    }
}

impl NativeTransfer for SettlementOutbox<'_> {
    fn send(
        &mut self,
        _pool: &mut Splitter,
        to: &Address,
        amount: Amount,
    ) -> Result<(), TransferError> {
        if to.is_zero() {
            return Err(TransferError::new("payout to the zero address"));
        }
        self.effects
            .settle(SettlementKind::Withdraw, Asset::Native, *to, amount);
        Ok(())
    }
}

/// Daemon-wide shared state.
pub struct DaemonState {
    /// Database connection. Always locked after `pool`.
    pub db: Arc<Mutex<Connection>>,
    pub config: DaemonConfig,
    /// Event bus for pushing events to subscribers.
    pub event_bus: EventBus,
    pub pool: Mutex<PoolState>,
    /// Shutdown signal sender.
    pub shutdown_tx: broadcast::Sender<()>,
}

impl DaemonState {
    /// Restore the pool from `conn`, or construct it from `config.pool` and
    /// save it when the database is empty.
    pub fn bootstrap(config: DaemonConfig, conn: Connection) -> anyhow::Result<Self> {
        let splitter = match yousplit_db::queries::pool::load(&conn)? {
            Some(splitter) => {
                info!(owner = %splitter.owner(), "restored pool from database");
                if !config.pool.owner.is_empty() {
                    warn!("stored pool takes precedence over the [pool] config section");
                }
                splitter
            }
            None => {
                let splitter = Splitter::new(config.pool.to_params()?)?;
                yousplit_db::queries::pool::save(&conn, &splitter)?;
                info!(owner = %splitter.owner(), "constructed new pool");
                splitter
            }
        };

        let token = match splitter.stable_token() {
            None => None,
            Some(address) => {
                let ledger = yousplit_db::queries::settings::load_token_ledger(&conn)?
                    .unwrap_or_else(|| MemoryTokenLedger::new(address));
                if yousplit_splitter::token::StableToken::token_address(&ledger) != address {
                    anyhow::bail!("stored token ledger does not belong to stable token {address}");
                }
                Some(ledger)
            }
        };

        let (shutdown_tx, _) = broadcast::channel(1);
        Ok(Self {
            db: Arc::new(Mutex::new(conn)),
            event_bus: EventBus::new(config.advanced.event_buffer),
            config,
            pool: Mutex::new(PoolState { splitter, token }),
            shutdown_tx,
        })
    }

    /// Run one pool mutation, persist it, then emit its events.
    pub async fn mutate<T>(
        &self,
        op: impl FnOnce(&mut PoolState, &mut Effects) -> Result<T, RpcError>,
    ) -> Result<T, RpcError> {
        let mut pool = self.pool.lock().await;
        let checkpoint = pool.clone();
        let mut effects = Effects::default();

        let value = match op(&mut *pool, &mut effects) {
            Ok(value) => value,
            Err(e) => {
                *pool = checkpoint;
                return Err(e);
            }
        };

        let db = self.db.lock().await;
        if let Err(e) = persist(&db, &*pool, &effects.settlements) {
            error!("persisting pool state failed, rolling back: {e}");
            *pool = checkpoint;
            return Err(RpcError::internal_error(&format!("db error: {e}")));
        }
        drop(db);
        drop(pool);

        for event in effects.events {
            self.event_bus.emit(event);
        }
        Ok(value)
    }
}

/// Write the snapshot, token ledger and settlements in one transaction.
pub fn persist(
    conn: &Connection,
    pool: &PoolState,
    settlements: &[PendingSettlement],
) -> yousplit_db::Result<()> {
    let tx = conn.unchecked_transaction()?;
    yousplit_db::queries::pool::write(&tx, &pool.splitter)?;
    if let Some(token) = &pool.token {
        yousplit_db::queries::settings::save_token_ledger(&tx, token)?;
    }
    for s in settlements {
        history::record(&tx, s.kind, s.asset, &s.party, s.amount)?;
    }
    tx.commit()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PoolConfig;

    fn config() -> DaemonConfig {
        DaemonConfig {
            pool: PoolConfig {
                owner: "0a".repeat(20),
                address: "ee".repeat(20),
                stable_token: "cc".repeat(20),
                beneficiaries: vec!["01".repeat(20), "02".repeat(20)],
                shares: vec![475, 475],
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_bootstrap_constructs_then_restores() {
        let conn = yousplit_db::open_memory().expect("db");
        let state = DaemonState::bootstrap(config(), conn).expect("bootstrap");
        {
            let pool = state.pool.lock().await;
            assert_eq!(pool.splitter.owner(), Address::repeat(0x0a));
            assert!(pool.token.is_some());
        }

        let db = state.db.lock().await;
        let stored = yousplit_db::queries::pool::load(&db)
            .expect("load")
            .expect("saved at bootstrap");
        assert_eq!(stored.get_beneficiaries().addresses.len(), 3);
    }

    #[tokio::test]
    async fn test_bootstrap_without_pool_config_fails() {
        let conn = yousplit_db::open_memory().expect("db");
        assert!(DaemonState::bootstrap(DaemonConfig::default(), conn).is_err());
    }

    #[tokio::test]
    async fn test_mutate_persists_and_emits() {
        let conn = yousplit_db::open_memory().expect("db");
        let state = DaemonState::bootstrap(config(), conn).expect("bootstrap");
        let mut rx = state.event_bus.subscribe();
        let from = Address::repeat(0x77);

        state
            .mutate(|pool, effects| {
                pool.splitter
                    .credit_native(1_000)
                    .map_err(RpcError::from_splitter)?;
                effects.settle(SettlementKind::Deposit, Asset::Native, from, 1_000);
                effects.events.push(PoolEvent::FundsReceived { from, amount: 1_000 });
                Ok(())
            })
            .await
            .expect("mutate");

        assert_eq!(rx.try_recv().expect("event").event.name(), "funds_received");
        let db = state.db.lock().await;
        let stored = yousplit_db::queries::pool::load(&db).expect("load").expect("pool");
        assert_eq!(stored.total_balance(), 1_000);
        assert_eq!(history::list(&db, None, 10).expect("history").len(), 1);
    }

    #[tokio::test]
    async fn test_failed_mutation_rolls_back() {
        let conn = yousplit_db::open_memory().expect("db");
        let state = DaemonState::bootstrap(config(), conn).expect("bootstrap");
        let mut rx = state.event_bus.subscribe();

        let result: Result<(), RpcError> = state
            .mutate(|pool, effects| {
                pool.splitter
                    .credit_native(1_000)
                    .map_err(RpcError::from_splitter)?;
                effects.events.push(PoolEvent::RoyaltiesOnramped { amount: 1 });
                Err(RpcError::invalid_params("late failure"))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(state.pool.lock().await.splitter.total_balance(), 0);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_outbox_records_native_payout() {
        let mut effects = Effects::default();
        let mut splitter = Splitter::new(
            config().pool.to_params().expect("params"),
        )
        .expect("construct");
        let mut outbox = SettlementOutbox::new(&mut effects);
        outbox
            .send(&mut splitter, &Address::repeat(1), 5)
            .expect("send");
        assert!(outbox.send(&mut splitter, &Address::ZERO, 5).is_err());
        assert_eq!(effects.settlements.len(), 1);
        assert_eq!(effects.settlements[0].kind, SettlementKind::Withdraw);
    }
}
