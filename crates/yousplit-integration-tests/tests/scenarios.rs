//! Integration test: the reference pool lifecycle.
//!
//! Walks the canonical two-beneficiary pool through construction, a dust
//! deposit, a real deposit and withdrawal, eligibility changes, an
//! over-allocation attempt and a failed onramp.

use yousplit_integration_tests::*;
use yousplit_splitter::token::{MemoryTokenLedger, StableToken};
use yousplit_splitter::SplitterError;
use yousplit_types::beneficiary::BeneficiaryInfo;
use yousplit_types::{Asset, DEFAULT_OWNER_SHARE_BPS};

#[test]
fn construction_registers_owner_and_beneficiaries() {
    let pool = native_pool();

    let list = pool.get_beneficiaries();
    assert_eq!(list.addresses, vec![OWNER, B1, B2]);
    assert_eq!(list.shares, vec![DEFAULT_OWNER_SHARE_BPS, 475, 475]);
    assert!(list.withdrawn.iter().all(|w| *w == 0));
    assert!(list.eligible.iter().all(|e| *e));

    for address in [OWNER, B1, B2] {
        let info = pool.get_beneficiary_info(&address);
        assert_eq!(info.withdrawn_native, 0);
        assert_eq!(info.withdrawn_stable, 0);
        assert!(info.eligible);
    }
    assert_eq!(pool.owner(), OWNER);
}

#[test]
fn one_unit_deposit_truncates_to_zero() {
    let mut pool = native_pool();
    pool.credit_native(1).expect("credit");

    assert_eq!(pool.total_balance(), 1);
    assert_eq!(pool.get_beneficiary_info(&B1).eligible_amount, 0);

    let mut recorder = Recorder::default();
    assert_eq!(
        pool.withdraw(&B1, &mut recorder),
        Err(SplitterError::NothingToWithdraw)
    );
    assert!(recorder.payouts.is_empty());
}

#[test]
fn withdraw_pays_exact_share_once() {
    let mut pool = native_pool();
    pool.credit_native(10_000).expect("credit");

    let mut recorder = Recorder::default();
    assert_eq!(pool.withdraw(&B1, &mut recorder), Ok(475));
    assert_eq!(recorder.payouts, vec![(B1, 475)]);
    assert_eq!(pool.total_balance(), 10_000 - 475);
    assert_eq!(pool.beneficiaries(&B1).withdrawn_native, 475);

    assert_eq!(
        pool.withdraw(&B1, &mut recorder),
        Err(SplitterError::NothingToWithdraw)
    );
    assert_eq!(recorder.payouts.len(), 1);
}

#[test]
fn deactivated_beneficiary_cannot_withdraw() {
    let mut pool = native_pool();
    pool.credit_native(10_000).expect("credit");

    pool.set_beneficiary(&OWNER, B2, 0, false).expect("deactivate");
    let err = pool
        .withdraw(&B2, &mut Recorder::default())
        .expect_err("ineligible");
    assert_eq!(err, SplitterError::NotEligible);
    assert_eq!(err.to_string(), "you are not eligible to withdraw");

    // Still listed, with zero share.
    let list = pool.get_beneficiaries();
    assert_eq!(list.addresses, vec![OWNER, B1, B2]);
    assert_eq!(list.shares[2], 0);
    assert!(!list.eligible[2]);
}

#[test]
fn over_allocation_rejected_without_changes() {
    let mut pool = native_pool();
    pool.credit_native(10_000).expect("credit");
    let before = pool.clone();

    // 500 + 475 + 475 is already allotted; 8551 more crosses the whole.
    let result = pool.set_beneficiary(&OWNER, B3, 8_551, true);
    assert!(matches!(result, Err(SplitterError::InvalidShareAllocation(_))));
    assert_eq!(pool, before);
    assert_eq!(pool.get_beneficiary_info(&B3), BeneficiaryInfo::default());

    pool.set_beneficiary(&OWNER, B3, 8_550, true).expect("exact fit");
    assert_eq!(pool.active_share_bps(), 10_000);
}

#[test]
fn onramp_without_allowance_fails() {
    let mut pool = dual_pool();
    let mut token = MemoryTokenLedger::new(TOKEN);
    token.mint(&OWNER, 1_000_000).expect("mint");

    let result = pool.onramp_royalties(&OWNER, 250_000, &mut token);
    assert!(matches!(result, Err(SplitterError::TransferFailed(_))));
    assert_eq!(pool.cumulative_deposited(Asset::Stable), 0);
    assert_eq!(pool.get_total_funds(), 0);
    assert_eq!(token.balance_of(&OWNER), 1_000_000);
}

#[test]
fn non_owner_admin_calls_rejected() {
    let mut pool = native_pool();
    let before = pool.clone();

    assert_eq!(
        pool.set_beneficiary(&B1, B3, 100, true),
        Err(SplitterError::NotOwner)
    );
    assert_eq!(
        pool.remove_beneficiary(&STRANGER, &B2),
        Err(SplitterError::NotOwner)
    );
    let mut token = MemoryTokenLedger::new(TOKEN);
    assert_eq!(
        dual_pool().onramp_royalties(&B1, 1, &mut token),
        Err(SplitterError::NotOwner)
    );
    assert_eq!(pool, before);
}

#[test]
fn full_stable_lifecycle() {
    let mut pool = dual_pool();
    let mut token = MemoryTokenLedger::new(TOKEN);
    token.mint(&OWNER, 1_000_000).expect("mint");
    token.approve(&OWNER, &POOL, 1_000_000);

    pool.onramp_royalties(&OWNER, 1_000_000, &mut token)
        .expect("onramp");
    assert_eq!(pool.get_total_funds(), 1_000_000);
    assert_eq!(pool.get_beneficiary_info(&B1).stable_eligible_amount, 47_500);
    assert_eq!(pool.get_beneficiary_info(&B1).eligible_amount, 0);

    assert_eq!(pool.withdraw_stable(&B1, &mut token), Ok(47_500));
    assert_eq!(token.balance_of(&B1), 47_500);
    assert_eq!(token.balance_of(&POOL), 1_000_000 - 47_500);
    assert_eq!(pool.get_total_funds(), token.balance_of(&POOL));

    // Native side is independent.
    assert_eq!(
        pool.withdraw(&B1, &mut Recorder::default()),
        Err(SplitterError::NothingToWithdraw)
    );
}

#[test]
fn removal_keeps_history_and_reactivation_restores_claim() {
    let mut pool = native_pool();
    pool.credit_native(10_000).expect("credit");
    let mut recorder = Recorder::default();
    pool.withdraw(&B1, &mut recorder).expect("withdraw");

    pool.remove_beneficiary(&OWNER, &B1).expect("remove");
    assert_eq!(pool.get_beneficiaries().addresses, vec![OWNER, B2]);
    assert_eq!(pool.beneficiaries(&B1).withdrawn_native, 475);
    assert_eq!(
        pool.remove_beneficiary(&OWNER, &B1),
        Err(SplitterError::UnknownBeneficiary)
    );

    pool.credit_native(10_000).expect("credit while removed");
    assert_eq!(pool.withdrawable(&B1, Asset::Native), 0);

    pool.set_beneficiary(&OWNER, B1, 475, true).expect("re-add");
    assert_eq!(pool.get_beneficiaries().addresses, vec![OWNER, B2, B1]);
    assert_eq!(pool.withdrawable(&B1, Asset::Native), 475);
    pool.check_invariants().expect("invariants");
}
