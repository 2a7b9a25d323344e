//! LMDB backend tests: atomic write sets, ordered scans, and a full
//! governance lifecycle surviving an environment reopen.

use curation_governance::{ApplicationStatus, CurationEngine, NewApplication};
use curation_nullables::{NullClock, NullLedger, NullRegistry};
use curation_store::{GovernanceStore, WriteSet};
use curation_store_lmdb::LmdbEnvironment;
use curation_types::{Address, Amount, GovernanceParams, Identity, SubjectKind};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const MAP_SIZE: usize = 64 * 1024 * 1024;

fn open(path: &Path) -> LmdbEnvironment {
    LmdbEnvironment::open(path, MAP_SIZE).expect("open env")
}

fn addr(seed: u8) -> Address {
    Address::from_bytes([seed; 20])
}

fn params() -> GovernanceParams {
    GovernanceParams {
        application_fee: Amount::new(5),
        min_quorum: Amount::new(100),
        min_deposit: Amount::new(10),
        initial_voting_period_secs: 60,
        challenge_window_secs: 30,
        challenge_voting_period_secs: 60,
        lame_duck_period_secs: 600,
        ..GovernanceParams::default()
    }
}

// ---------------------------------------------------------------------------
// 1. Raw store behaviour
// ---------------------------------------------------------------------------

#[test]
fn write_set_commits_all_tables() {
    let dir = tempfile::tempdir().unwrap();
    let env = open(dir.path());
    let store = env.governance_store();
    let subject = addr(1);

    let mut batch = WriteSet::new();
    batch.put_application(&subject, b"app".to_vec());
    batch.archive_application(&subject, 0, b"old".to_vec());
    batch.put_round(&subject, 0, b"round".to_vec());
    batch.put_deposit(&subject, &addr(2), 0, b"d2".to_vec());
    batch.append_message(b"m0".to_vec());
    batch.append_message(b"m1".to_vec());
    batch.put_meta("lame_duck", b"ld".to_vec());
    let receipt = store.commit(batch).unwrap();
    assert_eq!(receipt.message_ids, vec![0, 1]);

    assert_eq!(store.get_application(&subject).unwrap(), Some(b"app".to_vec()));
    assert_eq!(
        store.get_archived_application(&subject, 0).unwrap(),
        Some(b"old".to_vec())
    );
    assert_eq!(store.get_round(&subject, 0).unwrap(), Some(b"round".to_vec()));
    assert_eq!(store.get_round(&subject, 1).unwrap(), None);
    assert_eq!(
        store.get_deposit(&subject, &addr(2), 0).unwrap(),
        Some(b"d2".to_vec())
    );
    assert_eq!(store.get_meta("lame_duck").unwrap(), Some(b"ld".to_vec()));
    assert_eq!(store.message_count().unwrap(), 2);
    assert_eq!(store.list_applications().unwrap().len(), 1);
}

#[test]
fn round_deposits_scan_stays_inside_round() {
    let dir = tempfile::tempdir().unwrap();
    let env = open(dir.path());
    let store = env.governance_store();
    let subject = addr(1);

    let mut batch = WriteSet::new();
    batch.put_deposit(&subject, &addr(3), 0, b"a".to_vec());
    batch.put_deposit(&subject, &addr(2), 0, b"b".to_vec());
    batch.put_deposit(&subject, &addr(2), 1, b"c".to_vec());
    batch.put_deposit(&addr(9), &addr(2), 0, b"d".to_vec());
    store.commit(batch).unwrap();

    // Ordered by voter within the round.
    assert_eq!(
        store.get_round_deposits(&subject, 0).unwrap(),
        vec![b"b".to_vec(), b"a".to_vec()]
    );
    assert_eq!(store.get_round_deposits(&subject, 1).unwrap(), vec![b"c".to_vec()]);
    assert!(store.get_round_deposits(&subject, 2).unwrap().is_empty());
}

#[test]
fn message_ids_continue_across_batches() {
    let dir = tempfile::tempdir().unwrap();
    let env = open(dir.path());
    let store = env.governance_store();

    for i in 0..3u8 {
        let mut batch = WriteSet::new();
        batch.append_message(vec![i]);
        assert_eq!(store.commit(batch).unwrap().message_ids, vec![u64::from(i)]);
    }
    let page = store.get_messages(1, 3).unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].id, 1);
    assert_eq!(page[1].data, vec![2]);
    assert!(store.get_messages(3, 3).unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// 2. Engine over LMDB
// ---------------------------------------------------------------------------

#[test]
fn governance_state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(NullClock::new(1_000));
    let ledger = Arc::new(NullLedger::new());
    let registry = Arc::new(NullRegistry::new());
    let subject = addr(7);
    let applicant = Identity::new(addr(1));
    let voter = Identity::new(addr(2));
    ledger.fund(&applicant.address, Amount::new(5));
    ledger.fund(&voter.address, Amount::new(500));

    {
        let env = open(dir.path());
        let engine = CurationEngine::new(
            Arc::new(env.governance_store()),
            ledger.clone(),
            registry.clone(),
            clock.clone(),
            params(),
        )
        .unwrap();
        engine
            .submit_application(
                &applicant,
                NewApplication {
                    subject: subject.clone(),
                    subject_kind: SubjectKind::Factory,
                    title: "stable-factory".into(),
                    display_title: "Stable Factory".into(),
                    metadata_uri: "ipfs://stable-factory".into(),
                    features: BTreeSet::new(),
                    fee: Amount::new(5),
                    message: "first".into(),
                },
            )
            .unwrap();
        engine
            .vote(&subject, &voter, true, Amount::new(150), "yes")
            .unwrap();
        engine.enter_lame_duck(&Identity::admin(addr(3))).unwrap();
    }

    clock.advance(60);
    let env = open(dir.path());
    let engine = CurationEngine::new(
        Arc::new(env.governance_store()),
        ledger.clone(),
        registry.clone(),
        clock.clone(),
        params(),
    )
    .unwrap();

    assert!(engine.lame_duck_status().is_some());
    assert_eq!(engine.message_count().unwrap(), 2);
    let outcome = engine.finalize_round(&subject).unwrap();
    assert_eq!(outcome.status, ApplicationStatus::Approved);
    assert_eq!(outcome.approval_stake, Amount::new(150));
    assert_eq!(
        engine.settle(&subject, 0, &voter.address).unwrap(),
        Amount::new(150)
    );

    clock.advance(30);
    let app = engine.get_application(&subject).unwrap();
    assert_eq!(app.status, ApplicationStatus::Registered);
    assert!(app.registry_synced);
    assert!(registry.is_registered(&subject));
}
