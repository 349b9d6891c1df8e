// Copyright 2020-2026 MathxH Chen.
//
// Code is licensed under MIT Apache Dual License

use std::sync::Arc;

use num_bigint::BigInt;
use proptest::prelude::*;
use secgroups_rs::search::rounds;
use secgroups_rs::{
    search, search_any_length, search_public, Runtime, SecretValue, SecureType, Session,
    SessionConfig,
};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn session(seed: u64) -> Arc<Session> {
    init_tracing();
    Session::start(SessionConfig::default().with_seed(seed)).unwrap()
}

fn share_all(rt: &Session, ty: &Arc<SecureType>, values: &[i64]) -> Vec<SecretValue> {
    values
        .iter()
        .map(|&v| rt.input(ty, &BigInt::from(v)).unwrap())
        .collect()
}

#[test]
fn test_length_100_demo() {
    let rt = session(201);
    let ty = SecureType::integer(32).unwrap();
    let mut values: Vec<i64> = (0..100i64)
        .map(|i| if i % 2 == 0 { 1 } else { -1 } * (i + 50) * (i + 50))
        .collect();
    values.sort_unstable();
    let sequence = share_all(&rt, &ty, &values);
    assert_eq!(rounds(sequence.len()), 7);

    let target = rt.input(&ty, &BigInt::from(values[37])).unwrap();
    let found = search_any_length(&*rt, &sequence, &target).unwrap();
    assert_eq!(rt.reveal(&found).unwrap(), BigInt::from(37));

    let target = rt.input(&ty, &BigInt::from(values[0] - 1)).unwrap();
    let found = search_any_length(&*rt, &sequence, &target).unwrap();
    assert_eq!(rt.reveal(&found).unwrap(), BigInt::from(-1));
}

#[test]
fn test_every_position_of_a_power_of_two_sequence() {
    let rt = session(202);
    let ty = SecureType::integer(24).unwrap();
    let values: Vec<i64> = (0..16).map(|i| 3 * i - 20).collect();
    let sequence = share_all(&rt, &ty, &values);
    for (i, &v) in values.iter().enumerate() {
        let found = search_public(&*rt, &sequence, &BigInt::from(v)).unwrap();
        assert_eq!(rt.reveal(&found).unwrap(), BigInt::from(i));
        let found = search_public(&*rt, &sequence, &BigInt::from(v + 1)).unwrap();
        assert_eq!(rt.reveal(&found).unwrap(), BigInt::from(-1));
    }
}

#[test]
fn test_duplicates_return_a_matching_index() {
    let rt = session(203);
    let ty = SecureType::integer(16).unwrap();
    let values = [1, 4, 4, 4, 4, 9, 12, 12];
    let sequence = share_all(&rt, &ty, &values);
    for &v in &[4i64, 12] {
        let found = search_public(&*rt, &sequence, &BigInt::from(v)).unwrap();
        let index = rt.reveal(&found).unwrap();
        let index: usize = index.to_string().parse().unwrap();
        assert_eq!(values[index], v);
    }
}

#[test]
fn test_shape_is_independent_of_target() {
    let run = |target: i64| {
        let rt = Session::start(SessionConfig::default().with_seed(9)).unwrap();
        let ty = SecureType::integer(16).unwrap();
        let sequence = share_all(&rt, &ty, &[2, 3, 5, 7, 11, 13, 17, 19]);
        let t = rt.input(&ty, &BigInt::from(target)).unwrap();
        search(&*rt, &sequence, &t).unwrap();
        (rt.stats(), rt.transcript_digest())
    };
    let reference = run(2);
    for &t in &[19, 8, -4, 100, 11] {
        assert_eq!(run(t), reference, "target {}", t);
    }
}

#[test]
fn test_shutdown_session_refuses_search() {
    let rt = session(204);
    let ty = SecureType::integer(16).unwrap();
    let sequence = share_all(&rt, &ty, &[1, 2, 3, 4]);
    rt.shutdown();
    let err = search_public(&*rt, &sequence, &BigInt::from(3)).unwrap_err();
    assert!(err.is_abort());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    #[test]
    fn prop_search_finds_members(
        set in prop::collection::btree_set(-500i64..500, 1..20),
        needle in -510i64..510,
        pick in any::<prop::sample::Index>(),
    ) {
        let rt = Session::start(SessionConfig::default().with_seed(17)).unwrap();
        let ty = SecureType::integer(16).unwrap();
        let values: Vec<i64> = set.into_iter().collect();
        let sequence = share_all(&rt, &ty, &values);

        let member = values[pick.index(values.len())];
        let found = search_any_length(&*rt, &sequence, &rt.input(&ty, &BigInt::from(member)).unwrap()).unwrap();
        let expected = values.iter().position(|&v| v == member).unwrap();
        prop_assert_eq!(rt.reveal(&found).unwrap(), BigInt::from(expected));

        let found = search_any_length(&*rt, &sequence, &rt.input(&ty, &BigInt::from(needle)).unwrap()).unwrap();
        let expected = values
            .iter()
            .position(|&v| v == needle)
            .map(|i| i as i64)
            .unwrap_or(-1);
        prop_assert_eq!(rt.reveal(&found).unwrap(), BigInt::from(expected));
    }
}
