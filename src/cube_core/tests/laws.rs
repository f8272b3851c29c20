//! Algebraic laws every twist must satisfy, checked on random sequences.

use cube_core::{Action, Cube, TwistEngine, Validation, decode, encode};
use proptest::prelude::*;

fn engine_and_actions(max_len: usize) -> impl Strategy<Value = (usize, Vec<(u8, u8, u8)>)> {
    (2_usize..=6).prop_flat_map(move |n| {
        let deepest = ((n - 1) / 2) as u8;
        (
            Just(n),
            prop::collection::vec((0_u8..6, 0_u8..2, 0..=deepest), 0..max_len),
        )
    })
}

fn build(n: usize, raw: &[(u8, u8, u8)]) -> (TwistEngine, Vec<Action>) {
    let engine = TwistEngine::new(n).unwrap();
    let actions = raw
        .iter()
        .map(|&(face, direction, slice)| Action::from_raw(face, direction, slice, n).unwrap())
        .collect();

    (engine, actions)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn reachable_cubes_conserve_facelets((n, raw) in engine_and_actions(40)) {
        let (engine, actions) = build(n, &raw);
        let cube = engine.apply_all(&Cube::solved(n).unwrap(), actions).unwrap();

        prop_assert_eq!(cube.identity_counts(), [n * n; 6]);
        prop_assert!(cube.check_conservation().is_ok());
    }

    #[test]
    fn reversed_inverse_sequence_returns_home((n, raw) in engine_and_actions(40)) {
        let (engine, actions) = build(n, &raw);
        let solved = Cube::solved(n).unwrap();

        let there = engine.apply_all(&solved, actions.iter().copied()).unwrap();
        let back = engine
            .apply_all(&there, actions.iter().rev().map(|action| action.inverse()))
            .unwrap();

        prop_assert_eq!(back, solved);
    }

    #[test]
    fn in_place_matches_copy((n, raw) in engine_and_actions(20)) {
        let (engine, actions) = build(n, &raw);
        let mut in_place = Cube::solved(n).unwrap();
        let mut copied = in_place.clone();

        for action in actions {
            engine.apply_in_place(&mut in_place, action).unwrap();
            copied = engine.apply(&copied, action).unwrap();
        }

        prop_assert_eq!(in_place, copied);
    }

    #[test]
    fn external_state_round_trips((n, raw) in engine_and_actions(30)) {
        let (engine, actions) = build(n, &raw);
        let cube = engine.apply_all(&Cube::solved(n).unwrap(), actions).unwrap();

        let observed = Cube::from_observation(n, &cube.observation(), Validation::Strict).unwrap();
        prop_assert_eq!(&observed, &cube);
        prop_assert_eq!(decode(n, &encode(&cube)).unwrap(), cube);
    }
}
