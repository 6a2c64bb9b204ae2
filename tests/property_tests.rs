//! Property-based tests for the step algorithm.
//!
//! Machines here are stepped synchronously from the test thread, so every
//! property is checked against a deterministic sequence of steps.

use proptest::prelude::*;
use tursim::{Direction, Halt, Machine, Step, Transition, TransitionTable};

const SYMBOLS: [char; 3] = ['a', 'b', '_'];

fn arbitrary_direction() -> impl Strategy<Value = Direction> {
    prop_oneof![Just(Direction::Left), Just(Direction::Right)]
}

fn arbitrary_symbol() -> impl Strategy<Value = char> {
    prop::sample::select(SYMBOLS.to_vec())
}

prop_compose! {
    fn arbitrary_rule()(
        state in 0u8..4,
        read in arbitrary_symbol(),
        write in arbitrary_symbol(),
        direction in arbitrary_direction(),
        next in 0u8..4,
    ) -> (u8, char, Transition<u8, char>) {
        (state, read, Transition::new(next, write, direction))
    }
}

prop_compose! {
    fn arbitrary_table()(rules in prop::collection::vec(arbitrary_rule(), 0..16))
        -> TransitionTable<u8, char> {
        rules.into_iter().collect()
    }
}

prop_compose! {
    fn arbitrary_start()(tape in prop::collection::vec(arbitrary_symbol(), 1..12))
        (cursor in 0..tape.len(), tape in Just(tape)) -> (Vec<char>, usize) {
        (tape, cursor)
    }
}

proptest! {
    #[test]
    fn cursor_never_leaves_tape(table in arbitrary_table(), (tape, cursor) in arbitrary_start()) {
        let len = tape.len();
        let machine = Machine::new(tape, cursor, 0u8, table).unwrap();

        for _ in 0..64 {
            machine.step();
            let snapshot = machine.snapshot();
            prop_assert!(snapshot.cursor < len);
            prop_assert_eq!(snapshot.tape.len(), len);
        }
    }

    #[test]
    fn halting_is_terminal(table in arbitrary_table(), (tape, cursor) in arbitrary_start()) {
        let machine = Machine::new(tape, cursor, 0u8, table).unwrap();

        let mut halted = None;
        for _ in 0..64 {
            let step = machine.step();
            match halted {
                Some(snapshot) => {
                    prop_assert!(matches!(step, Step::Halt(_)));
                    prop_assert_eq!(&machine.snapshot(), &snapshot);
                    halted = Some(snapshot);
                }
                None if matches!(step, Step::Halt(_)) => {
                    prop_assert!(machine.halted());
                    halted = Some(machine.snapshot());
                }
                None => prop_assert!(!machine.halted()),
            }
        }
    }

    #[test]
    fn missing_rule_halts_without_change(
        (tape, cursor) in arbitrary_start(),
        state in 0u8..4,
    ) {
        let table = TransitionTable::<u8, char>::new();
        let machine = Machine::new(tape.clone(), cursor, state, table).unwrap();

        prop_assert_eq!(machine.step(), Step::Halt(Halt::Undefined));
        prop_assert_eq!(machine.tape(), tape);
        prop_assert_eq!(machine.cursor(), cursor);
        prop_assert_eq!(machine.state(), state);
        prop_assert_eq!(machine.steps(), 0);
    }

    #[test]
    fn edge_moves_halt_in_place(
        tape in prop::collection::vec(arbitrary_symbol(), 1..12),
        write in arbitrary_symbol(),
        left in any::<bool>(),
    ) {
        let (cursor, direction) = if left {
            (0, Direction::Left)
        } else {
            (tape.len() - 1, Direction::Right)
        };
        let read = tape[cursor];
        let table = TransitionTable::new().rule(0u8, read, write, direction, 1u8);
        let machine = Machine::new(tape, cursor, 0u8, table).unwrap();

        prop_assert_eq!(machine.step(), Step::Halt(Halt::Boundary));
        prop_assert_eq!(machine.cursor(), cursor);
        prop_assert_eq!(machine.tape()[cursor], write);
        prop_assert_eq!(machine.state(), 1);
    }
}
