//! Tests for the background worker: snapshot consistency under load and
//! bounded teardown.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tursim::{parse, Direction, Halt, Machine, ProgramManager, TransitionTable};

const WAIT: Duration = Duration::from_secs(10);

/// Writes '1' over a tape of '0's from left to right, then halts at the right edge.
fn sweeper(len: usize) -> Machine {
    let table = TransitionTable::new().rule("0".into(), '0', '1', Direction::Right, "0".into());
    Machine::new(vec!['0'; len], 0, "0".to_string(), table).unwrap()
}

#[test]
fn snapshots_are_never_torn() {
    const LEN: usize = 200_000;
    let machine = sweeper(LEN);
    let done = AtomicBool::new(false);

    thread::scope(|scope| {
        let reader = scope.spawn(|| {
            let mut observed = 0;
            while !done.load(Ordering::Acquire) {
                let snapshot = machine.snapshot();
                let ones = snapshot.tape.iter().filter(|&&c| c == '1').count();

                assert_eq!(ones as u64, snapshot.steps);
                assert!(snapshot.tape[..ones].iter().all(|&c| c == '1'));
                if snapshot.halted() {
                    assert_eq!(snapshot.cursor, LEN - 1);
                    assert_eq!(ones, LEN);
                } else {
                    assert_eq!(snapshot.cursor, ones);
                }
                observed += 1;
            }
            observed
        });

        machine.set_running(true);
        assert!(machine.wait_halted(Some(WAIT)));
        done.store(true, Ordering::Release);

        assert!(reader.join().unwrap() > 0);
    });

    assert_eq!(machine.halt(), Some(Halt::Boundary));
    assert!(machine.tape().iter().all(|&c| c == '1'));
}

#[test]
fn control_from_another_thread() {
    let machine = sweeper(1_000_000);

    thread::scope(|scope| {
        scope.spawn(|| machine.set_running(true));
    });
    assert!(machine.running());

    machine.set_running(false);
    let paused = machine.steps();
    thread::sleep(Duration::from_millis(20));
    assert!(machine.steps() <= paused + 1);

    machine.set_running(true);
    assert!(machine.wait_halted(Some(WAIT)));
    assert_eq!(machine.steps(), 1_000_000);
}

#[test]
fn teardown_is_bounded() {
    let program = ProgramManager::get_program_by_name("Ping pong").unwrap();

    let machines: Vec<Machine> = (0..16)
        .map(|i| {
            let machine = program.machine().unwrap();
            machine.set_running(i % 2 == 0);
            machine
        })
        .collect();
    thread::sleep(Duration::from_millis(10));

    let start = Instant::now();
    drop(machines);
    assert!(start.elapsed() < WAIT);
}

#[test]
fn machines_are_independent() {
    let program = parse("011 2 0 1 0 L 0 0 0 1 L 1").unwrap();
    let running = program.machine().unwrap();
    let idle = program.machine().unwrap();

    running.set_running(true);
    assert!(running.wait_halted(Some(WAIT)));

    let snapshot = running.snapshot();
    assert_eq!(snapshot.tape_string(), "100");
    assert_eq!(snapshot.state, "1");

    assert_eq!(idle.tape(), vec!['0', '1', '1']);
    assert_eq!(idle.steps(), 0);
    assert!(!idle.halted());
}
