use std::sync::Arc;

use dssim_engine::{
    simulate, Algorithm, Completion, Count, CsvSink, EngineError, Name, Order, Profile, Reaction, ReactionNetwork,
    Settings, Term, Trajectory,
};

const RUNGE_KUTTA: [Algorithm; 6] = [
    Algorithm::RungeKutta(Order::Three, Profile::Low),
    Algorithm::RungeKutta(Order::Three, Profile::Mid),
    Algorithm::RungeKutta(Order::Three, Profile::High),
    Algorithm::RungeKutta(Order::Five, Profile::Low),
    Algorithm::RungeKutta(Order::Five, Profile::Mid),
    Algorithm::RungeKutta(Order::Five, Profile::High),
];

fn decay(initial: u64) -> Arc<ReactionNetwork> {
    decay_at_rate(initial, 1.0)
}

fn decay_at_rate(initial: u64, rate: f64) -> Arc<ReactionNetwork> {
    Arc::new(
        ReactionNetwork::new(
            vec![(Name::from("A"), Count(initial)), (Name::from("B"), Count(0))],
            vec![Reaction::mass_action(vec![Term::of("A", 1)], vec![Term::of("B", 1)], rate)],
        )
        .unwrap(),
    )
}

fn isomerisation(each: u64) -> Arc<ReactionNetwork> {
    Arc::new(
        ReactionNetwork::new(
            vec![(Name::from("A"), Count(each)), (Name::from("B"), Count(each))],
            vec![
                Reaction::mass_action(vec![Term::of("A", 1)], vec![Term::of("B", 1)], 1.0),
                Reaction::mass_action(vec![Term::of("B", 1)], vec![Term::of("A", 1)], 1.0),
            ],
        )
        .unwrap(),
    )
}

fn run(network: Arc<ReactionNetwork>, algorithm: Algorithm, total_time: f64, step: f64, seed: u64) -> Trajectory {
    let mut trajectory = Trajectory::new();
    let completion = simulate(network, Settings::new(algorithm, total_time, step), Some(seed), &mut trajectory).unwrap();
    // the direct method may run out of reactant before the end
    assert!(
        matches!(completion, Completion::Finished { .. } | Completion::Absorbed { .. }),
        "{}: {:?}",
        algorithm,
        completion
    );
    trajectory
}

fn final_mean(algorithm: Algorithm, runs: u64) -> f64 {
    let sum: f64 = (0..runs)
        .map(|seed| run(decay(1000), algorithm, 1.0, 0.01, seed).last().unwrap().quantities[0])
        .sum();
    sum / runs as f64
}

#[test]
fn decay_is_monotone_for_every_algorithm() {
    let mut algorithms = vec![Algorithm::Direct, Algorithm::TauLeap, Algorithm::Heun];
    algorithms.extend(RUNGE_KUTTA);

    for algorithm in algorithms {
        let trajectory = run(decay(100), algorithm, 5.0, 0.01, 31);
        let a = trajectory.column("A").unwrap();
        let b = trajectory.column("B").unwrap();
        assert!(a.windows(2).all(|pair| pair[1] <= pair[0] + 1e-9), "{} A increased", algorithm);
        assert!(b.windows(2).all(|pair| pair[1] >= pair[0] - 1e-9), "{} B decreased", algorithm);
    }
}

#[test]
fn leaping_conserves_molecules() {
    let trajectory = run(decay(100), Algorithm::TauLeap, 5.0, 0.01, 8);
    for snapshot in trajectory.snapshots() {
        assert_eq!(snapshot.quantities[0] + snapshot.quantities[1], 100.0);
        assert_eq!(snapshot.quantities[0].fract(), 0.0);
    }

    let trajectory = run(decay(100), Algorithm::Heun, 5.0, 0.01, 8);
    for snapshot in trajectory.snapshots() {
        assert!((snapshot.quantities[0] + snapshot.quantities[1] - 100.0).abs() < 1e-9);
    }
}

#[test]
fn runge_kutta_conserves_away_from_zero() {
    for algorithm in RUNGE_KUTTA {
        let trajectory = run(isomerisation(500), algorithm, 1.0, 0.01, 21);
        for snapshot in trajectory.snapshots() {
            assert!(
                (snapshot.quantities[0] + snapshot.quantities[1] - 1000.0).abs() < 1e-6,
                "{} at t = {}",
                algorithm,
                snapshot.time
            );
        }
    }
}

#[test]
fn stepped_methods_report_every_step() {
    for algorithm in [Algorithm::TauLeap, Algorithm::Heun, RUNGE_KUTTA[4]] {
        let trajectory = run(decay(10), algorithm, 1.0, 0.3, 2);
        let times = trajectory.times();
        // ceil(1.0 / 0.3) = 4 steps, the last one overshoots
        assert_eq!(times.len(), 5);
        assert_eq!(times[0], 0.0);
        assert!((times[4] - 1.2).abs() < 1e-12);
    }
}

#[test]
fn stochastic_means_follow_the_mean_field() {
    let heun = run(decay(1000), Algorithm::Heun, 1.0, 0.001, 0).last().unwrap().quantities[0];
    // the mean-field value is 1000 / e, truncated counts make the rate slightly smaller
    assert!((heun - 1000.0 * (-1.0f64).exp()).abs() < 1.5, "heun {}", heun);

    // leaping with a fixed step decays as (1 - tau)^n, about 2 below the mean field here
    let tau_leap = final_mean(Algorithm::TauLeap, 300);
    assert!((tau_leap - heun).abs() < 7.0, "tau-leap {} vs heun {}", tau_leap, heun);

    for algorithm in RUNGE_KUTTA {
        let runge_kutta = final_mean(algorithm, 300);
        assert!((runge_kutta - heun).abs() < 7.0, "{} {} vs heun {}", algorithm, runge_kutta, heun);
    }
}

fn lowest_a(algorithm: Algorithm, seeds: u64) -> f64 {
    (0..seeds)
        .flat_map(|seed| run(decay_at_rate(5, 10.0), algorithm, 5.0, 1.0, seed).column("A").unwrap())
        .fold(f64::INFINITY, f64::min)
}

#[test]
fn tau_leap_overshoots_below_zero() {
    // a mean of 50 firings against 5 molecules in the first step
    let lowest = lowest_a(Algorithm::TauLeap, 50);
    assert!(lowest < 0.0, "lowest A {}", lowest);
}

#[test]
fn runge_kutta_clamps_at_zero() {
    for algorithm in RUNGE_KUTTA {
        let lowest = lowest_a(algorithm, 50);
        assert!(lowest >= 0.0, "{} lowest A {}", algorithm, lowest);
    }
}

#[test]
fn heun_ignores_the_seed() {
    let first = run(decay(40), Algorithm::Heun, 2.0, 0.05, 1);
    let second = run(decay(40), Algorithm::Heun, 2.0, 0.05, 2);
    assert_eq!(first, second);
}

#[test]
fn non_positive_steps_are_rejected() {
    let mut algorithms = vec![Algorithm::TauLeap, Algorithm::Heun];
    algorithms.extend(RUNGE_KUTTA);

    for algorithm in algorithms {
        for step in [0.0, -0.5] {
            let mut trajectory = Trajectory::new();
            let result = simulate(decay(10), Settings::new(algorithm, 1.0, step), Some(1), &mut trajectory);
            assert!(matches!(result, Err(EngineError::NonPositiveStep { .. })), "{} {}", algorithm, step);
            assert!(trajectory.is_empty());
        }
    }
}

#[test]
fn trajectory_streams_to_text() {
    let mut sink = CsvSink::new(Vec::new());
    simulate(decay(100), Settings::new(Algorithm::TauLeap, 1.0, 0.25), Some(6), &mut sink).unwrap();
    let text = String::from_utf8(sink.into_inner().unwrap()).unwrap();

    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 6);
    assert_eq!(lines[0], "#time A B");
    assert_eq!(lines[1], "0 100 0");
    assert!(lines[5].starts_with("1 "));
}
