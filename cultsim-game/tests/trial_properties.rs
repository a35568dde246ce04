use cultsim_game::{
    BatchOptions, Ending, Formula, NoAdjust, RemovalKind, Scenario, SimConfig, Trial, run_batch,
    trial_rng,
};

const SAMPLE_SIZE: usize = 300;

#[test]
fn every_trial_terminates_consistently() {
    let options = BatchOptions::seeded(2024).with_max_days(120);
    let records = run_batch(SAMPLE_SIZE, &SimConfig::default(), &NoAdjust, options)
        .expect("default config is valid");
    for record in &records {
        assert!(record.day <= 120);
        assert!(record.stability <= 100.0);
        assert_eq!(record.success, record.attachments == 0);
        match record.ending {
            Ending::Cleared => assert!(record.success),
            Ending::Destabilized => assert!(record.stability <= 40.0),
            Ending::DayCap => assert_eq!(record.day, 120),
        }
    }
}

#[test]
fn fixed_seed_reproduces_single_trial() {
    let run = || {
        Trial::new(SimConfig::default(), trial_rng(24, 0))
            .expect("valid config")
            .run(&NoAdjust, 200)
    };
    let record = run();
    assert_eq!(record, run());

    assert!(!record.success);
    assert_eq!(record.ending, Ending::Destabilized);
    assert_eq!(record.day, 39);
    assert_eq!(record.attachments, 1);
    assert_eq!(record.power, 375);
    assert!((record.stability - 36.64).abs() < 1e-9, "{}", record.stability);
    assert_eq!(record.n_successes, 9);
    assert_eq!(record.n_failures, 4);

    assert_eq!(
        record.log[..8],
        [
            "Day 1",
            "Stability cultivation +0.35 = 88.7",
            "Day 2",
            "Stability cultivation +0.33 = 89.03",
            "Day 3",
            "Stability cultivation +0.33 = 89.36",
            "Brand grew +6, power 348",
            "Removal success [37 vs DC32], attachments 8, power -1 = 347, stability -1 = 88.36",
        ]
    );
    assert_eq!(
        record.log[30..33],
        [
            "Brand grew +2, power 349",
            "Willpower roll failed 1x, power +4 = 353",
            "Removal failure [30 vs DC32], stability -17 = 70.99",
        ]
    );
    assert_eq!(
        record.log[record.log.len() - 2..],
        ["Stability fell below 40", "Attachments left 1, power 375"]
    );
}

#[test]
fn insurance_two_with_failing_rolls() {
    let config = SimConfig {
        removal_attempt: Formula::Constant(-50),
        pill_overflow: Formula::Constant(0),
        failure_insurance: 2,
        ..SimConfig::default()
    };
    let mut trial = Trial::new(config, trial_rng(3, 0)).expect("valid config");
    trial.attempt_removal(RemovalKind::Standard);
    let state = trial.state();
    assert_eq!(state.insured_retries, 2);
    assert_eq!(state.insurance_left, 0);
    assert_eq!(state.removal_failures, 1);

    trial.attempt_removal(RemovalKind::Standard);
    assert_eq!(trial.state().insured_retries, 2);
    assert_eq!(trial.state().removal_failures, 2);
}

#[test]
fn empty_start_clears_before_any_event() {
    let config = SimConfig {
        initial_attachments: 0,
        ..SimConfig::default()
    };
    let records = run_batch(5, &config, &NoAdjust, BatchOptions::seeded(1).with_logs(true))
        .expect("valid config");
    for record in records {
        assert!(record.success);
        assert_eq!(record.day, 1);
        assert_eq!(record.power, 342);
        assert!(!record.log.iter().any(|line| line.starts_with("Stability")));
    }
}

#[test]
fn cutoff_above_start_fails_immediately() {
    let config = SimConfig {
        stability_cutoff: 90.0,
        ..SimConfig::default()
    };
    let records = run_batch(5, &config, &NoAdjust, BatchOptions::seeded(1)).expect("valid config");
    assert!(
        records
            .iter()
            .all(|record| !record.success && record.day == 1)
    );
}

#[test]
fn scenarios_run_to_completion() {
    for scenario in Scenario::ALL {
        let config = scenario.prepared(&SimConfig::default());
        let records = run_batch(20, &config, &scenario, BatchOptions::seeded(11))
            .unwrap_or_else(|err| panic!("{scenario} config invalid: {err}"));
        assert_eq!(records.len(), 20);
        assert!(records.iter().all(|record| record.day <= 200));
    }
}

#[test]
fn better_removal_rolls_raise_success_rate() {
    let options = BatchOptions::seeded(77);
    let base = run_batch(SAMPLE_SIZE, &SimConfig::default(), &NoAdjust, options)
        .expect("valid config");
    let boosted_config = SimConfig {
        removal_attempt: "2d6+34".parse().expect("dice notation"),
        ..SimConfig::default()
    };
    let boosted =
        run_batch(SAMPLE_SIZE, &boosted_config, &NoAdjust, options).expect("valid config");
    let rate = |records: &[cultsim_game::OutcomeRecord]| {
        records.iter().filter(|record| record.success).count()
    };
    assert!(rate(&boosted) >= rate(&base));
}
