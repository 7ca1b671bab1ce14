//! Integration tests: the single-rank console and snapshot contract.
//!
//! Runs the full step loop through the backend factory and checks
//! snapshot cadence, time labels, domain-file rewrites, backend errors,
//! and single-rank particle conservation.

use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use mpm_comm::SelfComm;
use mpm_core::{backend_availability, Backend, MeshGeneration, Particle, Serial};
use mpm_particles::FillDomain;
use mpm_solver::{
    create_solver, ConfigError, Solve, Solver, SolverConfig, SolverError, VtkDomainWriter,
    VtkParticleWriter, DOMAIN_ACTUAL, DOMAIN_BALANCER,
};
use mpm_test_utils::fixtures::box_config;
use mpm_test_utils::{RecordingDomainWriter, RecordingParticleWriter, SharedBuffer};

fn unit_cube_config() -> SolverConfig {
    box_config(Arc::new(SelfComm), [8, 8, 8], 0.125, 0.1)
}

// ── Scenario A: snapshot cadence ────────────────────────────────────

#[test]
fn snapshots_at_labels_zero_one_and_six() {
    let particles = RecordingParticleWriter::new();
    let domains = RecordingDomainWriter::new();
    let particle_log = particles.log();
    let domain_log = domains.log();

    let mut config = unit_cube_config();
    config.particle_writer = Box::new(particles);
    config.domain_writer = Box::new(domains);

    let mut solver = create_solver("serial", config, &FillDomain).unwrap();
    solver.solve(1.0, 5).unwrap();
    assert_eq!(solver.last_metrics().step, 10);

    let records = particle_log.records();
    let labels: Vec<u64> = records.iter().map(|r| r.step).collect();
    assert_eq!(labels, vec![0, 1, 6]);
    assert_eq!(records[0].time, 0.0);
    assert_eq!(records[1].time, 0.0);
    assert!((records[2].time - 0.5).abs() < 1e-12, "time {}", records[2].time);

    // The pre-loop snapshot sees the initial mesh; in-loop ones see the
    // mesh rebuilt at that step.
    assert_eq!(records[0].generation, MeshGeneration::INITIAL);
    assert_eq!(records[1].generation, MeshGeneration(1));
    assert_eq!(records[2].generation, MeshGeneration(6));

    // Pre-loop pair plus one pair per written step, always at step 0.
    let domains = domain_log.records();
    assert_eq!(domains.len(), 6);
    assert!(domains.iter().all(|d| d.step == 0 && d.rank == 0));
    for pair in domains.chunks(2) {
        assert_eq!(pair[0].basename, DOMAIN_ACTUAL);
        assert_eq!(pair[1].basename, DOMAIN_BALANCER);
        assert_eq!(pair[0].vertices, [0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
    }
}

#[test]
fn progress_lines_follow_the_write_frequency() {
    let console = SharedBuffer::new();
    let mut config = unit_cube_config();
    config.progress = Box::new(console.clone());
    let mut solver = create_solver("serial", config, &FillDomain).unwrap();
    solver.solve(1.0, 5).unwrap();
    assert_eq!(console.contents(), "Step 1 / 10\nStep 6 / 10\n");
}

#[test]
fn vtk_files_follow_the_snapshot_labels() {
    let dir = std::env::temp_dir().join(format!("mpm-scenario-a-{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);

    let mut config = unit_cube_config();
    config.particle_writer = Box::new(VtkParticleWriter::new(&dir));
    config.domain_writer = Box::new(VtkDomainWriter::new(&dir));
    let mut solver = create_solver("serial", config, &FillDomain).unwrap();
    solver.solve(1.0, 5).unwrap();

    let exists = |name: String| dir.join(name).is_file();
    for label in [0, 1, 6] {
        assert!(exists(VtkParticleWriter::file_name(label, 0)), "label {label}");
    }
    for label in [2, 5, 10, 11] {
        assert!(!exists(VtkParticleWriter::file_name(label, 0)), "label {label}");
    }
    assert!(exists(VtkDomainWriter::file_name(DOMAIN_ACTUAL, 0, 0)));
    assert!(exists(VtkDomainWriter::file_name(DOMAIN_BALANCER, 0, 0)));
    // Single rank: no block index.
    assert!(!dir.join("particles_0.visit").exists());

    let text = fs::read_to_string(dir.join(VtkParticleWriter::file_name(6, 0))).unwrap();
    assert!(text.contains("TIME 1 1 double\n5e-1\n"));
    assert!(text.contains("POINTS 512 double"));
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn every_step_writes_with_frequency_one() {
    let particles = RecordingParticleWriter::new();
    let log = particles.log();
    let mut config = unit_cube_config();
    config.particle_writer = Box::new(particles);
    config.delta_t = 0.125;
    let mut solver = create_solver("serial", config, &FillDomain).unwrap();
    solver.solve(0.375, 1).unwrap();
    let labels: Vec<u64> = log.records().iter().map(|r| r.step).collect();
    assert_eq!(labels, vec![0, 1, 2, 3]);
}

#[test]
fn zero_write_frequency_is_rejected() {
    let mut solver = create_solver("serial", unit_cube_config(), &FillDomain).unwrap();
    match solver.solve(1.0, 0) {
        Err(SolverError::ZeroWriteFrequency) => {}
        other => panic!("expected ZeroWriteFrequency, got {other:?}"),
    }
}

#[test]
fn run_shorter_than_one_step_is_rejected() {
    let particles = RecordingParticleWriter::new();
    let log = particles.log();
    let mut config = unit_cube_config();
    config.particle_writer = Box::new(particles);
    let mut solver = create_solver("serial", config, &FillDomain).unwrap();
    match solver.solve(0.05, 1) {
        Err(SolverError::NoSteps { .. }) => {}
        other => panic!("expected NoSteps, got {other:?}"),
    }
    assert!(log.is_empty());
}

// ── Scenarios B and C: backend selection ────────────────────────────

#[test]
fn unknown_backend_builds_nothing() {
    let calls = AtomicUsize::new(0);
    let init = |_: [f64; 3], _: f64, _: &mut Particle| {
        calls.fetch_add(1, Ordering::Relaxed);
        true
    };
    match create_solver("gpu", unit_cube_config(), &init) {
        Err(SolverError::Config(ConfigError::InvalidBackend { name })) => assert_eq!(name, "gpu"),
        Err(e) => panic!("expected InvalidBackend, got {e}"),
        Ok(s) => panic!("expected InvalidBackend, built a {} solver", s.backend()),
    }
    assert_eq!(calls.load(Ordering::Relaxed), 0);
}

#[test]
fn disabled_backends_report_by_name() {
    for (name, message) in [
        ("cuda", "CUDA Backend Not Enabled"),
        ("hip", "HIP Backend Not Enabled"),
    ] {
        match create_solver(name, unit_cube_config(), &FillDomain) {
            Err(SolverError::Config(e @ ConfigError::BackendNotEnabled { .. })) => {
                assert_eq!(e.to_string(), message);
            }
            Err(e) => panic!("expected BackendNotEnabled for {name}, got {e}"),
            Ok(s) => panic!("expected BackendNotEnabled, built a {} solver", s.backend()),
        }
    }
}

#[test]
fn availability_matches_factory() {
    let availability = backend_availability();
    assert_eq!(
        availability.keys().copied().collect::<Vec<_>>(),
        vec![Backend::Serial, Backend::OpenMp, Backend::Cuda, Backend::Hip]
    );
    for (backend, enabled) in availability {
        let result = create_solver(backend.as_str(), unit_cube_config(), &FillDomain);
        assert_eq!(result.is_ok(), enabled, "{backend}");
        if let Ok(solver) = result {
            assert_eq!(solver.backend(), backend);
        }
    }
}

#[test]
fn invalid_config_is_rejected_before_seeding() {
    let calls = AtomicUsize::new(0);
    let init = |_: [f64; 3], _: f64, _: &mut Particle| {
        calls.fetch_add(1, Ordering::Relaxed);
        true
    };
    let mut config = unit_cube_config();
    config.delta_t = -0.1;
    match create_solver("serial", config, &init) {
        Err(SolverError::Config(ConfigError::InvalidTimeStep { .. })) => {}
        Err(e) => panic!("expected InvalidTimeStep, got {e}"),
        Ok(_) => panic!("expected InvalidTimeStep, built a solver"),
    }
    assert_eq!(calls.load(Ordering::Relaxed), 0);
}

// ── Scenario D: single rank ─────────────────────────────────────────

#[test]
fn single_rank_rebalances_every_step_and_keeps_every_particle() {
    let mut solver = Solver::<Serial>::new(unit_cube_config(), &FillDomain).unwrap();
    let before = solver.problem_manager().global_num_particle();
    assert_eq!(before, 512);
    let cuts_before: Vec<Vec<usize>> = (0..3)
        .map(|a| solver.mesh().partition().cuts(a).to_vec())
        .collect();

    solver.solve(1.0, 100).unwrap();

    // One mesh generation per step: rebalance and rebuild ran every step.
    assert_eq!(solver.mesh().generation(), MeshGeneration(10));
    assert_eq!(solver.problem_manager().mesh_generation(), MeshGeneration(10));
    let cuts_after: Vec<Vec<usize>> = (0..3)
        .map(|a| solver.mesh().partition().cuts(a).to_vec())
        .collect();
    assert_eq!(cuts_before, cuts_after);

    assert_eq!(solver.problem_manager().num_particle(), 512);
    assert_eq!(solver.problem_manager().global_num_particle(), before);
    let metrics = solver.last_metrics();
    assert_eq!(metrics.imbalance, 1.0);
    assert_eq!((metrics.sent, metrics.received), (0, 0));
}

#[test]
fn particles_settle_on_a_no_slip_floor() {
    let mut solver = Solver::<Serial>::new(unit_cube_config(), &FillDomain).unwrap();
    solver.solve(2.0, 100).unwrap();
    for p in solver.problem_manager().particles() {
        assert!(p.position[2] >= 0.0);
        assert!(p.is_finite());
    }
    // After two seconds of free fall from at most 1 m everything is down.
    assert!(solver
        .problem_manager()
        .particles()
        .iter()
        .all(|p| p.position[2] == 0.0 && p.velocity == [0.0; 3]));
}

#[test]
fn single_rank_accepts_a_slab_two_cells_thick() {
    let config = SolverConfig::new(
        Arc::new(SelfComm),
        [0.0, 0.0, 0.0, 1.0, 1.0, 0.25],
        [8, 8, 2],
        0.01,
    );
    let mut solver = Solver::<Serial>::new(config, &FillDomain).unwrap();
    assert_eq!(solver.problem_manager().global_num_particle(), 8 * 8 * 2 * 8);
    solver.solve(0.05, 10).unwrap();
    assert_eq!(solver.problem_manager().num_particle(), 8 * 8 * 2 * 8);
    assert_eq!(solver.mesh().partition().cuts(2), &[0, 2]);
}
