//! Integration tests: multi-rank runs on in-process SPMD groups.
//!
//! Checks the invariants that only show up with more than one rank:
//! partition coverage after rebalancing, particle conservation and id
//! uniqueness across migration, halo sufficiency, and that a failing rank
//! brings its peers down with an error instead of a hang.

use std::collections::HashSet;
use std::sync::Arc;

use mpm_comm::{run_spmd, Communicator};
use mpm_core::{GlobalDomain, HostThreads, Particle, Serial};
use mpm_mesh::{DimBlockPartitioner, ManualPartitioner, Mesh};
use mpm_particles::{FillDomain, MaterialProperties, ProblemManager};
use mpm_solver::{create_solver, IntegrationError, Solve, Solver, SolverError, HALO_MIN};
use mpm_test_utils::fixtures::{box_config, scatter_particles, PoisonIntegrator};
use mpm_test_utils::{RecordingParticleWriter, SharedBuffer};
use proptest::prelude::*;

/// Per-rank outcome of a run, gathered after `run_spmd` returns.
#[derive(Debug)]
struct RankOutcome {
    initial_ids: Vec<u64>,
    final_ids: Vec<u64>,
    global_before: u64,
    global_after: u64,
    cuts: [Vec<usize>; 3],
    block_cells: usize,
    min_block_width: [usize; 3],
    ranks_per_dim: [usize; 3],
    inside_halo: bool,
}

fn drifting(_: [f64; 3], _: f64, p: &mut Particle) -> bool {
    p.velocity = [1.0, 0.0, 0.0];
    true
}

fn periodic_drift_run(comm: Arc<dyn Communicator>, backend: &str) -> RankOutcome {
    let mut config = box_config(comm, [16, 16, 16], 1.0 / 16.0, 0.1);
    config.periodic = [true, false, false];
    config.gravity = 0.0;
    let mut solver = create_solver(backend, config, &drifting).unwrap();

    let initial_ids = solver.problem_manager().particles().iter().map(|p| p.id).collect();
    let global_before = solver.problem_manager().global_num_particle();
    solver.solve(0.5, 2).unwrap();

    let mesh = solver.mesh();
    let pm = solver.problem_manager();
    let partition = mesh.partition();
    RankOutcome {
        initial_ids,
        final_ids: pm.particles().iter().map(|p| p.id).collect(),
        global_before,
        global_after: pm.global_num_particle(),
        cuts: [0, 1, 2].map(|a| partition.cuts(a).to_vec()),
        block_cells: partition.block_cell_count(mesh.rank()),
        min_block_width: partition.min_block_width(),
        ranks_per_dim: partition.ranks_per_dim(),
        inside_halo: pm
            .particles()
            .iter()
            .all(|p| mesh.contains_with_halo(p.position, HALO_MIN)),
    }
}

fn check_outcomes(outcomes: &[RankOutcome], total_cells: usize) {
    let global = outcomes[0].global_before;
    assert!(global > 0);

    // Conservation: every rank agrees, and the local counts add up.
    for o in outcomes {
        assert_eq!(o.global_before, global);
        assert_eq!(o.global_after, global);
        assert!(o.inside_halo);
    }
    let local_total: usize = outcomes.iter().map(|o| o.final_ids.len()).sum();
    assert_eq!(local_total as u64, global);

    // No particle duplicated or lost, and ids are exactly those seeded.
    let initial: HashSet<u64> = outcomes.iter().flat_map(|o| o.initial_ids.clone()).collect();
    let finals: HashSet<u64> = outcomes.iter().flat_map(|o| o.final_ids.clone()).collect();
    assert_eq!(initial.len() as u64, global);
    assert_eq!(finals, initial);

    // Coverage: one partition everywhere, and its blocks tile the grid.
    for o in outcomes {
        assert_eq!(o.cuts, outcomes[0].cuts);
    }
    let covered: usize = outcomes.iter().map(|o| o.block_cells).sum();
    assert_eq!(covered, total_cells);

    // Halo sufficiency on every split axis.
    for o in outcomes {
        for axis in 0..3 {
            if o.ranks_per_dim[axis] > 1 {
                assert!(o.min_block_width[axis] >= HALO_MIN, "axis {axis}: {o:?}");
            }
        }
    }
}

#[test]
fn drifting_particles_are_conserved_across_four_ranks() {
    let outcomes = run_spmd(4, |comm| periodic_drift_run(comm, "serial"));
    check_outcomes(&outcomes, 16 * 16 * 16);
    assert_eq!(outcomes[0].ranks_per_dim.iter().product::<usize>(), 4);

    // Half a domain of drift along x moves particles off rank 0.
    let kept: HashSet<u64> = outcomes[0].final_ids.iter().copied().collect();
    assert!(outcomes[0].initial_ids.iter().any(|id| !kept.contains(id)));
}

#[test]
fn host_threads_backend_matches_serial_invariants() {
    let outcomes = run_spmd(2, |comm| periodic_drift_run(comm, "openmp"));
    check_outcomes(&outcomes, 16 * 16 * 16);
}

#[test]
fn seeded_ids_are_unique_across_ranks() {
    let ids = run_spmd(3, |comm| {
        let config = box_config(comm, [12, 12, 12], 1.0 / 12.0, 0.01);
        let solver = Solver::<Serial>::new(config, &FillDomain).unwrap();
        solver
            .problem_manager()
            .particles()
            .iter()
            .map(|p| p.id)
            .collect::<Vec<_>>()
    });
    let all: Vec<u64> = ids.concat();
    let unique: HashSet<u64> = all.iter().copied().collect();
    assert_eq!(all.len(), 12 * 12 * 12);
    assert_eq!(unique.len(), all.len());
    assert_eq!(*all.iter().max().unwrap(), all.len() as u64 - 1);
}

#[test]
fn imbalanced_load_moves_the_cut_toward_the_heavy_rank() {
    // Only the lower x half is seeded, so rank 0 starts with all the work.
    let lower_half = |x: [f64; 3], _: f64, _: &mut Particle| x[0] < 0.5;
    let outcomes = run_spmd(2, |comm| {
        let mut config = box_config(comm, [16, 16, 16], 1.0 / 16.0, 0.01);
        config.partitioner = Arc::new(ManualPartitioner::new([2, 1, 1]));
        config.gravity = 0.0;
        let mut solver = Solver::<HostThreads>::new(config, &lower_half).unwrap();
        let before = solver.mesh().partition().cuts(0).to_vec();
        solver.solve(0.01, 1).unwrap();
        let after = solver.mesh().partition().cuts(0).to_vec();
        (before, after, solver.load_balancer().imbalance())
    });
    let (before, after, imbalance) = &outcomes[0];
    assert_eq!(before, &vec![0, 8, 16]);
    assert!(after[1] < 8, "cut did not move: {after:?}");
    assert!(after[1] >= HALO_MIN);
    assert_eq!(*imbalance, 2.0);
    assert_eq!(outcomes[1].1, *after);
}

#[test]
fn only_rank_zero_prints_progress() {
    let consoles = run_spmd(3, |comm| {
        let console = SharedBuffer::new();
        let mut config = box_config(comm, [12, 12, 12], 1.0 / 12.0, 0.0625);
        config.gravity = 0.0;
        config.progress = Box::new(console.clone());
        let mut solver = create_solver("serial", config, &FillDomain).unwrap();
        solver.solve(0.25, 2).unwrap();
        console.contents()
    });
    assert_eq!(consoles[0], "Step 1 / 4\nStep 3 / 4\n");
    assert!(consoles[1].is_empty());
    assert!(consoles[2].is_empty());
}

// ── Failure propagation ─────────────────────────────────────────────

#[test]
fn failing_rank_aborts_its_peers() {
    let results = run_spmd(2, |comm| {
        let rank = comm.rank();
        let config = box_config(comm, [8, 8, 8], 0.125, 0.01);
        let solver = Solver::<Serial>::new(config, &FillDomain).unwrap();
        let mut solver = if rank == 0 {
            solver.with_integrator(Box::new(PoisonIntegrator::new(1)))
        } else {
            solver
        };
        solver.solve(0.1, 100)
    });
    match &results[0] {
        Err(SolverError::Integration(IntegrationError::NonFinite { count: 1, .. })) => {}
        other => panic!("expected NonFinite on rank 0, got {other:?}"),
    }
    // Rank 1 was waiting in the rebalance collective when rank 0 left.
    match &results[1] {
        Err(SolverError::Balance(_)) => {}
        other => panic!("expected a collective failure on rank 1, got {other:?}"),
    }
}

#[test]
fn poisoned_first_step_stops_before_any_in_loop_snapshot() {
    let writer = RecordingParticleWriter::new();
    let log = writer.log();
    let mut config = box_config(Arc::new(mpm_comm::SelfComm), [8, 8, 8], 0.125, 0.01);
    config.particle_writer = Box::new(writer);
    let mut solver = Solver::<Serial>::new(config, &FillDomain)
        .unwrap()
        .with_integrator(Box::new(PoisonIntegrator::new(0)));
    assert!(solver.solve(0.1, 1).is_err());
    let labels: Vec<u64> = log.records().iter().map(|r| r.step).collect();
    assert_eq!(labels, vec![0]);
}

// ── Direct migration ────────────────────────────────────────────────

/// Per rank: whether migration ran, the local particles afterwards, and
/// whether each one is where it may legally stay.
fn migrate_scattered(seed: u64, per_rank: usize) -> Vec<(bool, Vec<Particle>, bool)> {
    run_spmd(3, |comm| {
        let rank = comm.rank();
        let domain = Arc::new(
            GlobalDomain::new([0.0, 0.0, 0.0, 1.0, 1.0, 1.0], [12, 12, 12], [false; 3]).unwrap(),
        );
        let mesh = Mesh::new(domain, &DimBlockPartitioner, 0, HALO_MIN, &*comm).unwrap();
        let particles = scatter_particles(
            seed + rank as u64,
            per_rank,
            (rank * per_rank) as u64,
            [0.0, 0.0, 0.0, 1.0, 1.0, 1.0],
        );
        let mut pm =
            ProblemManager::from_particles(&mesh, particles, MaterialProperties::default(), comm)
                .unwrap();
        let report = pm.communicate_particles(&mesh, HALO_MIN).unwrap();
        // After a migration every particle sits on its owner; otherwise
        // every particle was already within the halo.
        let placed = pm.particles().iter().all(|p| {
            if report.migrated {
                mesh.owner_of(p.position) == rank
            } else {
                mesh.contains_with_halo(p.position, HALO_MIN)
            }
        });
        (report.migrated, pm.particles().to_vec(), placed)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn scattered_particles_land_on_their_owner(seed in any::<u64>(), per_rank in 1usize..200) {
        let seed = seed >> 2;
        let results = migrate_scattered(seed, per_rank);
        let total: usize = results.iter().map(|(_, p, _)| p.len()).sum();
        prop_assert_eq!(total, 3 * per_rank);
        let ids: HashSet<u64> = results.iter().flat_map(|(_, p, _)| p.iter().map(|q| q.id)).collect();
        prop_assert_eq!(ids.len(), 3 * per_rank);
        // The decision to migrate is collective.
        prop_assert!(results.iter().all(|(m, _, _)| *m == results[0].0));
        for (_, _, placed) in &results {
            prop_assert!(*placed);
        }
    }
}
