//! Per-step metrics for the time-stepping loop.
//!
//! [`StepMetrics`] captures timing and load data for one step on one rank.

/// Timing and load metrics collected during a single step.
///
/// All durations are in microseconds. The solver overwrites these after
/// every step; [`Solve::last_metrics`](crate::Solve::last_metrics) returns
/// the most recent values.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StepMetrics {
    /// One-based label of the step.
    pub step: u64,
    /// Wall-clock time for the whole step.
    pub total_us: u64,
    /// Time spent in the integrator.
    pub integrate_us: u64,
    /// Time spent computing the balanced partition (includes the collective).
    pub rebalance_us: u64,
    /// Time spent building the next mesh generation.
    pub remesh_us: u64,
    /// Time spent migrating particles (includes both collectives).
    pub migrate_us: u64,
    /// Time spent writing snapshots; zero on steps without output.
    pub output_us: u64,
    /// Particles owned by this rank after migration.
    pub local_particles: usize,
    /// Particles this rank sent during migration.
    pub sent: usize,
    /// Particles this rank received during migration.
    pub received: usize,
    /// Max work over mean work reported by the load balancer.
    pub imbalance: f64,
    /// Kinetic energy of the local particles after the step.
    pub kinetic_energy: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_metrics_are_zero() {
        let m = StepMetrics::default();
        assert_eq!(m.step, 0);
        assert_eq!(m.total_us, 0);
        assert_eq!(m.integrate_us, 0);
        assert_eq!(m.rebalance_us, 0);
        assert_eq!(m.remesh_us, 0);
        assert_eq!(m.migrate_us, 0);
        assert_eq!(m.output_us, 0);
        assert_eq!(m.local_particles, 0);
        assert_eq!(m.sent, 0);
        assert_eq!(m.received, 0);
        assert_eq!(m.imbalance, 0.0);
        assert_eq!(m.kinetic_energy, 0.0);
    }

    #[test]
    fn metrics_fields_accessible() {
        let m = StepMetrics {
            step: 3,
            total_us: 100,
            integrate_us: 40,
            rebalance_us: 20,
            remesh_us: 5,
            migrate_us: 30,
            output_us: 0,
            local_particles: 512,
            sent: 4,
            received: 2,
            imbalance: 1.25,
            kinetic_energy: 0.5,
        };
        assert_eq!(m.step, 3);
        assert_eq!(m.integrate_us + m.rebalance_us + m.remesh_us + m.migrate_us, 95);
        assert_eq!(m.imbalance, 1.25);
    }
}
