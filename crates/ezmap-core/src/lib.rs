//! Strategies, serialization bridge, task registry, and the `Mapper`
//! facade — the orchestration layer around `ezmap-partition` and
//! `ezmap-transport` (spec §2, component table).

pub mod bridge;
pub mod bundle;
pub mod config;
pub mod error;
pub mod mapper;
pub mod registry;

mod strategies {
    pub mod pool;
    pub mod scatter;
}

pub use bundle::{Bundle, ResultVec, WorkerOutcome};
pub use config::{LauncherKind, MapperConfig, MpichEsub, Overrides, RunMode, SchedulerKind, Strategy};
pub use error::{EzmapError, Result};
pub use mapper::{Mapper, ProcessLauncher};
pub use registry::{FuncDescriptor, Task, TaskRegistry};

use ezmap_transport::Transport;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Run a `map` in-process across `transport`, selecting the pool or
/// scatter strategy. This is what the helper binaries call on every rank
/// once they've resolved `func` against the task registry and deserialized
/// the argument bundle — and what `RunMode::DebugDryRun` runs directly
/// against a `LocalTransport` cohort without spawning a helper process.
pub fn dispatch<Tp, A, R, F>(
    transport: &Tp,
    bundle: &Bundle<A>,
    func: F,
    strategy: Strategy,
    onall: bool,
) -> Result<Vec<R>>
where
    Tp: Transport,
    A: Serialize + DeserializeOwned + Clone + Send,
    R: Serialize + DeserializeOwned + Send + Clone,
    F: Fn(&[A]) -> R + Sync + Send + Clone,
{
    bundle.validate()?;
    match strategy {
        Strategy::Pool => strategies::pool::run(transport, bundle, func, onall),
        Strategy::Scatter => strategies::scatter::run(transport, bundle, func, onall),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ezmap_transport::LocalTransport;
    use std::thread;

    fn squared(args: &[i64]) -> i64 {
        args[0] * args[0]
    }

    fn add3(args: &[i64]) -> i64 {
        args[0] + args[1]
    }

    fn run_cohort<F>(size: usize, strategy: Strategy, onall: bool, bundle: Bundle<i64>, func: F) -> Vec<Vec<i64>>
    where
        F: Fn(&[i64]) -> i64 + Sync + Send + Clone + 'static,
    {
        let world = LocalTransport::world(size);
        let handles: Vec<_> = world
            .into_iter()
            .map(|t| {
                let bundle = bundle.clone();
                let func = func.clone();
                thread::spawn(move || dispatch(&t, &bundle, func, strategy, onall).unwrap())
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    }

    #[test]
    fn scenario_a_pool_squared_on_four_ranks() {
        let bundle = Bundle::from1((0..10).collect());
        let results = run_cohort(4, Strategy::Pool, true, bundle, squared);
        assert_eq!(results[0], vec![0, 1, 4, 9, 16, 25, 36, 49, 64, 81]);
    }

    #[test]
    fn scenario_b_scatter_squared_on_four_ranks_matches_pool() {
        let bundle = Bundle::from1((0..10).collect());
        let pool = run_cohort(4, Strategy::Pool, true, bundle.clone(), squared);
        let scatter = run_cohort(4, Strategy::Scatter, true, bundle, squared);
        assert_eq!(pool[0], scatter[0]);
        assert_eq!(scatter[0], vec![0, 1, 4, 9, 16, 25, 36, 49, 64, 81]);
    }

    #[test]
    fn scenario_c_scatter_rank_identity_on_four_ranks() {
        // Each rank's function ignores its argument and reports its own
        // rank; with N=P=4 under scatter, rank i owns item i exactly, so
        // the gathered vector is the rank list in order regardless of
        // which item value was sent.
        let bundle = Bundle::from1(vec![0i64, 0, 0, 0]);
        let world = LocalTransport::world(4);
        let handles: Vec<_> = world
            .into_iter()
            .map(|t| {
                let bundle = bundle.clone();
                thread::spawn(move || {
                    let rank = t.rank() as i64;
                    dispatch(&t, &bundle, move |_: &[i64]| rank, Strategy::Scatter, true).unwrap()
                })
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(results[0], vec![0, 1, 2, 3]);
    }

    #[test]
    fn scenario_d_add3_with_three_columns() {
        let xs = vec![-5, -3, -1, 1, 3];
        let ys = vec![0, 1, 2, 3, 4];
        let ds = vec![0, 0, 0, 0, 0];
        let bundle = Bundle::from3(xs, ys, ds);
        let results = run_cohort(3, Strategy::Pool, true, bundle, add3);
        assert_eq!(results[0], vec![-5, -2, 1, 4, 7]);
    }

    #[test]
    fn scenario_e_pool_with_one_rank_and_onall_false_fails() {
        let world = LocalTransport::world(1);
        let bundle = Bundle::from1(vec![1, 2, 3]);
        let t = world.into_iter().next().unwrap();
        let err = dispatch(&t, &bundle, squared, Strategy::Pool, false).unwrap_err();
        assert!(matches!(err, EzmapError::NoWorkersAvailable));
    }

    #[test]
    fn empty_bundle_returns_empty_result() {
        let results = run_cohort(3, Strategy::Pool, true, Bundle::from1(Vec::new()), squared);
        assert_eq!(results[0], Vec::<i64>::new());
    }

    #[test]
    fn pool_handles_more_ranks_than_items() {
        // N=2 < P-1=3: rank 3 is never primed and must still reach barrier.
        let results = run_cohort(4, Strategy::Pool, false, Bundle::from1(vec![2, 3]), squared);
        assert_eq!(results[0], vec![4, 9]);
    }
}
