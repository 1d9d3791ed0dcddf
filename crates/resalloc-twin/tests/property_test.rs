//! Property Tests - Generated Well-Formed Workloads
//!
//! Workloads are generated with honest claims (every claim fits its
//! resource total, every request fits the remaining claim) and every task
//! releases what it holds before terminating.

use proptest::prelude::*;
use resalloc_twin::domain::*;

/// One generated step: (resource, amount seed, delay, release?)
type Step = (usize, u32, u32, bool);

fn build(totals: &[Units], plans: &[(Vec<Units>, Vec<Step>)]) -> Workload {
    let mut builder = Workload::builder(totals);
    for (task, (claims, steps)) in plans.iter().enumerate() {
        let mut held = vec![0; totals.len()];
        for (resource, &claim) in claims.iter().enumerate() {
            builder = builder.initiate(task, resource, claim);
        }
        for &(resource, seed, delay, release) in steps {
            if release {
                if held[resource] == 0 {
                    continue;
                }
                let amount = 1 + seed % held[resource];
                held[resource] -= amount;
                builder = builder.release(task, delay, resource, amount);
            } else {
                let remaining = claims[resource] - held[resource];
                if remaining == 0 {
                    continue;
                }
                let amount = 1 + seed % remaining;
                held[resource] += amount;
                builder = builder.request(task, delay, resource, amount);
            }
        }
        for (resource, &units) in held.iter().enumerate() {
            if units > 0 {
                builder = builder.release(task, 0, resource, units);
            }
        }
        builder = builder.terminate(task, 0);
    }
    builder.build().unwrap()
}

fn workload(max_resources: usize) -> impl Strategy<Value = Workload> {
    (1..=max_resources, 1usize..=4)
        .prop_flat_map(|(resources, tasks)| {
            (prop::collection::vec(1u32..=6, resources), Just(tasks))
        })
        .prop_flat_map(|(totals, tasks)| {
            let resources = totals.len();
            let claims: Vec<_> = totals.iter().map(|&total| 0..=total).collect();
            let steps = prop::collection::vec(
                (0..resources, any::<u32>(), 0u32..3, any::<bool>()),
                0..8,
            );
            let plans = prop::collection::vec((claims, steps), tasks);
            (Just(totals), plans)
        })
        .prop_map(|(totals, plans)| build(&totals, &plans))
}

fn step_all<M: ResourceManager>(mut sim: Simulation<'_, M>) -> Result<RunReport, SimError> {
    while !sim.is_finished() {
        sim.step()?;
        assert!(sim.conserves_units(), "conservation broken at cycle {}", sim.cycle());
    }
    Ok(sim.report())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn test_optimistic_always_finishes(workload in workload(3)) {
        let pool = ResourcePool::new(workload.totals().to_vec());
        let sim = Simulation::new(
            &workload,
            OptimisticManager::new(pool, workload.task_count()),
            SimulationConfig::default(),
        );
        let report = step_all(sim).unwrap();
        prop_assert!(report.outcomes.iter().all(|o| o.terminated_at.is_some()));
        prop_assert_eq!(report.outcomes.len(), workload.task_count());
    }

    #[test]
    fn test_banker_never_aborts_honest_tasks(workload in workload(3)) {
        let pool = ResourcePool::new(workload.totals().to_vec());
        let sim = Simulation::new(
            &workload,
            BankerManager::new(pool, workload.task_count()),
            SimulationConfig::default(),
        );
        match step_all(sim) {
            Ok(report) => prop_assert_eq!(report.aborted(), 0),
            Err(SimError::Stalled { blocked, .. }) => prop_assert!(!blocked.is_empty()),
            Err(other) => prop_assert!(false, "unexpected error: {other}"),
        }
    }

    #[test]
    fn test_runs_are_deterministic(workload in workload(2)) {
        let config = SimulationConfig::default();
        let first = run_policy(&workload, Policy::Optimistic, config).unwrap();
        let second = run_policy(&workload, Policy::Optimistic, config).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn test_deadlock_predicate(flags in prop::collection::vec((any::<bool>(), any::<bool>()), 0..6)) {
        let tasks: Vec<Task> = flags
            .iter()
            .enumerate()
            .map(|(id, &(finished, blocked))| {
                let mut task = Task::new(TaskId(id), 1);
                if finished {
                    task.terminate(0).unwrap();
                } else if blocked {
                    task.block(0);
                }
                task
            })
            .collect();
        let live: Vec<&(bool, bool)> = flags.iter().filter(|(finished, _)| !finished).collect();
        let expected = !live.is_empty() && live.iter().all(|(_, blocked)| *blocked);
        prop_assert_eq!(detect_deadlock(&tasks), expected);
    }
}
