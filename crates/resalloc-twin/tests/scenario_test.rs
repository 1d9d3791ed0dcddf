//! Integration Tests - Worked Scenarios
//!
//! Each scenario runs through the public driver and checks the observable
//! outcome: termination cycles, blocked cycles, aborts and the event stream.

use resalloc_twin::domain::*;

fn optimistic_sim(workload: &Workload) -> Simulation<'_, OptimisticManager> {
    let pool = ResourcePool::new(workload.totals().to_vec());
    Simulation::new(
        workload,
        OptimisticManager::new(pool, workload.task_count()),
        SimulationConfig::default(),
    )
}

fn banker_sim(workload: &Workload) -> Simulation<'_, BankerManager> {
    let pool = ResourcePool::new(workload.totals().to_vec());
    Simulation::new(
        workload,
        BankerManager::new(pool, workload.task_count()),
        SimulationConfig::default(),
    )
}

/// One resource of ten units; the second task waits for the first's release
fn release_then_grant() -> Workload {
    Workload::builder(&[10])
        .initiate(0, 0, 10)
        .request(0, 0, 0, 6)
        .release(0, 0, 0, 6)
        .terminate(0, 0)
        .initiate(1, 0, 10)
        .request(1, 0, 0, 5)
        .release(1, 0, 0, 5)
        .terminate(1, 0)
        .build()
        .unwrap()
}

/// Two single-unit resources acquired in opposite order
fn crossed_pair() -> Workload {
    Workload::builder(&[1, 1])
        .initiate(0, 0, 1)
        .initiate(0, 1, 1)
        .request(0, 0, 0, 1)
        .request(0, 0, 1, 1)
        .release(0, 0, 0, 1)
        .release(0, 0, 1, 1)
        .terminate(0, 0)
        .initiate(1, 0, 1)
        .initiate(1, 1, 1)
        .request(1, 0, 1, 1)
        .request(1, 0, 0, 1)
        .release(1, 0, 0, 1)
        .release(1, 0, 1, 1)
        .terminate(1, 0)
        .build()
        .unwrap()
}

mod release_then_grant {
    use super::*;

    #[test]
    fn test_blocked_until_commit() {
        let workload = release_then_grant();
        let mut sim = optimistic_sim(&workload);

        sim.step().unwrap();
        sim.step().unwrap();
        assert_eq!(sim.manager().pool().available_of(ResourceId(0)).unwrap(), 4);
        assert!(sim.tasks()[1].is_blocked());
        assert_eq!(sim.tasks()[1].blocked_since(), Some(1));

        sim.step().unwrap();
        assert!(sim.tasks()[1].is_blocked());
        assert_eq!(sim.tasks()[1].blocked_since(), Some(1));
        assert_eq!(sim.manager().pool().available_of(ResourceId(0)).unwrap(), 10);

        sim.step().unwrap();
        assert_eq!(sim.tasks()[1].held(ResourceId(0)).unwrap(), 5);
    }

    #[test]
    fn test_release_not_regranted_in_same_cycle() {
        let workload = release_then_grant();
        let report = optimistic_sim(&workload).run().unwrap();

        let released_at = report
            .events
            .iter()
            .find(|e| matches!(e.kind, EventKind::Released { .. }) && e.task == Some(TaskId(0)))
            .map(|e| e.cycle)
            .unwrap();
        let granted_at = report
            .events
            .iter()
            .find(|e| matches!(e.kind, EventKind::Granted { .. }) && e.task == Some(TaskId(1)))
            .map(|e| e.cycle)
            .unwrap();
        assert_eq!(released_at, 2);
        assert_eq!(granted_at, released_at + 1);
    }

    #[test]
    fn test_both_policies_agree() {
        let workload = release_then_grant();
        let comparison = compare(&workload, SimulationConfig::default()).unwrap();
        for report in comparison.reports() {
            assert_eq!(report.cycles, 6);
            assert_eq!(report.outcomes[0].terminated_at, Some(3));
            assert_eq!(report.outcomes[0].blocked_cycles, 0);
            assert_eq!(report.outcomes[1].terminated_at, Some(5));
            assert_eq!(report.outcomes[1].blocked_cycles, 2);
            assert_eq!(report.aborted(), 0);
        }
    }
}

mod crossed_pair {
    use super::*;

    #[test]
    fn test_optimistic_aborts_lower_id() {
        let workload = crossed_pair();
        let report = optimistic_sim(&workload).run().unwrap();

        assert!(report.outcomes[0].aborted);
        assert_eq!(report.outcomes[0].terminated_at, Some(3));
        assert!(!report.outcomes[1].aborted);
        assert_eq!(report.outcomes[1].terminated_at, Some(7));
        assert_eq!(report.outcomes[1].blocked_cycles, 1);

        let detected = report
            .events
            .iter()
            .find_map(|e| match &e.kind {
                EventKind::DeadlockDetected { blocked } => Some((e.cycle, blocked.clone())),
                _ => None,
            })
            .unwrap();
        assert_eq!(detected, (3, vec![TaskId(0), TaskId(1)]));
    }

    #[test]
    fn test_survivor_granted_next_cycle() {
        let workload = crossed_pair();
        let mut sim = optimistic_sim(&workload);
        for _ in 0..5 {
            sim.step().unwrap();
        }
        assert!(sim.tasks()[0].is_aborted());
        assert_eq!(sim.tasks()[1].held(ResourceId(0)).unwrap(), 1);
        assert_eq!(sim.tasks()[1].held(ResourceId(1)).unwrap(), 1);
    }

    #[test]
    fn test_victim_choice_is_repeatable() {
        let workload = crossed_pair();
        let first = optimistic_sim(&workload).run().unwrap();
        let second = optimistic_sim(&workload).run().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_banker_per_resource_check_stalls() {
        let workload = crossed_pair();
        let err = banker_sim(&workload).run().unwrap_err();
        assert_eq!(
            err,
            SimError::Stalled {
                cycle: 3,
                blocked: vec![TaskId(0), TaskId(1)],
            }
        );
    }
}

mod banker_admission {
    use super::*;

    #[test]
    fn test_infeasible_claim_aborted_at_initiate() {
        let workload = Workload::builder(&[5])
            .initiate(0, 0, 6)
            .terminate(0, 0)
            .initiate(1, 0, 5)
            .request(1, 0, 0, 5)
            .release(1, 0, 0, 5)
            .terminate(1, 0)
            .build()
            .unwrap();
        let mut sim = banker_sim(&workload);
        sim.step().unwrap();

        let task = &sim.tasks()[0];
        assert!(task.is_aborted());
        assert_eq!(task.time_terminated(), Some(0));
        assert_eq!(task.held_all(), &[0]);
        assert!(sim
            .log()
            .for_task(TaskId(0))
            .all(|e| !matches!(e.kind, EventKind::Granted { .. })));

        let report = sim.run().unwrap();
        assert!(report.outcomes[0].aborted);
        assert_eq!(report.outcomes[1].terminated_at, Some(3));
    }

    #[test]
    fn test_optimistic_ignores_infeasible_claim() {
        let workload = Workload::builder(&[5])
            .initiate(0, 0, 6)
            .terminate(0, 0)
            .build()
            .unwrap();
        let report = optimistic_sim(&workload).run().unwrap();
        assert!(!report.outcomes[0].aborted);
        assert_eq!(report.outcomes[0].terminated_at, Some(1));
    }

    #[test]
    fn test_remaining_claim_gates_grant() {
        // task 1 asks for 2 with 2 units free; its remaining claim is 3
        let workload = Workload::builder(&[5])
            .initiate(0, 0, 5)
            .request(0, 0, 0, 2)
            .request(0, 0, 0, 2)
            .release(0, 0, 0, 4)
            .terminate(0, 0)
            .initiate(1, 0, 1)
            .request(1, 0, 0, 1)
            .release(1, 1, 0, 1)
            .terminate(1, 0)
            .build()
            .unwrap();

        let optimistic = optimistic_sim(&workload).run().unwrap();
        assert_eq!(optimistic.outcomes[0].blocked_cycles, 0);
        assert_eq!(optimistic.outcomes[0].terminated_at, Some(4));

        let banker = banker_sim(&workload).run().unwrap();
        assert_eq!(banker.outcomes[0].blocked_cycles, 2);
        assert_eq!(banker.outcomes[0].terminated_at, Some(6));
        assert_eq!(banker.outcomes[1].terminated_at, Some(4));
    }

    #[test]
    fn test_over_claim_request_returns_held_units() {
        let workload = Workload::builder(&[4])
            .initiate(0, 0, 2)
            .request(0, 0, 0, 2)
            .request(0, 3, 0, 1)
            .terminate(0, 0)
            .build()
            .unwrap();
        let mut sim = banker_sim(&workload);
        sim.step().unwrap();
        sim.step().unwrap();
        sim.step().unwrap();

        assert!(sim.tasks()[0].is_aborted());
        assert_eq!(sim.tasks()[0].time_terminated(), Some(2));
        assert_eq!(sim.manager().pool().available_of(ResourceId(0)).unwrap(), 4);
        assert!(sim.is_finished());
    }
}

mod driver {
    use super::*;

    #[test]
    fn test_conservation_at_every_commit() {
        for workload in [release_then_grant(), crossed_pair()] {
            let mut sim = optimistic_sim(&workload);
            while !sim.is_finished() {
                sim.step().unwrap();
                assert!(sim.conserves_units());
            }
        }
    }

    #[test]
    fn test_delay_counts_toward_termination() {
        let workload = Workload::builder(&[1])
            .initiate(0, 0, 1)
            .request(0, 2, 0, 1)
            .release(0, 1, 0, 1)
            .terminate(0, 3)
            .build()
            .unwrap();
        let report = optimistic_sim(&workload).run().unwrap();
        // 1 + 3 + 2 + 4 dispatches
        assert_eq!(report.outcomes[0].terminated_at, Some(9));
        let computing = report
            .events
            .iter()
            .filter(|e| matches!(e.kind, EventKind::Computing { .. }))
            .count();
        assert_eq!(computing, 6);
    }

    #[test]
    fn test_terminate_with_held_units_returns_them() {
        let workload = Workload::builder(&[3])
            .initiate(0, 0, 3)
            .request(0, 0, 0, 3)
            .terminate(0, 0)
            .initiate(1, 0, 3)
            .request(1, 1, 0, 3)
            .release(1, 0, 0, 3)
            .terminate(1, 0)
            .build()
            .unwrap();
        let report = run_policy(&workload, Policy::Optimistic, SimulationConfig::default()).unwrap();
        assert_eq!(report.aborted(), 0);
        assert!(report
            .events
            .iter()
            .any(|e| e.kind == EventKind::Terminated { returned: vec![(ResourceId(0), 3)] }));
    }

    #[test]
    fn test_event_log_capacity() {
        let workload = release_then_grant();
        let pool = ResourcePool::new(workload.totals().to_vec());
        let config = SimulationBuilder::new().max_events(3).build();
        let report = Simulation::new(&workload, OptimisticManager::new(pool, 2), config)
            .run()
            .unwrap();
        assert_eq!(report.events.len(), 3);
        assert!(report.dropped_events > 0);
    }

    #[test]
    fn test_disabled_event_log() {
        let workload = release_then_grant();
        let config = SimulationBuilder::new().record_events(false).build();
        let report = run_policy(&workload, Policy::Banker, config).unwrap();
        assert!(report.events.is_empty());
        assert_eq!(report.dropped_events, 0);
    }
}
