use super::*;
use crate::barrier::{Forcer, ForcerId, ForcerState, InMemoryBarrierRegistry};
use crate::id::SequentialIdGen;
use crate::restraint::{used_permits, ConstraintSpec, InMemoryRestraintRegistry, Strategy};
use std::collections::HashMap;

type Facilitator = ResourceRestraintFacilitator<InMemoryRestraintRegistry, SequentialIdGen>;

fn facilitator(capacity: u32, strategy: Strategy) -> Facilitator {
    let config = CoordinationConfig::default()
        .with_restraint("deploy-slots", capacity, strategy)
        .with_facilitator(FacilitatorConfig {
            barrier_initial_wait: Duration::from_secs(5),
            restraint_initial_wait: Duration::from_secs(2),
        });
    ResourceRestraintFacilitator::new(
        config,
        InMemoryRestraintRegistry::new(),
        SequentialIdGen::new("consumer"),
    )
}

fn request(release: &str, permits: u32) -> AcquireRequest {
    AcquireRequest::new(
        "deploy-slots",
        ConstraintUnit::new("prod"),
        ReleaseEntityId::new(release),
        permits,
    )
}

fn deploy_slots() -> ConstraintId {
    ConstraintId::new("deploy-slots")
}

fn prod() -> ConstraintUnit {
    ConstraintUnit::new("prod")
}

#[test]
fn request_within_capacity_runs_sync_and_holds_permits() {
    let f = facilitator(3, Strategy::Fifo);

    let response = f.facilitate(&request("plan-1", 2)).unwrap();

    assert!(response.is_sync());
    assert_eq!(response.initial_wait, Duration::ZERO);
    let consumers = f.registry().load_consumers(&deploy_slots(), &prod()).unwrap();
    assert_eq!(consumers.len(), 1);
    assert_eq!(consumers[0].state, ConsumerState::Active);
    assert_eq!(consumers[0].permits, 2);
    assert_eq!(response.consumer_id, Some(consumers[0].id.clone()));
}

#[test]
fn permit_boundary_through_facilitation() {
    let f = facilitator(3, Strategy::Fifo);
    f.facilitate(&request("plan-1", 1)).unwrap();

    // used = 1 = C - k with k = 2
    assert!(f.facilitate(&request("plan-2", 2)).unwrap().is_sync());

    let response = f.facilitate(&request("plan-3", 1)).unwrap();
    assert_eq!(response.mode, ExecutionMode::Async);
    assert_eq!(response.initial_wait, Duration::from_secs(2));
}

#[test]
fn over_capacity_request_waits_as_blocked_consumer() {
    let f = facilitator(3, Strategy::Fifo);
    f.facilitate(&request("plan-1", 2)).unwrap();

    let response = f.facilitate(&request("plan-2", 2)).unwrap();

    assert_eq!(response.mode, ExecutionMode::Async);
    let consumers = f.registry().load_consumers(&deploy_slots(), &prod()).unwrap();
    assert_eq!(consumers[1].state, ConsumerState::Blocked);
    assert_eq!(response.consumer_id, Some(consumers[1].id.clone()));
}

#[test]
fn ensure_nets_out_permits_already_held() {
    let f = facilitator(3, Strategy::Fifo);
    f.facilitate(&request("plan-1", 2)).unwrap();

    let response = f
        .facilitate(&request("plan-1", 2).with_mode(AcquireMode::Ensure))
        .unwrap();

    assert!(response.is_sync());
    assert_eq!(response.consumer_id, None);
    assert_eq!(f.registry().all_consumers().len(), 1);
}

#[test]
fn ensure_requests_only_the_missing_permits() {
    let f = facilitator(5, Strategy::Fifo);
    f.facilitate(&request("plan-1", 1)).unwrap();

    let response = f
        .facilitate(&request("plan-1", 3).with_mode(AcquireMode::Ensure))
        .unwrap();

    assert!(response.is_sync());
    let consumers = f.registry().load_consumers(&deploy_slots(), &prod()).unwrap();
    assert_eq!(consumers.len(), 2);
    assert_eq!(consumers[1].permits, 2);
}

#[test]
fn ensure_while_blocked_returns_the_waiting_consumer() {
    let f = facilitator(2, Strategy::Fifo);
    f.facilitate(&request("other", 2)).unwrap();

    let ensure = request("plan-1", 1).with_mode(AcquireMode::Ensure);
    let first = f.facilitate(&ensure).unwrap();
    let second = f.facilitate(&ensure).unwrap();

    assert_eq!(first.mode, ExecutionMode::Async);
    assert_eq!(second.mode, ExecutionMode::Async);
    assert_eq!(second.initial_wait, Duration::from_secs(2));
    assert_eq!(second.consumer_id, first.consumer_id);
    assert_eq!(f.registry().all_consumers().len(), 2);

    f.release(&ReleaseEntityId::new("other")).unwrap();
    let held: Vec<Consumer> = f
        .registry()
        .consumers_for_release(&ReleaseEntityId::new("plan-1"))
        .unwrap();
    assert_eq!(used_permits(&held), 1);
}

#[test]
fn ensure_ignores_permits_of_other_scopes() {
    let f = facilitator(3, Strategy::Fifo);
    f.facilitate(&request("plan-1", 2)).unwrap();

    let response = f
        .facilitate(&request("plan-2", 2).with_mode(AcquireMode::Ensure))
        .unwrap();

    assert_eq!(response.mode, ExecutionMode::Async);
}

#[test]
fn accumulate_counts_every_request() {
    let f = facilitator(3, Strategy::Fifo);
    f.facilitate(&request("plan-1", 2)).unwrap();

    let response = f.facilitate(&request("plan-1", 2)).unwrap();

    assert_eq!(response.mode, ExecutionMode::Async);
    assert_eq!(f.registry().all_consumers().len(), 2);
}

#[test]
fn unknown_restraint_is_a_precondition_failure() {
    let f = facilitator(3, Strategy::Fifo);
    let mut req = request("plan-1", 1);
    req.restraint = "gpu-pool".to_string();

    let err = f.facilitate(&req).unwrap_err();
    assert!(matches!(err, RestraintError::MissingRestraint(name) if name == "gpu-pool"));
}

#[test]
fn zero_permits_is_invalid() {
    let f = facilitator(3, Strategy::Fifo);
    let err = f.facilitate(&request("plan-1", 0)).unwrap_err();
    assert!(matches!(err, RestraintError::InvalidPermits { permits: 0, .. }));
}

#[test]
fn request_larger_than_capacity_is_rejected() {
    let f = facilitator(3, Strategy::Fifo);
    let err = f.facilitate(&request("plan-1", 4)).unwrap_err();
    assert!(matches!(
        err,
        RestraintError::Rejected {
            requested: 4,
            capacity: 3,
            ..
        }
    ));
    assert!(f.registry().all_consumers().is_empty());
}

#[test]
fn fifo_release_keeps_head_of_line_until_it_fits() {
    let f = facilitator(5, Strategy::Fifo);
    f.facilitate(&request("plan-x", 3)).unwrap();
    f.facilitate(&request("plan-y", 2)).unwrap();
    let a = f.facilitate(&request("plan-a", 3)).unwrap().consumer_id.unwrap();
    let b = f.facilitate(&request("plan-b", 2)).unwrap().consumer_id.unwrap();

    // Frees exactly 2: b would fit, but a is ahead of it
    let promoted = f.release(&ReleaseEntityId::new("plan-y")).unwrap();
    assert!(promoted.is_empty());
    assert_eq!(f.poll(&deploy_slots(), &prod(), &a).unwrap(), ConsumerState::Blocked);
    assert_eq!(f.poll(&deploy_slots(), &prod(), &b).unwrap(), ConsumerState::Blocked);

    let promoted = f.release(&ReleaseEntityId::new("plan-x")).unwrap();
    assert_eq!(promoted, vec![a.clone(), b.clone()]);
    assert_eq!(f.poll(&deploy_slots(), &prod(), &a).unwrap(), ConsumerState::Active);
}

#[test]
fn asap_release_promotes_whatever_fits() {
    let f = facilitator(5, Strategy::Asap);
    f.facilitate(&request("plan-x", 3)).unwrap();
    f.facilitate(&request("plan-y", 2)).unwrap();
    f.facilitate(&request("plan-a", 3)).unwrap();
    let b = f.facilitate(&request("plan-b", 2)).unwrap().consumer_id.unwrap();

    let promoted = f.release(&ReleaseEntityId::new("plan-y")).unwrap();
    assert_eq!(promoted, vec![b]);
}

#[test]
fn fifo_newcomer_queues_behind_blocked_consumer() {
    let f = facilitator(5, Strategy::Fifo);
    f.facilitate(&request("plan-x", 3)).unwrap();
    f.facilitate(&request("plan-a", 3)).unwrap();

    // 2 permits are free, but plan-a is already waiting
    let response = f.facilitate(&request("plan-b", 1)).unwrap();
    assert_eq!(response.mode, ExecutionMode::Async);
}

#[test]
fn poll_promotes_waiting_consumer_once_capacity_is_free() {
    let f = facilitator(2, Strategy::Fifo);
    f.facilitate(&request("plan-1", 2)).unwrap();
    let waiting = f.facilitate(&request("plan-2", 1)).unwrap().consumer_id.unwrap();

    // Released out of band, without promotion
    f.registry()
        .finish_consumers(&ReleaseEntityId::new("plan-1"))
        .unwrap();

    assert_eq!(
        f.poll(&deploy_slots(), &prod(), &waiting).unwrap(),
        ConsumerState::Active
    );
}

#[test]
fn poll_released_consumer_is_not_found() {
    let f = facilitator(2, Strategy::Fifo);
    let id = f.facilitate(&request("plan-1", 1)).unwrap().consumer_id.unwrap();
    f.release(&ReleaseEntityId::new("plan-1")).unwrap();

    let err = f.poll(&deploy_slots(), &prod(), &id).unwrap_err();
    assert!(matches!(err, RestraintError::Registry(RegistryError::NotFound { .. })));
}

#[test]
fn release_of_unconfigured_constraint_fails() {
    let f = facilitator(2, Strategy::Fifo);
    let retired = Constraint::new(
        ConstraintId::new("retired"),
        ConstraintSpec {
            limits: 1,
            strategy: Strategy::Fifo,
        },
    );
    f.registry()
        .admit_consumer(
            &retired,
            Consumer::new(
                ConsumerId::new("orphan"),
                retired.id.clone(),
                prod(),
                1,
                ConsumerState::Blocked,
                ReleaseEntityId::new("plan-1"),
            ),
            AcquireMode::Accumulate,
        )
        .unwrap();

    let err = f.release(&ReleaseEntityId::new("plan-1")).unwrap_err();
    assert!(matches!(err, RestraintError::MissingConstraint(id) if id.as_str() == "retired"));
}

#[test]
fn shared_registry_never_grants_past_capacity() {
    let f = facilitator(1, Strategy::Fifo);
    let handles: Vec<_> = (0..8)
        .map(|n| {
            let f = f.clone();
            std::thread::spawn(move || {
                f.facilitate(&request(&format!("plan-{n}"), 1))
                    .unwrap()
                    .is_sync()
            })
        })
        .collect();

    let granted = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|sync| *sync)
        .count();
    assert_eq!(granted, 1);
    let consumers = f.registry().load_consumers(&deploy_slots(), &prod()).unwrap();
    assert_eq!(used_permits(&consumers), 1);
}

#[test]
fn release_of_unknown_scope_is_a_no_op() {
    let f = facilitator(2, Strategy::Fifo);
    assert!(f.release(&ReleaseEntityId::new("nobody")).unwrap().is_empty());
}

// Barrier facilitation

fn barrier_facilitator() -> BarrierFacilitator<InMemoryBarrierRegistry> {
    BarrierFacilitator::new(
        InMemoryBarrierRegistry::new(),
        &FacilitatorConfig {
            barrier_initial_wait: Duration::from_secs(5),
            restraint_initial_wait: Duration::ZERO,
        },
    )
}

fn states(entries: &[(&str, ForcerState)]) -> HashMap<ForcerId, ForcerState> {
    entries
        .iter()
        .map(|(id, s)| (ForcerId::new(*id), *s))
        .collect()
}

#[test]
fn standing_barrier_waits_with_initial_wait() {
    let f = barrier_facilitator();
    let id = BarrierId::new("gate");
    Barrier::create(id.clone(), Forcer::leaf("root"), f.registry()).unwrap();

    let response = f.facilitate(&id).unwrap();
    assert_eq!(response.mode, ExecutionMode::Async);
    assert_eq!(response.initial_wait, Duration::from_secs(5));
}

#[test]
fn poll_persists_terminal_state_and_facilitate_turns_sync() {
    let f = barrier_facilitator();
    let id = BarrierId::new("gate");
    let tree = Forcer::with_children("root", vec![Forcer::leaf("c1"), Forcer::leaf("c2")]);
    Barrier::create(id.clone(), tree, f.registry()).unwrap();

    let mut snapshot = states(&[
        ("root", ForcerState::Approaching),
        ("c1", ForcerState::Arrived),
        ("c2", ForcerState::Approaching),
    ]);
    assert_eq!(f.poll(&id, &snapshot).unwrap(), BarrierState::Standing);
    assert_eq!(f.facilitate(&id).unwrap().mode, ExecutionMode::Async);

    snapshot.insert(ForcerId::new("c2"), ForcerState::Arrived);
    assert_eq!(f.poll(&id, &snapshot).unwrap(), BarrierState::Down);
    assert_eq!(
        Barrier::load(&id, f.registry()).unwrap().state,
        BarrierState::Down
    );
    assert!(f.facilitate(&id).unwrap().is_sync());
}

#[test]
fn endured_barrier_stays_endured() {
    let f = barrier_facilitator();
    let id = BarrierId::new("gate");
    Barrier::create(id.clone(), Forcer::leaf("root"), f.registry()).unwrap();

    let abandoned = states(&[("root", ForcerState::Abandoned)]);
    assert_eq!(f.poll(&id, &abandoned).unwrap(), BarrierState::Endure);

    let arrived = states(&[("root", ForcerState::Arrived)]);
    assert_eq!(f.poll(&id, &arrived).unwrap(), BarrierState::Endure);
}

#[test]
fn facilitate_unknown_barrier_fails_to_load() {
    let f = barrier_facilitator();
    let err = f.facilitate(&BarrierId::new("missing")).unwrap_err();
    assert!(matches!(err, BarrierError::UnableToLoad { .. }));
}
