//! Blocking on missing transitions, preemption and run-time graph edits.

use arbor::builder::{ExecutionStateBuilder, HierarchyStateBuilder};
use arbor::config::EngineConfig;
use arbor::core::{ExecutionStatus, Outcome, OutcomeId, Transition};
use arbor::execution::{spawn, ExecutionEnv};
use arbor::state::{ExecutionState, HierarchyState, State};
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const POLL: Duration = Duration::from_millis(20);

fn env() -> ExecutionEnv {
    ExecutionEnv::new(EngineConfig::default().with_poll_interval(POLL))
}

fn counted(id: &str, outcome: OutcomeId, runs: &Arc<AtomicUsize>) -> ExecutionState {
    let runs = Arc::clone(runs);
    ExecutionStateBuilder::new(id)
        .outcome(0, "success")
        .outcome(1, "unwired")
        .executable(move |_ctx| {
            runs.fetch_add(1, Ordering::SeqCst);
            Ok(outcome)
        })
        .build()
        .unwrap()
}

/// `A` finishes with an outcome nothing is wired to; `B` would follow on `A.0`.
fn blocking_tree(runs_a: &Arc<AtomicUsize>, runs_b: &Arc<AtomicUsize>) -> HierarchyState {
    HierarchyStateBuilder::new("C")
        .outcome(0, "done")
        .state(counted("A", 1, runs_a))
        .state(counted("B", 0, runs_b))
        .start_state("A")
        .transition(Transition::to_state("A", 0, "B"))
        .transition(Transition::to_outcome("B", 0, "C", 0))
        .build()
        .unwrap()
}

fn wait_until(condition: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(2));
    }
}

#[test]
fn preempting_a_blocked_container_yields_preempted() {
    let runs_a = Arc::new(AtomicUsize::new(0));
    let runs_b = Arc::new(AtomicUsize::new(0));
    let tree = blocking_tree(&runs_a, &runs_b);
    let a = tree.handle_by_path("C/A").unwrap();

    let run = spawn(tree, json!({}), env()).unwrap();
    wait_until(|| a.status() == ExecutionStatus::WaitingForNextTransition);
    thread::sleep(Duration::from_millis(50));
    assert!(!run.is_finished());

    let stopped_at = Instant::now();
    run.stop();
    let completed = run.join().unwrap();

    assert!(stopped_at.elapsed() < POLL * 10);
    assert_eq!(completed.outcome.name(), "preempted");
    assert_eq!(completed.outcome.id(), Outcome::PREEMPTED_ID);
    assert_eq!(runs_a.load(Ordering::SeqCst), 1);
    assert_eq!(runs_b.load(Ordering::SeqCst), 0);
    assert_eq!(a.status(), ExecutionStatus::Finished);
}

#[test]
fn stop_during_a_leaf_that_ignores_it_still_preempts_container() {
    let started = Arc::new(AtomicBool::new(false));
    let release = Arc::new(AtomicBool::new(false));
    let stubborn = {
        let started = Arc::clone(&started);
        let release = Arc::clone(&release);
        ExecutionStateBuilder::new("A")
            .outcome(0, "success")
            .executable(move |_ctx| {
                started.store(true, Ordering::SeqCst);
                while !release.load(Ordering::SeqCst) {
                    thread::sleep(Duration::from_millis(2));
                }
                Ok(0)
            })
            .build()
            .unwrap()
    };
    let tree = HierarchyStateBuilder::new("C")
        .outcome(0, "done")
        .state(stubborn)
        .start_state("A")
        .transition(Transition::to_outcome("A", 0, "C", 0))
        .build()
        .unwrap();

    let run = spawn(tree, json!({}), env()).unwrap();
    wait_until(|| started.load(Ordering::SeqCst));
    run.stop();
    release.store(true, Ordering::SeqCst);
    let completed = run.join().unwrap();

    assert!(completed.outcome.is_preempted());
    assert_eq!(completed.state.container().history().get_path(), vec!["A"]);
}

#[test]
fn transition_added_at_run_time_unblocks_container() {
    let runs_a = Arc::new(AtomicUsize::new(0));
    let runs_b = Arc::new(AtomicUsize::new(0));
    let tree = blocking_tree(&runs_a, &runs_b);
    let editor = tree.container().transition_editor();
    let a = tree.handle_by_path("C/A").unwrap();

    let run = spawn(tree, json!({}), env()).unwrap();
    wait_until(|| a.status() == ExecutionStatus::WaitingForNextTransition);

    editor.add_transition(Transition::to_state("A", 1, "B")).unwrap();
    let completed = run.join().unwrap();

    assert_eq!(completed.outcome.name(), "done");
    assert_eq!(runs_b.load(Ordering::SeqCst), 1);
    assert_eq!(completed.state.container().transitions().len(), 3);
}

#[test]
fn invalid_run_time_edit_is_rejected_and_container_keeps_waiting() {
    let runs_a = Arc::new(AtomicUsize::new(0));
    let runs_b = Arc::new(AtomicUsize::new(0));
    let tree = blocking_tree(&runs_a, &runs_b);
    let editor = tree.container().transition_editor();
    let a = tree.handle_by_path("C/A").unwrap();

    let run = spawn(tree, json!({}), env()).unwrap();
    wait_until(|| a.status() == ExecutionStatus::WaitingForNextTransition);

    assert!(editor.add_transition(Transition::to_state("A", 1, "NOWHERE")).is_err());
    assert!(editor.add_transition(Transition::to_state("A", 0, "A")).is_err());
    thread::sleep(POLL * 3);
    assert!(!run.is_finished());

    run.stop();
    assert!(run.join().unwrap().outcome.is_preempted());
}

#[test]
fn preempting_a_child_path_preempts_only_that_subtree() {
    let polls = Arc::new(AtomicUsize::new(0));
    let spinner = {
        let polls = Arc::clone(&polls);
        ExecutionStateBuilder::new("SPIN")
            .outcome(0, "success")
            .executable(move |ctx| {
                while !ctx.is_preempted() {
                    polls.fetch_add(1, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(2));
                }
                Ok(Outcome::PREEMPTED_ID)
            })
            .build()
            .unwrap()
    };
    let inner = HierarchyStateBuilder::new("INNER")
        .outcome(0, "done")
        .state(spinner)
        .start_state("SPIN")
        .transition(Transition::to_outcome("SPIN", 0, "INNER", 0))
        .build()
        .unwrap();
    let fallback = ExecutionStateBuilder::new("FALLBACK")
        .outcome(0, "success")
        .executable(|_ctx| Ok(0))
        .build()
        .unwrap();
    let root = HierarchyStateBuilder::new("ROOT")
        .outcome(0, "done")
        .outcome(1, "recovered")
        .state(inner)
        .state(fallback)
        .start_state("INNER")
        .transition(Transition::to_outcome("INNER", 0, "ROOT", 0))
        .transition(Transition::to_state("INNER", Outcome::PREEMPTED_ID, "FALLBACK"))
        .transition(Transition::to_outcome("FALLBACK", 0, "ROOT", 1))
        .build()
        .unwrap();
    let inner_handle = root.handle_by_path("ROOT/INNER").unwrap();

    let run = spawn(root, json!({}), env()).unwrap();
    wait_until(|| polls.load(Ordering::SeqCst) > 0);
    inner_handle.preempt();
    let completed = run.join().unwrap();

    assert_eq!(completed.outcome.name(), "recovered");
    assert_eq!(
        completed.state.container().history().get_path(),
        vec!["INNER", "FALLBACK"]
    );
    let inner = completed.state.state_by_path("ROOT/INNER").unwrap();
    assert!(inner.final_outcome().is_some_and(Outcome::is_preempted));
    assert!(!inner_handle.is_preempted());
}
