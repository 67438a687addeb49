//! Every strategy against real worker processes of the built binary.

#![allow(clippy::unwrap_used)]

mod common;

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Instant;

use pixbench_pipeline::PipelineConfig;
use pixbench_pool::{
    ContextMode, Dispatch, Dispatcher, Execute, Executor, PoolError, ProcessBackend, ProcessPool,
    Strategy, Task, TaskResult, WorkerLauncher, list_images,
};

use common::{PIXBENCH, corrupt, image_dir};

fn nz(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).unwrap()
}

fn dispatcher(mode: ContextMode) -> Dispatcher {
    Dispatcher::for_pipeline(PIXBENCH, PipelineConfig::default(), mode)
}

fn tasks_in(dir: &std::path::Path, save: bool) -> Vec<Task> {
    let paths = list_images(dir, None).unwrap();
    Task::batch(&paths, &dir.join("out"), save)
}

fn pattern(results: &[TaskResult]) -> Vec<bool> {
    results.iter().map(|r| r.success).collect()
}

#[test]
fn corrupt_file_fails_alone_in_the_process_pool() {
    let dir = image_dir(4, 16);
    let bad = corrupt(dir.path(), "img_002.png");
    let tasks = tasks_in(dir.path(), false);
    assert_eq!(tasks.len(), 4);

    let pool = ProcessPool::new(WorkerLauncher::new(PIXBENCH, PipelineConfig::default()));
    let results = pool.execute(&tasks, nz(2)).unwrap();

    assert_eq!(results.len(), 4);
    assert_eq!(pattern(&results), [true, true, false, true]);
    let message = results[2].message.as_deref().unwrap();
    assert!(message.starts_with("failed to load"), "{message}");
    assert!(message.contains(&*bad.to_string_lossy()), "{message}");
}

#[test]
fn every_strategy_keeps_length_and_order() {
    let dir = image_dir(7, 12);
    corrupt(dir.path(), "img_003.png");
    let tasks = tasks_in(dir.path(), false);
    let expected = [true, true, true, false, true, true, true];
    let dispatcher = dispatcher(ContextMode::Shared);

    for strategy in Strategy::ALL {
        for workers in [1, 3, 16] {
            let results = dispatcher.dispatch(strategy, &tasks, nz(workers)).unwrap();
            assert_eq!(pattern(&results), expected, "{strategy} with {workers} workers");
        }
    }
}

#[test]
fn repeated_runs_give_the_same_outcome() {
    let dir = image_dir(5, 12);
    corrupt(dir.path(), "img_000.png");
    let tasks = tasks_in(dir.path(), false);
    let dispatcher = dispatcher(ContextMode::Isolated);

    for strategy in Strategy::ALL {
        let first = dispatcher.dispatch(strategy, &tasks, nz(2)).unwrap();
        let second = dispatcher.dispatch(strategy, &tasks, nz(2)).unwrap();
        assert_eq!(first, second, "{strategy}");
    }
}

#[cfg(unix)]
#[test]
fn non_utf8_file_name_does_not_break_process_strategies() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let dir = image_dir(3, 12);
    std::fs::copy(
        dir.path().join("img_000.png"),
        dir.path().join(OsStr::from_bytes(b"z\xff.png")),
    )
    .unwrap();
    let tasks = tasks_in(dir.path(), false);
    assert_eq!(tasks.len(), 3);

    let dispatcher = dispatcher(ContextMode::Shared);
    for strategy in Strategy::ALL {
        let results = dispatcher.dispatch(strategy, &tasks, nz(2)).unwrap();
        assert_eq!(pattern(&results), [true, true, true], "{strategy}");
    }
}

#[test]
fn empty_batch_needs_no_workers() {
    let broken = Dispatcher::for_pipeline(
        "/nonexistent/pixbench",
        PipelineConfig::default(),
        ContextMode::Shared,
    );
    for strategy in Strategy::ALL {
        assert!(broken.dispatch(strategy, &[], nz(4)).unwrap().is_empty());
    }
}

#[test]
fn saved_outputs_are_edge_maps() {
    let dir = image_dir(3, 20);
    let tasks = tasks_in(dir.path(), true);

    let results = dispatcher(ContextMode::Shared)
        .dispatch(Strategy::ProcessExecutor, &tasks, nz(2))
        .unwrap();
    assert!(results.iter().all(|r| r.success));

    for task in &tasks {
        let out = image::open(task.output_path()).unwrap();
        assert_eq!(out.color(), image::ColorType::L8);
        assert_eq!((out.width(), out.height()), (20, 20));
    }
}

#[test]
fn unlaunchable_worker_is_fatal() {
    let dir = image_dir(2, 8);
    let tasks = tasks_in(dir.path(), false);
    let launcher = WorkerLauncher::new(PathBuf::from("/nonexistent/pixbench"), PipelineConfig::default());

    let err = ProcessPool::new(launcher.clone())
        .execute(&tasks, nz(2))
        .unwrap_err();
    assert!(matches!(err, PoolError::Spawn { .. }), "{err}");

    let err = Executor::new(ProcessBackend::new(launcher))
        .execute(&tasks, nz(1))
        .unwrap_err();
    assert!(matches!(err, PoolError::Spawn { .. }), "{err}");
}

#[test]
fn worker_that_never_handshakes_is_fatal() {
    let dir = image_dir(2, 8);
    let tasks = tasks_in(dir.path(), false);
    // `pixbench steps --pipeline-json ...` is rejected by the argument
    // parser, so the child exits before sending `Ready`.
    let launcher =
        WorkerLauncher::new(PIXBENCH, PipelineConfig::default()).with_args(["steps"]);

    assert!(ProcessPool::new(launcher.clone()).execute(&tasks, nz(1)).is_err());
    assert!(
        Executor::new(ProcessBackend::new(launcher))
            .execute(&tasks, nz(2))
            .is_err()
    );
}

fn best_of(runs: usize, f: impl Fn() -> f64) -> f64 {
    (0..runs).map(|_| f()).fold(f64::INFINITY, f64::min)
}

#[test]
fn process_pool_is_not_slower_than_shared_thread_pool() {
    let cores = std::thread::available_parallelism().map_or(1, NonZeroUsize::get);
    if cores < 2 {
        eprintln!("skipping: needs at least 2 cores");
        return;
    }
    let workers = nz(cores.min(4));
    let dir = image_dir(24, 256);
    let tasks = tasks_in(dir.path(), false);
    let dispatcher = dispatcher(ContextMode::Shared);

    let time = |strategy| {
        best_of(2, || {
            let start = Instant::now();
            let results = dispatcher.dispatch(strategy, &tasks, workers).unwrap();
            assert!(results.iter().all(|r| r.success));
            start.elapsed().as_secs_f64()
        })
    };
    let process = time(Strategy::ProcessPool);
    let thread = time(Strategy::ThreadPool);

    assert!(
        process <= thread * 1.2 + 0.05,
        "process pool {process:.3}s vs shared thread pool {thread:.3}s"
    );
}

#[test]
#[ignore = "timing-sensitive; run with --ignored on an idle multi-core machine"]
fn process_pool_speeds_up_with_more_workers() {
    let cores = std::thread::available_parallelism().map_or(1, NonZeroUsize::get);
    assert!(cores >= 2, "needs at least 2 cores");
    let dir = image_dir(32, 384);
    let tasks = tasks_in(dir.path(), false);
    let dispatcher = dispatcher(ContextMode::Shared);

    let time = |workers| {
        best_of(3, || {
            let start = Instant::now();
            dispatcher
                .dispatch(Strategy::ProcessPool, &tasks, workers)
                .unwrap();
            start.elapsed().as_secs_f64()
        })
    };
    let serial = time(nz(1));
    let parallel = time(nz(cores.min(4)));
    assert!(parallel < serial, "{parallel:.3}s with workers vs {serial:.3}s serial");
}
