#![cfg(unix)]

use std::error::Error;
use std::io;
use std::time::{Duration, Instant};

use buildpool::{location, CommandMode, PoolError, PoolSettings, WorkerPool};
use buildpool_test_utils::{fast_settings, init_tracing, within, TempTree};

type TestResult = Result<(), Box<dyn Error>>;

fn argv_pool(size: usize) -> WorkerPool {
    WorkerPool::new(fast_settings(size).with_command_mode(CommandMode::Argv))
}

fn shell_pool(size: usize) -> WorkerPool {
    WorkerPool::new(fast_settings(size).with_command_mode(CommandMode::Shell))
}

#[tokio::test]
async fn two_slots_run_four_one_second_jobs_in_two_batches() -> TestResult {
    init_tracing();

    let mut pool = argv_pool(2);
    let started = Instant::now();
    for _ in 0..4 {
        pool.submit(location!(), "sleep 1").await?;
    }
    pool.await_all().await?;
    let elapsed = started.elapsed();

    assert!(elapsed >= Duration::from_millis(1900), "too fast: {elapsed:?}");
    assert!(elapsed < Duration::from_millis(3500), "too slow: {elapsed:?}");

    Ok(())
}

#[tokio::test]
async fn failing_process_ends_the_run_long_before_its_siblings() -> TestResult {
    init_tracing();

    let mut pool = argv_pool(3);
    let started = Instant::now();
    pool.submit(location!(), "sleep 10").await?;
    pool.submit(location!(), "false").await?;
    pool.submit(location!(), "sleep 10").await?;

    let (result, _) = within(Duration::from_secs(8), pool.await_all()).await;
    match result {
        Err(PoolError::JobFailed { command, code, .. }) => {
            assert_eq!(command, "false");
            assert_eq!(code, 1);
        }
        other => panic!("expected JobFailed, got {other:?}"),
    }
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(pool.running(), 0);

    Ok(())
}

#[tokio::test]
async fn killed_siblings_do_not_finish_their_work() -> TestResult {
    init_tracing();

    let tree = TempTree::new()?;
    let marker = tree.join("survivor");

    let mut pool = shell_pool(2);
    pool.submit(location!(), format!("sleep 0.5; touch {}", marker.display()))
        .await?;
    pool.submit(location!(), "exit 4").await?;

    let err = pool.await_all().await.unwrap_err();
    assert_eq!(err.exit_code(), 4);

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(!marker.exists(), "killed job still created its output");

    Ok(())
}

#[tokio::test]
async fn kill_all_reaches_processes_forked_by_the_shell() -> TestResult {
    init_tracing();

    let tree = TempTree::new()?;
    let marker = tree.join("grandchild");

    let mut pool = shell_pool(2);
    // The subshell is a separate process that outlives a killed `sh`
    // unless the whole process group goes down.
    pool.submit(
        location!(),
        format!("(sleep 0.5; touch {}); true", marker.display()),
    )
    .await?;
    tokio::time::sleep(Duration::from_millis(100)).await;
    pool.submit(location!(), "exit 1").await?;

    let err = pool.await_all().await.unwrap_err();
    assert!(matches!(err, PoolError::JobFailed { code: 1, .. }), "{err:?}");

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(!marker.exists(), "grandchild survived kill-all");

    Ok(())
}

#[tokio::test]
async fn barrier_sees_every_output() -> TestResult {
    init_tracing();

    let tree = TempTree::new()?;
    let mut pool = shell_pool(2);
    for i in 0..4 {
        let out = tree.join(&format!("out{i}"));
        pool.submit(location!(), format!("sleep 0.2 && touch {}", out.display()))
            .await?;
    }
    pool.await_all().await?;

    for i in 0..4 {
        assert!(tree.join(&format!("out{i}")).exists(), "out{i} missing after barrier");
    }

    Ok(())
}

#[tokio::test]
async fn shell_mode_understands_shell_syntax() -> TestResult {
    init_tracing();

    let mut pool = shell_pool(1);
    pool.run_serial(location!(), "echo hello | grep -q hello").await?;

    let err = pool.run_serial(location!(), "exit 3").await.unwrap_err();
    assert!(matches!(err, PoolError::JobFailed { code: 3, .. }), "{err:?}");

    Ok(())
}

#[tokio::test]
async fn argv_mode_does_not_interpret_quotes() -> TestResult {
    init_tracing();

    // `test` gets five words (`"a`, `b"`, `=`, `"a`, `b"`) and rejects them.
    let mut pool = argv_pool(1);
    let err = pool
        .run_serial(location!(), r#"test "a b" = "a b""#)
        .await
        .unwrap_err();
    assert!(matches!(err, PoolError::JobFailed { .. }), "{err:?}");

    Ok(())
}

#[tokio::test]
async fn unknown_program_is_a_spawn_failure() -> TestResult {
    init_tracing();

    let mut pool = argv_pool(2);
    let err = pool
        .submit(location!(), "definitely-not-a-real-program-4f1c --flag")
        .await
        .unwrap_err();

    match err {
        PoolError::Spawn { source, .. } => assert_eq!(source.kind(), io::ErrorKind::NotFound),
        other => panic!("expected Spawn, got {other:?}"),
    }
    assert!(pool.is_aborted());

    Ok(())
}

#[tokio::test]
async fn blank_command_line_cannot_be_spawned() -> TestResult {
    let mut pool = argv_pool(1);
    match pool.submit(location!(), "   ").await {
        Err(PoolError::Spawn { source, .. }) => {
            assert_eq!(source.kind(), io::ErrorKind::InvalidInput)
        }
        other => panic!("expected Spawn, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn captured_output_does_not_block_completion() -> TestResult {
    init_tracing();

    let settings = PoolSettings {
        capture_output: true,
        ..fast_settings(2).with_command_mode(CommandMode::Shell)
    };
    let mut pool = WorkerPool::new(settings);
    pool.submit(location!(), "seq 1 2000").await?;
    pool.submit(location!(), "echo to-stderr >&2").await?;

    let (result, _) = within(Duration::from_secs(5), pool.await_all()).await;
    result?;
    Ok(())
}

#[tokio::test]
async fn dropping_the_pool_kills_running_children() -> TestResult {
    init_tracing();

    let tree = TempTree::new()?;
    let marker = tree.join("late");
    {
        let mut pool = shell_pool(1);
        pool.submit(location!(), format!("sleep 0.5; touch {}", marker.display()))
            .await?;
    }

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(!marker.exists());
    Ok(())
}
