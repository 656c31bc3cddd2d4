use std::error::Error;
use std::path::{Path, PathBuf};

use buildpool::cli::CliArgs;
use buildpool::{exit_on_failure, run, PoolError};
use buildpool_test_utils::{init_tracing, TempTree};
use clap::Parser;

type TestResult = Result<(), Box<dyn Error>>;

/// Write `Buildpool.toml` into `tree` and return its path.
fn write_config(tree: &TempTree, contents: &str) -> Result<PathBuf, Box<dyn Error>> {
    let path = tree.join("Buildpool.toml");
    std::fs::write(&path, contents)?;
    Ok(path)
}

async fn run_cli<I, S>(config: &Path, args: I) -> buildpool::Result<i32>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut argv = vec![
        "buildpool".to_string(),
        "--config".to_string(),
        config.display().to_string(),
    ];
    argv.extend(args.into_iter().map(Into::into));
    let parsed = CliArgs::try_parse_from(argv).map_err(anyhow::Error::from)?;
    run(parsed).await
}

#[tokio::test]
async fn stale_reports_missing_and_up_to_date_outputs() -> TestResult {
    init_tracing();

    let tree = TempTree::new()?;
    let config = write_config(&tree, "")?;
    let input = tree.file_at("main.c", 100)?;
    let output = tree.join("main.o");
    let input = input.display().to_string();
    let output_arg = output.display().to_string();

    let code = run_cli(&config, ["stale", "--input", input.as_str(), "--output", output_arg.as_str()]).await?;
    assert_eq!(code, 1, "missing output must be stale");

    tree.file_at("main.o", 200)?;
    let code = run_cli(&config, ["stale", "--input", input.as_str(), "--output", output_arg.as_str()]).await?;
    assert_eq!(code, 0, "newer output is up to date");

    tree.file_at("main.c", 300)?;
    let code = run_cli(&config, ["stale", "--input", input.as_str(), "--output", output_arg.as_str()]).await?;
    assert_eq!(code, 1, "touched input makes the output stale again");

    Ok(())
}

#[tokio::test]
async fn ls_lists_a_directory() -> TestResult {
    init_tracing();

    let tree = TempTree::new()?;
    let config = write_config(&tree, "")?;
    tree.file("src/main.rs")?;
    let root = tree.root();

    assert_eq!(run_cli(&config, ["ls", root.as_str(), "--recursive"]).await?, 0);
    Ok(())
}

#[tokio::test]
async fn invalid_config_file_is_reported() -> TestResult {
    let tree = TempTree::new()?;
    let config = write_config(&tree, "[pool]\njobs = 0\n")?;

    let err = run_cli(&config, ["ls", "."]).await.unwrap_err();
    assert!(matches!(err, PoolError::ConfigError(_)), "{err:?}");
    assert_eq!(err.exit_code(), 1);
    Ok(())
}

#[test]
fn exit_on_failure_passes_values_through() {
    assert_eq!(exit_on_failure(Ok(7)), 7);
}

#[test]
fn interrupted_run_exits_130() {
    assert_eq!(PoolError::Interrupted.exit_code(), 130);
}

#[cfg(unix)]
mod with_processes {
    use super::*;

    #[tokio::test]
    async fn succeeding_commands_exit_zero() -> TestResult {
        init_tracing();

        let tree = TempTree::new()?;
        let config = write_config(&tree, "[pool]\nidle_backoff_ms = 5\n")?;

        let code = run_cli(&config, ["run", "true", "sleep 0.1", "true"]).await?;
        assert_eq!(code, 0);
        Ok(())
    }

    #[tokio::test]
    async fn failing_command_propagates_its_exit_code() -> TestResult {
        init_tracing();

        let tree = TempTree::new()?;
        let config = write_config(&tree, "[pool]\nidle_backoff_ms = 5\n")?;

        let err = run_cli(&config, ["run", "--shell", "sleep 5", "exit 6"])
            .await
            .unwrap_err();
        match &err {
            PoolError::JobFailed {
                location,
                command,
                code,
            } => {
                assert_eq!(location.to_string(), "<command-line>:2");
                assert_eq!(command, "exit 6");
                assert_eq!(*code, 6);
            }
            other => panic!("expected JobFailed, got {other:?}"),
        }
        assert_eq!(err.exit_code(), 6);
        Ok(())
    }

    #[tokio::test]
    async fn shell_flag_overrides_configured_argv_mode() -> TestResult {
        init_tracing();

        let tree = TempTree::new()?;
        let config = write_config(
            &tree,
            "[pool]\ncommand_mode = \"argv\"\nidle_backoff_ms = 5\n",
        )?;

        // As argv, `exit` is not a program at all.
        let err = run_cli(&config, ["run", "exit 5"]).await.unwrap_err();
        assert!(matches!(err, PoolError::Spawn { .. }), "{err:?}");

        let err = run_cli(&config, ["run", "--shell", "exit 5"]).await.unwrap_err();
        assert!(matches!(err, PoolError::JobFailed { code: 5, .. }), "{err:?}");
        Ok(())
    }

    #[tokio::test]
    async fn jobs_flag_overrides_configured_pool_size() -> TestResult {
        init_tracing();

        let tree = TempTree::new()?;
        let config = write_config(&tree, "[pool]\njobs = 4\nidle_backoff_ms = 5\n")?;

        // Fails whenever two of these overlap: only one can hold the lock dir.
        let lock = tree.join("lock");
        let exclusive = format!(
            "mkdir {lock} && sleep 0.3 && rmdir {lock}",
            lock = lock.display()
        );
        let commands = [exclusive.as_str(), exclusive.as_str(), exclusive.as_str()];

        let mut args = vec!["run", "--shell", "-j", "1"];
        args.extend(commands);
        assert_eq!(run_cli(&config, args).await?, 0);

        let mut args = vec!["run", "--shell"];
        args.extend(commands);
        let err = run_cli(&config, args).await.unwrap_err();
        assert!(matches!(err, PoolError::JobFailed { .. }), "{err:?}");
        Ok(())
    }
}

#[cfg(unix)]
#[test]
fn ls_into_a_closed_pipe_exits_cleanly() -> TestResult {
    use std::process::{Command, Stdio};

    let tree = TempTree::new()?;
    for i in 0..200 {
        tree.file(&format!("dir{}/file{i}.txt", i % 10))?;
    }

    let mut child = Command::new(env!("CARGO_BIN_EXE_buildpool"))
        .args(["ls", "--recursive"])
        .arg(tree.path())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;
    // Reader goes away before any output is consumed, like `| head -0`.
    drop(child.stdout.take());

    let output = child.wait_with_output()?;
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(output.status.success(), "status {:?}, stderr: {stderr}", output.status);
    assert!(!stderr.contains("panicked"), "{stderr}");
    Ok(())
}
