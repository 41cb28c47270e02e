//! # Example: basic_run
//!
//! Minimal registry run once at degree 1, without subscribers.
//!
//! Demonstrates how to:
//! - Define tasks with [`TaskFn`].
//! - Log, fail softly, and leave early from a task body through [`Ctx`].
//! - Run the registry with [`Harness::main`] and exit with its code.
//!
//! ## Flow
//! ```text
//! Harness::main()
//!     ├─► TaskGreeting   log, pass           (silent unless -v)
//!     ├─► TaskArithmetic error(), keeps going ─► FAIL block
//!     ├─► TaskConfigFile skip_with()          (silent unless -v)
//!     └─► FAIL, exit code 1
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example basic_run -- -v
//! ```

use std::process::ExitCode;

use taskharness::{Config, Ctx, Harness, Stop, TaskFn, TaskRef};

fn main() -> ExitCode {
    // 1. Configuration: one serial pass, verbose when asked.
    let verbose = std::env::args().any(|a| a == "-v");
    let cfg = Config {
        degrees: vec![1],
        verbose,
        ..Config::default()
    };

    // 2. Registry, in the order tasks should run.
    let tasks: Vec<TaskRef> = vec![
        TaskFn::arc("TaskGreeting", |ctx: Ctx| async move {
            ctx.log("Testing \"Hello\" function");
            Ok::<_, Stop>(())
        }),
        TaskFn::arc("TaskArithmetic", |ctx: Ctx| async move {
            for (a, b, want) in [(2, 2, 4), (3, 3, 7), (5, 5, 10)] {
                if a + b != want {
                    ctx.error(format!("{a} + {b} = {}, want {want}", a + b));
                }
            }
            Ok::<_, Stop>(())
        }),
        TaskFn::arc("TaskConfigFile", |ctx: Ctx| async move {
            let path = "/etc/taskharness.conf";
            if tokio::fs::metadata(path).await.is_err() {
                return Err(ctx.skip_with(format!("{path} not present")));
            }
            ctx.log(format!("found {path}"));
            Ok(())
        }),
    ];

    // 3. Build and run.
    match Harness::builder(cfg).build() {
        Ok(harness) => harness.main(&tasks),
        Err(e) => {
            eprintln!("taskharness: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}
