//! # Observability & Tracing
//!
//! The runtime logs through `tracing` with structured fields:
//!
//! - every spawned unit of work runs inside a `frame` span carrying `actor`, `op` and the
//!   frame `id`, so nested calls show up as nested spans;
//! - lock traffic (`Lock released`, `Lock reacquired`) and frame start/finish are `debug`;
//! - operations returning an error are `warn`;
//! - protocol violations are `error`, once per violation.
//!
//! ```bash
//! # Failures and violations only
//! RUST_LOG=warn cargo run
//!
//! # Every handoff
//! RUST_LOG=debug cargo run
//!
//! # Only the runtime
//! RUST_LOG=handoff_framework=debug cargo run
//! ```
//!
//! With `RUST_LOG=debug`, a cyclic call (User → Directory → User) reads like:
//!
//! ```text
//! DEBUG frame{actor="User" op="join" id=2}: Lock reacquired frame=2
//! DEBUG frame{actor="User" op="join" id=2}: Started
//! DEBUG frame{actor="User" op="join" id=2}: Lock released frame=2
//! DEBUG frame{actor="Directory" op="register" id=3}: Lock reacquired frame=3
//! ...
//! ```

/// Initializes the tracing subscriber for an application.
///
/// Log verbosity comes from the `RUST_LOG` environment variable. Module paths are hidden
/// (`with_target(false)`) since the span fields already name the actor and operation.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}
