//! # Handoff Sample
//!
//! Demonstrates the lock-handoff actor framework.
//!
//! - **[user_actor](handoff_sample::user_actor)**: a [`User`] profile wrapped as [`UserActor`].
//! - **[directory_actor](handoff_sample::directory_actor)**: a [`Directory`] that calls back into joining users.
//!
//! The entry point renames a user, then has two users join a directory. Each join is a
//! cycle (user → directory → same user) that completes without deadlocking.
//!
//! Run with `RUST_LOG=debug` to see every frame start and finish.

use handoff_framework::tracing::setup_tracing;
use handoff_framework::Context;
use handoff_sample::directory_actor::{Directory, DirectoryActor, MembersResult};
use handoff_sample::user_actor::{JoinResult, SetNameResult, User, UserActor};
use tracing::{error, info, Instrument};

#[tokio::main]
async fn main() -> Result<(), String> {
    // Setup tracing once for the entire application
    setup_tracing();

    info!("Starting handoff sample");

    let ctx = Context::root();
    let alice = UserActor::new(User::new("alice"));
    let bob = UserActor::new(User::new("bob"));
    let directory = DirectoryActor::new(Directory::new());

    let span = tracing::info_span!("rename");
    let previous = async {
        // The call hands back a future before the rename runs.
        let pending = alice.set_name(&ctx, "Alice".to_string());
        info!(completed = pending.is_completed(), "Rename requested");
        pending.await.map_err(|e| e.to_string())
    }
    .instrument(span)
    .await
    .map(|SetNameResult { previous }| previous)?;

    info!(%previous, "User renamed");

    let span = tracing::info_span!("join");
    async {
        for user in [&alice, &bob] {
            match user.join(&ctx, user.clone(), directory.clone()).await {
                Ok(JoinResult { members }) => info!(members, "User joined"),
                Err(e) => error!(error = %e, "Join failed"),
            }
        }
    }
    .instrument(span)
    .await;

    let MembersResult { members } = directory
        .members(&ctx)
        .await
        .map_err(|e| e.to_string())?;
    info!(?members, "Application completed successfully");
    Ok(())
}
