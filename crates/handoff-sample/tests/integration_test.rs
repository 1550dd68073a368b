use handoff_framework::{Context, FrameworkError};
use handoff_sample::directory_actor::{Directory, DirectoryActor, MembersResult};
use handoff_sample::user_actor::{
    JoinResult, NameResult, ProfileResult, SetNameResult, User, UserActor,
};
use std::future::IntoFuture;
use std::time::Duration;

async fn within<T>(fut: impl std::future::Future<Output = T>) -> T {
    tokio::time::timeout(Duration::from_secs(5), fut)
        .await
        .expect("call did not complete")
}

async fn profile(user: &UserActor) -> ProfileResult {
    user.profile(&Context::root())
        .await
        .expect("Failed to read profile")
}

#[tokio::test]
async fn test_set_name_returns_unresolved_future_then_previous_name() {
    let user = UserActor::new(User::new("bob"));
    let ctx = Context::root();

    let pending = user.set_name(&ctx, "ann".to_string());
    // Nothing has run yet on a current-thread runtime.
    assert!(!pending.is_completed());
    assert!(!ctx.is_held());

    let SetNameResult { previous } = pending.await.expect("Failed to rename user");
    assert_eq!(previous, "bob");
    assert!(ctx.is_held());

    let ProfileResult {
        name,
        renames,
        memberships,
    } = profile(&user).await;
    assert_eq!(name, "ann");
    assert_eq!(renames, 1);
    assert_eq!(memberships, 0);
}

#[tokio::test]
async fn test_blank_name_is_rejected_and_actor_stays_usable() {
    let user = UserActor::new(User::new("bob"));
    let ctx = Context::root();

    let err = user
        .set_name(&ctx, "   ".to_string())
        .await
        .expect_err("Blank name should be rejected");
    assert!(!err.is_fatal());
    assert!(err.to_string().contains("User validation error"));

    // The failed frame still handed the lock back.
    let NameResult { name } = user.name(&ctx).await.expect("Failed to read name");
    assert_eq!(name, "bob");
    assert_eq!(profile(&user).await.renames, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_renames_both_apply() {
    let user = UserActor::new(User::new("bob"));
    let (ctx_x, ctx_y) = (Context::root(), Context::root());

    let x = user.set_name(&ctx_x, "x".to_string());
    let y = user.set_name(&ctx_y, "y".to_string());
    let (x, y) = within(async { (x.await, y.await) }).await;
    let previous = [
        x.expect("Failed to rename to x").previous,
        y.expect("Failed to rename to y").previous,
    ];

    let ProfileResult { name, renames, .. } = profile(&user).await;
    assert!(name == "x" || name == "y");
    assert_eq!(renames, 2);
    // One of the renames saw the original name, the other saw the first rename.
    assert!(previous.contains(&"bob".to_string()));
    assert!(previous.contains(&if name == "x" { "y" } else { "x" }.to_string()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_readers_never_see_a_half_retyped_name() {
    let user = UserActor::new(User::new("bob"));
    let writer_ctx = Context::root();

    let retyping = user.retype(&writer_ctx, "bartholomew".to_string());

    let mut reads = vec![];
    for _ in 0..50 {
        let user = user.clone();
        reads.push(tokio::spawn(async move {
            let NameResult { name } = user
                .name(&Context::root())
                .await
                .expect("Failed to read name");
            name
        }));
    }

    within(async {
        retyping.await.expect("Failed to retype name");
        for read in reads {
            let name = read.await.expect("reader task failed");
            assert!(
                name == "bob" || name == "bartholomew",
                "observed partial name {name:?}"
            );
        }
    })
    .await;

    assert_eq!(profile(&user).await.name, "bartholomew");
}

#[tokio::test]
async fn test_join_calls_back_into_the_joining_user() {
    let alice = UserActor::new(User::new("alice"));
    let directory = DirectoryActor::new(Directory::new());
    let ctx = Context::root();

    let JoinResult { members } = within(async {
        alice
            .join(&ctx, alice.clone(), directory.clone())
            .await
            .expect("Failed to join directory")
    })
    .await;
    assert_eq!(members, 1);
    assert!(ctx.is_held());

    let MembersResult { members } = directory
        .members(&ctx)
        .await
        .expect("Failed to list members");
    assert_eq!(members, vec!["alice".to_string()]);
    assert_eq!(profile(&alice).await.memberships, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_joins_all_register() {
    let directory = DirectoryActor::new(Directory::new());
    let users: Vec<UserActor> = (0..10)
        .map(|i| UserActor::new(User::new(format!("user-{i}"))))
        .collect();

    let joins: Vec<_> = users
        .iter()
        .map(|user| user.join(&Context::root(), user.clone(), directory.clone()))
        .collect();

    let mut counts = within(async {
        let mut counts = vec![];
        for join in joins {
            counts.push(join.await.expect("Failed to join directory").members);
        }
        counts
    })
    .await;
    counts.sort_unstable();
    assert_eq!(counts, (1..=10).collect::<Vec<_>>());

    let MembersResult { mut members } = directory
        .members(&Context::root())
        .await
        .expect("Failed to list members");
    members.sort();
    let mut expected: Vec<String> = (0..10).map(|i| format!("user-{i}")).collect();
    expected.sort();
    assert_eq!(members, expected);
}

#[tokio::test]
async fn test_joining_twice_reports_the_directory_error() {
    let alice = UserActor::new(User::new("alice"));
    let directory = DirectoryActor::new(Directory::new());
    let ctx = Context::root();

    alice
        .join(&ctx, alice.clone(), directory.clone())
        .await
        .expect("Failed to join directory");
    let err = within(alice.join(&ctx, alice.clone(), directory.clone()).into_future())
        .await
        .expect_err("Second join should fail");

    assert!(matches!(err, FrameworkError::Implementation(_)));
    assert!(err.to_string().contains("User already registered: alice"));

    // Both locks came back despite the failure.
    assert_eq!(profile(&alice).await.memberships, 1);
    let MembersResult { members } = directory
        .members(&ctx)
        .await
        .expect("Failed to list members");
    assert_eq!(members.len(), 1);
}
