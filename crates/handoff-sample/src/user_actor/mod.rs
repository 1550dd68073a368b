//! # User Actor
//!
//! A user profile turned into an actor with [`actor!`](handoff_framework::actor).
//!
//! ## Overview
//!
//! [`User`] is an ordinary struct. Its operations are associated `async fn`s that take
//! the frame's [`Context`] first and reach the profile through
//! [`Context::with_state`]. The macro wraps them into [`UserActor`], whose methods return
//! a [`Future`](handoff_framework::Future) right away.
//!
//! [`User::join`] is the interesting one: it calls into a
//! [`DirectoryActor`], which calls straight back into this user to read its name. The
//! handoff makes that cycle safe.
//!
//! ## Usage
//!
//! ```rust
//! use handoff_framework::Context;
//! use handoff_sample::user_actor::{SetNameResult, User, UserActor};
//!
//! #[tokio::main]
//! async fn main() {
//!     let user = UserActor::new(User::new("bob"));
//!     let ctx = Context::root();
//!
//!     let SetNameResult { previous } = user.set_name(&ctx, "ann".into()).await.unwrap();
//!     assert_eq!(previous, "bob");
//! }
//! ```

pub mod error;

pub use error::*;

use crate::directory_actor::{DirectoryActor, RegisterResult};
use handoff_framework::{actor, Context};
use tracing::{debug, info};

/// A registered user's profile.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub name: String,
    pub renames: u32,
    pub memberships: u32,
}

impl User {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            renames: 0,
            memberships: 0,
        }
    }

    pub async fn set_name(ctx: Context, name: String) -> Result<(String,), UserError> {
        validate(&name)?;
        let previous = ctx.with_state(|user: &mut User| {
            user.renames += 1;
            std::mem::replace(&mut user.name, name)
        })?;
        debug!(%previous, "Renamed");
        Ok((previous,))
    }

    /// Rewrites the name one character at a time, yielding to the scheduler in between.
    ///
    /// The lock stays held across the yields, so nobody sees a half-written name.
    pub async fn retype(ctx: Context, name: String) -> Result<(), UserError> {
        validate(&name)?;
        ctx.with_state(|user: &mut User| {
            user.renames += 1;
            user.name.clear();
        })?;
        for c in name.chars() {
            tokio::task::yield_now().await;
            ctx.with_state(|user: &mut User| user.name.push(c))?;
        }
        Ok(())
    }

    pub async fn name(ctx: Context) -> Result<(String,), UserError> {
        let name = ctx.with_state(|user: &mut User| user.name.clone())?;
        Ok((name,))
    }

    pub async fn profile(ctx: Context) -> Result<(String, u32, u32), UserError> {
        let profile = ctx.with_state(|user: &mut User| {
            (user.name.clone(), user.renames, user.memberships)
        })?;
        Ok(profile)
    }

    /// Registers this user in `directory`.
    ///
    /// `me` is this user's own actor handle; the directory uses it to call back for the
    /// name while this frame waits.
    pub async fn join(
        ctx: Context,
        me: UserActor,
        directory: DirectoryActor,
    ) -> Result<(usize,), UserError> {
        let RegisterResult { members } = directory.register(&ctx, me).await?;
        let name = ctx.with_state(|user: &mut User| {
            user.memberships += 1;
            user.name.clone()
        })?;
        info!(%name, members, "Joined directory");
        Ok((members,))
    }
}

fn validate(name: &str) -> Result<(), UserError> {
    if name.trim().is_empty() {
        return Err(UserError::ValidationError("name must not be blank".into()));
    }
    Ok(())
}

actor! {
    /// Actor wrapping a [`User`].
    pub struct UserActor(User);

    /// Replaces the name, returning the previous one.
    fn set_name(name: String) -> (previous: String);
    /// See [`User::retype`].
    fn retype(name: String) -> ();
    fn name() -> (name: String);
    fn profile() -> (name: String, renames: u32, memberships: u32);
    /// See [`User::join`].
    fn join(me: UserActor, directory: DirectoryActor) -> (members: usize);
}
