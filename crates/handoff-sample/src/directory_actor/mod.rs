//! # Directory Actor
//!
//! Keeps the list of users that joined.
//!
//! [`Directory::register`] asks the joining user for its name through the user's own actor.
//! When the registration was started by [`User::join`](crate::user_actor::User::join),
//! that user is already busy waiting on this call; the call still goes through because the
//! waiting frame released its lock.

pub mod error;

pub use error::*;

use crate::user_actor::{NameResult, UserActor};
use handoff_framework::{actor, Context};
use tracing::info;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Directory {
    pub members: Vec<String>,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(ctx: Context, user: UserActor) -> Result<(usize,), DirectoryError> {
        let NameResult { name } = user.name(&ctx).await?;
        let members = ctx.with_state(|dir: &mut Directory| {
            if dir.members.contains(&name) {
                return Err(DirectoryError::AlreadyRegistered(name.clone()));
            }
            dir.members.push(name.clone());
            Ok(dir.members.len())
        })??;
        info!(%name, members, "Registered");
        Ok((members,))
    }

    pub async fn members(ctx: Context) -> Result<(Vec<String>,), DirectoryError> {
        let members = ctx.with_state(|dir: &mut Directory| dir.members.clone())?;
        Ok((members,))
    }
}

actor! {
    /// Actor wrapping a [`Directory`].
    pub struct DirectoryActor(Directory);

    /// Lists `user` under its current name, returning the new member count.
    fn register(user: UserActor) -> (members: usize);
    fn members() -> (members: Vec<String>);
}
