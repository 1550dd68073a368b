//! # The `actor!` macro
//!
//! Writing `Actor::dispatch` by hand for every operation is mechanical, so [`actor!`]
//! does it from a list of operations. For each entry
//! `fn op(args...) -> (outs...)` it emits:
//!
//! - a method `op(&self, ctx: &Context, args...) -> Future<OpResult>` that calls
//!   `Inner::op(ctx, args...)` through the handoff protocol;
//! - a result type `OpResult` with one public field per return value, in declared order.
//!
//! plus the actor struct itself and `new(internal)`. The wrapped type provides each
//! operation as an associated `async fn op(ctx: Context, args...) -> Result<(outs...,), E>`.
//!
//! ```rust
//! use handoff_framework::{actor, Context, ProtocolViolation};
//!
//! pub struct Counter {
//!     hits: u32,
//! }
//!
//! impl Counter {
//!     async fn hit(ctx: Context, by: u32) -> Result<(u32,), ProtocolViolation> {
//!         let hits = ctx.with_state(|c: &mut Counter| {
//!             c.hits += by;
//!             c.hits
//!         })?;
//!         Ok((hits,))
//!     }
//! }
//!
//! actor! {
//!     /// Actor wrapping a [`Counter`].
//!     pub struct CounterActor(Counter);
//!
//!     fn hit(by: u32) -> (hits: u32);
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let counter = CounterActor::new(Counter { hits: 0 });
//!     let ctx = Context::root();
//!     let HitResult { hits } = counter.hit(&ctx, 2).await.unwrap();
//!     assert_eq!(hits, 2);
//! }
//! ```

/// Declares an actor type over a wrapped implementation. See the [module docs](crate::macros).
#[macro_export]
macro_rules! actor {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident($inner:ty);

        $(
            $(#[$op_meta:meta])*
            fn $op:ident($($arg:ident : $arg_ty:ty),* $(,)?) -> ($($out:ident : $out_ty:ty),* $(,)?);
        )*
    ) => {
        $crate::paste::paste! {
            $(#[$meta])*
            #[derive(Clone, Debug)]
            $vis struct $name {
                actor: $crate::Actor<$inner>,
            }

            impl $name {
                /// Wraps `internal`, taking ownership of it.
                $vis fn new(internal: $inner) -> Self {
                    Self {
                        actor: $crate::Actor::new(internal),
                    }
                }

                $(
                    $(#[$op_meta])*
                    $vis fn $op(
                        &self,
                        ctx: &$crate::Context,
                        $($arg: $arg_ty),*
                    ) -> $crate::Future<[<$op:camel Result>]> {
                        self.actor.dispatch(ctx, stringify!($op), move |ctx| async move {
                            <$inner>::$op(ctx, $($arg),*)
                                .await
                                .map(|($($out,)*)| [<$op:camel Result>] { $($out),* })
                        })
                    }
                )*
            }

            $(
                #[doc = concat!("Result of [`", stringify!($name), "::", stringify!($op), "`].")]
                #[derive(Debug)]
                $vis struct [<$op:camel Result>] {
                    $(pub $out: $out_ty,)*
                }
            )*
        }
    };
}
