// src/watch/mod.rs

//! Filesystem watching.
//!
//! This module is responsible for:
//! - Keeping the set of watched directories in step with the tree
//!   ([`WatchSet`]).
//! - Wiring up the cross-platform OS watcher (`notify`) behind the
//!   [`Subscription`] trait.
//! - Translating raw notifications into [`FsEvent`]s.
//!
//! It does **not** decide what happens on a change; that is the engine's job.

pub mod event;
pub mod subscription;
pub mod watch_set;

pub use event::{FsEvent, FsOp, translate};
pub use subscription::{NotifySubscription, Subscription};
pub use watch_set::WatchSet;
