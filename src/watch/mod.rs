// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Subscribing to filesystem notifications for watched directories
//!   (`notify`) and translating them into [`RawEvent`](crate::types::RawEvent)s.
//! - Debouncing the raw stream into batches.
//! - Deciding which changed paths are noise.
//!
//! It does **not** know about remotes or transfers.

pub mod collector;
pub mod ignore;
pub mod path_utils;
pub mod watcher;

pub use collector::EventCollector;
pub use ignore::{IgnorePolicy, IgnoreReason};
pub use watcher::{translate_event, NotifyWatchSource, WatchSource};
