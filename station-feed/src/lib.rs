//! Bike-sharing station feed.
//!
//! Station data comes from interchangeable providers (the JCDecaux API, a
//! local snapshot cache, a fixed fixture set) that all honour the same
//! contract: subscribe to their events, `start()` them, `stop()` them.
//! Whatever the source, emitted stations are normalized into
//! [`domain::Station`].

pub mod clock;
pub mod config;
pub mod domain;
pub mod events;
pub mod jcdecaux;
pub mod provider;
pub mod storage;
