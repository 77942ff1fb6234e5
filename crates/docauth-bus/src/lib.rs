//! # DocAuth Bus - Engine Event Delivery
//!
//! Carries the engine's stage and error notifications from a session's
//! receive task to any number of observers.
//!
//! ```text
//! ┌──────────────┐   publish()    ┌──────────────┐  recv()/stream   ┌────────────┐
//! │ Receive task │ ─────────────→ │ EngineEvent  │ ───────────────→ │ Subscriber │
//! │  (session)   │  never blocks  │     Bus      │                  └────────────┘
//! └──────────────┘                │              │  listen()        ┌────────────┐
//!                                 │              │ ───────────────→ │  Listener  │
//!                                 └──────────────┘   own task       │   task     │
//!                                                                   └────────────┘
//! ```
//!
//! ## Delivery Rules
//!
//! - Publishing is a broadcast send. A slow observer lags and loses the
//!   oldest events; it never stalls the publisher or any exchange.
//! - Events are not ordered relative to exchange completions. An error
//!   event about a request may arrive before or after that request's
//!   failed response.
//! - Closing the bus lets observers drain buffered events, then ends them.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod events;
pub mod listener;
pub mod publisher;
pub mod subscriber;

pub use events::{EngineErrorReport, EngineEvent, EventFilter, EventKind, StageChanged};
pub use listener::ListenerHandle;
pub use publisher::EngineEventBus;
pub use subscriber::{EventStream, Subscription, SubscriptionError};

/// Maximum events buffered per subscriber before the oldest are dropped.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
