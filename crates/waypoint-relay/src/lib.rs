// SPDX-FileCopyrightText: 2026 Waypoint Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat relay orchestration for Waypoint.
//!
//! [`ChatRelay`] accepts a user message, persists it, raises the typing flag,
//! and hands the message to the remote agent on a detached task tracked by
//! [`DelegationTracker`].

pub mod relay;
pub mod shutdown;
pub mod tracker;

pub use relay::{ChatAccepted, ChatRelay, error_reply_text};
pub use shutdown::{drain_delegations, install_signal_handler};
pub use tracker::{DelegationRecord, DelegationStatus, DelegationTracker};
