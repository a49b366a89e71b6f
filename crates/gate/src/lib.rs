// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tokengate: session gate and token lifecycle management.
//!
//! Two independent pieces that meet only through the persisted credential
//! store and broadcast events:
//!
//! - [`gate`] decides what a guarded route should render from an
//!   externally-owned authentication view.
//! - [`manager`] owns the credential record, runs a periodic liveness
//!   check, refreshes the access token through a configured endpoint, and
//!   broadcasts lifecycle events.

pub mod config;
pub mod gate;
pub mod jwt;
pub mod manager;
pub mod status;
pub mod store;
