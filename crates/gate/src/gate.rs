// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session gate: pure mapping from authentication state to a render
//! decision.
//!
//! The gate never touches the credential store or the network — it only
//! reads an externally-owned authentication view. Callers must re-evaluate
//! whenever either flag changes.

/// Externally-owned authentication status consumed by the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthView {
    pub is_authenticated: bool,
    /// The session check has not completed yet.
    pub loading: bool,
}

/// Redirect instruction issued when an unauthenticated user hits a guarded
/// route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectInstruction {
    /// The location the user originally requested, so the login flow can
    /// return them afterward.
    pub return_to: String,
    /// Replace the current history entry instead of pushing a new one.
    pub replace: bool,
}

/// What a guarded route should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Session check in flight — show an indeterminate placeholder, render
    /// nothing else.
    Loading,
    /// Not authenticated — redirect to the login destination.
    RedirectToLogin(RedirectInstruction),
    /// Authenticated — render the guarded content unchanged.
    RenderChildren,
}

/// Decide what a guarded route should render.
///
/// `loading` wins over everything: an unauthenticated view mid-check must
/// not redirect.
pub fn resolve(auth: AuthView, location: &str) -> GateDecision {
    if auth.loading {
        return GateDecision::Loading;
    }
    if !auth.is_authenticated {
        return GateDecision::RedirectToLogin(RedirectInstruction {
            return_to: location.to_owned(),
            replace: true,
        });
    }
    GateDecision::RenderChildren
}

#[cfg(test)]
#[path = "gate_tests.rs"]
mod tests;
