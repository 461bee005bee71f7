// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The session state machine.
//!
//! Transitions are validated in one place so no caller can drive a session
//! backwards into `Spawning` or out of a terminal state.

use super::SessionState;

/// Whether a transition from `from` to `to` is legal.
///
/// Rules:
/// - terminal states are absorbing;
/// - nothing returns to `Spawning`;
/// - `TaskComplete` is entered from `Working` only;
/// - attention states are entered from any live state and cleared by
///   `Ready`/`Working`;
/// - terminal states are reachable from any live state.
pub fn allowed(from: SessionState, to: SessionState) -> bool {
    use SessionState::*;

    if from.is_terminal() {
        return false;
    }
    if from == to {
        return false;
    }

    match to {
        Spawning => false,
        Stopped | Error => true,
        LoginRequired | BlockingPrompt => true,
        Ready => true,
        Working => matches!(from, Spawning | Ready | TaskComplete | LoginRequired | BlockingPrompt),
        TaskComplete => from == Working,
    }
}

/// Apply a transition, returning `true` when the state changed.
///
/// Illegal transitions are ignored; detectors re-announce states
/// constantly and the machine absorbs the noise.
pub fn apply(state: &mut SessionState, to: SessionState) -> bool {
    if allowed(*state, to) {
        *state = to;
        true
    } else {
        false
    }
}

#[cfg(test)]
#[path = "transition_tests.rs"]
mod tests;
