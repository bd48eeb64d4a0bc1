//! Connection lifecycle state machine.
//!
//! # Transition Table
//!
//! | From | Input | To |
//! |------|-------|----|
//! | `Connecting` | `HandshakeCompleted` | `Open` |
//! | `Connecting` | `TransportClosed` | `Closed(Reconnecting)` |
//! | `Open` | `TransportClosed` | `Closed(Reconnecting)` |
//! | `Closed(Reconnecting)` | `ReconnectDue` | `Connecting` |
//! | any but `Closed(Terminal)` | `CloseRequested` | `Closed(Terminal)` |
//!
//! Every other pair is rejected. `Closed(Terminal)` accepts nothing.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

// ============================================================================
// CloseKind
// ============================================================================

/// Why a connection is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CloseKind {
    /// Dropped by the transport; a reconnect is pending.
    Reconnecting,
    /// Closed on request; no reconnect will ever happen.
    Terminal,
}

// ============================================================================
// ConnectionState
// ============================================================================

/// Lifecycle state of a [`Connection`](super::Connection).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Transport handshake in flight.
    Connecting,
    /// Transport open; sends are accepted.
    Open,
    /// Transport closed.
    Closed(CloseKind),
}

/// Inputs that drive [`ConnectionState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    /// The transport handshake succeeded.
    HandshakeCompleted,
    /// The transport closed, dropped, or failed its handshake.
    TransportClosed,
    /// The reconnect delay elapsed.
    ReconnectDue,
    /// `close()` was called.
    CloseRequested,
}

impl ConnectionState {
    /// Applies `input`, returning the next state or `None` if the
    /// input is not valid in the current state.
    #[must_use]
    pub fn next(self, input: Transition) -> Option<Self> {
        use CloseKind::{Reconnecting, Terminal};
        use Transition::{CloseRequested, HandshakeCompleted, ReconnectDue, TransportClosed};

        match (self, input) {
            (Self::Closed(Terminal), _) => None,
            (_, CloseRequested) => Some(Self::Closed(Terminal)),
            (Self::Connecting, HandshakeCompleted) => Some(Self::Open),
            (Self::Connecting | Self::Open, TransportClosed) => Some(Self::Closed(Reconnecting)),
            (Self::Closed(Reconnecting), ReconnectDue) => Some(Self::Connecting),
            _ => None,
        }
    }

    /// Returns `true` if sends are accepted.
    #[inline]
    #[must_use]
    pub fn is_open(self) -> bool {
        self == Self::Open
    }

    /// Returns `true` if no further transition is possible.
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        self == Self::Closed(CloseKind::Terminal)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connecting => f.write_str("connecting"),
            Self::Open => f.write_str("open"),
            Self::Closed(CloseKind::Reconnecting) => f.write_str("closed (reconnecting)"),
            Self::Closed(CloseKind::Terminal) => f.write_str("closed"),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    const ALL_STATES: [ConnectionState; 4] = [
        ConnectionState::Connecting,
        ConnectionState::Open,
        ConnectionState::Closed(CloseKind::Reconnecting),
        ConnectionState::Closed(CloseKind::Terminal),
    ];

    const ALL_INPUTS: [Transition; 4] = [
        Transition::HandshakeCompleted,
        Transition::TransportClosed,
        Transition::ReconnectDue,
        Transition::CloseRequested,
    ];

    #[test]
    fn test_transition_table() {
        use CloseKind::*;
        use ConnectionState::*;
        use Transition::*;

        let expected = [
            (Connecting, HandshakeCompleted, Some(Open)),
            (Connecting, TransportClosed, Some(Closed(Reconnecting))),
            (Connecting, ReconnectDue, None),
            (Connecting, CloseRequested, Some(Closed(Terminal))),
            (Open, HandshakeCompleted, None),
            (Open, TransportClosed, Some(Closed(Reconnecting))),
            (Open, ReconnectDue, None),
            (Open, CloseRequested, Some(Closed(Terminal))),
            (Closed(Reconnecting), HandshakeCompleted, None),
            (Closed(Reconnecting), TransportClosed, None),
            (Closed(Reconnecting), ReconnectDue, Some(Connecting)),
            (Closed(Reconnecting), CloseRequested, Some(Closed(Terminal))),
            (Closed(Terminal), HandshakeCompleted, None),
            (Closed(Terminal), TransportClosed, None),
            (Closed(Terminal), ReconnectDue, None),
            (Closed(Terminal), CloseRequested, None),
        ];

        for (from, input, to) in expected {
            assert_eq!(from.next(input), to, "{from} + {input:?}");
        }
    }

    #[test]
    fn test_predicates() {
        assert!(ConnectionState::Open.is_open());
        assert!(!ConnectionState::Connecting.is_open());
        assert!(ConnectionState::Closed(CloseKind::Terminal).is_terminal());
        assert!(!ConnectionState::Closed(CloseKind::Reconnecting).is_terminal());
    }

    proptest! {
        #[test]
        fn terminal_is_absorbing(
            start in 0usize..4,
            inputs in prop::collection::vec(0usize..4, 0..32),
        ) {
            let mut state = ALL_STATES[start];
            let mut seen_terminal = state.is_terminal();

            for i in inputs {
                if let Some(next) = state.next(ALL_INPUTS[i]) {
                    state = next;
                }
                if seen_terminal {
                    prop_assert!(state.is_terminal());
                }
                seen_terminal |= state.is_terminal();
            }
        }

        #[test]
        fn only_handshake_opens(start in 0usize..4, input in 0usize..4) {
            let input = ALL_INPUTS[input];
            if ALL_STATES[start].next(input) == Some(ConnectionState::Open) {
                prop_assert_eq!(input, Transition::HandshakeCompleted);
            }
        }
    }
}
