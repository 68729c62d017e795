//! Lifecycle state owned by one client connection.

use std::fmt;

use lsp_types::ClientInfo;

/// Lifecycle phase of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    /// No `initialize` request has been accepted yet.
    #[default]
    Uninitialized,
    /// `initialize` succeeded; feature requests are served.
    Initialized,
    /// `shutdown` was accepted and its response is being delivered.
    ShuttingDown,
    /// The session is finished; nothing more is read.
    Exited,
}

impl fmt::Display for Phase {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Uninitialized => "uninitialized",
            Self::Initialized => "initialized",
            Self::ShuttingDown => "shutting down",
            Self::Exited => "exited",
        };
        formatter.write_str(label)
    }
}

/// Per-connection state threaded through the dispatcher.
///
/// Sessions are plain values, so tests can run several side by side.
#[derive(Debug, Clone, Default)]
pub struct Session {
    phase: Phase,
    client_info: Option<ClientInfo>,
}

impl Session {
    /// Creates a session in [`Phase::Uninitialized`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Client information recorded by `initialize`.
    #[must_use]
    pub fn client_info(&self) -> Option<&ClientInfo> {
        self.client_info.as_ref()
    }

    /// Records a successful `initialize`.
    pub(crate) fn initialise(&mut self, client_info: Option<ClientInfo>) {
        self.phase = Phase::Initialized;
        self.client_info = client_info;
    }

    /// Records an accepted `shutdown` whose response is still to be written.
    pub(crate) fn begin_shutdown(&mut self) {
        self.phase = Phase::ShuttingDown;
    }

    /// Marks the session finished.
    pub fn exit(&mut self) {
        self.phase = Phase::Exited;
    }
}
