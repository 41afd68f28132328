use thiserror::Error;

/// Connectivity mode of the synchronization engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Startup: the initial fetch has not completed yet.
    Initializing,
    /// The remote authority is reachable and polled for external changes.
    SyncedRemote,
    /// The remote authority is unreachable; edits go to the local fallback.
    DegradedLocal,
}

impl SyncMode {
    /// Label exposed to the control surface.
    pub fn label(self) -> &'static str {
        match self {
            SyncMode::Initializing => "initializing",
            SyncMode::SyncedRemote => "synced",
            SyncMode::DegradedLocal => "degraded",
        }
    }
}

/// Connectivity events fed to the [`SyncStateMachine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncEvent {
    /// A document was read from or written to the remote authority.
    RemoteAdopted,
    /// A remote call failed.
    RemoteUnreachable,
    /// The recovery probe reached the remote and the local snapshot was pushed.
    RemoteRecovered,
}

/// Error returned when an event cannot be applied from the current mode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// Mode the machine was in when the event was received.
    pub from: SyncMode,
    /// Rejected event.
    pub event: SyncEvent,
}

/// Tracks the engine mode: `Initializing -> SyncedRemote <-> DegradedLocal`.
#[derive(Debug, Clone)]
pub struct SyncStateMachine {
    mode: SyncMode,
    version: usize,
}

impl Default for SyncStateMachine {
    fn default() -> Self {
        Self {
            mode: SyncMode::Initializing,
            version: 0,
        }
    }
}

impl SyncStateMachine {
    /// Create a machine in [`SyncMode::Initializing`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Current mode.
    pub fn mode(&self) -> SyncMode {
        self.mode
    }

    /// Number of mode changes applied so far.
    pub fn version(&self) -> usize {
        self.version
    }

    /// Apply an event, returning the resulting mode.
    pub fn apply(&mut self, event: SyncEvent) -> Result<SyncMode, InvalidTransition> {
        let next = self.compute_transition(event)?;
        if next != self.mode {
            self.mode = next;
            self.version += 1;
        }
        Ok(next)
    }

    fn compute_transition(&self, event: SyncEvent) -> Result<SyncMode, InvalidTransition> {
        let next = match (self.mode, event) {
            (SyncMode::Initializing, SyncEvent::RemoteAdopted) => SyncMode::SyncedRemote,
            (SyncMode::Initializing, SyncEvent::RemoteUnreachable) => SyncMode::DegradedLocal,
            (SyncMode::SyncedRemote, SyncEvent::RemoteAdopted) => SyncMode::SyncedRemote,
            (SyncMode::SyncedRemote, SyncEvent::RemoteUnreachable) => SyncMode::DegradedLocal,
            (SyncMode::DegradedLocal, SyncEvent::RemoteUnreachable) => SyncMode::DegradedLocal,
            (SyncMode::DegradedLocal, SyncEvent::RemoteRecovered) => SyncMode::SyncedRemote,
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_mode_is_initializing() {
        let sm = SyncStateMachine::new();
        assert_eq!(sm.mode(), SyncMode::Initializing);
        assert_eq!(sm.version(), 0);
    }

    #[test]
    fn failover_and_recovery_cycle() {
        let mut sm = SyncStateMachine::new();
        assert_eq!(
            sm.apply(SyncEvent::RemoteAdopted).unwrap(),
            SyncMode::SyncedRemote
        );
        assert_eq!(
            sm.apply(SyncEvent::RemoteUnreachable).unwrap(),
            SyncMode::DegradedLocal
        );
        assert_eq!(
            sm.apply(SyncEvent::RemoteUnreachable).unwrap(),
            SyncMode::DegradedLocal
        );
        assert_eq!(
            sm.apply(SyncEvent::RemoteRecovered).unwrap(),
            SyncMode::SyncedRemote
        );
        assert_eq!(sm.version(), 3);
    }

    #[test]
    fn unreachable_at_startup_degrades() {
        let mut sm = SyncStateMachine::new();
        assert_eq!(
            sm.apply(SyncEvent::RemoteUnreachable).unwrap(),
            SyncMode::DegradedLocal
        );
    }

    #[test]
    fn recovery_requires_degraded_mode() {
        let mut sm = SyncStateMachine::new();
        let err = sm.apply(SyncEvent::RemoteRecovered).unwrap_err();
        assert_eq!(err.from, SyncMode::Initializing);

        sm.apply(SyncEvent::RemoteAdopted).unwrap();
        assert!(sm.apply(SyncEvent::RemoteRecovered).is_err());
    }

    #[test]
    fn degraded_mode_does_not_adopt_remote_without_recovery() {
        let mut sm = SyncStateMachine::new();
        sm.apply(SyncEvent::RemoteUnreachable).unwrap();
        let err = sm.apply(SyncEvent::RemoteAdopted).unwrap_err();
        assert_eq!(
            err,
            InvalidTransition {
                from: SyncMode::DegradedLocal,
                event: SyncEvent::RemoteAdopted,
            }
        );
    }
}
