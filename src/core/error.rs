//! Failure classification shared by every error type

/// How a failure is treated by the rest of the system
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Caller asked too early; never retried automatically
    Precondition,
    /// Network failure; retried only by the next reactive trigger
    Transport,
    /// Radio link failure; drives ranging back to idle
    Link,
    /// Peer firmware mismatch; aborts the handshake
    Protocol,
    /// Invalid local configuration
    Configuration,
}

impl ErrorClass {
    /// Whether a later trigger may succeed without any change on our side
    pub fn is_transient(&self) -> bool {
        matches!(self, ErrorClass::Transport | ErrorClass::Link)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classes() {
        assert!(ErrorClass::Transport.is_transient());
        assert!(ErrorClass::Link.is_transient());
        assert!(!ErrorClass::Precondition.is_transient());
        assert!(!ErrorClass::Protocol.is_transient());
        assert!(!ErrorClass::Configuration.is_transient());
    }
}
