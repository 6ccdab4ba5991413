use std::io;

use thiserror::Error;

/// Raised when runtime metrics collection cannot be started.
#[derive(Debug, Error)]
pub enum Error {
    /// Raised if the thread of a sampler could not be spawned.
    #[error("failed to spawn the {name} sampler thread")]
    Spawn {
        /// Name of the sampler.
        name: &'static str,
        /// The error returned by the OS.
        #[source]
        source: io::Error,
    },
    /// Raised if the configuration leaves nothing to collect.
    #[error("no collectors are enabled")]
    NoCollectors,
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Error::NoCollectors.to_string(), "no collectors are enabled");

        let err = Error::Spawn {
            name: "memory",
            source: io::Error::new(io::ErrorKind::WouldBlock, "no threads left"),
        };
        assert_eq!(err.to_string(), "failed to spawn the memory sampler thread");
        assert_eq!(err.source().unwrap().to_string(), "no threads left");
    }
}
