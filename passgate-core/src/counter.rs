//! Replay and clone detection via signature counters.
//!
//! Authenticators with a hardware counter increment it on every signature,
//! so a value that fails to advance means the credential's private key is
//! being used somewhere else — the sole signal available for a cloned
//! authenticator. Authenticators without one fall back to a server-side
//! counter incremented per successful authentication; that degrades to
//! replay-within-this-service detection only (two clones would each advance
//! the same stored value), which is a known limitation, not a guarantee.

use crate::error::CloneError;

/// Counter values as stored with the credential.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoredCounters {
    /// Authenticator-reported counter from the last accepted assertion.
    pub sign_counter: u32,
    /// Server-maintained counter for authenticators that report none.
    pub fallback_counter: u32,
}

/// Where the counter evidence for this assertion comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterSource {
    /// The authenticator reports a usable counter.
    Hardware(u32),
    /// No counter support; only the server-side fallback applies.
    FallbackOnly,
}

impl CounterSource {
    /// Classify an extracted counter against the stored state.
    ///
    /// Counter support is signalled by the extracted value being nonzero or
    /// by a nonzero value having been stored previously — an authenticator
    /// that once reported a counter must keep reporting one.
    pub fn classify(extracted: u32, stored: &StoredCounters) -> Self {
        if extracted > 0 || stored.sign_counter > 0 {
            CounterSource::Hardware(extracted)
        } else {
            CounterSource::FallbackOnly
        }
    }
}

/// The new counter value to persist atomically with the last-used timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterAdvance {
    /// Store the authenticator-reported value as `sign_counter`.
    Hardware(u32),
    /// Store this value as `fallback_counter`.
    Fallback(u32),
}

impl CounterAdvance {
    pub fn value(&self) -> u32 {
        match self {
            CounterAdvance::Hardware(n) | CounterAdvance::Fallback(n) => *n,
        }
    }
}

/// Check the strict-increase invariant and compute the next counter state.
///
/// Hardware counters must strictly exceed the stored value — no tolerance
/// window, since a legitimate counter always advances monotonically. The
/// fallback counter advances by exactly 1 and the same strict-increase
/// invariant is enforced against the stored fallback value.
pub fn check_and_advance(
    stored: &StoredCounters,
    source: CounterSource,
) -> Result<CounterAdvance, CloneError> {
    match source {
        CounterSource::Hardware(extracted) => {
            if extracted > stored.sign_counter {
                Ok(CounterAdvance::Hardware(extracted))
            } else {
                tracing::warn!(
                    stored = stored.sign_counter,
                    reported = extracted,
                    "signature counter did not advance"
                );
                Err(CloneError::PossibleClone {
                    stored: stored.sign_counter,
                    reported: extracted,
                })
            }
        }
        CounterSource::FallbackOnly => {
            // A pinned (saturated) fallback counter can no longer satisfy
            // strict increase; treat it the same as a non-advancing counter.
            match stored.fallback_counter.checked_add(1) {
                Some(next) => Ok(CounterAdvance::Fallback(next)),
                None => Err(CloneError::PossibleClone {
                    stored: stored.fallback_counter,
                    reported: stored.fallback_counter,
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hardware_counter_must_strictly_increase() {
        let stored = StoredCounters {
            sign_counter: 5,
            fallback_counter: 0,
        };
        assert_eq!(
            check_and_advance(&stored, CounterSource::Hardware(6)).unwrap(),
            CounterAdvance::Hardware(6)
        );
        assert_eq!(
            check_and_advance(&stored, CounterSource::Hardware(100)).unwrap(),
            CounterAdvance::Hardware(100)
        );
    }

    #[test]
    fn equal_counter_is_a_possible_clone() {
        let stored = StoredCounters {
            sign_counter: 5,
            fallback_counter: 0,
        };
        assert_eq!(
            check_and_advance(&stored, CounterSource::Hardware(5)).unwrap_err(),
            CloneError::PossibleClone {
                stored: 5,
                reported: 5
            }
        );
    }

    #[test]
    fn lower_counter_is_a_possible_clone() {
        let stored = StoredCounters {
            sign_counter: 5,
            fallback_counter: 0,
        };
        assert!(check_and_advance(&stored, CounterSource::Hardware(3)).is_err());
        assert!(check_and_advance(&stored, CounterSource::Hardware(0)).is_err());
    }

    #[test]
    fn fallback_advances_by_exactly_one() {
        let stored = StoredCounters {
            sign_counter: 0,
            fallback_counter: 7,
        };
        assert_eq!(
            check_and_advance(&stored, CounterSource::FallbackOnly).unwrap(),
            CounterAdvance::Fallback(8)
        );
    }

    #[test]
    fn saturated_fallback_is_rejected() {
        let stored = StoredCounters {
            sign_counter: 0,
            fallback_counter: u32::MAX,
        };
        assert!(check_and_advance(&stored, CounterSource::FallbackOnly).is_err());
    }

    #[test]
    fn classification_tracks_counter_support() {
        let fresh = StoredCounters::default();
        assert_eq!(
            CounterSource::classify(0, &fresh),
            CounterSource::FallbackOnly
        );
        assert_eq!(
            CounterSource::classify(1, &fresh),
            CounterSource::Hardware(1)
        );

        // Once a nonzero counter was stored, a zero report is suspicious
        // and stays on the hardware path (where it fails strict increase).
        let seasoned = StoredCounters {
            sign_counter: 10,
            fallback_counter: 0,
        };
        assert_eq!(
            CounterSource::classify(0, &seasoned),
            CounterSource::Hardware(0)
        );
        assert!(check_and_advance(&seasoned, CounterSource::classify(0, &seasoned)).is_err());
    }
}
