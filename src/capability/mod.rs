//! # Capability Resolver
//!
//! Lazy, probe-once selection of an implementation strategy.
//!
//! A [`Capability`] holds an ordered list of candidate probes for one named
//! operation. The first call to [`Capability::resolve`] runs the probes in
//! order and memoizes the outcome: the first candidate whose probe yields a
//! strategy is bound, or, if every probe declines, the operation is recorded
//! as unsupported. Later calls return the memoized outcome without probing.
//!
//! ## Concurrency
//! Resolution is backed by [`once_cell::sync::OnceCell`], so concurrent first
//! callers block until one of them has finished probing and all observe the
//! same bound strategy. Probes never run more than once per capability.
//!
//! ## Example
//! ```rust
//! use packet_compat::capability::{Candidate, Capability};
//!
//! let double: Capability<i32, i32> = Capability::new("double")
//!     .candidate(Candidate::new("negative_only", |x: &i32| (*x < 0).then(|| x * 2)))
//!     .candidate(Candidate::new("any", |x: &i32| Some(x * 2)));
//!
//! assert_eq!(*double.resolve(&4).unwrap(), 8);
//! assert_eq!(double.bound_candidate(), Some("any"));
//! ```

use std::fmt;

use once_cell::sync::OnceCell;
use tracing::{error, info, trace};

use crate::error::{ProtocolError, Result};
use crate::utils::metrics::{global_metrics, Timer};

type Probe<C, S> = Box<dyn Fn(&C) -> Option<S> + Send + Sync>;

/// One candidate strategy and the probe that tries to build it.
pub struct Candidate<C, S> {
    name: &'static str,
    probe: Probe<C, S>,
}

impl<C, S> Candidate<C, S> {
    pub fn new<F>(name: &'static str, probe: F) -> Self
    where
        F: Fn(&C) -> Option<S> + Send + Sync + 'static,
    {
        Self {
            name,
            probe: Box::new(probe),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<C, S> fmt::Debug for Candidate<C, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Candidate").field("name", &self.name).finish()
    }
}

/// Memoized outcome of probing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<S> {
    Bound { candidate: &'static str, strategy: S },
    Unsupported { tried: usize },
}

/// A named operation with ordered candidates and a memoized choice.
pub struct Capability<C, S> {
    operation: &'static str,
    candidates: Vec<Candidate<C, S>>,
    resolved: OnceCell<Resolution<S>>,
}

impl<C, S> Capability<C, S> {
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            candidates: Vec::new(),
            resolved: OnceCell::new(),
        }
    }

    /// Append a candidate. Candidates are probed in insertion order.
    pub fn candidate(mut self, candidate: Candidate<C, S>) -> Self {
        self.candidates.push(candidate);
        self
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn candidate_names(&self) -> Vec<&'static str> {
        self.candidates.iter().map(Candidate::name).collect()
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.get().is_some()
    }

    /// Name of the bound candidate, if resolution already succeeded.
    pub fn bound_candidate(&self) -> Option<&'static str> {
        match self.resolved.get() {
            Some(Resolution::Bound { candidate, .. }) => Some(*candidate),
            _ => None,
        }
    }

    pub fn resolution(&self) -> Option<&Resolution<S>> {
        self.resolved.get()
    }

    /// Return the bound strategy, probing on first use.
    pub fn resolve(&self, ctx: &C) -> Result<&S> {
        match self.resolved.get_or_init(|| self.probe_all(ctx)) {
            Resolution::Bound { strategy, .. } => Ok(strategy),
            Resolution::Unsupported { tried } => Err(ProtocolError::UnsupportedRuntime {
                operation: self.operation.to_string(),
                tried: *tried,
            }),
        }
    }

    fn probe_all(&self, ctx: &C) -> Resolution<S> {
        let _timer = Timer::start(self.operation);
        let metrics = global_metrics();
        for candidate in &self.candidates {
            metrics.probe_run();
            match (candidate.probe)(ctx) {
                Some(strategy) => {
                    metrics.capability_bound();
                    info!(
                        operation = self.operation,
                        candidate = candidate.name,
                        "Capability bound"
                    );
                    return Resolution::Bound {
                        candidate: candidate.name,
                        strategy,
                    };
                }
                None => {
                    trace!(
                        operation = self.operation,
                        candidate = candidate.name,
                        "Candidate probe declined"
                    );
                }
            }
        }

        metrics.capability_unsupported();
        error!(
            operation = self.operation,
            tried = self.candidates.len(),
            candidates = ?self.candidate_names(),
            "No candidate matched; operation unsupported"
        );
        Resolution::Unsupported {
            tried: self.candidates.len(),
        }
    }
}

impl<S> Capability<(), S> {
    /// Resolve a capability whose probes need no context.
    pub fn get(&self) -> Result<&S> {
        self.resolve(&())
    }
}

impl<C, S: fmt::Debug> fmt::Debug for Capability<C, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capability")
            .field("operation", &self.operation)
            .field("candidates", &self.candidate_names())
            .field("resolved", &self.resolved.get())
            .finish()
    }
}
