//! # Native Object Shims
//!
//! Stable, logically named access to native objects whose shape differs per
//! runtime build, plus the single process-wide resolver state.
//!
//! ## Lifecycle
//! [`CompatRuntime::install`] publishes the state once per process. Every
//! capability inside it resolves at most once; nothing is ever re-probed or
//! invalidated, since the running runtime cannot change shape mid-process.

pub mod attribute;

pub use attribute::{AttributeShim, AttributeSnapshot};

use once_cell::sync::OnceCell;
use tracing::{info, warn};

use crate::error::{ProtocolError, Result};
use crate::runtime::SharedRuntime;

static GLOBAL: OnceCell<CompatRuntime> = OnceCell::new();

/// All resolver-backed shims for one runtime.
#[derive(Debug)]
pub struct CompatRuntime {
    runtime: SharedRuntime,
    attributes: AttributeShim,
}

impl CompatRuntime {
    /// Standalone state, not published process-wide.
    pub fn new(runtime: SharedRuntime) -> Self {
        Self {
            attributes: AttributeShim::new(SharedRuntime::clone(&runtime)),
            runtime,
        }
    }

    /// Publish the process-wide state. The first install wins; later calls
    /// return the existing state unchanged.
    pub fn install(runtime: SharedRuntime) -> &'static CompatRuntime {
        let requested = runtime.build().to_string();
        let mut fresh = false;
        let state = GLOBAL.get_or_init(|| {
            fresh = true;
            Self::new(runtime)
        });
        if fresh {
            info!(build = %requested, "Native runtime installed");
        } else {
            warn!(
                installed = state.build(),
                requested = %requested,
                "Native runtime already installed; keeping the first"
            );
        }
        state
    }

    pub fn global() -> Result<&'static CompatRuntime> {
        GLOBAL.get().ok_or(ProtocolError::RuntimeNotInstalled)
    }

    pub fn runtime(&self) -> &SharedRuntime {
        &self.runtime
    }

    pub fn build(&self) -> &str {
        self.runtime.build()
    }

    pub fn attributes(&self) -> &AttributeShim {
        &self.attributes
    }
}
