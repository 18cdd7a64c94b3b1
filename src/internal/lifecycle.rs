//! Attach/use/dispose state tracking shared by stateful target sources.

use std::sync::atomic::{AtomicU8, Ordering};

use crate::error::{DiError, DiResult};

const ATTACHED: u8 = 0;
const IN_USE: u8 = 1;
const DISPOSED: u8 = 2;

/// Runtime state of a target source.
///
/// An unattached source only exists as its configuration
/// ([`TargetSpec`](crate::TargetSpec)); attaching consumes the configuration,
/// so every live source starts in `Attached`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Configured and validated, no target resolved yet
    Attached,
    /// At least one target has been resolved
    InUse,
    /// Disposed; every further resolution fails
    Disposed,
}

pub(crate) struct Lifecycle {
    state: AtomicU8,
    kind: &'static str,
}

impl Lifecycle {
    pub(crate) fn new(kind: &'static str) -> Self {
        Self {
            state: AtomicU8::new(ATTACHED),
            kind,
        }
    }

    /// Records a resolution, failing once disposed.
    pub(crate) fn enter_use(&self) -> DiResult<()> {
        match self
            .state
            .compare_exchange(ATTACHED, IN_USE, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) | Err(IN_USE) => Ok(()),
            Err(_) => Err(DiError::Disposed(self.kind)),
        }
    }

    /// Moves to `Disposed`. Returns false if it already was.
    pub(crate) fn dispose(&self) -> bool {
        self.state.swap(DISPOSED, Ordering::AcqRel) != DISPOSED
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.state.load(Ordering::Acquire) == DISPOSED
    }

    pub(crate) fn state(&self) -> LifecycleState {
        match self.state.load(Ordering::Acquire) {
            ATTACHED => LifecycleState::Attached,
            IN_USE => LifecycleState::InUse,
            _ => LifecycleState::Disposed,
        }
    }
}
