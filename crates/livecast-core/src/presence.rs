//! Viewer presence signal
//!
//! Fires the host's join/leave hooks as an edge pair. A leave is only ever
//! emitted for an outstanding join, and a join only when none is outstanding.

use tracing::debug;

/// Host callback with no arguments
pub type Callback = Box<dyn FnMut()>;

/// Join/leave edge tracker
pub struct ViewerPresence {
    on_join: Option<Callback>,
    on_leave: Option<Callback>,
    joined: bool,
    joins: u64,
    leaves: u64,
}

impl ViewerPresence {
    pub fn new(on_join: Option<Callback>, on_leave: Option<Callback>) -> Self {
        Self {
            on_join,
            on_leave,
            joined: false,
            joins: 0,
            leaves: 0,
        }
    }

    /// Signal a join. No-op if a join is already outstanding.
    pub fn join(&mut self) -> bool {
        if self.joined {
            return false;
        }
        self.joined = true;
        self.joins += 1;
        debug!(joins = self.joins, "Viewer joined");
        if let Some(on_join) = self.on_join.as_mut() {
            on_join();
        }
        true
    }

    /// Signal a leave. No-op without an outstanding join.
    pub fn leave(&mut self) -> bool {
        if !self.joined {
            return false;
        }
        self.joined = false;
        self.leaves += 1;
        debug!(leaves = self.leaves, "Viewer left");
        if let Some(on_leave) = self.on_leave.as_mut() {
            on_leave();
        }
        true
    }

    pub fn is_joined(&self) -> bool {
        self.joined
    }

    pub fn joins(&self) -> u64 {
        self.joins
    }

    pub fn leaves(&self) -> u64 {
        self.leaves
    }
}

impl Default for ViewerPresence {
    fn default() -> Self {
        Self::new(None, None)
    }
}

impl std::fmt::Debug for ViewerPresence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewerPresence")
            .field("joined", &self.joined)
            .field("joins", &self.joins)
            .field("leaves", &self.leaves)
            .finish()
    }
}
