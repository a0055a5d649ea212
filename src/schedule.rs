use smallvec::SmallVec;

/// Number of snapshots over a full run.
pub const SNAPSHOTS_PER_RUN: u64 = 5;

/// Number of force log rows over a full run.
pub const FORCE_ROWS_PER_RUN: u64 = 500;

/// Output produced after a completed step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Snapshot,
    ForceLog,
}

/// Decides at which steps the batch loop writes snapshots and force log rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportSchedule {
    snapshot_interval: u64,
    log_interval: u64,
}

impl ExportSchedule {
    /// Spreads snapshots and force rows evenly over `horizon` steps. Both intervals are at least
    /// one step, so short runs export every step instead of never.
    pub fn new(horizon: u64) -> Self {
        Self {
            snapshot_interval: (horizon / SNAPSHOTS_PER_RUN).max(1),
            log_interval: (horizon / FORCE_ROWS_PER_RUN).max(1),
        }
    }

    pub fn snapshot_interval(&self) -> u64 {
        self.snapshot_interval
    }

    pub fn log_interval(&self) -> u64 {
        self.log_interval
    }

    /// What to write after the step that brought the solver to `t`. The snapshot comes first
    /// when both fire.
    pub fn triggers(&self, t: u64) -> SmallVec<[Trigger; 2]> {
        let mut triggers = SmallVec::new();

        if t % self.snapshot_interval == 0 {
            triggers.push(Trigger::Snapshot);
        }
        if t % self.log_interval == 0 {
            triggers.push(Trigger::ForceLog);
        }

        triggers
    }
}
