use std::time::{
	Duration,
	Instant,
};

use super::Status;

/// How long to keep polling the status register for the READY bit.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum WaitLimit {
	/// poll forever; a missing chip hangs the caller
	Unbounded,
	/// give up after that many status queries (at least one)
	Polls(u32),
	/// give up once the deadline (measured from the first query) passed
	Deadline(Duration),
}

impl WaitLimit {
	pub(crate) fn start(&self) -> WaitBudget {
		WaitBudget {
			limit: *self,
			started: Instant::now(),
			polls: 0,
		}
	}
}

impl Default for WaitLimit {
	fn default() -> Self {
		WaitLimit::Polls(0xffff)
	}
}

/// Outcome of a single status query.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Readiness {
	Ready(Status),
	Busy(Status),
}

impl Readiness {
	pub fn from_status(status: Status) -> Self {
		if status.is_ready() { Readiness::Ready(status) } else { Readiness::Busy(status) }
	}

	pub fn status(&self) -> Status {
		match *self {
			Readiness::Ready(s) | Readiness::Busy(s) => s,
		}
	}
}

/// Outcome of polling until ready; `polls` counts the status queries issued.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum WaitOutcome {
	Ready {
		status: Status,
		polls: u32,
	},
	TimedOut {
		status: Status,
		polls: u32,
	},
}

impl WaitOutcome {
	pub fn is_ready(&self) -> bool {
		match self {
			WaitOutcome::Ready { .. } => true,
			WaitOutcome::TimedOut { .. } => false,
		}
	}

	pub fn status(&self) -> Status {
		match *self {
			WaitOutcome::Ready { status, .. } | WaitOutcome::TimedOut { status, .. } => status,
		}
	}

	pub fn polls(&self) -> u32 {
		match *self {
			WaitOutcome::Ready { polls, .. } | WaitOutcome::TimedOut { polls, .. } => polls,
		}
	}
}

pub(crate) struct WaitBudget {
	limit: WaitLimit,
	started: Instant,
	polls: u32,
}

impl WaitBudget {
	// account for a query just issued; true if another one may follow
	pub(crate) fn record(&mut self) -> bool {
		self.polls = self.polls.saturating_add(1);
		match self.limit {
			WaitLimit::Unbounded => true,
			WaitLimit::Polls(max) => self.polls < max,
			WaitLimit::Deadline(d) => self.started.elapsed() < d,
		}
	}

	pub(crate) fn polls(&self) -> u32 {
		self.polls
	}
}
