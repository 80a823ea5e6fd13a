use std::cell::RefCell;

use crate::TsdocError;

/// The stage of the pipeline that gave up on a comment or snippet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Stage {
	Parse,
	Context,
	EmbeddedFormat,
	Render,
}

impl Stage {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Parse => "parse",
			Self::Context => "context",
			Self::EmbeddedFormat => "embedded_format",
			Self::Render => "render",
		}
	}
}

impl std::fmt::Display for Stage {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Receives the reason whenever a comment or snippet is left unformatted.
///
/// Formatting never fails outward, so this is the only place skipped work is
/// visible.
pub trait Diagnostics {
	fn report(&self, stage: Stage, error: &TsdocError);
}

/// Drops every report.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDiagnostics;

impl Diagnostics for NoopDiagnostics {
	fn report(&self, _stage: Stage, _error: &TsdocError) {}
}

/// Forwards reports to `tracing` at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
	fn report(&self, stage: Stage, error: &TsdocError) {
		tracing::debug!(stage = %stage, error = %error, "comment left unformatted");
	}
}

/// A single collected report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticRecord {
	pub stage: Stage,
	pub message: String,
}

/// Records every report in memory.
#[derive(Debug, Default)]
pub struct CollectedDiagnostics {
	records: RefCell<Vec<DiagnosticRecord>>,
}

impl CollectedDiagnostics {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn records(&self) -> Vec<DiagnosticRecord> {
		self.records.borrow().clone()
	}

	pub fn len(&self) -> usize {
		self.records.borrow().len()
	}

	pub fn is_empty(&self) -> bool {
		self.records.borrow().is_empty()
	}

	/// Whether any report came from `stage`.
	pub fn has_stage(&self, stage: Stage) -> bool {
		self.records.borrow().iter().any(|record| record.stage == stage)
	}
}

impl Diagnostics for CollectedDiagnostics {
	fn report(&self, stage: Stage, error: &TsdocError) {
		self.records.borrow_mut().push(DiagnosticRecord {
			stage,
			message: error.to_string(),
		});
	}
}
