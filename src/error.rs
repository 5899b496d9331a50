use std::{error, fmt};

/// Recoverable navigation failures. Every variant is surfaced as a status
/// message at the shell level; none of them aborts the process or leaves
/// history and tab state half-mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavError {
	/// A navigation was attempted while no document is open.
	NoDocumentLoaded,
	/// The target does not resolve inside the loaded document.
	PageNotFound(String),
	/// The tab limit was reached; the caller falls back to the active tab.
	TabCreationFailed,
}

impl fmt::Display for NavError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::NoDocumentLoaded => write!(f, "No document is loaded"),
			Self::PageNotFound(target) => write!(f, "Page not found: {target}"),
			Self::TabCreationFailed => write!(f, "Could not create a new tab"),
		}
	}
}

impl error::Error for NavError {}
