use std::path::PathBuf;

use crate::types::OpenFlags;

/// An injected instruction for the shell. Direct user input and deferred
/// or scripted actions are parsed into the same closed set and consumed by
/// one dispatch path, so navigation requests never interleave.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserEvent {
	OpenFile { path: PathBuf },
	OpenPage { target: String, flags: OpenFlags },
	FindInIndex { keyword: String },
	RunAutotestStep,
}

impl UserEvent {
	/// Parses the opaque `{action, args}` shape arriving from outside.
	/// Unknown action names and malformed argument lists yield `None`; the
	/// caller logs and ignores those rather than failing.
	#[must_use]
	pub fn parse(action: &str, args: &[String]) -> Option<Self> {
		match action {
			"open-file" => {
				let path = args.first().filter(|p| !p.is_empty())?;
				Some(Self::OpenFile { path: PathBuf::from(path) })
			}
			"open-page" => {
				let target = args.first().filter(|t| !t.is_empty())?.clone();
				let flags = match args.get(1) {
					Some(raw) => OpenFlags::from_bits_truncate(raw.parse().ok()?),
					None => OpenFlags::default(),
				};
				Some(Self::OpenPage { target, flags })
			}
			"find-in-index" => {
				let keyword = args.first().filter(|k| !k.is_empty())?.clone();
				Some(Self::FindInIndex { keyword })
			}
			"run-next-autotest-step" => Some(Self::RunAutotestStep),
			_ => None,
		}
	}
}
