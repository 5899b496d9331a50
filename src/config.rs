use std::{
	collections::HashMap,
	fs,
	path::{Path, PathBuf},
};

use log::warn;
use serde::{Deserialize, Serialize};

const DEFAULT_RECENT_DOCUMENTS_TO_SHOW: usize = 10;
const DEFAULT_MAX_OPEN_TABS: usize = 32;
const DEFAULT_AUTOTEST_TICK_MS: u64 = 500;

/// A named navigation target saved for one document.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredBookmark {
	pub title: String,
	pub target: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
	pub recent_documents_to_show: usize,
	pub max_open_tabs: usize,
	pub autotest_tick_ms: u64,
}

impl Default for AppSettings {
	fn default() -> Self {
		Self {
			recent_documents_to_show: DEFAULT_RECENT_DOCUMENTS_TO_SHOW,
			max_open_tabs: DEFAULT_MAX_OPEN_TABS,
			autotest_tick_ms: DEFAULT_AUTOTEST_TICK_MS,
		}
	}
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct ConfigData {
	app: AppSettings,
	recent_documents: Vec<String>,
	bookmarks: HashMap<String, Vec<StoredBookmark>>,
	encodings: HashMap<String, String>,
}

/// Settings persistence: app options, the recent-documents ring, and
/// per-document bookmarks and encoding choices, stored as one TOML file.
/// Without `initialize` it works purely in memory, which is what the test
/// suite uses.
pub struct ConfigManager {
	path: Option<PathBuf>,
	data: ConfigData,
}

impl Default for ConfigManager {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigManager {
	#[must_use]
	pub fn new() -> Self {
		Self { path: None, data: ConfigData::default() }
	}

	/// Binds the manager to a file and loads it if present. Returns false
	/// when the file exists but cannot be parsed; defaults are kept.
	pub fn initialize(&mut self, path: &Path) -> bool {
		self.path = Some(path.to_path_buf());
		match fs::read_to_string(path) {
			Ok(raw) => match toml::from_str(&raw) {
				Ok(data) => {
					self.data = data;
					true
				}
				Err(err) => {
					warn!("config {} is unreadable, using defaults: {err}", path.display());
					false
				}
			},
			Err(_) => true,
		}
	}

	pub fn flush(&self) {
		let Some(path) = self.path.as_deref() else {
			return;
		};
		let serialized = match toml::to_string_pretty(&self.data) {
			Ok(serialized) => serialized,
			Err(err) => {
				warn!("cannot serialize config: {err}");
				return;
			}
		};
		if let Some(parent) = path.parent() {
			let _ = fs::create_dir_all(parent);
		}
		if let Err(err) = fs::write(path, serialized) {
			warn!("cannot write config {}: {err}", path.display());
		}
	}

	#[must_use]
	pub const fn app(&self) -> &AppSettings {
		&self.data.app
	}

	pub const fn app_mut(&mut self) -> &mut AppSettings {
		&mut self.data.app
	}

	pub fn add_recent_document(&mut self, path: &str) {
		let recent = &mut self.data.recent_documents;
		if let Some(idx) = recent.iter().position(|p| p == path) {
			recent.remove(idx);
		}
		recent.insert(0, path.to_string());
		while recent.len() > self.data.app.recent_documents_to_show {
			recent.pop();
		}
	}

	#[must_use]
	pub fn get_recent_documents(&self) -> &[String] {
		&self.data.recent_documents
	}

	#[must_use]
	pub fn get_bookmarks(&self, path: &str) -> &[StoredBookmark] {
		self.data.bookmarks.get(path).map_or(&[], Vec::as_slice)
	}

	pub fn add_bookmark(&mut self, path: &str, bookmark: StoredBookmark) {
		let bookmarks = self.data.bookmarks.entry(path.to_string()).or_default();
		if !bookmarks.contains(&bookmark) {
			bookmarks.push(bookmark);
		}
	}

	/// Adds the bookmark, or removes an identical one if already present.
	pub fn toggle_bookmark(&mut self, path: &str, bookmark: StoredBookmark) {
		let bookmarks = self.data.bookmarks.entry(path.to_string()).or_default();
		if let Some(idx) = bookmarks.iter().position(|b| *b == bookmark) {
			bookmarks.remove(idx);
		} else {
			bookmarks.push(bookmark);
		}
	}

	pub fn remove_bookmarks_for_target(&mut self, path: &str, target: &str) {
		if let Some(bookmarks) = self.data.bookmarks.get_mut(path) {
			bookmarks.retain(|b| b.target != target);
		}
	}

	pub fn set_document_encoding(&mut self, path: &str, label: &str) {
		self.data.encodings.insert(path.to_string(), label.to_string());
	}

	#[must_use]
	pub fn get_document_encoding(&self, path: &str) -> Option<&str> {
		self.data.encodings.get(path).map(String::as_str)
	}
}

impl Drop for ConfigManager {
	fn drop(&mut self) {
		self.flush();
	}
}
