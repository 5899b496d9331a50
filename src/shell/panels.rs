use log::debug;
use regex::RegexBuilder;

use crate::{
	config::StoredBookmark,
	document::{DocumentAccess, IndexEntry, TocNode, find_in_toc, flatten_toc, normalize_target},
	types::NavState,
};

/// Lifecycle contract shared by every auxiliary panel. Panels are passive:
/// they hold presentation state, never navigate on their own.
pub trait Panel {
	fn document_loaded(&mut self, document: &dyn DocumentAccess);
	fn document_closed(&mut self);
	/// Re-read of the active instance's affordances after a browser change.
	fn active_view_state(&mut self, _state: NavState) {}
}

/// The hierarchical contents tree and its current selection.
#[derive(Default)]
pub struct ContentsTab {
	toc: Vec<TocNode>,
	selection: Option<String>,
}

impl ContentsTab {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Best-effort synchronization: selects the node matching `target`, or
	/// silently clears the selection when no node does.
	pub fn locate(&mut self, target: &str) {
		self.selection = find_in_toc(&self.toc, target).map(|node| normalize_target(&node.target));
		if self.selection.is_none() {
			debug!("contents tree has no node for {target}");
		}
	}

	#[must_use]
	pub fn selection(&self) -> Option<&str> {
		self.selection.as_deref()
	}

	#[must_use]
	pub fn toc(&self) -> &[TocNode] {
		&self.toc
	}
}

impl Panel for ContentsTab {
	fn document_loaded(&mut self, document: &dyn DocumentAccess) {
		self.toc = document.table_of_contents().to_vec();
		self.selection = None;
	}

	fn document_closed(&mut self) {
		self.toc.clear();
		self.selection = None;
	}
}

/// The alphabetical keyword index.
#[derive(Default)]
pub struct IndexTab {
	entries: Vec<IndexEntry>,
	selection: Option<usize>,
}

impl IndexTab {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn entries(&self) -> &[IndexEntry] {
		&self.entries
	}

	#[must_use]
	pub fn selection(&self) -> Option<&IndexEntry> {
		self.selection.and_then(|idx| self.entries.get(idx))
	}

	/// Case-insensitive exact match first, then the first prefix match,
	/// mirroring how typing into an index field narrows the list.
	#[must_use]
	pub fn find_entry(&self, keyword: &str) -> Option<usize> {
		let wanted = keyword.trim().to_lowercase();
		if wanted.is_empty() {
			return None;
		}
		self.entries
			.iter()
			.position(|entry| entry.keyword.to_lowercase() == wanted)
			.or_else(|| self.entries.iter().position(|entry| entry.keyword.to_lowercase().starts_with(&wanted)))
	}

	/// Selects the entry for `keyword` and returns its target.
	pub fn select(&mut self, keyword: &str) -> Option<String> {
		let idx = self.find_entry(keyword)?;
		self.selection = Some(idx);
		self.entries.get(idx).map(|entry| entry.target.clone())
	}
}

impl Panel for IndexTab {
	fn document_loaded(&mut self, document: &dyn DocumentAccess) {
		self.entries = document.index().to_vec();
		self.selection = None;
	}

	fn document_closed(&mut self) {
		self.entries.clear();
		self.selection = None;
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
	pub title: String,
	pub target: String,
}

/// Title search over the contents tree and the index. Full-text indexing
/// is out of scope; this panel only matches what the other panels show.
#[derive(Default)]
pub struct SearchTab {
	last_query: String,
	results: Vec<SearchHit>,
}

impl SearchTab {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn last_query(&self) -> &str {
		&self.last_query
	}

	#[must_use]
	pub fn results(&self) -> &[SearchHit] {
		&self.results
	}

	/// Runs a case-insensitive substring query; returns the hit count.
	pub fn run_query(&mut self, document: &dyn DocumentAccess, query: &str) -> usize {
		self.last_query = query.trim().to_string();
		self.results.clear();
		if self.last_query.is_empty() {
			return 0;
		}
		let Ok(matcher) = RegexBuilder::new(&regex::escape(&self.last_query)).case_insensitive(true).build() else {
			return 0;
		};
		for (title, target) in flatten_toc(document.table_of_contents()) {
			if !target.is_empty() && matcher.is_match(&title) {
				self.push_hit(title, target);
			}
		}
		for entry in document.index() {
			if matcher.is_match(&entry.keyword) {
				self.push_hit(entry.keyword.clone(), entry.target.clone());
			}
		}
		self.results.len()
	}

	fn push_hit(&mut self, title: String, target: String) {
		let normalized = normalize_target(&target);
		if self.results.iter().any(|hit| normalize_target(&hit.target) == normalized) {
			return;
		}
		self.results.push(SearchHit { title, target });
	}
}

impl Panel for SearchTab {
	fn document_loaded(&mut self, _document: &dyn DocumentAccess) {
		self.last_query.clear();
		self.results.clear();
	}

	fn document_closed(&mut self) {
		self.last_query.clear();
		self.results.clear();
	}
}

/// Saved targets for the loaded document. The backing store lives in the
/// config; this panel holds the presentation copy.
#[derive(Default)]
pub struct BookmarksTab {
	items: Vec<StoredBookmark>,
}

impl BookmarksTab {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	pub fn set_items(&mut self, items: Vec<StoredBookmark>) {
		self.items = items;
	}

	#[must_use]
	pub fn items(&self) -> &[StoredBookmark] {
		&self.items
	}

	#[must_use]
	pub fn get(&self, idx: usize) -> Option<&StoredBookmark> {
		self.items.get(idx)
	}
}

impl Panel for BookmarksTab {
	fn document_loaded(&mut self, _document: &dyn DocumentAccess) {
		self.items.clear();
	}

	fn document_closed(&mut self) {
		self.items.clear();
	}
}
