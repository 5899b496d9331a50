use std::{collections::BTreeMap, fs, path::Path};

use anyhow::{Context, bail};
use percent_encoding::percent_decode_str;

use crate::encoding::TextEncoding;

/// Outcome of resolving a target against the loaded document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
	/// Decoded, renderable page content.
	Content(String),
	/// The target points outside the document; the embedding driver hands
	/// it to the system browser.
	External(String),
	NotFound,
}

/// One node of the contents tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocNode {
	pub title: String,
	pub target: String,
	pub children: Vec<TocNode>,
}

impl TocNode {
	#[must_use]
	pub const fn new(title: String, target: String) -> Self {
		Self { title, target, children: Vec::new() }
	}

	#[must_use]
	pub fn with_children(mut self, children: Vec<Self>) -> Self {
		self.children = children;
		self
	}
}

/// One keyword of the alphabetical index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
	pub keyword: String,
	pub target: String,
}

/// Read-only access to the loaded document. Container parsing lives behind
/// this boundary; the shell only ever sees resolved page content.
pub trait DocumentAccess {
	fn title(&self) -> &str;
	fn home_target(&self) -> &str;
	fn resolve(&self, target: &str) -> Resolution;
	fn table_of_contents(&self) -> &[TocNode];
	fn index(&self) -> &[IndexEntry];
	fn encoding(&self) -> TextEncoding;
	fn set_encoding(&mut self, encoding: TextEncoding);
	/// Every addressable page, in document order.
	fn page_list(&self) -> Vec<String>;
}

/// Loads a document from a filesystem path.
pub trait DocumentProvider {
	/// # Errors
	///
	/// Returns an error if the path cannot be read or holds no pages.
	fn load(&self, path: &Path) -> anyhow::Result<Box<dyn DocumentAccess>>;
}

#[must_use]
pub fn is_external_url(target: &str) -> bool {
	let lower = target.trim().to_ascii_lowercase();
	lower.starts_with("http:") || lower.starts_with("https:") || lower.starts_with("mailto:")
}

/// Normalizes a document-relative target for lookup: trims, drops the
/// fragment, percent-decodes, and strips leading "./" and "/" so that
/// "/pages/a.html#top" and "pages/a.html" name the same page.
#[must_use]
pub fn normalize_target(target: &str) -> String {
	let without_fragment = target.trim().split('#').next().unwrap_or_default();
	let decoded = percent_decode_str(without_fragment).decode_utf8_lossy();
	let mut path = decoded.as_ref();
	while let Some(rest) = path.strip_prefix("./") {
		path = rest;
	}
	path.trim_start_matches('/').to_string()
}

/// Depth-first flattening of the contents tree into (title, target) pairs
/// in document order.
#[must_use]
pub fn flatten_toc(nodes: &[TocNode]) -> Vec<(String, String)> {
	let mut flat = Vec::new();
	collect_flat(nodes, &mut flat);
	flat
}

fn collect_flat(nodes: &[TocNode], out: &mut Vec<(String, String)>) {
	for node in nodes {
		out.push((node.title.clone(), node.target.clone()));
		collect_flat(&node.children, out);
	}
}

/// Finds the first contents node naming the same page as `target`.
#[must_use]
pub fn find_in_toc<'a>(nodes: &'a [TocNode], target: &str) -> Option<&'a TocNode> {
	let wanted = normalize_target(target);
	find_normalized(nodes, &wanted)
}

fn find_normalized<'a>(nodes: &'a [TocNode], wanted: &str) -> Option<&'a TocNode> {
	for node in nodes {
		if !node.target.is_empty() && normalize_target(&node.target) == wanted {
			return Some(node);
		}
		if let Some(found) = find_normalized(&node.children, wanted) {
			return Some(found);
		}
	}
	None
}

/// An in-memory document: raw page bytes keyed by normalized target,
/// decoded on resolution through the chosen encoding. Container decoders
/// produce one of these; so do the directory provider and the test suite.
pub struct MemoryDocument {
	title: String,
	home: String,
	pages: BTreeMap<String, Vec<u8>>,
	toc: Vec<TocNode>,
	index: Vec<IndexEntry>,
	encoding: TextEncoding,
}

impl MemoryDocument {
	#[must_use]
	pub fn new(title: impl Into<String>) -> Self {
		Self {
			title: title.into(),
			home: String::new(),
			pages: BTreeMap::new(),
			toc: Vec::new(),
			index: Vec::new(),
			encoding: TextEncoding::default(),
		}
	}

	#[must_use]
	pub fn with_page(mut self, target: &str, bytes: impl Into<Vec<u8>>) -> Self {
		let key = normalize_target(target);
		if self.home.is_empty() {
			self.home.clone_from(&key);
		}
		self.pages.insert(key, bytes.into());
		self
	}

	#[must_use]
	pub fn with_home(mut self, target: &str) -> Self {
		self.home = normalize_target(target);
		self
	}

	#[must_use]
	pub fn with_toc(mut self, toc: Vec<TocNode>) -> Self {
		self.toc = toc;
		self
	}

	#[must_use]
	pub fn with_index(mut self, index: Vec<IndexEntry>) -> Self {
		self.index = index;
		self
	}

	#[must_use]
	pub const fn with_encoding(mut self, encoding: TextEncoding) -> Self {
		self.encoding = encoding;
		self
	}
}

impl DocumentAccess for MemoryDocument {
	fn title(&self) -> &str {
		&self.title
	}

	fn home_target(&self) -> &str {
		&self.home
	}

	fn resolve(&self, target: &str) -> Resolution {
		if target.trim().is_empty() {
			return Resolution::NotFound;
		}
		if is_external_url(target) {
			return Resolution::External(target.trim().to_string());
		}
		let key = normalize_target(target);
		if key.is_empty() {
			return Resolution::NotFound;
		}
		self.pages.get(&key).map_or(Resolution::NotFound, |bytes| Resolution::Content(self.encoding.decode(bytes)))
	}

	fn table_of_contents(&self) -> &[TocNode] {
		&self.toc
	}

	fn index(&self) -> &[IndexEntry] {
		&self.index
	}

	fn encoding(&self) -> TextEncoding {
		self.encoding
	}

	fn set_encoding(&mut self, encoding: TextEncoding) {
		self.encoding = encoding;
	}

	fn page_list(&self) -> Vec<String> {
		self.pages.keys().cloned().collect()
	}
}

/// Loads a directory of HTML pages as one document. It stands in for a
/// container decoder so the binary and the autotest mode can drive the
/// shell against real files.
pub struct DirectoryProvider;

const PAGE_EXTENSIONS: &[&str] = &["htm", "html", "xhtml"];

impl DocumentProvider for DirectoryProvider {
	fn load(&self, path: &Path) -> anyhow::Result<Box<dyn DocumentAccess>> {
		let entries = fs::read_dir(path).with_context(|| format!("cannot read {}", path.display()))?;
		let mut files: Vec<_> = entries
			.filter_map(Result::ok)
			.map(|entry| entry.path())
			.filter(|page| {
				page.extension()
					.and_then(|ext| ext.to_str())
					.is_some_and(|ext| PAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
			})
			.collect();
		files.sort();
		if files.is_empty() {
			bail!("no pages found in {}", path.display());
		}
		let title = path.file_name().map_or_else(|| "Untitled".to_string(), |name| name.to_string_lossy().to_string());
		let mut document = MemoryDocument::new(title);
		let mut toc = Vec::new();
		let mut index = Vec::new();
		for file in &files {
			let Some(name) = file.file_name().and_then(|n| n.to_str()) else {
				continue;
			};
			let bytes = fs::read(file).with_context(|| format!("cannot read {}", file.display()))?;
			let stem = file.file_stem().map_or_else(String::new, |s| s.to_string_lossy().to_string());
			document = document.with_page(name, bytes);
			toc.push(TocNode::new(stem.clone(), name.to_string()));
			index.push(IndexEntry { keyword: stem, target: name.to_string() });
		}
		index.sort_by(|a, b| a.keyword.to_lowercase().cmp(&b.keyword.to_lowercase()));
		let mut document = document.with_toc(toc).with_index(index);
		if document.resolve("index.html") != Resolution::NotFound {
			document = document.with_home("index.html");
		}
		Ok(Box::new(document))
	}
}
