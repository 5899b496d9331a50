use std::{
	fs,
	path::{Path, PathBuf},
};

use anyhow::{Context, bail};
use log::{debug, info, warn};
use sha1::{Digest, Sha1};

use crate::{
	document::{DocumentAccess, Resolution, normalize_target},
	encoding::TextEncoding,
};

/// Files extracted for external viewing. Owned by the session; everything
/// registered here is deleted when the session is torn down.
#[derive(Default)]
pub struct TempResourceKeeper {
	files: Vec<PathBuf>,
	dirs: Vec<PathBuf>,
}

impl TempResourceKeeper {
	fn keep_file(&mut self, path: PathBuf) {
		if !self.files.contains(&path) {
			self.files.push(path);
		}
	}

	fn keep_dir(&mut self, path: PathBuf) {
		if !self.dirs.contains(&path) {
			self.dirs.push(path);
		}
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.files.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.files.is_empty()
	}
}

impl Drop for TempResourceKeeper {
	fn drop(&mut self) {
		for file in &self.files {
			if let Err(err) = fs::remove_file(file) {
				debug!("leaving temp file {}: {err}", file.display());
			}
		}
		for dir in &self.dirs {
			let _ = fs::remove_dir(dir);
		}
	}
}

/// The live loaded-document context shared by every view instance:
/// file path, document handle, chosen encoding, and extracted resources.
/// Exactly one session exists at a time; loading another file replaces it.
pub struct DocumentSession {
	file_path: PathBuf,
	base_name: String,
	document: Box<dyn DocumentAccess>,
	temp_keeper: TempResourceKeeper,
}

impl DocumentSession {
	#[must_use]
	pub fn new(file_path: &Path, document: Box<dyn DocumentAccess>) -> Self {
		let base_name = file_path.file_name().map_or_else(String::new, |name| name.to_string_lossy().to_string());
		info!("session opened: {} ({})", file_path.display(), document.title());
		Self { file_path: file_path.to_path_buf(), base_name, document, temp_keeper: TempResourceKeeper::default() }
	}

	#[must_use]
	pub fn document(&self) -> &dyn DocumentAccess {
		self.document.as_ref()
	}

	#[must_use]
	pub const fn file_path(&self) -> &PathBuf {
		&self.file_path
	}

	#[must_use]
	pub fn file_path_str(&self) -> String {
		self.file_path.to_string_lossy().to_string()
	}

	#[must_use]
	pub fn base_name(&self) -> &str {
		&self.base_name
	}

	#[must_use]
	pub fn title(&self) -> String {
		let title = self.document.title();
		if title.is_empty() { self.base_name.clone() } else { title.to_string() }
	}

	#[must_use]
	pub fn encoding(&self) -> TextEncoding {
		self.document.encoding()
	}

	pub fn set_encoding(&mut self, encoding: TextEncoding) {
		info!("encoding changed to {}", encoding.label());
		self.document.set_encoding(encoding);
	}

	#[must_use]
	pub const fn temp_resources(&self) -> &TempResourceKeeper {
		&self.temp_keeper
	}

	/// Session-scoped temp directory, named after the document path so two
	/// sessions over different files never collide.
	fn temp_dir_for(&self, temp_root: &Path) -> PathBuf {
		let mut hasher = Sha1::new();
		hasher.update(self.file_path.to_string_lossy().as_bytes());
		let hash = format!("{:x}", hasher.finalize());
		temp_root.join(format!("chmview_{hash}"))
	}

	/// Extracts one page into the session temp area and returns its path.
	/// The file is removed when the session is dropped.
	///
	/// # Errors
	///
	/// Returns an error if the target does not resolve to page content or
	/// the file cannot be written.
	pub fn extract_resource(&mut self, target: &str, temp_root: &Path) -> anyhow::Result<PathBuf> {
		let content = match self.document.resolve(target) {
			Resolution::Content(content) => content,
			Resolution::External(url) => bail!("{url} is not part of this document"),
			Resolution::NotFound => bail!("no such page: {target}"),
		};
		let dir = self.temp_dir_for(temp_root);
		fs::create_dir_all(&dir).with_context(|| format!("cannot create {}", dir.display()))?;
		let name = flat_file_name(&normalize_target(target));
		let output = dir.join(name);
		fs::write(&output, content).with_context(|| format!("cannot write {}", output.display()))?;
		self.temp_keeper.keep_file(output.clone());
		self.temp_keeper.keep_dir(dir);
		debug!("extracted {target} to {}", output.display());
		Ok(output)
	}

	/// Extracts every page into `dest`, preserving the document layout.
	/// Returns the number of pages written.
	///
	/// # Errors
	///
	/// Returns an error if any page cannot be written.
	pub fn extract_all(&self, dest: &Path) -> anyhow::Result<usize> {
		let mut written = 0usize;
		for target in self.document.page_list() {
			let Resolution::Content(content) = self.document.resolve(&target) else {
				warn!("skipping unresolvable page {target}");
				continue;
			};
			let output = dest.join(normalize_target(&target));
			if let Some(parent) = output.parent() {
				fs::create_dir_all(parent).with_context(|| format!("cannot create {}", parent.display()))?;
			}
			fs::write(&output, content).with_context(|| format!("cannot write {}", output.display()))?;
			written += 1;
		}
		info!("extracted {written} pages to {}", dest.display());
		Ok(written)
	}
}

/// Collapses a normalized target into a single path component.
fn flat_file_name(target: &str) -> String {
	let name = target.rsplit('/').next().unwrap_or(target);
	if name.is_empty() { "page.html".to_string() } else { name.to_string() }
}
