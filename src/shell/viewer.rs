use std::{
	collections::VecDeque,
	path::{Path, PathBuf},
};

use log::{debug, info, warn};

use crate::{
	config::{ConfigManager, StoredBookmark},
	document::{self, DocumentProvider, Resolution},
	encoding::TextEncoding,
	error::NavError,
	session::DocumentSession,
	types::{NavState, OpenOptions},
};

use super::{
	autotest::{AutotestAction, AutotestState},
	events::UserEvent,
	panels::{BookmarksTab, ContentsTab, IndexTab, Panel, SearchTab},
	view_mgr::{ViewId, ViewInstance, ViewWindowMgr},
};

/// The navigation orchestrator. Owns the tab manager, the auxiliary
/// panels, and the live document session; every navigation request in the
/// application funnels through here, and each one runs to completion
/// before the next is taken off the event queue.
pub struct ViewerShell {
	provider: Box<dyn DocumentProvider>,
	config: ConfigManager,
	views: ViewWindowMgr,
	contents_tab: ContentsTab,
	index_tab: IndexTab,
	search_tab: SearchTab,
	bookmarks_tab: BookmarksTab,
	session: Option<DocumentSession>,
	nav_state: NavState,
	status: String,
	external_requests: Vec<String>,
	queue: VecDeque<UserEvent>,
	dispatching: bool,
	autotest: AutotestState,
	shutdown_requested: bool,
}

impl ViewerShell {
	#[must_use]
	pub fn new(provider: Box<dyn DocumentProvider>, config: ConfigManager) -> Self {
		let max_tabs = config.app().max_open_tabs;
		Self {
			provider,
			config,
			views: ViewWindowMgr::new(max_tabs),
			contents_tab: ContentsTab::new(),
			index_tab: IndexTab::new(),
			search_tab: SearchTab::new(),
			bookmarks_tab: BookmarksTab::new(),
			session: None,
			nav_state: NavState::default(),
			status: String::new(),
			external_requests: Vec::new(),
			queue: VecDeque::new(),
			dispatching: false,
			autotest: AutotestState::Off,
			shutdown_requested: false,
		}
	}

	// ---- session lifecycle ----

	/// Loads a document, tearing the previous session down first. With
	/// `open_home` the document's start page opens in the content tree.
	///
	/// # Errors
	///
	/// Returns an error if the provider cannot load the path; the previous
	/// session stays intact in that case.
	pub fn load_file(&mut self, path: &Path, open_home: bool) -> anyhow::Result<()> {
		let document = self.provider.load(path)?;
		self.close_file();
		let mut session = DocumentSession::new(path, document);
		let path_str = session.file_path_str();
		if let Some(encoding) = self.config.get_document_encoding(&path_str).and_then(TextEncoding::from_label) {
			session.set_encoding(encoding);
		}
		self.contents_tab.document_loaded(session.document());
		self.index_tab.document_loaded(session.document());
		self.search_tab.document_loaded(session.document());
		self.bookmarks_tab.document_loaded(session.document());
		self.bookmarks_tab.set_items(self.config.get_bookmarks(&path_str).to_vec());
		self.config.add_recent_document(&path_str);
		self.config.flush();
		let home = session.document().home_target().to_string();
		let title = session.title();
		self.session = Some(session);
		self.show_in_status_bar(format!("Opened {title}"));
		if open_home && !home.is_empty() {
			let _ = self.open_page(&home, OpenOptions::new().with_content_tree().with_add_to_history());
		}
		Ok(())
	}

	/// Tears the live session down: closes every tab, clears history, and
	/// broadcasts the closure to all panels.
	pub fn close_file(&mut self) {
		if self.session.take().is_none() {
			return;
		}
		self.views.close_all();
		self.drain_window_events();
		self.contents_tab.document_closed();
		self.index_tab.document_closed();
		self.search_tab.document_closed();
		self.bookmarks_tab.document_closed();
		self.update_navigation_state();
		info!("document closed");
	}

	// ---- navigation orchestrator ----

	/// Opens `target` according to `options`. See the flag semantics on
	/// [`OpenOptions`]; failures are surfaced on the status line and leave
	/// tab and history state untouched.
	///
	/// # Errors
	///
	/// Returns [`NavError`] for the recoverable failure taxonomy; never
	/// panics and never leaves partial state behind.
	pub fn open_page(&mut self, target: &str, options: OpenOptions) -> Result<(), NavError> {
		let options = options.normalized();
		let target = target.trim().to_string();
		let resolution = match self.session.as_ref() {
			Some(session) if !target.is_empty() => session.document().resolve(&target),
			Some(_) => Resolution::NotFound,
			None => return Err(self.report(NavError::NoDocumentLoaded)),
		};
		debug!("open_page {target} ({options:?})");
		match resolution {
			Resolution::NotFound => Err(self.report(NavError::PageNotFound(target))),
			Resolution::External(url) => {
				info!("deferring external target: {url}");
				self.external_requests.push(url);
				Ok(())
			}
			Resolution::Content(content) => {
				let destination = self.destination_view(options)?;
				if let Some(view) = self.views.get_mut(destination) {
					if options.add_to_history && view.current() != Some(target.as_str()) {
						view.record_departure();
					}
					view.show(&target, content);
				}
				if options.content_tree {
					self.contents_tab.locate(&target);
				}
				self.drain_window_events();
				self.update_navigation_state();
				Ok(())
			}
		}
	}

	/// Picks the instance that receives the page, creating one when asked
	/// to (or when none exists at all). Tab exhaustion falls back to the
	/// active tab.
	fn destination_view(&mut self, options: OpenOptions) -> Result<ViewId, NavError> {
		if options.new_tab {
			match self.views.create_tab(!options.background) {
				Ok(id) => return Ok(id),
				Err(err) => {
					self.show_in_status_bar(err.to_string());
					if let Some(id) = self.views.active_id() {
						return Ok(id);
					}
					return Err(err);
				}
			}
		}
		match self.views.active_id() {
			Some(id) => Ok(id),
			None => match self.views.create_tab(true) {
				Ok(id) => Ok(id),
				Err(err) => Err(self.report(err)),
			},
		}
	}

	/// Returns to the previous page of the active instance. A no-op when
	/// nothing is active or the back stack is empty; a stale entry that no
	/// longer resolves is reported and both stacks stay untouched.
	pub fn navigate_back(&mut self) {
		let Some(target) = self.views.active().and_then(|view| view.peek_back()).map(str::to_string) else {
			return;
		};
		let Some(content) = self.resolve_for_history(&target) else {
			return;
		};
		if let Some(view) = self.views.active_mut() {
			view.commit_back(content);
		}
		self.update_navigation_state();
		debug!("navigated back to {target}");
	}

	pub fn navigate_forward(&mut self) {
		let Some(target) = self.views.active().and_then(|view| view.peek_forward()).map(str::to_string) else {
			return;
		};
		let Some(content) = self.resolve_for_history(&target) else {
			return;
		};
		if let Some(view) = self.views.active_mut() {
			view.commit_forward(content);
		}
		self.update_navigation_state();
		debug!("navigated forward to {target}");
	}

	fn resolve_for_history(&mut self, target: &str) -> Option<String> {
		let resolution = self.session.as_ref().map(|session| session.document().resolve(target));
		match resolution {
			Some(Resolution::Content(content)) => Some(content),
			Some(_) => {
				let _ = self.report(NavError::PageNotFound(target.to_string()));
				None
			}
			None => None,
		}
	}

	/// Decides whether the viewer follows a link from rendered content.
	/// Internal links navigate with history and return true; external ones
	/// return false and the caller dispatches them (system browser).
	pub fn activate_link(&mut self, link: &str) -> bool {
		if link.trim().is_empty() {
			return false;
		}
		if document::is_external_url(link) {
			debug!("external link left to the caller: {link}");
			return false;
		}
		let _ = self.open_page(link, OpenOptions::new().with_add_to_history());
		true
	}

	/// Panel callback: a user picked a target in the contents, index,
	/// search, or bookmarks panel. Re-entrant calls made while an event is
	/// dispatching are queued, preserving navigation order.
	pub fn on_user_selected_target(&mut self, target: &str) {
		let options = OpenOptions::new().with_content_tree().with_add_to_history();
		if self.dispatching {
			self.queue.push_back(UserEvent::OpenPage { target: target.to_string(), flags: options.into() });
			return;
		}
		let _ = self.open_page(target, options);
	}

	// ---- event dispatch ----

	/// Single dispatch point for user input and injected events. Each
	/// event runs to completion before the next one starts; events posted
	/// during dispatch are appended to the queue.
	pub fn post_event(&mut self, event: UserEvent) {
		self.queue.push_back(event);
		if !self.dispatching {
			self.pump();
		}
	}

	/// Accepts the raw `{action, args}` shape; unrecognized actions are
	/// logged and dropped.
	pub fn post_raw_event(&mut self, action: &str, args: &[String]) {
		match UserEvent::parse(action, args) {
			Some(event) => self.post_event(event),
			None => warn!("ignoring unrecognized user event {action:?}"),
		}
	}

	fn pump(&mut self) {
		self.dispatching = true;
		while let Some(event) = self.queue.pop_front() {
			self.handle_user_event(event);
		}
		self.dispatching = false;
	}

	fn handle_user_event(&mut self, event: UserEvent) {
		debug!("dispatching {event:?}");
		match event {
			UserEvent::OpenFile { path } => {
				if let Err(err) = self.load_file(&path, true) {
					self.show_in_status_bar(format!("Failed to open {}: {err:#}", path.display()));
				}
			}
			UserEvent::OpenPage { target, flags } => {
				let _ = self.open_page(&target, flags.into());
			}
			UserEvent::FindInIndex { keyword } => self.find_in_index(&keyword),
			UserEvent::RunAutotestStep => self.run_autotest_step(),
		}
	}

	// ---- panel-facing actions ----

	/// Looks a keyword up in the index panel and navigates to its entry.
	pub fn find_in_index(&mut self, keyword: &str) {
		match self.index_tab.select(keyword) {
			Some(target) => self.on_user_selected_target(&target),
			None => self.show_in_status_bar(format!("No index entry for {keyword:?}")),
		}
	}

	/// Runs a title search and reports the hit count on the status line.
	pub fn search(&mut self, query: &str) -> usize {
		let Some(session) = self.session.as_ref() else {
			let _ = self.report(NavError::NoDocumentLoaded);
			return 0;
		};
		let hits = self.search_tab.run_query(session.document(), query);
		self.show_in_status_bar(format!("{hits} search results"));
		hits
	}

	/// Re-synchronizes the contents selection to the active page.
	pub fn locate_in_contents(&mut self) {
		if let Some(target) = self.views.active().and_then(ViewInstance::current).map(str::to_string) {
			self.contents_tab.locate(&target);
		}
	}

	// ---- toolbar actions ----

	pub fn navigate_home(&mut self) {
		let Some(home) = self.session.as_ref().map(|session| session.document().home_target().to_string()) else {
			let _ = self.report(NavError::NoDocumentLoaded);
			return;
		};
		if home.is_empty() {
			self.show_in_status_bar("This document has no start page");
			return;
		}
		let _ = self.open_page(&home, OpenOptions::new().with_content_tree().with_add_to_history());
	}

	pub fn navigate_prev_in_toc(&mut self) {
		self.navigate_in_toc(false);
	}

	pub fn navigate_next_in_toc(&mut self) {
		self.navigate_in_toc(true);
	}

	/// Walks the contents tree in document order relative to the active
	/// page.
	fn navigate_in_toc(&mut self, forward: bool) {
		let Some(session) = self.session.as_ref() else {
			let _ = self.report(NavError::NoDocumentLoaded);
			return;
		};
		let flat: Vec<(String, String)> = document::flatten_toc(session.document().table_of_contents())
			.into_iter()
			.filter(|(_, target)| !target.is_empty())
			.collect();
		let Some(current) = self.views.active().and_then(ViewInstance::current) else {
			return;
		};
		let wanted = document::normalize_target(current);
		let Some(position) = flat.iter().position(|(_, target)| document::normalize_target(target) == wanted) else {
			self.show_in_status_bar("The current page is not in the table of contents");
			return;
		};
		let neighbor = if forward { position.checked_add(1) } else { position.checked_sub(1) };
		match neighbor.and_then(|idx| flat.get(idx)) {
			Some((_, target)) => {
				let target = target.clone();
				let _ = self.open_page(&target, OpenOptions::new().with_content_tree().with_add_to_history());
			}
			None => {
				let edge = if forward { "last" } else { "first" };
				self.show_in_status_bar(format!("Already at the {edge} topic"));
			}
		}
	}

	pub fn activate_tab(&mut self, id: ViewId) {
		if self.views.activate(id) {
			self.drain_window_events();
			self.update_navigation_state();
		}
	}

	pub fn close_current_tab(&mut self) {
		if let Some(id) = self.views.active_id() {
			self.views.close_tab(id);
			self.drain_window_events();
			self.update_navigation_state();
		}
	}

	/// Switches the session encoding, persists the choice, and re-renders
	/// every open tab's page under the new codec.
	pub fn set_text_encoding(&mut self, label: &str) -> bool {
		let Some(encoding) = TextEncoding::from_label(label) else {
			self.show_in_status_bar(format!("Unknown encoding {label:?}"));
			return false;
		};
		let Some(session) = self.session.as_mut() else {
			let _ = self.report(NavError::NoDocumentLoaded);
			return false;
		};
		session.set_encoding(encoding);
		let path_str = session.file_path_str();
		self.config.set_document_encoding(&path_str, encoding.label());
		self.config.flush();
		self.refresh_all_browsers();
		self.show_in_status_bar(format!("Encoding set to {}", encoding.label()));
		true
	}

	/// Re-resolves the active tab's page, e.g. after the document changed
	/// under it.
	pub fn refresh_current_browser(&mut self) {
		let refreshed = {
			let Some(session) = self.session.as_ref() else {
				return;
			};
			self.views.active().and_then(ViewInstance::current).and_then(|target| {
				match session.document().resolve(target) {
					Resolution::Content(content) => Some(content),
					_ => None,
				}
			})
		};
		if let Some(content) = refreshed {
			if let Some(view) = self.views.active_mut() {
				view.refresh(content);
			}
		}
	}

	fn refresh_all_browsers(&mut self) {
		let mut updates = Vec::new();
		{
			let Some(session) = self.session.as_ref() else {
				return;
			};
			for view in self.views.iter() {
				if let Some(target) = view.current() {
					if let Resolution::Content(content) = session.document().resolve(target) {
						updates.push((view.id(), content));
					}
				}
			}
		}
		for (id, content) in updates {
			if let Some(view) = self.views.get_mut(id) {
				view.refresh(content);
			}
		}
	}

	/// Bookmarks the active page under `title` (or the page target when
	/// empty) and persists it.
	pub fn add_bookmark(&mut self, title: &str) {
		let Some(target) = self.views.active().and_then(ViewInstance::current).map(str::to_string) else {
			self.show_in_status_bar("Nothing to bookmark");
			return;
		};
		let Some(path_str) = self.session.as_ref().map(DocumentSession::file_path_str) else {
			return;
		};
		let title = if title.trim().is_empty() { target.clone() } else { title.trim().to_string() };
		self.config.add_bookmark(&path_str, StoredBookmark { title, target });
		self.config.flush();
		self.bookmarks_tab.set_items(self.config.get_bookmarks(&path_str).to_vec());
		self.show_in_status_bar("Bookmark added");
	}

	/// Extracts the active page into the session temp area for an external
	/// viewer; the file disappears with the session.
	///
	/// # Errors
	///
	/// Returns an error when nothing is open or the page cannot be written.
	pub fn extract_current_page(&mut self, temp_root: &Path) -> anyhow::Result<PathBuf> {
		let Some(target) = self.views.active().and_then(ViewInstance::current).map(str::to_string) else {
			anyhow::bail!("no page is displayed");
		};
		let Some(session) = self.session.as_mut() else {
			anyhow::bail!("no document is loaded");
		};
		session.extract_resource(&target, temp_root)
	}

	/// Extracts the whole document to `dest`.
	///
	/// # Errors
	///
	/// Returns an error when nothing is open or a page cannot be written.
	pub fn extract_all(&self, dest: &Path) -> anyhow::Result<usize> {
		let Some(session) = self.session.as_ref() else {
			anyhow::bail!("no document is loaded");
		};
		session.extract_all(dest)
	}

	// ---- autotest ----

	pub fn begin_autotest(&mut self) {
		info!("autotest armed");
		self.autotest = AutotestState::Initial;
	}

	#[must_use]
	pub const fn autotest_state(&self) -> AutotestState {
		self.autotest
	}

	#[must_use]
	pub const fn shutdown_requested(&self) -> bool {
		self.shutdown_requested
	}

	fn run_autotest_step(&mut self) {
		let (action, next) = self.autotest.tick();
		self.autotest = next;
		match action {
			None => {}
			Some(AutotestAction::OpenHomePage) => self.navigate_home(),
			Some(AutotestAction::SelectFirstIndexEntry) => {
				match self.index_tab.entries().first().map(|entry| entry.keyword.clone()) {
					Some(keyword) => self.find_in_index(&keyword),
					None => warn!("autotest: the index is empty"),
				}
			}
			Some(AutotestAction::RequestShutdown) => {
				info!("autotest finished, requesting shutdown");
				self.shutdown_requested = true;
			}
		}
	}

	// ---- shared state plumbing ----

	pub fn show_in_status_bar(&mut self, text: impl Into<String>) {
		self.status = text.into();
		info!("{}", self.status);
	}

	fn report(&mut self, err: NavError) -> NavError {
		warn!("{err}");
		self.show_in_status_bar(err.to_string());
		err
	}

	fn drain_window_events(&mut self) {
		for event in self.views.take_events() {
			debug!("{event:?}");
		}
	}

	/// Recomputes the back/forward affordances from the active instance
	/// and pushes them to every panel.
	fn update_navigation_state(&mut self) {
		let state = self.views.active().map_or_else(NavState::default, |view| NavState {
			back_enabled: view.back_available(),
			forward_enabled: view.forward_available(),
		});
		self.nav_state = state;
		self.contents_tab.active_view_state(state);
		self.index_tab.active_view_state(state);
		self.search_tab.active_view_state(state);
		self.bookmarks_tab.active_view_state(state);
	}

	// ---- accessors ----

	#[must_use]
	pub fn current_browser(&self) -> Option<&ViewInstance> {
		self.views.active()
	}

	#[must_use]
	pub const fn view_window_mgr(&self) -> &ViewWindowMgr {
		&self.views
	}

	#[must_use]
	pub const fn contents_window(&self) -> &ContentsTab {
		&self.contents_tab
	}

	#[must_use]
	pub const fn index_window(&self) -> &IndexTab {
		&self.index_tab
	}

	#[must_use]
	pub const fn search_window(&self) -> &SearchTab {
		&self.search_tab
	}

	#[must_use]
	pub const fn bookmarks_window(&self) -> &BookmarksTab {
		&self.bookmarks_tab
	}

	#[must_use]
	pub const fn session(&self) -> Option<&DocumentSession> {
		self.session.as_ref()
	}

	#[must_use]
	pub const fn nav_state(&self) -> NavState {
		self.nav_state
	}

	#[must_use]
	pub fn status(&self) -> &str {
		&self.status
	}

	#[must_use]
	pub const fn config(&self) -> &ConfigManager {
		&self.config
	}

	/// External resolutions accumulated since the last call; the embedding
	/// driver dispatches them to the system browser.
	pub fn take_external_requests(&mut self) -> Vec<String> {
		std::mem::take(&mut self.external_requests)
	}
}

#[cfg(test)]
mod tests {
	use anyhow::bail;

	use super::*;
	use crate::{
		document::{DocumentAccess, IndexEntry, MemoryDocument, TocNode},
		types::OpenFlags,
	};

	struct FixtureProvider;

	impl DocumentProvider for FixtureProvider {
		fn load(&self, path: &Path) -> anyhow::Result<Box<dyn DocumentAccess>> {
			if path.ends_with("missing.chm") {
				bail!("no such file");
			}
			let document = MemoryDocument::new("Test Manual")
				.with_page("index.html", b"welcome".to_vec())
				.with_page("intro.html", b"introduction".to_vec())
				.with_page("ch1.html", b"chapter one".to_vec())
				.with_page("ch2.html", b"chapter two".to_vec())
				.with_page("ch3.html", b"chapter three".to_vec())
				.with_home("index.html")
				.with_toc(vec![
					TocNode::new("Welcome".to_string(), "index.html".to_string()),
					TocNode::new("Introduction".to_string(), "intro.html".to_string()),
					TocNode::new("Chapters".to_string(), String::new()).with_children(vec![
						TocNode::new("Chapter One".to_string(), "ch1.html".to_string()),
						TocNode::new("Chapter Two".to_string(), "ch2.html".to_string()),
						TocNode::new("Chapter Three".to_string(), "ch3.html".to_string()),
					]),
				])
				.with_index(vec![
					IndexEntry { keyword: "chapter one".to_string(), target: "ch1.html".to_string() },
					IndexEntry { keyword: "introduction".to_string(), target: "intro.html".to_string() },
				]);
			Ok(Box::new(document))
		}
	}

	fn empty_shell() -> ViewerShell {
		ViewerShell::new(Box::new(FixtureProvider), ConfigManager::new())
	}

	fn loaded_shell() -> ViewerShell {
		let mut shell = empty_shell();
		shell.load_file(Path::new("/docs/test.chm"), false).expect("fixture loads");
		shell
	}

	fn current_target(shell: &ViewerShell) -> Option<String> {
		shell.current_browser().and_then(ViewInstance::current).map(str::to_string)
	}

	#[test]
	fn open_page_without_a_document_fails() {
		let mut shell = empty_shell();
		assert_eq!(shell.open_page("intro.html", OpenOptions::new()), Err(NavError::NoDocumentLoaded));
		assert_eq!(shell.status(), "No document is loaded");
		assert!(shell.view_window_mgr().is_empty());
	}

	#[test]
	fn unresolvable_target_mutates_nothing() {
		let mut shell = loaded_shell();
		shell.open_page("intro.html", OpenOptions::new()).expect("known page");
		let err = shell.open_page("nope.html", OpenOptions::new().with_add_to_history());
		assert_eq!(err, Err(NavError::PageNotFound("nope.html".to_string())));
		assert_eq!(shell.view_window_mgr().len(), 1);
		let view = shell.current_browser().expect("tab stays active");
		assert_eq!(view.current(), Some("intro.html"));
		assert!(view.back_stack().is_empty());
		assert!(view.forward_stack().is_empty());
	}

	#[test]
	fn empty_target_is_a_page_not_found() {
		let mut shell = loaded_shell();
		assert_eq!(shell.open_page("   ", OpenOptions::new()), Err(NavError::PageNotFound(String::new())));
	}

	#[test]
	fn first_navigation_creates_the_first_tab() {
		let mut shell = loaded_shell();
		shell
			.open_page("intro.html", OpenOptions::new().with_content_tree().with_add_to_history())
			.expect("known page");
		assert_eq!(shell.view_window_mgr().len(), 1);
		let view = shell.current_browser().expect("a tab is active");
		assert_eq!(view.current(), Some("intro.html"));
		assert_eq!(view.content(), "introduction");
		assert!(view.back_stack().is_empty());
		assert_eq!(shell.contents_window().selection(), Some("intro.html"));
	}

	#[test]
	fn history_scenario_intro_then_ch1_then_back() {
		let mut shell = loaded_shell();
		shell
			.open_page("intro.html", OpenOptions::new().with_content_tree().with_add_to_history())
			.expect("known page");
		shell.open_page("ch1.html", OpenOptions::new().with_add_to_history()).expect("known page");
		{
			let view = shell.current_browser().expect("a tab is active");
			assert_eq!(view.current(), Some("ch1.html"));
			assert_eq!(view.back_stack(), ["intro.html"]);
		}
		assert!(shell.nav_state().back_enabled);
		assert!(!shell.nav_state().forward_enabled);

		shell.navigate_back();
		let view = shell.current_browser().expect("a tab is active");
		assert_eq!(view.current(), Some("intro.html"));
		assert!(view.back_stack().is_empty());
		assert_eq!(view.forward_stack(), ["ch1.html"]);
		assert!(!shell.nav_state().back_enabled);
		assert!(shell.nav_state().forward_enabled);
	}

	#[test]
	fn back_then_forward_is_a_round_trip() {
		let mut shell = loaded_shell();
		shell.open_page("intro.html", OpenOptions::new().with_add_to_history()).expect("known page");
		shell.open_page("ch1.html", OpenOptions::new().with_add_to_history()).expect("known page");
		shell.open_page("ch2.html", OpenOptions::new().with_add_to_history()).expect("known page");
		let before_current = current_target(&shell);
		let before_back = shell.current_browser().expect("active").back_stack().to_vec();
		let before_forward = shell.current_browser().expect("active").forward_stack().to_vec();

		shell.navigate_back();
		shell.navigate_forward();

		let view = shell.current_browser().expect("active");
		assert_eq!(current_target(&shell), before_current);
		assert_eq!(view.back_stack(), before_back.as_slice());
		assert_eq!(view.forward_stack(), before_forward.as_slice());
	}

	#[test]
	fn reopening_the_same_page_without_history_is_a_no_op() {
		let mut shell = loaded_shell();
		shell.open_page("intro.html", OpenOptions::new().with_add_to_history()).expect("known page");
		shell.open_page("intro.html", OpenOptions::new()).expect("known page");
		shell.open_page("intro.html", OpenOptions::new().with_add_to_history()).expect("known page");
		let view = shell.current_browser().expect("active");
		assert_eq!(view.current(), Some("intro.html"));
		assert!(view.back_stack().is_empty());
		assert_eq!(shell.view_window_mgr().len(), 1);
	}

	#[test]
	fn new_tab_opens_foreground_and_preserves_the_old_page() {
		let mut shell = loaded_shell();
		shell.open_page("ch1.html", OpenOptions::new()).expect("known page");
		let old = shell.view_window_mgr().active_id().expect("active");
		shell.open_page("ch2.html", OpenOptions::new().with_new_tab()).expect("known page");
		assert_eq!(shell.view_window_mgr().len(), 2);
		let active = shell.view_window_mgr().active_id().expect("active");
		assert_ne!(active, old);
		assert_eq!(current_target(&shell), Some("ch2.html".to_string()));
		let old_view = shell.view_window_mgr().get(old).expect("old tab still exists");
		assert_eq!(old_view.current(), Some("ch1.html"));
	}

	#[test]
	fn background_tab_does_not_steal_focus() {
		let mut shell = loaded_shell();
		shell.open_page("ch1.html", OpenOptions::new()).expect("known page");
		let old = shell.view_window_mgr().active_id().expect("active");
		shell.open_page("ch3.html", OpenOptions::new().with_new_tab().with_background()).expect("known page");
		assert_eq!(shell.view_window_mgr().len(), 2);
		assert_eq!(shell.view_window_mgr().active_id(), Some(old));
		assert_eq!(current_target(&shell), Some("ch1.html".to_string()));
		let background = shell.view_window_mgr().iter().find(|view| view.id() != old).expect("new tab exists");
		assert_eq!(background.current(), Some("ch3.html"));
	}

	#[test]
	fn every_valid_flag_combination_leaves_one_active_instance() {
		for bits in 0u32..16 {
			let flags = OpenFlags::from_bits_truncate(bits);
			if flags.contains(OpenFlags::BACKGROUND) && !flags.contains(OpenFlags::NEW_TAB) {
				continue;
			}
			let mut shell = loaded_shell();
			shell.open_page("intro.html", OpenOptions::new()).expect("known page");
			let before = shell.view_window_mgr().active_id();
			shell.open_page("ch1.html", flags.into()).expect("known page");
			let active = shell.view_window_mgr().active_id();
			assert!(active.is_some(), "flags {bits:#06b} left no active instance");
			if flags.contains(OpenFlags::BACKGROUND) {
				assert_eq!(active, before, "flags {bits:#06b} moved focus");
			}
		}
	}

	#[test]
	fn background_without_new_tab_reuses_the_active_tab() {
		let mut shell = loaded_shell();
		shell.open_page("intro.html", OpenOptions::new()).expect("known page");
		shell.open_page("ch1.html", OpenFlags::BACKGROUND.into()).expect("known page");
		assert_eq!(shell.view_window_mgr().len(), 1);
		assert_eq!(current_target(&shell), Some("ch1.html".to_string()));
	}

	#[test]
	fn tab_exhaustion_falls_back_to_the_active_tab() {
		let mut config = ConfigManager::new();
		config.app_mut().max_open_tabs = 1;
		let mut shell = ViewerShell::new(Box::new(FixtureProvider), config);
		shell.load_file(Path::new("/docs/test.chm"), false).expect("fixture loads");
		shell.open_page("intro.html", OpenOptions::new()).expect("known page");
		shell.open_page("ch1.html", OpenOptions::new().with_new_tab()).expect("falls back");
		assert_eq!(shell.view_window_mgr().len(), 1);
		assert_eq!(current_target(&shell), Some("ch1.html".to_string()));
	}

	#[test]
	fn external_target_is_deferred_without_touching_tabs() {
		let mut shell = loaded_shell();
		shell.open_page("intro.html", OpenOptions::new()).expect("known page");
		shell.open_page("https://example.com/faq", OpenOptions::new().with_add_to_history()).expect("deferred");
		assert_eq!(shell.take_external_requests(), ["https://example.com/faq"]);
		assert!(shell.take_external_requests().is_empty());
		let view = shell.current_browser().expect("active");
		assert_eq!(view.current(), Some("intro.html"));
		assert!(view.back_stack().is_empty());
	}

	#[test]
	fn activate_link_follows_internal_and_defers_external() {
		let mut shell = loaded_shell();
		shell.open_page("intro.html", OpenOptions::new()).expect("known page");
		assert!(shell.activate_link("ch1.html"));
		let view = shell.current_browser().expect("active");
		assert_eq!(view.current(), Some("ch1.html"));
		assert_eq!(view.back_stack(), ["intro.html"]);

		assert!(!shell.activate_link("https://example.com"));
		assert!(!shell.activate_link("  "));
		assert_eq!(current_target(&shell), Some("ch1.html".to_string()));
	}

	#[test]
	fn content_tree_sync_is_opt_in() {
		let mut shell = loaded_shell();
		shell.open_page("intro.html", OpenOptions::new().with_content_tree()).expect("known page");
		assert_eq!(shell.contents_window().selection(), Some("intro.html"));
		shell.open_page("ch1.html", OpenOptions::new()).expect("known page");
		assert_eq!(shell.contents_window().selection(), Some("intro.html"));
		shell.locate_in_contents();
		assert_eq!(shell.contents_window().selection(), Some("ch1.html"));
	}

	#[test]
	fn panel_selection_navigates_with_tree_and_history() {
		let mut shell = loaded_shell();
		shell.open_page("intro.html", OpenOptions::new()).expect("known page");
		shell.on_user_selected_target("ch2.html");
		let view = shell.current_browser().expect("active");
		assert_eq!(view.current(), Some("ch2.html"));
		assert_eq!(view.back_stack(), ["intro.html"]);
		assert_eq!(shell.contents_window().selection(), Some("ch2.html"));
	}

	#[test]
	fn back_with_no_tabs_is_a_safe_no_op() {
		let mut shell = loaded_shell();
		shell.open_page("intro.html", OpenOptions::new()).expect("known page");
		shell.close_current_tab();
		assert!(shell.view_window_mgr().is_empty());
		assert_eq!(shell.view_window_mgr().active_id(), None);
		shell.navigate_back();
		shell.navigate_forward();
		assert!(shell.view_window_mgr().is_empty());
		assert_eq!(shell.nav_state(), NavState::default());
	}

	#[test]
	fn unknown_raw_events_are_ignored() {
		let mut shell = loaded_shell();
		shell.post_raw_event("self-destruct", &["now".to_string()]);
		shell.post_raw_event("open-page", &[]);
		assert!(shell.view_window_mgr().is_empty());
	}

	#[test]
	fn events_posted_during_dispatch_run_in_order() {
		let mut shell = loaded_shell();
		shell.open_page("intro.html", OpenOptions::new()).expect("known page");
		// find-in-index re-enters navigation through the panel callback,
		// which must queue rather than run inline.
		shell.post_event(UserEvent::FindInIndex { keyword: "chapter one".to_string() });
		let view = shell.current_browser().expect("active");
		assert_eq!(view.current(), Some("ch1.html"));
		assert_eq!(view.back_stack(), ["intro.html"]);
		assert_eq!(shell.contents_window().selection(), Some("ch1.html"));
	}

	#[test]
	fn find_in_index_reports_unknown_keywords() {
		let mut shell = loaded_shell();
		shell.open_page("intro.html", OpenOptions::new()).expect("known page");
		shell.find_in_index("zzz");
		assert_eq!(shell.status(), "No index entry for \"zzz\"");
		assert_eq!(current_target(&shell), Some("intro.html".to_string()));
	}

	#[test]
	fn loading_another_document_tears_the_session_down() {
		let mut shell = loaded_shell();
		shell.open_page("intro.html", OpenOptions::new().with_content_tree()).expect("known page");
		shell.open_page("ch1.html", OpenOptions::new().with_new_tab()).expect("known page");
		assert_eq!(shell.view_window_mgr().len(), 2);
		shell.load_file(Path::new("/docs/other.chm"), true).expect("fixture loads");
		assert_eq!(shell.view_window_mgr().len(), 1);
		assert_eq!(current_target(&shell), Some("index.html".to_string()));
		assert!(shell.current_browser().expect("active").back_stack().is_empty());
		assert_eq!(shell.config().get_recent_documents()[0], "/docs/other.chm");
	}

	#[test]
	fn failed_load_keeps_the_current_session() {
		let mut shell = loaded_shell();
		shell.open_page("intro.html", OpenOptions::new()).expect("known page");
		assert!(shell.load_file(Path::new("/docs/missing.chm"), true).is_err());
		assert!(shell.session().is_some());
		assert_eq!(current_target(&shell), Some("intro.html".to_string()));
	}

	#[test]
	fn close_file_resets_views_and_panels() {
		let mut shell = loaded_shell();
		shell.open_page("intro.html", OpenOptions::new().with_content_tree()).expect("known page");
		shell.close_file();
		assert!(shell.session().is_none());
		assert!(shell.view_window_mgr().is_empty());
		assert!(shell.contents_window().toc().is_empty());
		assert!(shell.index_window().entries().is_empty());
		assert_eq!(shell.open_page("intro.html", OpenOptions::new()), Err(NavError::NoDocumentLoaded));
	}

	#[test]
	fn toc_order_navigation_walks_neighbors() {
		let mut shell = loaded_shell();
		shell.open_page("ch1.html", OpenOptions::new()).expect("known page");
		shell.navigate_next_in_toc();
		assert_eq!(current_target(&shell), Some("ch2.html".to_string()));
		shell.navigate_prev_in_toc();
		assert_eq!(current_target(&shell), Some("ch1.html".to_string()));
	}

	#[test]
	fn toc_order_navigation_stops_at_the_edges() {
		let mut shell = loaded_shell();
		shell.open_page("index.html", OpenOptions::new()).expect("known page");
		shell.navigate_prev_in_toc();
		assert_eq!(current_target(&shell), Some("index.html".to_string()));
		assert_eq!(shell.status(), "Already at the first topic");
	}

	#[test]
	fn navigate_home_opens_the_start_page() {
		let mut shell = loaded_shell();
		shell.open_page("ch2.html", OpenOptions::new().with_add_to_history()).expect("known page");
		shell.navigate_home();
		let view = shell.current_browser().expect("active");
		assert_eq!(view.current(), Some("index.html"));
		assert_eq!(view.back_stack(), ["ch2.html"]);
	}

	#[test]
	fn encoding_switch_rerenders_open_tabs_and_persists() {
		let mut shell = loaded_shell();
		shell.open_page("intro.html", OpenOptions::new()).expect("known page");
		assert!(shell.set_text_encoding("windows-1251"));
		assert_eq!(shell.config().get_document_encoding("/docs/test.chm"), Some("windows-1251"));
		assert_eq!(shell.session().expect("live session").encoding().label(), "windows-1251");
		assert_eq!(current_target(&shell), Some("intro.html".to_string()));
		assert!(!shell.set_text_encoding("martian-7"));
	}

	#[test]
	fn add_bookmark_persists_and_fills_the_panel() {
		let mut shell = loaded_shell();
		shell.open_page("ch1.html", OpenOptions::new()).expect("known page");
		shell.add_bookmark("First chapter");
		assert_eq!(shell.bookmarks_window().items().len(), 1);
		assert_eq!(shell.bookmarks_window().get(0).expect("bookmark exists").target, "ch1.html");
		assert_eq!(shell.config().get_bookmarks("/docs/test.chm").len(), 1);
	}

	#[test]
	fn search_reports_hits_on_the_status_line() {
		let mut shell = loaded_shell();
		assert_eq!(shell.search("chapter"), 3);
		assert_eq!(shell.status(), "3 search results");
		assert_eq!(shell.search_window().results().len(), 3);
	}

	#[test]
	fn autotest_drives_open_index_shutdown() {
		let mut shell = loaded_shell();
		shell.begin_autotest();
		assert_eq!(shell.autotest_state(), AutotestState::Initial);

		shell.post_event(UserEvent::RunAutotestStep);
		assert_eq!(shell.autotest_state(), AutotestState::OpenIndex);
		assert_eq!(current_target(&shell), Some("index.html".to_string()));
		assert!(!shell.shutdown_requested());

		shell.post_event(UserEvent::RunAutotestStep);
		assert_eq!(shell.autotest_state(), AutotestState::Shutdown);
		assert_eq!(current_target(&shell), Some("ch1.html".to_string()));
		assert_eq!(shell.contents_window().selection(), Some("ch1.html"));
		assert!(!shell.shutdown_requested());

		shell.post_event(UserEvent::RunAutotestStep);
		assert_eq!(shell.autotest_state(), AutotestState::Shutdown);
		assert!(shell.shutdown_requested());
	}

	#[test]
	fn autotest_stays_off_until_armed() {
		let mut shell = loaded_shell();
		shell.post_event(UserEvent::RunAutotestStep);
		assert_eq!(shell.autotest_state(), AutotestState::Off);
		assert!(shell.view_window_mgr().is_empty());
		assert!(!shell.shutdown_requested());
	}
}
