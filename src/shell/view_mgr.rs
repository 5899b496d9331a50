use std::collections::VecDeque;

use log::debug;

use crate::error::NavError;

/// Identifier of one browsing surface (tab). Stable for the lifetime of
/// the instance; never reused within a manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewId(u64);

/// One browsing surface: the page it currently displays plus its own
/// back/forward history.
#[derive(Debug)]
pub struct ViewInstance {
	id: ViewId,
	current: Option<String>,
	content: String,
	back_stack: Vec<String>,
	forward_stack: Vec<String>,
}

impl ViewInstance {
	const fn new(id: ViewId) -> Self {
		Self { id, current: None, content: String::new(), back_stack: Vec::new(), forward_stack: Vec::new() }
	}

	#[must_use]
	pub const fn id(&self) -> ViewId {
		self.id
	}

	#[must_use]
	pub fn current(&self) -> Option<&str> {
		self.current.as_deref()
	}

	#[must_use]
	pub fn content(&self) -> &str {
		&self.content
	}

	#[must_use]
	pub fn back_stack(&self) -> &[String] {
		&self.back_stack
	}

	#[must_use]
	pub fn forward_stack(&self) -> &[String] {
		&self.forward_stack
	}

	#[must_use]
	pub fn back_available(&self) -> bool {
		!self.back_stack.is_empty()
	}

	#[must_use]
	pub fn forward_available(&self) -> bool {
		!self.forward_stack.is_empty()
	}

	#[must_use]
	pub fn peek_back(&self) -> Option<&str> {
		self.back_stack.last().map(String::as_str)
	}

	#[must_use]
	pub fn peek_forward(&self) -> Option<&str> {
		self.forward_stack.last().map(String::as_str)
	}

	/// Displays a page. History is recorded separately via
	/// [`Self::record_departure`]; a plain `show` never touches the stacks.
	pub(crate) fn show(&mut self, target: &str, content: String) {
		self.current = Some(target.to_string());
		self.content = content;
	}

	/// Replaces the rendered content without changing the current target
	/// (used when the encoding changes under a page).
	pub(crate) fn refresh(&mut self, content: String) {
		self.content = content;
	}

	/// Pushes the page being left onto the back stack and invalidates the
	/// forward stack, standard browser semantics for a fresh navigation.
	pub(crate) fn record_departure(&mut self) {
		if let Some(current) = self.current.clone() {
			self.back_stack.push(current);
			self.forward_stack.clear();
		}
	}

	/// Completes a back navigation whose target already resolved: pops the
	/// back stack, saves the current page on the forward stack, renders.
	pub(crate) fn commit_back(&mut self, content: String) {
		if let Some(target) = self.back_stack.pop() {
			if let Some(current) = self.current.take() {
				self.forward_stack.push(current);
			}
			self.show(&target, content);
		}
	}

	pub(crate) fn commit_forward(&mut self, content: String) {
		if let Some(target) = self.forward_stack.pop() {
			if let Some(current) = self.current.take() {
				self.back_stack.push(current);
			}
			self.show(&target, content);
		}
	}
}

/// Queued notification that the active browser changed; dependent panels
/// re-read the active instance's state when they see one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEvent {
	BrowserChanged(Option<ViewId>),
}

/// Owns the ordered collection of view instances and the active pointer.
/// Mutations queue [`WindowEvent`]s which the shell drains after every
/// operation.
pub struct ViewWindowMgr {
	tabs: Vec<ViewInstance>,
	active: Option<usize>,
	next_id: u64,
	max_tabs: usize,
	events: VecDeque<WindowEvent>,
}

impl ViewWindowMgr {
	#[must_use]
	pub const fn new(max_tabs: usize) -> Self {
		Self { tabs: Vec::new(), active: None, next_id: 0, max_tabs, events: VecDeque::new() }
	}

	/// # Errors
	///
	/// Returns [`NavError::TabCreationFailed`] when the tab limit is
	/// reached.
	pub fn create_tab(&mut self, foreground: bool) -> Result<ViewId, NavError> {
		if self.tabs.len() >= self.max_tabs {
			return Err(NavError::TabCreationFailed);
		}
		let id = ViewId(self.next_id);
		self.next_id += 1;
		self.tabs.push(ViewInstance::new(id));
		debug!("created tab {id:?} (foreground: {foreground})");
		if foreground {
			self.active = Some(self.tabs.len() - 1);
			self.events.push_back(WindowEvent::BrowserChanged(Some(id)));
		}
		Ok(id)
	}

	/// Idempotent: re-activating the already-active instance queues no
	/// duplicate event and returns false.
	pub fn activate(&mut self, id: ViewId) -> bool {
		let Some(idx) = self.index_of(id) else {
			return false;
		};
		if self.active == Some(idx) {
			return false;
		}
		self.active = Some(idx);
		self.events.push_back(WindowEvent::BrowserChanged(Some(id)));
		true
	}

	/// Removes the instance. When the active tab closes, activation falls
	/// to the tab immediately to its left, or to none when the collection
	/// empties.
	pub fn close_tab(&mut self, id: ViewId) -> bool {
		let Some(idx) = self.index_of(id) else {
			return false;
		};
		self.tabs.remove(idx);
		match self.active {
			Some(active) if active > idx => self.active = Some(active - 1),
			Some(active) if active == idx => {
				if self.tabs.is_empty() {
					self.active = None;
					self.events.push_back(WindowEvent::BrowserChanged(None));
				} else {
					let fallback = idx.saturating_sub(1);
					self.active = Some(fallback);
					self.events.push_back(WindowEvent::BrowserChanged(Some(self.tabs[fallback].id)));
				}
			}
			_ => {}
		}
		true
	}

	pub fn close_all(&mut self) {
		if self.tabs.is_empty() {
			return;
		}
		self.tabs.clear();
		if self.active.take().is_some() {
			self.events.push_back(WindowEvent::BrowserChanged(None));
		}
	}

	fn index_of(&self, id: ViewId) -> Option<usize> {
		self.tabs.iter().position(|tab| tab.id == id)
	}

	#[must_use]
	pub fn active(&self) -> Option<&ViewInstance> {
		self.active.and_then(|idx| self.tabs.get(idx))
	}

	pub fn active_mut(&mut self) -> Option<&mut ViewInstance> {
		self.active.and_then(|idx| self.tabs.get_mut(idx))
	}

	#[must_use]
	pub fn active_id(&self) -> Option<ViewId> {
		self.active().map(|tab| tab.id)
	}

	#[must_use]
	pub fn get(&self, id: ViewId) -> Option<&ViewInstance> {
		self.index_of(id).and_then(|idx| self.tabs.get(idx))
	}

	pub fn get_mut(&mut self, id: ViewId) -> Option<&mut ViewInstance> {
		self.index_of(id).and_then(|idx| self.tabs.get_mut(idx))
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.tabs.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.tabs.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = &ViewInstance> {
		self.tabs.iter()
	}

	pub fn take_events(&mut self) -> Vec<WindowEvent> {
		self.events.drain(..).collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn mgr() -> ViewWindowMgr {
		ViewWindowMgr::new(8)
	}

	#[test]
	fn foreground_creation_activates_and_notifies_once() {
		let mut views = mgr();
		let id = views.create_tab(true).expect("under the tab limit");
		assert_eq!(views.active_id(), Some(id));
		assert_eq!(views.take_events(), [WindowEvent::BrowserChanged(Some(id))]);
		assert!(views.take_events().is_empty());
	}

	#[test]
	fn background_creation_keeps_focus() {
		let mut views = mgr();
		let first = views.create_tab(true).expect("under the tab limit");
		views.take_events();
		let second = views.create_tab(false).expect("under the tab limit");
		assert_eq!(views.active_id(), Some(first));
		assert!(views.take_events().is_empty());
		assert!(views.get(second).is_some());
	}

	#[test]
	fn redundant_activation_notifies_exactly_once() {
		let mut views = mgr();
		let first = views.create_tab(true).expect("under the tab limit");
		let second = views.create_tab(false).expect("under the tab limit");
		views.take_events();
		assert!(views.activate(second));
		assert!(!views.activate(second));
		assert!(!views.activate(second));
		assert_eq!(views.take_events(), [WindowEvent::BrowserChanged(Some(second))]);
		let _ = first;
	}

	#[test]
	fn closing_the_active_tab_falls_to_the_left_neighbor() {
		let mut views = mgr();
		let a = views.create_tab(true).expect("under the tab limit");
		let b = views.create_tab(true).expect("under the tab limit");
		let c = views.create_tab(true).expect("under the tab limit");
		views.take_events();
		assert!(views.close_tab(c));
		assert_eq!(views.active_id(), Some(b));
		assert_eq!(views.take_events(), [WindowEvent::BrowserChanged(Some(b))]);
		let _ = a;
	}

	#[test]
	fn closing_the_first_active_tab_falls_to_the_new_first() {
		let mut views = mgr();
		let a = views.create_tab(true).expect("under the tab limit");
		let b = views.create_tab(false).expect("under the tab limit");
		views.take_events();
		assert!(views.close_tab(a));
		assert_eq!(views.active_id(), Some(b));
	}

	#[test]
	fn closing_an_inactive_tab_keeps_the_active_pointer() {
		let mut views = mgr();
		let a = views.create_tab(true).expect("under the tab limit");
		let b = views.create_tab(true).expect("under the tab limit");
		views.take_events();
		assert!(views.close_tab(a));
		assert_eq!(views.active_id(), Some(b));
		assert!(views.take_events().is_empty());
	}

	#[test]
	fn closing_the_only_tab_leaves_no_active_instance() {
		let mut views = mgr();
		let only = views.create_tab(true).expect("under the tab limit");
		views.take_events();
		assert!(views.close_tab(only));
		assert!(views.is_empty());
		assert_eq!(views.active_id(), None);
		assert_eq!(views.take_events(), [WindowEvent::BrowserChanged(None)]);
	}

	#[test]
	fn tab_limit_reports_creation_failure() {
		let mut views = ViewWindowMgr::new(1);
		views.create_tab(true).expect("under the tab limit");
		assert_eq!(views.create_tab(true), Err(NavError::TabCreationFailed));
		assert_eq!(views.len(), 1);
	}

	#[test]
	fn back_forward_round_trip_restores_stacks() {
		let mut views = mgr();
		let id = views.create_tab(true).expect("under the tab limit");
		let view = views.get_mut(id).expect("tab exists");
		view.show("intro.html", "intro".to_string());
		view.record_departure();
		view.show("ch1.html", "one".to_string());
		assert_eq!(view.back_stack(), ["intro.html"]);

		view.commit_back("intro".to_string());
		assert_eq!(view.current(), Some("intro.html"));
		assert!(view.back_stack().is_empty());
		assert_eq!(view.forward_stack(), ["ch1.html"]);

		view.commit_forward("one".to_string());
		assert_eq!(view.current(), Some("ch1.html"));
		assert_eq!(view.back_stack(), ["intro.html"]);
		assert!(view.forward_stack().is_empty());
	}

	#[test]
	fn record_departure_invalidates_forward_history() {
		let mut views = mgr();
		let id = views.create_tab(true).expect("under the tab limit");
		let view = views.get_mut(id).expect("tab exists");
		view.show("a.html", String::new());
		view.record_departure();
		view.show("b.html", String::new());
		view.commit_back(String::new());
		assert!(view.forward_available());
		view.record_departure();
		view.show("c.html", String::new());
		assert!(!view.forward_available());
		assert_eq!(view.back_stack(), ["a.html"]);
	}
}
