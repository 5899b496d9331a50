use bitflags::bitflags;

bitflags! {
	/// Open-page behavior flags as they travel on the wire: user events and
	/// saved shortcuts carry a plain flag integer.
	#[derive(Debug, Clone, Copy, PartialEq, Eq)]
	pub struct OpenFlags: u32 {
		const CONTENT_TREE = 1 << 0;
		const ADD_TO_HISTORY = 1 << 1;
		const NEW_TAB = 1 << 2;
		const BACKGROUND = 1 << 3;
	}
}

impl Default for OpenFlags {
	fn default() -> Self {
		Self::CONTENT_TREE
	}
}

/// Validated form of [`OpenFlags`] used inside the shell.
///
/// `background` is only meaningful together with `new_tab`; [`Self::normalized`]
/// drops the stray modifier so downstream code never has to consider the
/// combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OpenOptions {
	pub content_tree: bool,
	pub add_to_history: bool,
	pub new_tab: bool,
	pub background: bool,
}

impl OpenOptions {
	#[must_use]
	pub const fn new() -> Self {
		Self { content_tree: false, add_to_history: false, new_tab: false, background: false }
	}

	#[must_use]
	pub const fn with_content_tree(mut self) -> Self {
		self.content_tree = true;
		self
	}

	#[must_use]
	pub const fn with_add_to_history(mut self) -> Self {
		self.add_to_history = true;
		self
	}

	#[must_use]
	pub const fn with_new_tab(mut self) -> Self {
		self.new_tab = true;
		self
	}

	#[must_use]
	pub const fn with_background(mut self) -> Self {
		self.background = true;
		self
	}

	#[must_use]
	pub const fn normalized(mut self) -> Self {
		if !self.new_tab {
			self.background = false;
		}
		self
	}
}

impl From<OpenFlags> for OpenOptions {
	fn from(flags: OpenFlags) -> Self {
		Self {
			content_tree: flags.contains(OpenFlags::CONTENT_TREE),
			add_to_history: flags.contains(OpenFlags::ADD_TO_HISTORY),
			new_tab: flags.contains(OpenFlags::NEW_TAB),
			background: flags.contains(OpenFlags::BACKGROUND),
		}
		.normalized()
	}
}

impl From<OpenOptions> for OpenFlags {
	fn from(options: OpenOptions) -> Self {
		let options = options.normalized();
		let mut flags = Self::empty();
		flags.set(Self::CONTENT_TREE, options.content_tree);
		flags.set(Self::ADD_TO_HISTORY, options.add_to_history);
		flags.set(Self::NEW_TAB, options.new_tab);
		flags.set(Self::BACKGROUND, options.background);
		flags
	}
}

/// Enabled state of the back/forward affordances, recomputed from the
/// active view's stacks after every navigation or tab change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NavState {
	pub back_enabled: bool,
	pub forward_enabled: bool,
}
