mod autotest;
mod events;
mod panels;
mod view_mgr;
mod viewer;

pub use autotest::{AutotestAction, AutotestState};
pub use events::UserEvent;
pub use panels::{BookmarksTab, ContentsTab, IndexTab, Panel, SearchHit, SearchTab};
pub use view_mgr::{ViewId, ViewInstance, ViewWindowMgr, WindowEvent};
pub use viewer::ViewerShell;
