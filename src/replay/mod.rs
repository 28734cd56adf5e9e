//! Device-level input replay against live pages.

pub mod cursor;
pub mod event;
pub mod page;
pub mod replayer;

pub use cursor::{CursorState, CursorTable};
pub use event::{EventBatch, InputCommand, KeyCombo};
pub use page::{MouseButton, PageHandle, PageId};
pub use replayer::{InputReplayer, ReplayReport};
