use crate::replay::page::PageId;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Last known pointer position on a page
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CursorState {
    pub x: f64,
    pub y: f64,
}

impl CursorState {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Cursor positions keyed by page identity.
///
/// Entries are created lazily at (0, 0) and removed with [`CursorTable::forget`]
/// when the page closes.
#[derive(Debug, Default)]
pub struct CursorTable {
    cursors: Mutex<HashMap<PageId, CursorState>>,
}

impl CursorTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, page: &PageId) -> CursorState {
        *self.cursors.lock().entry(page.clone()).or_default()
    }

    pub fn set(&self, page: &PageId, state: CursorState) {
        self.cursors.lock().insert(page.clone(), state);
    }

    pub fn forget(&self, page: &PageId) -> Option<CursorState> {
        self.cursors.lock().remove(page)
    }

    pub fn len(&self) -> usize {
        self.cursors.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cursors.lock().is_empty()
    }
}
