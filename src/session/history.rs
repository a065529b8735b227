//! Back navigation over previously shown cards

/// Visited item ids with a cursor
///
/// Visiting a new card drops anything ahead of the cursor. Going back only moves the
/// cursor.
#[derive(Debug, Clone, Default)]
pub struct NavigationHistory {
    entries: Vec<String>,
    pointer: usize,
}

impl NavigationHistory {
    /// Maximum number of entries to keep
    const MAX_ENTRIES: usize = 1000;

    /// History holding only the starting card
    pub fn starting_at(id: &str) -> Self {
        Self { entries: vec![id.to_string()], pointer: 0 }
    }

    /// Record a newly shown card
    pub fn push(&mut self, id: &str) {
        if self.entries.is_empty() {
            self.entries.push(id.to_string());
            self.pointer = 0;
            return;
        }
        self.entries.truncate(self.pointer + 1);
        self.entries.push(id.to_string());
        if self.entries.len() > Self::MAX_ENTRIES {
            self.entries.remove(0);
        }
        self.pointer = self.entries.len() - 1;
    }

    /// Id one step back, without moving the cursor
    pub fn peek_back(&self) -> Option<&str> {
        let previous = self.pointer.checked_sub(1)?;
        self.entries.get(previous).map(String::as_str)
    }

    /// Step back, returning the id now under the cursor
    pub fn back(&mut self) -> Option<&str> {
        if self.pointer == 0 {
            return None;
        }
        self.pointer -= 1;
        self.entries.get(self.pointer).map(String::as_str)
    }

    /// Id under the cursor
    pub fn current(&self) -> Option<&str> {
        self.entries.get(self.pointer).map(String::as_str)
    }

    /// Whether going back is possible
    pub fn can_go_back(&self) -> bool {
        self.pointer > 0
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
