//! Bounded undo/redo history of full board snapshots.

use std::collections::VecDeque;

use crate::background::Background;
use crate::element::Element;

/// Default number of undo steps kept.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Everything undo/redo restores: the elements (ids included) and the
/// background.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Elements in paint order.
    pub elements: Vec<Element>,
    /// Board background.
    pub background: Background,
}

/// Undo and redo stacks.
///
/// Callers take a [`checkpoint`](Self::checkpoint) of the state *before*
/// each discrete change. A new checkpoint clears the redo stack.
#[derive(Debug, Clone)]
pub struct History {
    undo: VecDeque<Snapshot>,
    redo: Vec<Snapshot>,
    limit: usize,
}

impl History {
    /// Create a history keeping at most `limit` undo steps. A limit of 0
    /// disables history.
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            undo: VecDeque::with_capacity(limit.min(DEFAULT_HISTORY_LIMIT)),
            redo: Vec::new(),
            limit,
        }
    }

    /// Record the state before a change.
    pub fn checkpoint(&mut self, before: Snapshot) {
        if self.limit == 0 {
            return;
        }
        if self.undo.back() == Some(&before) {
            self.redo.clear();
            return;
        }
        self.undo.push_back(before);
        while self.undo.len() > self.limit {
            self.undo.pop_front();
        }
        self.redo.clear();
    }

    /// Step back. `current` is moved onto the redo stack and the previous
    /// state is returned, or `None` when there is nothing to undo.
    pub fn undo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let previous = self.undo.pop_back()?;
        self.redo.push(current);
        Some(previous)
    }

    /// Step forward again after an undo.
    pub fn redo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let next = self.redo.pop()?;
        self.undo.push_back(current);
        while self.undo.len() > self.limit {
            self.undo.pop_front();
        }
        Some(next)
    }

    /// Whether an undo step is available.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    /// Whether a redo step is available.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Number of undo steps available.
    #[must_use]
    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    /// Forget everything (after a restore).
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::ElementKind;

    fn snapshot(captions: &[&str]) -> Snapshot {
        Snapshot {
            elements: captions
                .iter()
                .map(|c| Element::new(ElementKind::text(*c)))
                .collect(),
            background: Background::default(),
        }
    }

    #[test]
    fn test_undo_redo_cycle() {
        let mut history = History::default();
        let a = snapshot(&[]);
        let b = snapshot(&["one"]);
        let c = snapshot(&["one", "two"]);

        history.checkpoint(a.clone());
        history.checkpoint(b.clone());

        assert_eq!(history.undo(c.clone()), Some(b.clone()));
        assert_eq!(history.undo(b.clone()), Some(a.clone()));
        assert_eq!(history.undo(a.clone()), None);

        assert_eq!(history.redo(a.clone()), Some(b.clone()));
        assert_eq!(history.redo(b), Some(c));
        assert!(!history.can_redo());
    }

    #[test]
    fn test_checkpoint_clears_redo() {
        let mut history = History::default();
        history.checkpoint(snapshot(&[]));
        let restored = history.undo(snapshot(&["x"]));
        assert!(restored.is_some());
        assert!(history.can_redo());

        history.checkpoint(snapshot(&[]));
        assert!(!history.can_redo());
    }

    #[test]
    fn test_limit_drops_oldest() {
        let mut history = History::new(3);
        for i in 0..10 {
            let caption = i.to_string();
            history.checkpoint(snapshot(&[caption.as_str()]));
        }
        assert_eq!(history.undo_len(), 3);
        let newest = history.undo(snapshot(&[])).expect("undo");
        assert_eq!(newest.elements[0].text_content(), Some("9"));
    }

    #[test]
    fn test_zero_limit_disables() {
        let mut history = History::new(0);
        history.checkpoint(snapshot(&[]));
        assert!(!history.can_undo());
    }
}
