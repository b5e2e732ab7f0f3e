use crate::command::ErrorReason;
use crate::response::{RespondOptions, Stub};
use std::collections::VecDeque;

///
/// Tells the interceptor how to answer a matching request with a stub.
///
#[derive(Clone, Debug)]
pub struct RespondOverwrite {
    /// The stub to answer with
    pub stub: Stub,
    /// Header and status changes applied on top of the stub
    pub options: RespondOptions,
}

///
/// Tells the interceptor to fail a matching request.
///
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AbortOverwrite {
    /// The network error reported to the page
    pub error_reason: ErrorReason,
}

///
/// A queued overwrite. Sticky entries are reused for every match, one-shot entries are
/// consumed by the first match.
///
#[derive(Clone, Debug)]
pub struct Entry<T> {
    pub(crate) id: u64,
    /// Whether the entry survives being applied
    pub sticky: bool,
    /// The overwrite itself
    pub overwrite: T,
}

///
/// A front-consuming queue of overwrites.
///
/// Only the front entry is ever applied. A one-shot front is removed once it has been
/// applied, so the entry behind it takes over. A sticky front stays where it is and hides
/// every entry queued after it until the queue is cleared.
///
#[derive(Clone, Debug)]
pub struct OverwriteQueue<T> {
    entries: VecDeque<Entry<T>>,
    next_id: u64,
}

impl<T> Default for OverwriteQueue<T> {
    fn default() -> Self {
        Self {
            entries: VecDeque::new(),
            next_id: 0,
        }
    }
}

impl<T: Clone> OverwriteQueue<T> {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an overwrite to the back of the queue.
    pub fn push(&mut self, overwrite: T, sticky: bool) {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push_back(Entry {
            id,
            sticky,
            overwrite,
        });
    }

    /// The entry the next match would apply.
    pub fn front(&self) -> Option<&Entry<T>> {
        self.entries.front()
    }

    ///
    /// Removes the front entry after it was applied, unless it is sticky. Nothing happens
    /// when the front is no longer the entry with `id`, which only occurs when the queue was
    /// changed while the entry was being applied.
    ///
    pub fn consume_front_if_one_shot(&mut self, id: u64) -> bool {
        match self.entries.front() {
            Some(entry) if entry.id == id && !entry.sticky => {
                self.entries.pop_front();
                true
            }
            _ => false,
        }
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of queued entries, shadowed ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::OverwriteQueue;

    fn apply(queue: &mut OverwriteQueue<&'static str>) -> Option<&'static str> {
        let (id, value) = queue.front().map(|entry| (entry.id, entry.overwrite))?;
        queue.consume_front_if_one_shot(id);
        Some(value)
    }

    #[test]
    fn test_one_shot_entries_drain_in_order() {
        let mut queue = OverwriteQueue::new();
        queue.push("a", false);
        queue.push("b", false);

        assert_eq!(Some("a"), apply(&mut queue));
        assert_eq!(Some("b"), apply(&mut queue));
        assert_eq!(None, apply(&mut queue));
    }

    #[test]
    fn test_one_shot_before_sticky() {
        let mut queue = OverwriteQueue::new();
        queue.push("once", false);
        queue.push("always", true);

        assert_eq!(2, queue.len());
        assert_eq!(Some("once"), apply(&mut queue));
        assert_eq!(1, queue.len());
        assert_eq!(Some("always"), apply(&mut queue));
        assert_eq!(Some("always"), apply(&mut queue));
        assert_eq!(1, queue.len());
    }

    #[test]
    fn test_sticky_front_shadows_later_entries() {
        let mut queue = OverwriteQueue::new();
        queue.push("always", true);
        queue.push("never", false);

        for _ in 0..3 {
            assert_eq!(Some("always"), apply(&mut queue));
        }
        assert_eq!(2, queue.len());

        queue.clear();
        assert!(queue.is_empty());
    }

    #[test]
    fn test_consume_ignores_stale_id() {
        let mut queue = OverwriteQueue::new();
        queue.push("a", false);
        let stale = queue.front().map(|entry| entry.id).unwrap();
        queue.clear();
        queue.push("b", false);

        assert!(!queue.consume_front_if_one_shot(stale));
        assert_eq!(1, queue.len());
    }
}
