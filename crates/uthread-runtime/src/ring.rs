//! Ready ring for uthread scheduling
//!
//! A singly-linked circular list threaded through an index arena. Every
//! uthread that has been created and not yet reaped has exactly one entry;
//! finished entries stay linked (the scan skips them) so their return values
//! remain reachable until reaped.
//!
//! Policy: new entries are appended at the tail, i.e. after the most
//! recently created entry, so a full pass visits entries in creation order.
//!
//! ```text
//!   head                         tail
//!    │                            │
//!    ▼                            ▼
//!  ┌───┐    ┌───┐    ┌───┐    ┌───┐
//!  │ A │───▶│ B │───▶│ C │───▶│ D │──┐
//!  └───┘    └───┘    └───┘    └───┘  │
//!    ▲                               │
//!    └───────────────────────────────┘
//! ```
//!
//! Entries are boxed so the saved context inside a TCB keeps its address
//! while the arena grows.

use uthread_core::error::MemoryError;
use uthread_core::id::UthreadId;

/// What the ring needs to know about an entry
pub trait RingMember {
    /// Eligible to be switched to
    fn is_runnable(&self) -> bool;
}

/// One ring node: the authoritative value plus the link to its successor
pub struct RingEntry<E> {
    pub value: E,
    next: u32,
}

struct Slot<E> {
    generation: u32,
    entry: Option<Box<RingEntry<E>>>,
}

/// Circular ready ring
pub struct ReadyRing<E> {
    slots: Vec<Slot<E>>,
    /// LIFO stack of vacated slot indices
    free: Vec<u32>,
    head: Option<u32>,
    tail: Option<u32>,
    len: usize,
    capacity: usize,
}

impl<E: RingMember> ReadyRing<E> {
    /// Create an empty ring holding at most `capacity` entries
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
            capacity,
        }
    }

    /// Number of linked entries
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Maximum number of linked entries
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// First entry in creation order
    pub fn head(&self) -> Option<UthreadId> {
        self.head.map(|idx| self.id_at(idx))
    }

    /// Most recently appended entry
    pub fn tail(&self) -> Option<UthreadId> {
        self.tail.map(|idx| self.id_at(idx))
    }

    /// Append `value` after the tail
    pub fn insert(&mut self, value: E) -> Result<UthreadId, MemoryError> {
        if self.len >= self.capacity {
            return Err(MemoryError::TooManyUthreads);
        }

        let idx = match self.free.pop() {
            Some(idx) => idx,
            None => {
                let idx = u32::try_from(self.slots.len())
                    .map_err(|_| MemoryError::TooManyUthreads)?;
                self.slots.push(Slot { generation: 0, entry: None });
                idx
            }
        };

        // A new tail links back to the head; a lone entry links to itself
        let next = self.head.unwrap_or(idx);
        self.slots[idx as usize].entry = Some(Box::new(RingEntry { value, next }));

        match self.tail {
            Some(tail) => {
                if let Some(entry) = self.slots[tail as usize].entry.as_mut() {
                    entry.next = idx;
                }
            }
            None => self.head = Some(idx),
        }
        self.tail = Some(idx);
        self.len += 1;

        Ok(self.id_at(idx))
    }

    /// Unlink an entry and return its value
    ///
    /// Never called while a scheduling pass is walking the ring.
    pub fn remove(&mut self, id: UthreadId) -> Option<E> {
        if !self.contains(id) {
            return None;
        }
        let idx = id.index();
        let next = self.link(idx);

        if self.len == 1 {
            self.head = None;
            self.tail = None;
        } else {
            let prev = self.predecessor(idx);
            if let Some(entry) = self.slots[prev as usize].entry.as_mut() {
                entry.next = next;
            }
            if self.head == Some(idx) {
                self.head = Some(next);
            }
            if self.tail == Some(idx) {
                self.tail = Some(prev);
            }
        }

        let slot = &mut self.slots[idx as usize];
        let entry = slot.entry.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(idx);
        self.len -= 1;

        Some(entry.value)
    }

    /// Check that `id` names a live entry of this generation
    #[inline]
    pub fn contains(&self, id: UthreadId) -> bool {
        self.slots
            .get(id.as_usize())
            .map_or(false, |s| s.generation == id.generation() && s.entry.is_some())
    }

    pub fn get(&self, id: UthreadId) -> Option<&E> {
        let slot = self.slots.get(id.as_usize())?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.entry.as_deref().map(|e| &e.value)
    }

    pub fn get_mut(&mut self, id: UthreadId) -> Option<&mut E> {
        let slot = self.slots.get_mut(id.as_usize())?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.entry.as_deref_mut().map(|e| &mut e.value)
    }

    /// Successor of `id` in ring order
    pub fn next_of(&self, id: UthreadId) -> Option<UthreadId> {
        if !self.contains(id) {
            return None;
        }
        Some(self.id_at(self.link(id.index())))
    }

    /// First runnable entry after `from`, wrapping at most once.
    ///
    /// The scan ends at `from` itself, so `Some(from)` means nothing else is
    /// runnable and `None` means every entry, `from` included, is finished.
    pub fn next_runnable(&self, from: UthreadId) -> Option<UthreadId> {
        if !self.contains(from) {
            return self.first_runnable();
        }
        let start = self.link(from.index());
        self.scan(start)
    }

    /// First runnable entry in creation order, starting at the head
    pub fn first_runnable(&self) -> Option<UthreadId> {
        self.scan(self.head?)
    }

    /// Number of runnable entries
    pub fn runnable_count(&self) -> usize {
        self.iter().filter(|(_, e)| e.is_runnable()).count()
    }

    /// Walk the ring once from the head
    pub fn iter(&self) -> Iter<'_, E> {
        Iter {
            ring: self,
            cursor: self.head,
            remaining: self.len,
        }
    }

    fn scan(&self, start: u32) -> Option<UthreadId> {
        let mut idx = start;
        for _ in 0..self.len {
            let entry = self.slots[idx as usize].entry.as_deref()?;
            if entry.value.is_runnable() {
                return Some(self.id_at(idx));
            }
            idx = entry.next;
        }
        None
    }

    #[inline]
    fn link(&self, idx: u32) -> u32 {
        self.slots[idx as usize].entry.as_deref().map_or(idx, |e| e.next)
    }

    fn predecessor(&self, idx: u32) -> u32 {
        let mut cur = idx;
        for _ in 0..self.len {
            let next = self.link(cur);
            if next == idx {
                return cur;
            }
            cur = next;
        }
        idx
    }

    #[inline]
    fn id_at(&self, idx: u32) -> UthreadId {
        UthreadId::new(idx, self.slots[idx as usize].generation)
    }
}

/// Iterator over ring entries in ring order
pub struct Iter<'a, E> {
    ring: &'a ReadyRing<E>,
    cursor: Option<u32>,
    remaining: usize,
}

impl<'a, E: RingMember> Iterator for Iter<'a, E> {
    type Item = (UthreadId, &'a E);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let idx = self.cursor?;
        let entry = self.ring.slots[idx as usize].entry.as_deref()?;
        self.remaining -= 1;
        self.cursor = Some(entry.next);
        Some((self.ring.id_at(idx), &entry.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}
