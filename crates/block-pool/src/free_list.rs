//! Per-pool free lists over the block slot arena.
//!
//! Every physical block has a [`BlockSlot`] holding its link, its free-list
//! membership, and a back-reference to the pool it was carved from. A
//! [`FreeList`] is a FIFO queue threaded through the slots by index: blocks
//! are taken from the head and returned to the tail, so a freshly initialized
//! pool hands out its blocks in address order.

/// Link value meaning "no slot".
pub(crate) const NIL: u32 = u32::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BlockSlot {
    next: u32,
    /// Pool whose free list currently holds this block; `None` while the
    /// block is allocated.
    list: Option<u16>,
    /// Pool this block belongs to.
    pool: u16,
}

impl BlockSlot {
    pub(crate) const UNUSED: Self = Self {
        next: NIL,
        list: None,
        pool: u16::MAX,
    };

    pub(crate) const fn new(pool: u16) -> Self {
        Self {
            next: NIL,
            list: None,
            pool,
        }
    }

    pub(crate) fn pool(&self) -> usize {
        usize::from(self.pool)
    }

    pub(crate) fn is_free(&self) -> bool {
        self.list.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FreeList {
    pool: u16,
    head: u32,
    tail: u32,
    len: u32,
}

impl FreeList {
    pub(crate) const fn new(pool: u16) -> Self {
        Self {
            pool,
            head: NIL,
            tail: NIL,
            len: 0,
        }
    }

    pub(crate) fn len(&self) -> u32 {
        self.len
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.head == NIL
    }

    /// Appends slot `index` to the tail of the list.
    ///
    /// The slot must not be a member of any list.
    pub(crate) fn push_back(&mut self, slots: &mut [BlockSlot], index: u32) {
        let slot = &mut slots[index as usize];
        assert!(!slot.is_free(), "slot {index} is already in a free list");
        slot.next = NIL;
        slot.list = Some(self.pool);

        if self.tail == NIL {
            self.head = index;
        } else {
            slots[self.tail as usize].next = index;
        }
        self.tail = index;
        self.len += 1;
    }

    /// Removes the slot at the head of the list.
    pub(crate) fn pop_front(&mut self, slots: &mut [BlockSlot]) -> Option<u32> {
        if self.head == NIL {
            return None;
        }

        let index = self.head;
        let slot = &mut slots[index as usize];
        debug_assert_eq!(slot.list, Some(self.pool));
        self.head = slot.next;
        slot.next = NIL;
        slot.list = None;

        if self.head == NIL {
            self.tail = NIL;
        }
        self.len -= 1;
        Some(index)
    }

    #[cfg(test)]
    pub(crate) fn iter<'a>(&self, slots: &'a [BlockSlot]) -> impl Iterator<Item = u32> + 'a {
        let mut next = self.head;
        core::iter::from_fn(move || {
            if next == NIL {
                return None;
            }
            let current = next;
            next = slots[current as usize].next;
            Some(current)
        })
    }
}
