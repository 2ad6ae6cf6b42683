/// Exclusive lower bound for the next poll.
///
/// Only ever moves forward, and only to one past an id that was delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    next: i64,
}

impl Cursor {
    pub fn new(start: i64) -> Self {
        Self { next: start.max(0) }
    }

    /// Smallest id still expected
    pub fn next(&self) -> i64 {
        self.next
    }

    /// Offset to send with the poll; zero means "from the start" and is omitted
    pub fn offset(&self) -> Option<i64> {
        (self.next != 0).then_some(self.next)
    }

    /// Whether an event with this id is new to the consumer
    pub fn admits(&self, id: i64) -> bool {
        id >= self.next
    }

    /// Move past the highest id of a fully delivered batch
    pub fn advance(&mut self, max_delivered: i64) {
        self.next = self.next.max(max_delivered.saturating_add(1));
    }
}

impl Default for Cursor {
    fn default() -> Self {
        Self::new(0)
    }
}
