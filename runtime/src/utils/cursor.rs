use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CursorError {
    #[error("Position {index} out of range (length {len})")]
    OutOfBounds { index: usize, len: usize },
}

/// A steppable view over a fixed sequence of items.
///
/// The same cursor type walks source characters in the tokenizer and
/// instructions in the VM. The backing slice is shared, so cloning a cursor
/// only copies the position.
#[derive(Debug, Clone)]
pub struct Cursor<T> {
    items: Arc<[T]>,
    position: usize,
}

impl<T> Cursor<T> {
    pub fn new(items: impl Into<Arc<[T]>>) -> Self {
        Self {
            items: items.into(),
            position: 0,
        }
    }

    /// Item at the current position, without advancing
    pub fn peek(&self) -> Option<&T> {
        self.items.get(self.position)
    }

    /// Return the current item and advance past it
    pub fn read(&mut self) -> Result<&T, CursorError> {
        let index = self.position;
        let len = self.items.len();
        match self.items.get(index) {
            Some(item) => {
                self.position += 1;
                Ok(item)
            }
            None => Err(CursorError::OutOfBounds { index, len }),
        }
    }

    /// Step back by one. Does nothing at the start.
    pub fn unread(&mut self) {
        if !self.at_start() {
            self.position -= 1;
        }
    }

    /// Step back `count` times
    pub fn unread_by(&mut self, count: usize) {
        self.position = self.position.saturating_sub(count);
    }

    /// Move directly to `index`. `index == len()` is allowed and means "at end".
    pub fn jump_to(&mut self, index: usize) -> Result<(), CursorError> {
        if index > self.items.len() {
            return Err(CursorError::OutOfBounds {
                index,
                len: self.items.len(),
            });
        }
        self.position = index;
        Ok(())
    }

    pub fn at_end(&self) -> bool {
        self.position >= self.items.len()
    }

    pub fn at_start(&self) -> bool {
        self.position == 0
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items from the current position to the end
    pub fn remaining(&self) -> &[T] {
        &self.items[self.position.min(self.items.len())..]
    }
}
