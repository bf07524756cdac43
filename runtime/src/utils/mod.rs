//! Shared helpers for the tokenizer and the VM

mod cursor;

pub use cursor::{Cursor, CursorError};
