pub mod service;
pub mod store;

pub use service::{NoteError, NoteService, NoteView};
pub use store::{NoteStore, NoteStoreError};
