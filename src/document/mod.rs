//! Archival output
//!
//! Every successfully fetched page becomes a [`DocumentRecord`] in WARC
//! response framing, written to its own file by a [`DocumentWriter`].

mod record;
mod writer;

pub use record::{DocumentRecord, RecordError};
pub use writer::DocumentWriter;
