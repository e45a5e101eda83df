//! CBZ output.
//!
//! A CBZ is a plain zip container whose entries are page images; comic
//! readers show them in entry-name order.

mod writer;

pub use writer::{CBZ_EXTENSION, entry_names, write_cbz, write_cbz_to_writer};
