//! COG reader: header, IFD chain and tile access over a [`RangeReader`].
//!
//! [`RangeReader`]: crate::io::RangeReader

mod reader;

pub use reader::{CogReader, ReaderOptions, DEFAULT_MAX_IFDS};
