//! File format parsers.
//!
//! Cloud-Optimized GeoTIFFs are plain TIFF or BigTIFF containers laid out so
//! that headers and directories come first; everything needed to walk them
//! lives in [`tiff`].

pub mod tiff;
