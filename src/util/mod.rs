//! Utility functions shared by the renderer.
//!
//! # Examples
//!
//! ```
//! use rssfilter::util::strip_invalid_xml_chars;
//!
//! assert_eq!(strip_invalid_xml_chars("bell\x07 rings"), "bell rings");
//! ```

mod text;

pub use text::strip_invalid_xml_chars;
