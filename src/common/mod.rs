//! Supporting utility types shared across the crate.

mod bytestr;

pub use bytestr::ByteStr;
