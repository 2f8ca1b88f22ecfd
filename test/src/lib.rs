//! # Weft Test
//! Harness for driving a weft host & its clients end to end over in-memory
//! transports.


pub use helpers::*;
