//! Lock-Free Byte Ring Buffer
//!
//! Provides a high-performance SPSC ring buffer carrying the raw UART byte
//! stream from the serial producer task to the logger loop.

mod buffer;

pub use buffer::{ByteRing, Drain, DEFAULT_CAPACITY};
