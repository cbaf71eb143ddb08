//! Binary number model.
//!
//! This module provides the value types the rest of the emulator is
//! written against:
//! - [`Byte`] - an 8-bit value with two's-complement interpretation
//! - [`Word`] - a 16-bit value made of a high and a low byte
//! - [`arith`] - the 8-bit ALU operations and the carry/overflow they produce

mod byte;
mod word;
pub mod arith;

pub use byte::{Byte, DataError, Format};
pub use word::Word;
pub use arith::Sum;
