//! General-purpose numerical helpers used by the synthesis stages.

pub mod interp;

pub use interp::{Bracket, InterpError, LinearGrid};
