//! Ledger core types

mod documents;
mod ids;
mod timestamp;
mod value;

pub use documents::*;
pub use ids::*;
pub use timestamp::*;
pub use value::*;
