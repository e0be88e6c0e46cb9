//! Row-to-document reconstruction for reads.

pub mod bundle;
mod has_many_number;
mod has_many_text;
pub mod read;
mod relationship;

pub use bundle::{Row, RowBundle, BLOCK_TYPE_KEY};
pub use read::transform_read;
