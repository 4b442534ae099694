mod date_range;
mod post;

pub use date_range::*;
pub use post::*;
