mod depth;
mod empty;
mod error;
mod iter;
mod rbt;

pub use crate::depth::Depth;
pub use crate::empty::Empty;
pub use crate::error::RbtError;
pub use crate::iter::{Iter, Order, Range, Traverse};
pub use crate::rbt::{Color, Handle, Rbt, Stats};
