mod field;
mod index;
mod record;
mod ty;

pub use self::field::*;
pub use self::index::*;
pub use self::record::*;
pub use self::ty::*;
