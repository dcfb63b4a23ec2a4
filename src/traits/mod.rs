//! Traits implemented by shared services.

mod dispose;

pub use dispose::Dispose;
