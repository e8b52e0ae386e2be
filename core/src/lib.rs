pub mod batch;
mod listen;
mod track;

pub use listen::*;
pub use track::*;

/// The most listens the service accepts in a single `import` request
pub const MAX_BATCH_SIZE: usize = 200;
