pub mod error;

pub use error::{DptError, Result};
