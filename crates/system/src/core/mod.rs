//! Error and result types shared by the system layer

pub mod error;
pub mod result;

pub use error::{SystemError, SystemResult};
pub use result::SystemResultExt;
