//! Settings loaded from `.simplepadrc`.

pub mod rc;

pub use rc::{RC_FILE_NAME, RcConfig, RcLoader};
