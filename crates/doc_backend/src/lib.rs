//! Document Backend - the cursor-based editing surface the assembly engine drives
//!
//! The editing application is modelled as a single-document, single-session
//! resource with an implicit cursor. Every primitive is a blocking call that
//! reads or advances that cursor; there is no random-access seek.
//!
//! [`MemoryBackend`] is a faithful in-process simulator of that surface. It
//! records every call it receives and can inject transport faults, which makes
//! it the backend of choice for tests and for the command line front end.

mod backend;
mod call_log;
mod error;
mod memory;
pub mod model;

pub use backend::*;
pub use call_log::*;
pub use error::*;
pub use memory::*;
