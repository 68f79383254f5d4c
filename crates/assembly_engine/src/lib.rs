//! Assembly Engine - Document assembly over a cursor-driven editing backend
//!
//! This crate turns structured inputs (table data, freeform text, declarative
//! document specs and operation batches) into sequences of backend cursor
//! primitives, tracking where the cursor is so every table fill ends outside
//! the table it wrote.

mod batch;
mod error;
mod grid;
mod interpreter;
mod literal;
mod outcome;
mod plan;
mod segment;
mod session;
mod settings;
mod spec;
mod table_data;
mod templates;

pub use batch::*;
pub use error::*;
pub use grid::*;
pub use interpreter::*;
pub use literal::*;
pub use outcome::*;
pub use plan::*;
pub use segment::*;
pub use session::*;
pub use settings::*;
pub use spec::*;
pub use table_data::*;
pub use templates::*;
