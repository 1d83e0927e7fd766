//! Drift DOM
//!
//! Content identifiers and the surface contract the content engine drives.
//!
//! The engine never touches a browser DOM directly. Everything it needs
//! (the content mount point, element enumeration, head style resources,
//! the backdrop and the breadcrumb trail) goes through [`Surface`].
//! [`MemorySurface`] is an in-memory implementation backed by html5ever.

mod id;
mod element;
mod surface;
mod parser;
mod memory;
pub mod css;

pub use id::{ContentId, EmptyContentId};
pub use element::{ElementInfo, ElementKey};
pub use surface::{CrumbState, CrumbView, Surface};
pub use parser::FragmentParser;
pub use memory::MemorySurface;
