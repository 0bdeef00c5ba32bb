//! # The Resolution Pipeline
//!
//! Two resolvers, composed: [`SectionResolver`] turns one URI into one
//! parsed [`crate::model::Section`]; [`ScriptResolver`] walks the include
//! graph from an entry point and consolidates every reached section into
//! a single [`crate::model::Script`].

mod section;
mod script;

pub use section::SectionResolver;
pub use script::ScriptResolver;
