//! Application services - help catalog and user roles

pub mod help;
pub mod roles;

pub use help::{HelpCatalog, ScriptMetadata};
pub use roles::UserRoles;
