//! Author records and the identity rules used to deduplicate them.
//!
//! Matching order is not significant: a person matches on alias, email,
//! ORCID or full name, an entity on name or alias, whichever agrees first.

pub mod author;
pub mod matcher;

pub use author::{AuthorKind, AuthorRecord};
pub use matcher::{find_match, same_identity};
