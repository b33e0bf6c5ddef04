//! HTTP handlers, grouped by resource.
//!
//! Doc headers name the access level of each route: `[Public Route]`, `[Authenticated Route]`
//! or `[Admin Route]`. Admin handlers re-check the role themselves; the router only
//! guarantees an authenticated caller.

pub mod comments;
pub mod homepages;
pub mod languages;
pub mod links;
pub mod pages;
pub mod posts;
pub mod roles;
pub mod settings;
pub mod users;
