//! GitHub REST API access and pull request contributor collection.

pub mod client;
pub mod collect;
pub mod web_url;

pub use client::{AccountKind, GitHubClient, GitHubProfile};
pub use collect::ContributorCollector;
