//! Collaborator traits (ports) implemented by the persistence layer

mod collaborators;

pub use collaborators::{Directory, ReadTarget, RepoResult, Store};
