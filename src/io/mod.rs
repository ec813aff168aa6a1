//! Model artifact persistence
//!
//! One artifact per user, stored under the store root as
//! `user_<id>/model.<ext>` in JSON or YAML.

mod artifact;
mod format;
mod store;


pub use artifact::{ModelArtifact, FORMAT_VERSION};
pub use format::{ArtifactFormat, SaveConfig};
pub use store::ModelStore;
