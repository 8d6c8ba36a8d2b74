//! Consent trees and requirement matching
//!
//! The authorization service returns consents as a flat list. Each consent
//! carries a `dependency_path` naming its ancestors, which is enough to
//! rebuild the trees:
//!
//! ```text
//! transfer (id=1)
//!   data_access (id=2)
//!     read (id=3)
//! ```
//!
//! A [`ConsentForest`] holds every tree for one identity and decides whether
//! a scope requirement such as `transfer[data_access[read]]` is met.

pub mod forest;
pub mod matcher;
pub mod record;
pub mod tree;

pub use forest::ConsentForest;
pub use matcher::{forest_meets_requirement, forest_meets_requirements, tree_meets_requirement};
pub use record::{ConsentId, ConsentList, ConsentRecord};
pub use tree::ConsentTree;
