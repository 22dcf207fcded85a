//! Hash collections used across Charmy, backed by AHash.

pub use ahash::{AHashMap as HashMap, AHashSet as HashSet, RandomState};
