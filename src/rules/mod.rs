// src/rules/mod.rs
//
// Per-frame violation rules. Every rule is a pure function of one frame's
// detections; nothing is carried across frames.

pub mod cluster;
pub mod helmet;
pub mod zone;

pub use cluster::ClusterRule;
pub use helmet::HelmetRule;
pub use zone::ZoneRule;
