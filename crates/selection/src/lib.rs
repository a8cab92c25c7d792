//! Reticle selection - pointer hit testing and candidate ranking
//!
//! This crate provides the picking half of the editor core:
//! - [`intersection::SelectionIntersection`] - Ordered measure of how good a hit is
//! - [`view::View`] - Camera matrices with an optional pick scissor
//! - [`volume::SelectionVolume`] - Projects primitives into the pick box
//! - [`selector`] - Selectors and the ranked [`selector::SelectionPool`]
//! - [`scene`] - Collaborator traits for walking the scene
//! - [`aabb::Aabb`] - Axis-aligned bounds shared with manipulation

pub mod aabb;
pub mod clip;
pub mod intersection;
pub mod scene;
pub mod selector;
pub mod view;
pub mod volume;

pub use aabb::*;
pub use intersection::*;
pub use scene::*;
pub use selector::*;
pub use view::*;
pub use volume::*;
