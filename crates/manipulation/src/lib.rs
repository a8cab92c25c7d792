//! Reticle manipulation - handles, drag behaviors and the selection driver
//!
//! This crate provides the dragging half of the editor core:
//! - [`pivot::Pivot2World`] - Handle frames sized in screen pixels
//! - [`ray`] - Pointer rays and drag anchor points
//! - [`manipulatable::Manipulatable`] - Drag behaviors (construct, then transform)
//! - [`manipulator::Manipulator`] - Pickable handle sets and the drag decision table
//! - [`transformation::Transformation`] - Drag results and their undo names
//! - [`collaborator`] - Transform sink and undo interfaces
//! - [`system::SelectionSystem`] - Pointer event driver

pub mod collaborator;
pub mod manipulatable;
pub mod manipulator;
pub mod modifiers;
pub mod pivot;
pub mod ray;
pub mod system;
pub mod transformation;

pub use collaborator::*;
pub use manipulatable::{DragInput, Manipulatable};
pub use manipulator::{DragAction, DragRule, Manipulator, ManipulatorMode, PickContext};
pub use modifiers::InputModifiers;
pub use pivot::Pivot2World;
pub use system::{SelectionMode, SelectionSystem};
pub use transformation::{undo_name, Transformation};
