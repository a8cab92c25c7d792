//! Interfaces the editor implements to receive drag results.

use glam::Mat4;

use crate::transformation::Transformation;

/// Receives drag updates for the current selection.
///
/// Each [`apply`](TransformSink::apply) replaces the previous in-progress
/// transform, since every update is measured from the drag anchor.
pub trait TransformSink {
    /// Preview `transformation`, placed by the pivot captured at drag start
    fn apply(&mut self, transformation: &Transformation, pivot2world: &Mat4);

    /// Bake the in-progress transform into the selected objects
    fn freeze(&mut self);
}

/// A scoped undo transaction around one drag
pub trait UndoSystem {
    /// Opened before the first mutating update
    fn start(&mut self);

    /// Closed with a name describing the committed change
    fn finish(&mut self, name: &str);
}
