//! Scene-walk collaborator traits and a small in-memory scene of boxes.

use std::fmt::Debug;

use glam::{Mat4, Quat};
use tracing::debug;

use crate::aabb::Aabb;
use crate::intersection::SelectionIntersection;
use crate::selector::Selector;
use crate::view::View;
use crate::volume::SelectionVolume;

/// Anything with a toggleable selected state
pub trait Selectable {
    fn is_selected(&self) -> bool;
    fn set_selected(&mut self, selected: bool);
}

/// Geometry that can be hit tested through a [`SelectionVolume`]
pub trait Testable {
    fn local_to_world(&self) -> Mat4 {
        Mat4::IDENTITY
    }

    fn two_sided(&self) -> bool {
        false
    }

    /// Test local-space primitives, keeping the best hit in `best`
    fn test_select(&self, volume: &SelectionVolume, best: &mut SelectionIntersection);
}

/// Which candidates a walk visits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WalkFilter {
    #[default]
    All,
    SelectedOnly,
    UnselectedOnly,
}

impl WalkFilter {
    pub fn accepts(self, selected: bool) -> bool {
        match self {
            WalkFilter::All => true,
            WalkFilter::SelectedOnly => selected,
            WalkFilter::UnselectedOnly => !selected,
        }
    }
}

/// The scene as seen by picking and manipulation
pub trait SceneWalker {
    type Key: Copy + Eq + Debug;

    /// Visit each visible candidate once, in a stable order
    fn for_each_candidate(
        &self,
        view: &View,
        filter: WalkFilter,
        visit: &mut dyn FnMut(Self::Key, &dyn Testable),
    );

    fn is_selected(&self, key: Self::Key) -> bool;
    fn set_selected(&mut self, key: Self::Key, selected: bool);
    fn deselect_all(&mut self);
    fn selection_count(&self) -> usize;

    /// World bounds of the current selection, [`Aabb::EMPTY`] if none
    fn selection_bounds(&self) -> Aabb;

    /// Orientation of the most recently selected object
    fn reference_rotation(&self) -> Quat {
        Quat::IDENTITY
    }
}

/// Test every candidate accepted by `filter`, bracketing each one for `selector`
pub fn test_select_scene<W, S>(
    scene: &W,
    volume: &mut SelectionVolume,
    filter: WalkFilter,
    selector: &mut S,
) where
    W: SceneWalker + ?Sized,
    S: Selector<W::Key> + ?Sized,
{
    let view = *volume.view();
    let mut visited = 0usize;
    scene.for_each_candidate(&view, filter, &mut |key, testable| {
        visited += 1;
        selector.push_selectable(key);
        volume.begin_mesh(testable.local_to_world(), testable.two_sided());
        let mut best = SelectionIntersection::INVALID;
        testable.test_select(volume, &mut best);
        selector.add_intersection(best);
        selector.pop_selectable();
    });
    debug!("Scene walk ({:?}) tested {} candidates", filter, visited);
}

/// One box in an [`AabbScene`]
#[derive(Debug, Clone, PartialEq)]
pub struct SceneBox {
    pub local_bounds: Aabb,
    pub transform: Mat4,
    pub selected: bool,
}

impl SceneBox {
    pub fn new(local_bounds: Aabb) -> Self {
        Self {
            local_bounds,
            transform: Mat4::IDENTITY,
            selected: false,
        }
    }

    pub fn with_transform(mut self, transform: Mat4) -> Self {
        self.transform = transform;
        self
    }

    /// Bounds of the transformed box in world space
    pub fn world_bounds(&self) -> Aabb {
        let mut bounds = Aabb::EMPTY;
        for corner in self.local_bounds.corners() {
            bounds.extend_point(self.transform.transform_point3(corner));
        }
        bounds
    }
}

impl Selectable for SceneBox {
    fn is_selected(&self) -> bool {
        self.selected
    }

    fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }
}

impl Testable for SceneBox {
    fn local_to_world(&self) -> Mat4 {
        self.transform
    }

    fn test_select(&self, volume: &SelectionVolume, best: &mut SelectionIntersection) {
        volume.test_aabb(&self.local_bounds, best);
    }
}

/// In-memory scene of boxes keyed by index
#[derive(Debug, Clone, Default)]
pub struct AabbScene {
    pub boxes: Vec<SceneBox>,
    /// Most recently selected box, used for the reference rotation
    last_selected: Option<usize>,
}

impl AabbScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, scene_box: SceneBox) -> usize {
        self.boxes.push(scene_box);
        self.boxes.len() - 1
    }

    pub fn get(&self, key: usize) -> Option<&SceneBox> {
        self.boxes.get(key)
    }

    pub fn get_mut(&mut self, key: usize) -> Option<&mut SceneBox> {
        self.boxes.get_mut(key)
    }

    pub fn selected_keys(&self) -> impl Iterator<Item = usize> + '_ {
        self.boxes
            .iter()
            .enumerate()
            .filter(|(_, b)| b.selected)
            .map(|(i, _)| i)
    }
}

impl SceneWalker for AabbScene {
    type Key = usize;

    fn for_each_candidate(
        &self,
        _view: &View,
        filter: WalkFilter,
        visit: &mut dyn FnMut(usize, &dyn Testable),
    ) {
        for (key, scene_box) in self.boxes.iter().enumerate() {
            if filter.accepts(scene_box.selected) {
                visit(key, scene_box);
            }
        }
    }

    fn is_selected(&self, key: usize) -> bool {
        self.boxes.get(key).is_some_and(|b| b.selected)
    }

    fn set_selected(&mut self, key: usize, selected: bool) {
        if let Some(scene_box) = self.boxes.get_mut(key) {
            scene_box.set_selected(selected);
            if selected {
                self.last_selected = Some(key);
            } else if self.last_selected == Some(key) {
                self.last_selected = None;
            }
        }
    }

    fn deselect_all(&mut self) {
        for scene_box in &mut self.boxes {
            scene_box.set_selected(false);
        }
        self.last_selected = None;
    }

    fn selection_count(&self) -> usize {
        self.boxes.iter().filter(|b| b.selected).count()
    }

    fn selection_bounds(&self) -> Aabb {
        let mut bounds = Aabb::EMPTY;
        for scene_box in self.boxes.iter().filter(|b| b.selected) {
            bounds.extend(&scene_box.world_bounds());
        }
        bounds
    }

    fn reference_rotation(&self) -> Quat {
        self.last_selected
            .and_then(|key| self.boxes.get(key))
            .map(|b| b.transform.to_scale_rotation_translation().1)
            .unwrap_or(Quat::IDENTITY)
    }
}
