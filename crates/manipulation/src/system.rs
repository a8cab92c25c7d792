//! The selection driver: turns pointer events into picks and drags.
//!
//! A press either grabs a manipulator handle and starts a drag session, or
//! is tracked as a click or area sweep and resolved into a selection change
//! on release. Only one press is handled at a time.

use glam::{Mat4, Quat, Vec2, Vec3};
use reticle_config::{ConfigError, ReticleConfig};
use selection::{
    device_epsilon_for_pixels, selection_box_for_area, selection_box_for_point, test_select_scene,
    BestSelector, DeepBestSelector, IntersectionBands, SceneWalker, Selectable, SelectionPool,
    SelectionVolume, View, WalkFilter,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::collaborator::{TransformSink, UndoSystem};
use crate::manipulatable::{DragInput, Manipulatable};
use crate::manipulator::{Manipulator, ManipulatorMode, PickContext};
use crate::modifiers::InputModifiers;
use crate::pivot::{construct_device2manip, construct_manip2object, Pivot2World};
use crate::transformation::{undo_name, Transformation};

/// How a click changes the selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SelectionMode {
    /// Select only the best candidate
    #[default]
    Replace,
    /// Flip the best candidate
    Toggle,
    /// Move the selection to the next candidate under the pointer
    Cycle,
    /// Select every candidate tied with the best
    Matching,
    /// As `Matching`, through the whole depth range
    DeepMatching,
}

impl SelectionMode {
    pub fn from_modifiers(modifiers: InputModifiers) -> Self {
        match (modifiers.shift, modifiers.ctrl, modifiers.alt) {
            (_, true, true) => SelectionMode::DeepMatching,
            (_, true, false) => SelectionMode::Matching,
            (_, false, true) => SelectionMode::Cycle,
            (true, false, false) => SelectionMode::Toggle,
            (false, false, false) => SelectionMode::Replace,
        }
    }
}

/// State captured when a handle is grabbed
#[derive(Debug, Clone)]
struct DragSession {
    manipulatable: Manipulatable,
    device2manip: Mat4,
    manip2object: Mat4,
    pivot2world_start: Mat4,
    undo_open: bool,
    last: Option<Transformation>,
}

/// A press that did not grab a handle
#[derive(Debug, Clone, Copy)]
struct PendingPress {
    start: Vec2,
    current: Vec2,
    modifiers: InputModifiers,
}

/// Owns the manipulator, the pivot and the pointer capture
#[derive(Debug, Clone)]
pub struct SelectionSystem {
    config: ReticleConfig,
    manipulator: Manipulator,
    custom_pivot: Option<Vec3>,
    pivot2world: Mat4,
    session: Option<DragSession>,
    press: Option<PendingPress>,
}

impl SelectionSystem {
    /// Fails if `config` is out of range
    pub fn new(config: ReticleConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            manipulator: Manipulator::for_mode(ManipulatorMode::default()),
            custom_pivot: None,
            pivot2world: Mat4::IDENTITY,
            session: None,
            press: None,
        })
    }

    pub fn config(&self) -> &ReticleConfig {
        &self.config
    }

    pub fn mode(&self) -> ManipulatorMode {
        self.manipulator.mode()
    }

    pub fn manipulator(&self) -> &Manipulator {
        &self.manipulator
    }

    /// Switch manipulators. Ignored while the pointer is captured.
    pub fn set_mode<W: SceneWalker + ?Sized>(&mut self, mode: ManipulatorMode, scene: &W) {
        if self.is_captured() {
            warn!("Ignoring manipulator change to {:?} during a press", mode);
            return;
        }
        if mode != self.mode() {
            self.manipulator = Manipulator::for_mode(mode);
        }
        self.update_pivot(scene);
    }

    /// Place the pivot explicitly; `None` returns to the selection centre
    pub fn set_custom_pivot<W: SceneWalker + ?Sized>(&mut self, pivot: Option<Vec3>, scene: &W) {
        self.custom_pivot = pivot;
        self.update_pivot(scene);
    }

    pub fn custom_pivot(&self) -> Option<Vec3> {
        self.custom_pivot
    }

    pub fn pivot2world(&self) -> Mat4 {
        self.pivot2world
    }

    pub fn is_captured(&self) -> bool {
        self.session.is_some() || self.press.is_some()
    }

    pub fn is_dragging(&self) -> bool {
        self.session.is_some()
    }

    /// Recompute the pivot from the selection. Only Rotate and Scale follow
    /// the reference object's orientation.
    pub fn update_pivot<W: SceneWalker + ?Sized>(&mut self, scene: &W) {
        let bounds = scene.selection_bounds();
        let origin = self.custom_pivot.unwrap_or(if bounds.is_valid() {
            bounds.origin
        } else {
            Vec3::ZERO
        });
        let rotation = if self.mode().uses_pivot_rotation() && scene.selection_count() > 0 {
            scene.reference_rotation()
        } else {
            Quat::IDENTITY
        };
        self.pivot2world = Mat4::from_rotation_translation(rotation, origin);
    }

    fn device_epsilon(&self, view: &View) -> Vec2 {
        device_epsilon_for_pixels(self.config.pick.pixel_radius, &view.viewport())
    }

    fn bands(&self) -> IntersectionBands {
        IntersectionBands::from(&self.config.pick)
    }

    fn point_volume(&self, view: &View, device_point: Vec2) -> SelectionVolume {
        let pick_view = view.scissored(selection_box_for_point(device_point, self.device_epsilon(view)));
        SelectionVolume::new(&pick_view, self.bands())
    }

    /// Pointer pressed at `device_point`
    pub fn on_mouse_down<W>(
        &mut self,
        view: &View,
        device_point: Vec2,
        modifiers: InputModifiers,
        scene: &mut W,
    ) where
        W: SceneWalker + TransformSink + ?Sized,
    {
        if self.is_captured() {
            warn!("Pointer already captured, ignoring press at {}", device_point);
            return;
        }
        self.update_pivot(scene);

        if let Some(session) = self.grab_handle(view, device_point, modifiers, scene) {
            debug!(
                "Drag started: {} at {}",
                session.manipulatable.name(),
                device_point
            );
            self.session = Some(session);
            return;
        }

        trace!("Press at {} did not grab a handle", device_point);
        self.press = Some(PendingPress {
            start: device_point,
            current: device_point,
            modifiers,
        });
    }

    fn grab_handle<W>(
        &mut self,
        view: &View,
        device_point: Vec2,
        modifiers: InputModifiers,
        scene: &mut W,
    ) -> Option<DragSession>
    where
        W: SceneWalker + ?Sized,
    {
        let frames = Pivot2World::new(self.pivot2world, view)?;
        let pick_view = view.scissored(selection_box_for_point(device_point, self.device_epsilon(view)));
        let ctx = PickContext {
            view: &pick_view,
            pivot: &frames,
            bounds: scene.selection_bounds(),
            modifiers,
            config: &self.config,
        };
        self.manipulator.test_select(&ctx, scene);
        let mut manipulatable = self.manipulator.manipulatable()?;

        // the drag manipulator may have changed the selection
        self.update_pivot(scene);
        let device2manip = construct_device2manip(&self.pivot2world, view)?;
        let manip2object = construct_manip2object(&self.pivot2world, view)?;
        let input = DragInput {
            device2manip,
            device_point,
            modifiers,
            config: &self.config.manipulator,
        };
        manipulatable.construct(&input, &scene.selection_bounds(), &self.pivot2world);

        Some(DragSession {
            manipulatable,
            device2manip,
            manip2object,
            pivot2world_start: self.pivot2world,
            undo_open: false,
            last: None,
        })
    }

    /// Pointer moved while pressed
    pub fn on_mouse_move<W, U>(
        &mut self,
        device_point: Vec2,
        modifiers: InputModifiers,
        scene: &mut W,
        undo: &mut U,
    ) where
        W: TransformSink + ?Sized,
        U: UndoSystem + ?Sized,
    {
        if let Some(press) = &mut self.press {
            press.current = device_point;
            return;
        }
        let Some(session) = &mut self.session else {
            return;
        };
        let input = DragInput {
            device2manip: session.device2manip,
            device_point,
            modifiers,
            config: &self.config.manipulator,
        };
        let Some(transformation) = session
            .manipulatable
            .transform(&input, &session.manip2object)
        else {
            trace!("Dropped drag update at {}", device_point);
            return;
        };
        if !session.undo_open {
            undo.start();
            session.undo_open = true;
        }
        scene.apply(&transformation, &session.pivot2world_start);
        session.last = Some(transformation);
    }

    /// Pointer released. Commits a drag, or resolves a click or sweep.
    pub fn on_mouse_up<W, U>(&mut self, view: &View, device_point: Vec2, scene: &mut W, undo: &mut U)
    where
        W: SceneWalker + TransformSink + ?Sized,
        U: UndoSystem + ?Sized,
    {
        if let Some(session) = self.session.take() {
            scene.freeze();
            if session.undo_open {
                let name = undo_name(self.mode(), session.last.as_ref());
                undo.finish(&name);
                debug!("Drag committed: {}", name);
            } else {
                debug!("Drag released without changes");
            }
            self.manipulator.set_selected(false);
            self.update_pivot(scene);
            return;
        }

        let Some(press) = self.press.take() else {
            return;
        };
        let delta = device_point - press.start;
        let epsilon = self.device_epsilon(view);
        if delta.x.abs() > epsilon.x || delta.y.abs() > epsilon.y {
            self.select_area(view, press.start, delta, press.modifiers, scene);
        } else {
            self.select_point(view, device_point, SelectionMode::from_modifiers(press.modifiers), scene);
        }
        self.update_pivot(scene);
    }

    /// Change the selection from a click. Returns true if anything was hit.
    pub fn select_point<W: SceneWalker + ?Sized>(
        &self,
        view: &View,
        device_point: Vec2,
        mode: SelectionMode,
        scene: &mut W,
    ) -> bool {
        let mut volume = self.point_volume(view, device_point);
        match mode {
            SelectionMode::Replace | SelectionMode::Toggle | SelectionMode::Cycle => {
                let mut pool = SelectionPool::new(self.bands());
                test_select_scene(scene, &mut volume, WalkFilter::All, &mut pool);
                let keys: Vec<W::Key> = pool.keys().copied().collect();
                debug!("Point select ({:?}): {} candidates", mode, keys.len());
                match mode {
                    SelectionMode::Toggle => {
                        if let Some(&key) = keys.first() {
                            let selected = scene.is_selected(key);
                            scene.set_selected(key, !selected);
                        }
                    }
                    SelectionMode::Cycle => {
                        let next = keys
                            .iter()
                            .position(|&key| scene.is_selected(key))
                            .map_or(0, |current| (current + 1) % keys.len());
                        scene.deselect_all();
                        if let Some(&key) = keys.get(next) {
                            scene.set_selected(key, true);
                        }
                    }
                    _ => {
                        scene.deselect_all();
                        if let Some(&key) = keys.first() {
                            scene.set_selected(key, true);
                        }
                    }
                }
                !keys.is_empty()
            }
            SelectionMode::Matching => {
                let mut best = BestSelector::new(&self.config.pick);
                test_select_scene(scene, &mut volume, WalkFilter::All, &mut best);
                replace_selection(scene, best.into_best())
            }
            SelectionMode::DeepMatching => {
                let mut best = DeepBestSelector::new(&self.config.pick);
                test_select_scene(scene, &mut volume, WalkFilter::All, &mut best);
                replace_selection(scene, best.into_best())
            }
        }
    }

    /// Select everything inside the device rectangle swept from `start` by
    /// `delta`. Shift adds to the selection instead of replacing it.
    pub fn select_area<W: SceneWalker + ?Sized>(
        &self,
        view: &View,
        start: Vec2,
        delta: Vec2,
        modifiers: InputModifiers,
        scene: &mut W,
    ) -> usize {
        let area_view = view.scissored(selection_box_for_area(start, delta));
        let mut volume = SelectionVolume::new(&area_view, self.bands());
        let mut pool = SelectionPool::new(self.bands());
        test_select_scene(scene, &mut volume, WalkFilter::All, &mut pool);

        if !modifiers.shift {
            scene.deselect_all();
        }
        let mut count = 0;
        for (_, key) in pool {
            scene.set_selected(key, true);
            count += 1;
        }
        debug!("Area select: {} objects", count);
        count
    }
}

fn replace_selection<W: SceneWalker + ?Sized>(scene: &mut W, keys: Vec<W::Key>) -> bool {
    scene.deselect_all();
    let hit = !keys.is_empty();
    for key in keys {
        scene.set_selected(key, true);
    }
    hit
}
