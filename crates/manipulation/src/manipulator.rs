//! Manipulators: sets of pickable handles, each bound to a drag behavior.
//!
//! A pick runs every visible handle of the active manipulator through a
//! [`SelectionPool`]; the closest handle becomes selected and decides which
//! [`Manipulatable`] the next drag uses. The drag manipulator has no handles
//! and instead walks an ordered rule table over the scene.

use glam::{BVec3, Mat4, Vec3};
use reticle_config::ReticleConfig;
use selection::{
    test_select_scene, Aabb, BooleanSelector, IntersectionBands, SceneWalker, Selectable,
    SelectionIntersection, SelectionPool, SelectionVolume, Selector, View, WalkFilter,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::manipulatable::{
    DragBounds, DragNewBrush, ExtrudeFaces, Manipulatable, RotateAxis, RotateFree, ScaleAxis,
    ScaleFree, SkewAxis, TranslateAxis, TranslateFree,
};
use crate::modifiers::InputModifiers;
use crate::pivot::Pivot2World;
use crate::ray::unit_axis;

/// Segments used to approximate rotate rings
const RING_SEGMENTS: usize = 32;

/// Which manipulator the editor shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ManipulatorMode {
    #[default]
    Translate,
    Rotate,
    Scale,
    Skew,
    Drag,
}

impl ManipulatorMode {
    /// Undo label used when a drag produced no update
    pub fn tool_name(self) -> &'static str {
        match self {
            ManipulatorMode::Translate => "translateTool",
            ManipulatorMode::Rotate => "rotateTool",
            ManipulatorMode::Scale => "scaleTool",
            ManipulatorMode::Skew => "skewTool",
            ManipulatorMode::Drag => "dragTool",
        }
    }

    /// Whether the pivot follows the reference object's rotation
    pub fn uses_pivot_rotation(self) -> bool {
        matches!(self, ManipulatorMode::Rotate | ManipulatorMode::Scale)
    }
}

/// Everything a pick needs besides the scene
#[derive(Debug, Clone, Copy)]
pub struct PickContext<'a> {
    /// View scissored around the pointer
    pub view: &'a View,
    pub pivot: &'a Pivot2World,
    /// World bounds of the current selection
    pub bounds: Aabb,
    pub modifiers: InputModifiers,
    pub config: &'a ReticleConfig,
}

impl PickContext<'_> {
    fn bands(&self) -> IntersectionBands {
        IntersectionBands::from(&self.config.pick)
    }

    fn volume(&self) -> SelectionVolume {
        SelectionVolume::new(self.view, self.bands())
    }
}

/// Handle geometry in the handle's own frame
#[derive(Debug, Clone)]
enum HandleShape {
    Segment(Vec3, Vec3),
    LineLoop(Vec<Vec3>),
    Polygon(Vec<Vec3>),
}

impl HandleShape {
    fn test(&self, volume: &SelectionVolume, best: &mut SelectionIntersection) {
        match self {
            HandleShape::Segment(a, b) => volume.test_segment(*a, *b, best),
            HandleShape::LineLoop(points) => volume.test_line_loop(points, best),
            HandleShape::Polygon(points) => volume.test_polygon(points, best),
        }
    }
}

/// Closest handle under the pointer
fn pick_handle<H: Copy>(
    ctx: &PickContext,
    handles: impl IntoIterator<Item = (H, Mat4, HandleShape)>,
) -> Option<H> {
    let mut volume = ctx.volume();
    let mut pool = SelectionPool::new(ctx.bands());
    for (handle, frame, shape) in handles {
        pool.push_selectable(handle);
        volume.begin_mesh(frame, true);
        let mut best = SelectionIntersection::INVALID;
        shape.test(&volume, &mut best);
        pool.add_intersection(best);
        pool.pop_selectable();
    }
    pool.best().map(|(_, handle)| *handle)
}

/// Counter-clockwise circle from `u` toward `v`
fn circle(radius: f32, u: Vec3, v: Vec3) -> Vec<Vec3> {
    (0..RING_SEGMENTS)
        .map(|i| {
            let angle = i as f32 / RING_SEGMENTS as f32 * std::f32::consts::TAU;
            (u * angle.cos() + v * angle.sin()) * radius
        })
        .collect()
}

/// Counter-clockwise square in the XY plane
fn square(half_size: f32) -> Vec<Vec3> {
    vec![
        Vec3::new(-half_size, -half_size, 0.0),
        Vec3::new(half_size, -half_size, 0.0),
        Vec3::new(half_size, half_size, 0.0),
        Vec3::new(-half_size, half_size, 0.0),
    ]
}

/// Axis segments that are not pointing at the viewer
fn axis_handles<H>(
    ctx: &PickContext,
    length: f32,
    handle: impl Fn(usize) -> H,
) -> Vec<(H, Mat4, HandleShape)> {
    (0..3)
        .filter(|&i| {
            ctx.pivot
                .show_axis(unit_axis(i), ctx.config.manipulator.axis_hide_threshold)
        })
        .map(|i| {
            (
                handle(i),
                ctx.pivot.world_space,
                HandleShape::Segment(Vec3::ZERO, unit_axis(i) * length),
            )
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslateHandle {
    Axis(usize),
    Screen,
}

/// Three axis arrows and a screen-plane quad
#[derive(Debug, Clone, Default)]
pub struct TranslateManipulator {
    selected: Option<TranslateHandle>,
}

impl TranslateManipulator {
    pub fn selected(&self) -> Option<TranslateHandle> {
        self.selected
    }

    fn test_select(&mut self, ctx: &PickContext) {
        let config = &ctx.config.manipulator;
        let mut handles = axis_handles(ctx, config.translate_axis_length, TranslateHandle::Axis);
        handles.push((
            TranslateHandle::Screen,
            ctx.pivot.viewplane_space,
            HandleShape::Polygon(square(config.quad_size)),
        ));
        self.selected = pick_handle(ctx, handles);
    }

    fn manipulatable(&self) -> Option<Manipulatable> {
        Some(match self.selected? {
            TranslateHandle::Axis(i) => Manipulatable::TranslateAxis(TranslateAxis::new(unit_axis(i))),
            TranslateHandle::Screen => Manipulatable::TranslateFree(TranslateFree::default()),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotateHandle {
    Axis(usize),
    /// Ring facing the viewer
    Screen,
    /// Inside the trackball, away from every ring
    Sphere,
}

/// Three axis rings, a screen ring and a free trackball
#[derive(Debug, Clone, Default)]
pub struct RotateManipulator {
    selected: Option<RotateHandle>,
    screen_axis: Vec3,
}

impl RotateManipulator {
    pub fn selected(&self) -> Option<RotateHandle> {
        self.selected
    }

    fn test_select(&mut self, ctx: &PickContext) {
        let config = &ctx.config.manipulator;
        let radius = config.rotate_sphere_radius;
        self.screen_axis = ctx.pivot.axis_screen;

        let mut handles: Vec<_> = (0..3)
            .map(|i| {
                let (u, v) = (unit_axis((i + 1) % 3), unit_axis((i + 2) % 3));
                (
                    RotateHandle::Axis(i),
                    ctx.pivot.world_space,
                    HandleShape::LineLoop(circle(radius, u, v)),
                )
            })
            .collect();
        handles.push((
            RotateHandle::Screen,
            ctx.pivot.viewpoint_space,
            HandleShape::LineLoop(circle(config.rotate_screen_radius, Vec3::X, Vec3::Y)),
        ));
        self.selected = pick_handle(ctx, handles);
        if self.selected.is_some() {
            return;
        }

        let mut volume = ctx.volume();
        volume.begin_mesh(ctx.pivot.viewpoint_space, true);
        let mut sphere = BooleanSelector::new();
        Selector::<()>::push_selectable(&mut sphere, ());
        let mut best = SelectionIntersection::INVALID;
        volume.test_polygon(&circle(radius, Vec3::X, Vec3::Y), &mut best);
        Selector::<()>::add_intersection(&mut sphere, best);
        Selector::<()>::pop_selectable(&mut sphere);
        if sphere.is_selected() {
            self.selected = Some(RotateHandle::Sphere);
        }
    }

    fn manipulatable(&self) -> Option<Manipulatable> {
        Some(match self.selected? {
            RotateHandle::Axis(i) => Manipulatable::RotateAxis(RotateAxis::new(unit_axis(i))),
            RotateHandle::Screen => Manipulatable::RotateAxis(RotateAxis::new(self.screen_axis)),
            RotateHandle::Sphere => Manipulatable::RotateFree(RotateFree::default()),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleHandle {
    Axis(usize),
    Screen,
}

/// Three axis handles and a screen-plane quad
#[derive(Debug, Clone, Default)]
pub struct ScaleManipulator {
    selected: Option<ScaleHandle>,
}

impl ScaleManipulator {
    pub fn selected(&self) -> Option<ScaleHandle> {
        self.selected
    }

    fn test_select(&mut self, ctx: &PickContext) {
        let config = &ctx.config.manipulator;
        let mut handles = axis_handles(ctx, config.scale_axis_length, ScaleHandle::Axis);
        handles.push((
            ScaleHandle::Screen,
            ctx.pivot.viewplane_space,
            HandleShape::Polygon(square(config.quad_size)),
        ));
        self.selected = pick_handle(ctx, handles);
    }

    fn manipulatable(&self) -> Option<Manipulatable> {
        Some(match self.selected? {
            ScaleHandle::Axis(i) => Manipulatable::ScaleAxis(ScaleAxis::new(unit_axis(i))),
            ScaleHandle::Screen => Manipulatable::ScaleFree(ScaleFree::default()),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkewHandle {
    /// Centre line along `which` on the bounds face normal to `by`
    Edge { which: usize, by: usize, positive: bool },
    /// Inside the bounds but away from every edge line
    Body,
}

/// Lines across each bounds face; dragging one skews along its direction
#[derive(Debug, Clone, Default)]
pub struct SkewManipulator {
    selected: Option<SkewHandle>,
}

impl SkewManipulator {
    pub fn selected(&self) -> Option<SkewHandle> {
        self.selected
    }

    fn test_select(&mut self, ctx: &PickContext) {
        self.selected = None;
        let bounds = ctx.bounds;
        if !bounds.is_valid() {
            return;
        }

        let mut handles = Vec::with_capacity(12);
        for by in 0..3 {
            for positive in [true, false] {
                let sign = if positive { 1.0 } else { -1.0 };
                let center = bounds.origin + unit_axis(by) * bounds.extents[by] * sign;
                for which in (0..3).filter(|&which| which != by) {
                    let half = unit_axis(which) * bounds.extents[which];
                    handles.push((
                        SkewHandle::Edge { which, by, positive },
                        Mat4::IDENTITY,
                        HandleShape::Segment(center - half, center + half),
                    ));
                }
            }
        }
        self.selected = pick_handle(ctx, handles);
        if self.selected.is_some() {
            return;
        }

        let mut volume = ctx.volume();
        volume.begin_mesh(Mat4::IDENTITY, false);
        let mut best = SelectionIntersection::INVALID;
        volume.test_aabb(&bounds, &mut best);
        if best.is_valid() {
            self.selected = Some(SkewHandle::Body);
        }
    }

    fn manipulatable(&self) -> Option<Manipulatable> {
        Some(match self.selected? {
            SkewHandle::Edge { which, by, positive } => {
                Manipulatable::SkewAxis(SkewAxis::new(which, by, positive))
            }
            SkewHandle::Body => Manipulatable::TranslateFree(TranslateFree::default()),
        })
    }
}

/// What a drag-mode press resolved to
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragAction {
    Extrude { axis: usize, positive: bool },
    /// Rotate about the view axis, in pivot-local coordinates
    RotateCorner { axis: Vec3 },
    Resize { moving_min: BVec3, moving_max: BVec3 },
    Translate,
    NewBrush,
}

/// One guarded entry of the drag decision table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragRule {
    /// ctrl+alt: push the bounds face under the pointer
    ExtrudeFace,
    /// alt+shift: rotate by a bounds corner about the view axis
    RotateCorner,
    /// alt: resize by the bounds faces beyond the pointer
    ResizeFaces,
    /// Pointer over the selection
    TranslateSelected,
    /// Pointer over an unselected object: select it, then translate
    SelectAndTranslate,
    /// Nothing under the pointer
    NewBrush,
}

/// Evaluated in order; the first rule that decides wins
pub const DRAG_RULES: [DragRule; 6] = [
    DragRule::ExtrudeFace,
    DragRule::RotateCorner,
    DragRule::ResizeFaces,
    DragRule::TranslateSelected,
    DragRule::SelectAndTranslate,
    DragRule::NewBrush,
];

#[derive(Debug, Clone, Copy, PartialEq)]
enum RuleOutcome {
    Pass,
    Decided(Option<DragAction>),
}

impl DragRule {
    fn evaluate<W: SceneWalker + ?Sized>(self, ctx: &PickContext, scene: &mut W) -> RuleOutcome {
        let modifiers = ctx.modifiers;
        match self {
            DragRule::ExtrudeFace if modifiers.ctrl && modifiers.alt => {
                RuleOutcome::Decided(extrude_face_under_pointer(ctx))
            }
            DragRule::RotateCorner if modifiers.alt && modifiers.shift => {
                RuleOutcome::Decided(corner_under_pointer(ctx).then_some(DragAction::RotateCorner {
                    axis: ctx.pivot.axis_screen,
                }))
            }
            DragRule::ResizeFaces if modifiers.alt => {
                RuleOutcome::Decided(faces_beyond_pointer(ctx))
            }
            DragRule::TranslateSelected => {
                let mut hit = BooleanSelector::new();
                test_select_scene(scene, &mut ctx.volume(), WalkFilter::SelectedOnly, &mut hit);
                if hit.is_selected() {
                    RuleOutcome::Decided(Some(DragAction::Translate))
                } else {
                    RuleOutcome::Pass
                }
            }
            DragRule::SelectAndTranslate => {
                let mut pool = SelectionPool::new(ctx.bands());
                test_select_scene(scene, &mut ctx.volume(), WalkFilter::UnselectedOnly, &mut pool);
                let Some(&(_, key)) = pool.best() else {
                    return RuleOutcome::Pass;
                };
                if !modifiers.shift {
                    scene.deselect_all();
                }
                scene.set_selected(key, true);
                debug!("Drag: selected {:?} before translating", key);
                RuleOutcome::Decided(Some(DragAction::Translate))
            }
            DragRule::NewBrush => RuleOutcome::Decided(Some(DragAction::NewBrush)),
            _ => RuleOutcome::Pass,
        }
    }
}

fn extrude_face_under_pointer(ctx: &PickContext) -> Option<DragAction> {
    let bounds = ctx.bounds;
    if !bounds.is_valid() {
        return None;
    }
    let faces = (0..3).flat_map(|axis| {
        [true, false].map(|positive| {
            (
                (axis, positive),
                Mat4::IDENTITY,
                HandleShape::Polygon(bounds.face(axis, positive).to_vec()),
            )
        })
    });
    let (axis, positive) = pick_handle(ctx, faces)?;
    Some(DragAction::Extrude { axis, positive })
}

fn corner_under_pointer(ctx: &PickContext) -> bool {
    if !ctx.bounds.is_valid() {
        return false;
    }
    let mut volume = ctx.volume();
    volume.begin_mesh(Mat4::IDENTITY, false);
    let mut best = SelectionIntersection::INVALID;
    volume.test_points(&ctx.bounds.corners(), &mut best);
    best.is_valid()
}

/// Faces whose planes lie between the box and the pointer line
fn faces_beyond_pointer(ctx: &PickContext) -> Option<DragAction> {
    let bounds = ctx.bounds;
    if !bounds.is_valid() {
        return None;
    }
    let mut volume = ctx.volume();
    volume.begin_mesh(Mat4::IDENTITY, false);
    let (near, far) = (volume.near(), volume.far());
    let direction = (far - near).try_normalize()?;
    let closest = near + direction * (bounds.origin - near).dot(direction);

    let moving_max = closest.cmpgt(bounds.max());
    let moving_min = closest.cmplt(bounds.min());
    if !(moving_max.any() || moving_min.any()) {
        return None;
    }
    Some(DragAction::Resize {
        moving_min,
        moving_max,
    })
}

/// Picks scene objects and bounds features instead of handles
#[derive(Debug, Clone, Default)]
pub struct DragManipulator {
    selected: Option<DragAction>,
}

impl DragManipulator {
    pub fn selected(&self) -> Option<DragAction> {
        self.selected
    }

    fn test_select<W: SceneWalker + ?Sized>(&mut self, ctx: &PickContext, scene: &mut W) {
        self.selected = None;
        for rule in DRAG_RULES {
            if let RuleOutcome::Decided(action) = rule.evaluate(ctx, scene) {
                debug!("Drag: {:?} decided {:?}", rule, action);
                self.selected = action;
                return;
            }
        }
    }

    fn manipulatable(&self) -> Option<Manipulatable> {
        Some(match self.selected? {
            DragAction::Extrude { axis, positive } => {
                Manipulatable::ExtrudeFaces(ExtrudeFaces::new(axis, positive))
            }
            DragAction::RotateCorner { axis } => Manipulatable::RotateAxis(RotateAxis::new(axis)),
            DragAction::Resize {
                moving_min,
                moving_max,
            } => Manipulatable::DragBounds(DragBounds::new(moving_min, moving_max)),
            DragAction::Translate => Manipulatable::TranslateFree(TranslateFree::default()),
            DragAction::NewBrush => Manipulatable::DragNewBrush(DragNewBrush::default()),
        })
    }
}

/// The closed set of manipulators
#[derive(Debug, Clone)]
pub enum Manipulator {
    Translate(TranslateManipulator),
    Rotate(RotateManipulator),
    Scale(ScaleManipulator),
    Skew(SkewManipulator),
    Drag(DragManipulator),
}

impl Manipulator {
    pub fn for_mode(mode: ManipulatorMode) -> Self {
        match mode {
            ManipulatorMode::Translate => Manipulator::Translate(TranslateManipulator::default()),
            ManipulatorMode::Rotate => Manipulator::Rotate(RotateManipulator::default()),
            ManipulatorMode::Scale => Manipulator::Scale(ScaleManipulator::default()),
            ManipulatorMode::Skew => Manipulator::Skew(SkewManipulator::default()),
            ManipulatorMode::Drag => Manipulator::Drag(DragManipulator::default()),
        }
    }

    pub fn mode(&self) -> ManipulatorMode {
        match self {
            Manipulator::Translate(_) => ManipulatorMode::Translate,
            Manipulator::Rotate(_) => ManipulatorMode::Rotate,
            Manipulator::Scale(_) => ManipulatorMode::Scale,
            Manipulator::Skew(_) => ManipulatorMode::Skew,
            Manipulator::Drag(_) => ManipulatorMode::Drag,
        }
    }

    /// Resolve the handle under the pointer. Only the drag manipulator
    /// touches `scene`, and it may change the selection.
    pub fn test_select<W: SceneWalker + ?Sized>(&mut self, ctx: &PickContext, scene: &mut W) {
        match self {
            Manipulator::Translate(m) => m.test_select(ctx),
            Manipulator::Rotate(m) => m.test_select(ctx),
            Manipulator::Scale(m) => m.test_select(ctx),
            Manipulator::Skew(m) => m.test_select(ctx),
            Manipulator::Drag(m) => m.test_select(ctx, scene),
        }
        debug!("{:?} manipulator selected: {}", self.mode(), self.is_selected());
    }

    /// A fresh behavior for the selected handle
    pub fn manipulatable(&self) -> Option<Manipulatable> {
        match self {
            Manipulator::Translate(m) => m.manipulatable(),
            Manipulator::Rotate(m) => m.manipulatable(),
            Manipulator::Scale(m) => m.manipulatable(),
            Manipulator::Skew(m) => m.manipulatable(),
            Manipulator::Drag(m) => m.manipulatable(),
        }
    }
}

impl Selectable for Manipulator {
    fn is_selected(&self) -> bool {
        match self {
            Manipulator::Translate(m) => m.selected.is_some(),
            Manipulator::Rotate(m) => m.selected.is_some(),
            Manipulator::Scale(m) => m.selected.is_some(),
            Manipulator::Skew(m) => m.selected.is_some(),
            Manipulator::Drag(m) => m.selected.is_some(),
        }
    }

    /// Handles are selected by picking; this only clears them
    fn set_selected(&mut self, selected: bool) {
        if selected {
            return;
        }
        match self {
            Manipulator::Translate(m) => m.selected = None,
            Manipulator::Rotate(m) => m.selected = None,
            Manipulator::Scale(m) => m.selected = None,
            Manipulator::Skew(m) => m.selected = None,
            Manipulator::Drag(m) => m.selected = None,
        }
    }
}
