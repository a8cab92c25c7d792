//! Camera matrices for picking, with an optional scissor around the pointer.
//!
//! Device space is normalized pointer coordinates in `[-1, 1]` on both axes.
//! Enabling a scissor remaps a device rectangle onto the full clip box, so a
//! primitive survives clipping only if it projects inside that rectangle.

use glam::{Mat4, Vec2, Vec3};

/// Smallest scissor half size, keeps the scissor matrix invertible
const MIN_SCISSOR_HALF_SIZE: f32 = 1e-6;

/// A rectangle in device space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionBox {
    pub min: Vec2,
    pub max: Vec2,
}

/// Pick rectangle centered on a device point
pub fn selection_box_for_point(device_point: Vec2, device_epsilon: Vec2) -> SelectionBox {
    SelectionBox {
        min: device_point - device_epsilon,
        max: device_point + device_epsilon,
    }
}

/// Pick rectangle swept from `start` by `delta`
pub fn selection_box_for_area(start: Vec2, delta: Vec2) -> SelectionBox {
    let end = start + delta;
    SelectionBox {
        min: start.min(end),
        max: start.max(end),
    }
}

/// Device-space pick half size for a pixel radius.
///
/// The viewport maps device units to pixels, so its diagonal holds the half
/// window size. Half a pixel is the smallest half size a window can have.
pub fn device_epsilon_for_pixels(pixel_radius: f32, viewport: &Mat4) -> Vec2 {
    Vec2::new(
        pixel_radius / viewport.x_axis.x.abs().max(0.5),
        pixel_radius / viewport.y_axis.y.abs().max(0.5),
    )
}

/// Convert a window pixel position (origin top-left) to clamped device space
pub fn window_to_device(position: Vec2, width: u32, height: u32) -> Vec2 {
    let size = Vec2::new(width.max(1) as f32, height.max(1) as f32);
    let device = Vec2::new(
        position.x / size.x * 2.0 - 1.0,
        1.0 - position.y / size.y * 2.0,
    );
    device.clamp(Vec2::NEG_ONE, Vec2::ONE)
}

/// Camera matrices for one view
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct View {
    modelview: Mat4,
    projection: Mat4,
    viewport: Mat4,
    scissor: Mat4,
    view_projection: Mat4,
    fill: bool,
}

impl View {
    /// `fill` is false for wireframe views
    pub fn new(modelview: Mat4, projection: Mat4, viewport: Mat4, fill: bool) -> Self {
        let mut view = Self {
            modelview,
            projection,
            viewport,
            scissor: Mat4::IDENTITY,
            view_projection: Mat4::IDENTITY,
            fill,
        };
        view.construct();
        view
    }

    /// Build a view whose viewport matches a window size in pixels
    pub fn for_window(modelview: Mat4, projection: Mat4, width: u32, height: u32, fill: bool) -> Self {
        Self::new(
            modelview,
            projection,
            viewport_for_size(&projection, width, height),
            fill,
        )
    }

    fn construct(&mut self) {
        self.view_projection = self.scissor * self.projection * self.modelview;
    }

    /// Restrict clipping to a device rectangle
    pub fn enable_scissor(&mut self, rect: SelectionBox) {
        let half = ((rect.max - rect.min) * 0.5).max(Vec2::splat(MIN_SCISSOR_HALF_SIZE));
        let center = (rect.min + rect.max) * 0.5;
        let scissor = Mat4::from_translation(center.extend(0.0))
            * Mat4::from_scale(Vec3::new(half.x, half.y, 1.0));
        self.scissor = scissor.inverse();
        self.construct();
    }

    pub fn disable_scissor(&mut self) {
        self.scissor = Mat4::IDENTITY;
        self.construct();
    }

    /// A copy of this view scissored to `rect`
    pub fn scissored(&self, rect: SelectionBox) -> Self {
        let mut view = *self;
        view.enable_scissor(rect);
        view
    }

    /// Scissor * projection * modelview
    pub fn view_matrix(&self) -> Mat4 {
        self.view_projection
    }

    pub fn modelview(&self) -> Mat4 {
        self.modelview
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    pub fn viewport(&self) -> Mat4 {
        self.viewport
    }

    pub fn fill(&self) -> bool {
        self.fill
    }

    pub fn is_perspective(&self) -> bool {
        self.projection.z_axis.w.abs() > 1e-7
    }
}

/// Device-to-pixel matrix. Depth is scaled so one world unit along the view
/// axis spans as many pixels as one unit across it, keeping pivot scaling
/// uniform in perspective and ortho views.
pub fn viewport_for_size(projection: &Mat4, width: u32, height: u32) -> Mat4 {
    let half_width = width as f32 * 0.5;
    let half_height = height as f32 * 0.5;
    let pixels_per_unit = projection.x_axis.x * half_width;
    let depth_scale = if projection.z_axis.z.abs() > 1e-12 {
        pixels_per_unit / projection.z_axis.z.abs()
    } else {
        pixels_per_unit
    };
    Mat4::from_scale(Vec3::new(half_width, half_height, depth_scale))
}
