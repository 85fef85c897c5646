//! Overlay rectangle resolution

/// Width used when neither dimension is requested, in points
pub const DEFAULT_WIDTH: f32 = 100.0;

/// Resolved image rectangle in PDF user space; `(x, y)` is the lower-left
/// corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlaySpec {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl OverlaySpec {
    /// Largest rectangle of aspect `ratio` (width / height) that fits inside
    /// this one, centred in it.
    pub fn fit(&self, ratio: f32) -> OverlaySpec {
        if ratio <= 0.0 || self.width <= 0.0 || self.height <= 0.0 {
            return *self;
        }
        let (width, height) = if self.width / self.height > ratio {
            (self.height * ratio, self.height)
        } else {
            (self.width, self.width / ratio)
        };
        OverlaySpec {
            x: self.x + (self.width - width) / 2.0,
            y: self.y + (self.height - height) / 2.0,
            width,
            height,
        }
    }
}

/// Resolve the drawn size of an image with aspect ratio `ratio`
/// (width / height) placed at `(x, y)` on a page of `page_size`.
///
/// Missing dimensions are derived from the ratio. The result is clamped to
/// the page: width first, then height, each recomputing the other side.
///
/// # Arguments
/// * `page_size` - Page width and height in points
/// * `ratio` - Image width over height
/// * `x`, `y` - Lower-left corner of the rectangle
/// * `width`, `height` - Requested size; `None` derives it from the other
///   side, or from [`DEFAULT_WIDTH`] when both are missing
pub fn resolve_placement(
    page_size: (f32, f32),
    ratio: f32,
    x: f32,
    y: f32,
    width: Option<f32>,
    height: Option<f32>,
) -> OverlaySpec {
    let (page_width, page_height) = page_size;

    let (mut width, mut height) = match (width, height) {
        (None, None) => (DEFAULT_WIDTH, DEFAULT_WIDTH / ratio),
        (Some(w), None) => (w, w / ratio),
        (None, Some(h)) => (h * ratio, h),
        (Some(w), Some(h)) => (w, h),
    };

    if x + width > page_width {
        width = (page_width - x).max(0.0);
        height = width / ratio;
    }
    if y + height > page_height {
        height = (page_height - y).max(0.0);
        width = height * ratio;
    }

    OverlaySpec {
        x,
        y,
        width,
        height,
    }
}
