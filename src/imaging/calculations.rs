//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

use super::backend::Dimensions;

/// Plan the output dimensions for an image that must fit inside `bounds`.
///
/// Images that already fit are returned unchanged; the planner never
/// upscales. Larger images are scaled down along the longer edge first and
/// the other edge is derived from the source aspect ratio. If the derived
/// edge still overflows its own bound (non-square bounds), the image is
/// scaled again to fit that bound too.
///
/// Output edges are rounded to the nearest pixel and never drop below 1.
///
/// # Examples
/// ```
/// # use canvas_ingest::imaging::{Dimensions, plan_dimensions};
/// // 4000x3000 landscape into a 1600 box → 1600x1200
/// let planned = plan_dimensions(Dimensions::new(4000, 3000), Dimensions::new(1600, 1600));
/// assert_eq!(planned, Dimensions::new(1600, 1200));
///
/// // Small icons pass through untouched
/// let icon = plan_dimensions(Dimensions::new(50, 50), Dimensions::new(400, 400));
/// assert_eq!(icon, Dimensions::new(50, 50));
/// ```
pub fn plan_dimensions(source: Dimensions, bounds: Dimensions) -> Dimensions {
    let max_w = bounds.width.max(1);
    let max_h = bounds.height.max(1);

    if source.width <= max_w && source.height <= max_h {
        return source;
    }

    let (src_w, src_h) = (source.width as f64, source.height as f64);

    let (mut w, mut h) = if source.width > source.height {
        // Landscape: width is the long edge
        let w = source.width.min(max_w) as f64;
        (w, src_h * w / src_w)
    } else {
        // Portrait or square: height is the long edge
        let h = source.height.min(max_h) as f64;
        (src_w * h / src_h, h)
    };

    if w > max_w as f64 {
        h = h * max_w as f64 / w;
        w = max_w as f64;
    }
    if h > max_h as f64 {
        w = w * max_h as f64 / h;
        h = max_h as f64;
    }

    Dimensions {
        width: (w.round() as u32).clamp(1, max_w),
        height: (h.round() as u32).clamp(1, max_h),
    }
}
