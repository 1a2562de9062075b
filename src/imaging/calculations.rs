//! Pure calculation functions for thumbnail dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

use super::params::Bounds;

/// Calculate the output size of a thumbnail that fits inside `bounds`.
///
/// The source aspect ratio is preserved and the result never exceeds the
/// source dimensions: requests larger than the original are clamped to it.
/// The derived side is rounded to the nearest pixel and is at least 1.
///
/// - Only width given: height = `round(H * w / W)`
/// - Only height given: width = `round(W * h / H)`
/// - Both given: the tighter of the two constraints wins
/// - Neither given: the source size
///
/// # Examples
/// ```
/// # use galleryd::imaging::{Bounds, fit_within};
/// // 800x600 source, width=200 → 200x150
/// assert_eq!(fit_within((800, 600), Bounds::new(Some(200), None)), (200, 150));
///
/// // No upscaling: a 3000px request on an 800px source keeps 800x600
/// assert_eq!(fit_within((800, 600), Bounds::new(Some(3000), None)), (800, 600));
/// ```
pub fn fit_within(source: (u32, u32), bounds: Bounds) -> (u32, u32) {
    let (src_w, src_h) = (source.0.max(1), source.1.max(1));

    match (bounds.width, bounds.height) {
        (None, None) => (src_w, src_h),
        (Some(w), None) => scale_by_width(src_w, src_h, w.min(src_w)),
        (None, Some(h)) => scale_by_height(src_w, src_h, h.min(src_h)),
        (Some(w), Some(h)) => {
            let w = w.min(src_w);
            let h = h.min(src_h);
            // Compare w/src_w against h/src_h without floating point
            if u64::from(w) * u64::from(src_h) <= u64::from(h) * u64::from(src_w) {
                scale_by_width(src_w, src_h, w)
            } else {
                scale_by_height(src_w, src_h, h)
            }
        }
    }
}

fn scale_by_width(src_w: u32, src_h: u32, w: u32) -> (u32, u32) {
    let h = (src_h as f64 * w as f64 / src_w as f64).round() as u32;
    (w.max(1), h.max(1))
}

fn scale_by_height(src_w: u32, src_h: u32, h: u32) -> (u32, u32) {
    let w = (src_w as f64 * h as f64 / src_h as f64).round() as u32;
    (w.max(1), h.max(1))
}
