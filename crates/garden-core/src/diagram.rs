//! Plain-text garden layout.

use std::fmt::Write;

use crate::existing::ExistingCrop;

/// Render the layout as numbered rows.
///
/// ```text
/// Garden Layout Diagram (Text-based)
///
/// Total garden size: 100 sq ft
///
/// Existing crops:
///   Row 1: Tomatoes (50 sq ft)
///
/// New crops:
///   Row 2: Potatoes
/// ```
///
/// Row numbers run on from the existing crops into the new ones.
pub fn render_diagram<S: AsRef<str>>(
    garden_size: f64,
    existing: &[ExistingCrop],
    new_crops: &[S],
) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = writeln!(out, "Garden Layout Diagram (Text-based)");
    let _ = writeln!(out);
    let _ = writeln!(out, "Total garden size: {garden_size} sq ft");
    let _ = writeln!(out);

    let mut row = 0usize;

    let _ = writeln!(out, "Existing crops:");
    if existing.is_empty() {
        let _ = writeln!(out, "  None");
    }
    for crop in existing {
        row += 1;
        let _ = writeln!(out, "  Row {row}: {} ({} sq ft)", crop.name, crop.area);
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "New crops:");
    if new_crops.is_empty() {
        let _ = writeln!(out, "  No new crops fit in the remaining space.");
    }
    for crop in new_crops {
        row += 1;
        let _ = writeln!(out, "  Row {row}: {}", crop.as_ref());
    }

    out
}
