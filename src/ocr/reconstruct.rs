//! Rebuilds spaced text from character boxes.
//!
//! Boxes are clustered into lines by vertical center, then split into words
//! wherever the horizontal gap between neighbours exceeds an adaptive
//! threshold derived from the line's own gaps and glyph widths.

use super::engine::CharBox;

/// Floor for the vertical grouping tolerance.
const MIN_Y_TOLERANCE: f32 = 3.0;
/// Vertical tolerance as a fraction of the median box height.
const Y_TOLERANCE_RATIO: f32 = 0.35;
/// Floor for the word gap threshold.
const MIN_GAP: f32 = 3.0;
const GAP_MEDIAN_RATIO: f32 = 1.8;
const GAP_WIDTH_RATIO: f32 = 0.60;
/// A multi-line result whose region is flatter than this (height / width)
/// is treated as one misclustered line.
const FLAT_REGION_RATIO: f32 = 0.4;

/// Returns the newline-joined reconstructed text. No boxes gives "".
pub fn reconstruct_text(boxes: &[CharBox]) -> String {
    let boxes: Vec<&CharBox> = boxes.iter().filter(|b| !b.glyph.is_empty()).collect();
    if boxes.is_empty() {
        return String::new();
    }

    let lines = group_lines(&boxes);
    let texts: Vec<String> = lines.iter().map(|line| line_text(line)).collect();

    if lines.len() > 1 && is_flat_region(&boxes) {
        crate::log(&format!(
            "Reconstruction: {} lines in a flat region, flattening to one line",
            lines.len()
        ));
        return texts.join(" ");
    }

    texts.join("\n")
}

/// Clusters boxes into lines, top line first, each line left to right.
fn group_lines<'a>(boxes: &[&'a CharBox]) -> Vec<Vec<&'a CharBox>> {
    let mut sorted = boxes.to_vec();
    sorted.sort_by(|a, b| {
        b.center_y()
            .total_cmp(&a.center_y())
            .then(a.center_x().total_cmp(&b.center_x()))
    });

    let heights: Vec<f32> = sorted.iter().map(|b| b.height()).collect();
    let y_tolerance = MIN_Y_TOLERANCE.max(Y_TOLERANCE_RATIO * median(&heights).unwrap_or(0.0));

    let mut lines: Vec<Vec<&CharBox>> = Vec::new();
    for b in sorted {
        // Compared against the last box added, so a slowly drifting baseline
        // stays on one line.
        let joins = lines
            .last()
            .and_then(|line| line.last())
            .is_some_and(|last| (last.center_y() - b.center_y()).abs() <= y_tolerance);
        if joins {
            if let Some(line) = lines.last_mut() {
                line.push(b);
            }
        } else {
            lines.push(vec![b]);
        }
    }

    for line in &mut lines {
        line.sort_by(|a, b| a.center_x().total_cmp(&b.center_x()));
    }
    lines
}

/// Gap between each box and its right neighbour.
fn gaps(line: &[&CharBox]) -> Vec<f32> {
    line.windows(2).map(|w| w[1].left - w[0].right).collect()
}

/// Gap above which two neighbouring glyphs belong to different words.
pub fn gap_threshold(line: &[&CharBox]) -> f32 {
    let median_gap = median(&gaps(line)).unwrap_or(0.0);
    let avg_width = if line.is_empty() {
        0.0
    } else {
        line.iter().map(|b| b.width()).sum::<f32>() / line.len() as f32
    };
    MIN_GAP
        .max(GAP_MEDIAN_RATIO * median_gap)
        .max(GAP_WIDTH_RATIO * avg_width)
}

fn line_text(line: &[&CharBox]) -> String {
    let threshold = gap_threshold(line);
    let mut text = String::new();
    for (i, b) in line.iter().enumerate() {
        if i > 0 && b.left - line[i - 1].right > threshold {
            text.push(' ');
        }
        text.push_str(&b.glyph);
    }
    text
}

fn is_flat_region(boxes: &[&CharBox]) -> bool {
    let left = boxes.iter().map(|b| b.left).fold(f32::INFINITY, f32::min);
    let right = boxes.iter().map(|b| b.right).fold(f32::NEG_INFINITY, f32::max);
    let bottom = boxes.iter().map(|b| b.bottom).fold(f32::INFINITY, f32::min);
    let top = boxes.iter().map(|b| b.top).fold(f32::NEG_INFINITY, f32::max);
    (top - bottom) < FLAT_REGION_RATIO * (right - left)
}

/// Median; mean of the two middle values for even counts.
fn median(values: &[f32]) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::engine::parse_box_output;

    fn make_box(glyph: &str, left: f32, bottom: f32, right: f32, top: f32) -> CharBox {
        CharBox {
            glyph: glyph.to_string(),
            left,
            bottom,
            right,
            top,
        }
    }

    /// Lays out words on one baseline: glyphs 5 wide, 2 apart, words 20 apart.
    fn row(words: &[&str], x0: f32, bottom: f32) -> Vec<CharBox> {
        let mut boxes = Vec::new();
        let mut x = x0;
        for (w, word) in words.iter().enumerate() {
            if w > 0 {
                x += 18.0;
            }
            for c in word.chars() {
                boxes.push(make_box(&c.to_string(), x, bottom, x + 5.0, bottom + 10.0));
                x += 7.0;
            }
        }
        boxes
    }

    #[test]
    fn test_two_clusters_one_space() {
        let boxes = row(&["abcd", "efgh"], 0.0, 0.0);
        // Intra-word gap 2, inter-word gap 20.
        assert_eq!(boxes[4].left - boxes[3].right, 20.0);
        assert_eq!(reconstruct_text(&boxes), "abcd efgh");
    }

    #[test]
    fn test_uniform_small_gaps_single_token() {
        let boxes = row(&["gallia"], 0.0, 0.0);
        assert_eq!(reconstruct_text(&boxes), "gallia");
    }

    #[test]
    fn test_gap_threshold_components() {
        let boxes = row(&["abcd", "efgh"], 0.0, 0.0);
        let refs: Vec<&CharBox> = boxes.iter().collect();
        // max(3.0, 1.8 * 2.0, 0.6 * 5.0)
        assert!((gap_threshold(&refs) - 3.6).abs() < 1e-5);

        let wide: Vec<CharBox> = (0..3)
            .map(|i| make_box("m", i as f32 * 22.0, 0.0, i as f32 * 22.0 + 20.0, 10.0))
            .collect();
        let refs: Vec<&CharBox> = wide.iter().collect();
        assert!((gap_threshold(&refs) - 12.0).abs() < 1e-5);
    }

    #[test]
    fn test_input_order_irrelevant() {
        let mut boxes = row(&["arma", "cano"], 0.0, 0.0);
        boxes.reverse();
        boxes.swap(1, 5);
        assert_eq!(reconstruct_text(&boxes), "arma cano");
    }

    #[test]
    fn test_lines_top_first() {
        let mut boxes = row(&["ab"], 0.0, 0.0);
        boxes.extend(row(&["cd"], 0.0, 40.0));
        // Region 12 wide, 50 tall: a genuine two-line block.
        assert_eq!(reconstruct_text(&boxes), "cd\nab");
    }

    #[test]
    fn test_flat_region_flattened() {
        // One physical line whose second word sits 5 units higher than the
        // first; more than the 3.5 tolerance, so it clusters as two lines.
        let mut boxes = row(&["abc"], 0.0, 5.0);
        boxes.extend(row(&["def"], 80.0, 0.0));
        assert_eq!(reconstruct_text(&boxes), "abc def");
    }

    #[test]
    fn test_drifting_baseline_stays_on_one_line() {
        let boxes: Vec<CharBox> = "roma"
            .chars()
            .enumerate()
            .map(|(i, c)| {
                let x = i as f32 * 7.0;
                let y = i as f32 * 2.0;
                make_box(&c.to_string(), x, y, x + 5.0, y + 10.0)
            })
            .collect();
        // Consecutive centers differ by 2, within the 3.5 tolerance.
        assert_eq!(reconstruct_text(&boxes), "roma");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(reconstruct_text(&[]), "");
    }

    #[test]
    fn test_overlapping_boxes_concatenate() {
        let boxes = parse_box_output("a 0 0 5 5 0\nb 0 0 5 5 0");
        assert_eq!(reconstruct_text(&boxes), "ab");
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&[]), None);
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), Some(2.5));
    }
}
