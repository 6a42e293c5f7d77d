//! Line-height arithmetic and CSS substitution.
//!
//! The fit search only ever talks about line-heights rounded to two decimals,
//! so `1.2 + 0.05 * 10` is `1.70` and not `1.6999999999999997`. Substitution
//! writes the same two-decimal form into the stylesheet.

use once_cell::sync::Lazy;
use regex::Regex;

/// Matches a unitless `line-height: <number>;` declaration.
static LINE_HEIGHT_DECL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"line-height:\s*([0-9]*\.?[0-9]+)\s*;").expect("line-height pattern is valid")
});

/// Rounds a line-height to two decimal places.
pub fn round_line_height(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Advances a line-height by one step, rounding the result.
pub fn next_line_height(current: f64, step: f64) -> f64 {
    round_line_height(current + step)
}

/// Formats a line-height the way it appears in CSS.
pub fn format_line_height(value: f64) -> String {
    format!("{:.2}", round_line_height(value))
}

/// Replaces every unitless `line-height` declaration in `css` with `value`.
///
/// Declarations with units (`18px`) or keywords (`normal`) are not touched.
/// When the stylesheet has no matching declaration the text is returned as is.
pub fn apply_line_height(css: &str, value: f64) -> String {
    let formatted = format_line_height(value);
    LINE_HEIGHT_DECL
        .replace_all(css, format!("line-height: {formatted};").as_str())
        .into_owned()
}

/// Returns the first unitless line-height declared in `css`, if any.
pub fn find_line_height(css: &str) -> Option<f64> {
    LINE_HEIGHT_DECL
        .captures(css)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

/// True if `css` has at least one declaration the search can drive.
pub fn has_line_height(css: &str) -> bool {
    LINE_HEIGHT_DECL.is_match(css)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_line_height_two_decimals() {
        assert_eq!(round_line_height(1.234), 1.23);
        assert_eq!(round_line_height(1.235_000_1), 1.24);
        assert_eq!(round_line_height(1.2), 1.2);
    }

    #[test]
    fn test_ten_steps_from_start_land_on_exact_value() {
        let mut current = 1.2;
        for _ in 0..10 {
            current = next_line_height(current, 0.05);
        }
        assert_eq!(current, 1.7);
        assert_eq!(format_line_height(current), "1.70");
    }

    #[test]
    fn test_unrounded_accumulation_would_drift() {
        // Guard for the reason rounding exists at all.
        let mut raw = 1.2_f64;
        for _ in 0..10 {
            raw += 0.05;
        }
        assert_ne!(raw, 1.7);
        assert_eq!(round_line_height(raw), 1.7);
    }

    #[test]
    fn test_apply_line_height_replaces_declaration() {
        let css = "body { font-size: 11pt; line-height: 1.2; }";
        let out = apply_line_height(css, 1.3);
        assert_eq!(out, "body { font-size: 11pt; line-height: 1.30; }");
    }

    #[test]
    fn test_apply_line_height_replaces_every_declaration() {
        let css = "p { line-height:1.4; }\nli { line-height: 1.4 ; }";
        let out = apply_line_height(css, 1.25);
        assert_eq!(out.matches("line-height: 1.25;").count(), 2);
    }

    #[test]
    fn test_apply_line_height_leaves_units_alone() {
        let css = "h1 { line-height: 18px; } p { line-height: normal; }";
        assert_eq!(apply_line_height(css, 1.5), css);
    }

    #[test]
    fn test_apply_line_height_without_declaration_is_noop() {
        let css = "body { margin: 0; }";
        assert_eq!(apply_line_height(css, 1.5), css);
        assert!(!has_line_height(css));
    }

    #[test]
    fn test_find_line_height_reads_first_value() {
        let css = "body { line-height: 1.35; } li { line-height: 2; }";
        assert_eq!(find_line_height(css), Some(1.35));
        assert_eq!(find_line_height(".x { line-height: .9; }"), Some(0.9));
        assert_eq!(find_line_height("body {}"), None);
    }
}
