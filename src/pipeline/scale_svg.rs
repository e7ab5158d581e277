//! Scale application: rewrite a vector drawing so that one wrapping
//! group carries the run's scale transform.
//!
//! ## Why a wrapping group, not rewritten coordinates?
//!
//! Numerically rewriting every path coordinate would have to understand
//! arcs, relative commands, stroke widths, and text positioning. A single
//! `<g transform="scale(x,y)">` around the drawing's content scales all
//! of it exactly, with the drawing origin as the fixed point, and any
//! renderer that honours nested group transforms (all of them) produces
//! identical geometry. Exactly one scale group is applied per run; each
//! run re-opens the original drawing, so transforms never compound.
//!
//! ## Why strip namespaces?
//!
//! Converter output arrives fully namespaced (`xmlns`, `xmlns:xlink`,
//! sometimes prefixed tags). Several downstream consumers of the scaled
//! file choke on namespaced tags, so declarations and prefixes are
//! reduced to local names on output (`xlink:href` becomes the SVG2-style
//! plain `href`). The rules are deterministic text passes, each
//! independently testable.

use crate::error::ResizeError;
use crate::factors::ScaleFactors;
use once_cell::sync::Lazy;
use regex::Regex;

static RE_SVG_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<(?:[A-Za-z_][\w.-]*:)?svg\b[^>]*>").unwrap());

static RE_XMLNS_DECL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\s+xmlns(?::[A-Za-z_][\w.-]*)?\s*=\s*("[^"]*"|'[^']*')"#).unwrap());

static RE_TAG_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(</?)[A-Za-z_][\w.-]*:").unwrap());

static RE_XLINK_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bxlink:([A-Za-z_][\w.-]*\s*=)").unwrap());

/// Wrap the drawing's content in a single scale group and strip
/// namespaces.
///
/// The transform is structural: all children of the root element move
/// into a new `<g transform="scale(x,y)">` group, scaling about the
/// drawing's native origin with no recentering and no rotation. Anything
/// before the root element (XML declaration, comments) is preserved
/// verbatim.
pub fn apply_scale(svg: &str, factors: ScaleFactors) -> Result<String, ResizeError> {
    let open = RE_SVG_OPEN.find(svg).ok_or_else(|| ResizeError::InvalidDrawing {
        detail: "no <svg> root element found".to_string(),
    })?;

    let prefix = &svg[..open.start()];
    let open_tag = open.as_str();
    let group_open = format!(r#"<g transform="scale({},{})">"#, factors.x, factors.y);

    let composed = if open_tag.trim_end().ends_with("/>") {
        // Empty drawing: expand the self-closing root around an empty group.
        let bare = open_tag
            .trim_end()
            .strip_suffix("/>")
            .unwrap_or(open_tag)
            .trim_end();
        format!("{prefix}{bare}>{group_open}</g></svg>")
    } else {
        let close_at = svg.rfind("</").ok_or_else(|| ResizeError::InvalidDrawing {
            detail: "no closing </svg> tag found".to_string(),
        })?;
        let inner = &svg[open.end()..close_at];
        let tail = &svg[close_at..];
        format!("{prefix}{open_tag}{group_open}{inner}</g>{tail}")
    };

    Ok(strip_namespaces(&composed))
}

/// Reduce namespaced tags and `xlink:` attributes to local names and drop
/// all namespace declarations.
pub fn strip_namespaces(svg: &str) -> String {
    let s = RE_XMLNS_DECL.replace_all(svg, "");
    let s = RE_TAG_PREFIX.replace_all(&s, "$1");
    RE_XLINK_ATTR.replace_all(&s, "$1").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = concat!(
        r#"<?xml version="1.0" encoding="UTF-8"?>"#,
        "\n",
        r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="100" height="100">"#,
        r#"<rect x="10" y="10" width="20" height="20"/>"#,
        r##"<use xlink:href="#piece"/>"##,
        "</svg>"
    );

    #[test]
    fn wraps_content_in_scale_group() {
        let out = apply_scale(SAMPLE, ScaleFactors::new(1.5, 2.0)).unwrap();
        assert!(out.contains(r#"<g transform="scale(1.5,2)">"#), "got: {out}");
        assert!(out.ends_with("</g></svg>"), "got: {out}");
        // content moved inside the group, order preserved
        let g_at = out.find("<g transform").unwrap();
        let rect_at = out.find("<rect").unwrap();
        assert!(rect_at > g_at);
    }

    #[test]
    fn preserves_xml_declaration_prelude() {
        let out = apply_scale(SAMPLE, ScaleFactors::default()).unwrap();
        assert!(out.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
    }

    #[test]
    fn strips_namespace_declarations_and_prefixes() {
        let out = apply_scale(SAMPLE, ScaleFactors::default()).unwrap();
        assert!(!out.contains("xmlns"), "got: {out}");
        assert!(out.contains(r##"<use href="#piece"/>"##), "got: {out}");
    }

    #[test]
    fn strips_prefixed_tags_to_local_names() {
        let svg = r#"<svg:svg xmlns:svg="http://www.w3.org/2000/svg"><svg:path d="M0 0"/></svg:svg>"#;
        let out = apply_scale(svg, ScaleFactors::new(2.0, 2.0)).unwrap();
        assert!(out.contains("<path d=\"M0 0\"/>"), "got: {out}");
        assert!(out.contains("<svg>"), "got: {out}");
        assert!(out.ends_with("</g></svg>"), "got: {out}");
    }

    #[test]
    fn self_closing_root_gets_empty_group() {
        let out = apply_scale(r#"<svg width="10" height="10"/>"#, ScaleFactors::new(1.5, 1.5))
            .unwrap();
        assert_eq!(
            out,
            r#"<svg width="10" height="10"><g transform="scale(1.5,1.5)"></g></svg>"#
        );
    }

    #[test]
    fn identity_factors_still_wrap() {
        let out = apply_scale(SAMPLE, ScaleFactors::default()).unwrap();
        assert!(out.contains(r#"scale(1,1)"#));
    }

    #[test]
    fn missing_root_is_an_error() {
        let err = apply_scale("<html><body/></html>", ScaleFactors::default()).unwrap_err();
        assert!(matches!(err, ResizeError::InvalidDrawing { .. }));
    }

    #[test]
    fn xml_space_attribute_is_left_alone() {
        let svg = r#"<svg xmlns="x"><text xml:space="preserve">a</text></svg>"#;
        let out = strip_namespaces(svg);
        assert!(out.contains(r#"xml:space="preserve""#));
    }

    #[test]
    fn reapplying_on_the_original_never_compounds() {
        // Each run re-opens the original drawing: scaling the same source
        // twice yields the same single group, not a nested pair.
        let once = apply_scale(SAMPLE, ScaleFactors::new(1.5, 2.0)).unwrap();
        let again = apply_scale(SAMPLE, ScaleFactors::new(1.5, 2.0)).unwrap();
        assert_eq!(once, again);
        assert_eq!(once.matches("<g transform=\"scale(").count(), 1);
    }
}
