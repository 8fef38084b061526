//! Page geometry and rule-line blocks shared by every template.

use crate::models::{PageSettings, PaperSize};
use crate::page::document::{OE, OE_CHILDREN, OUTLINE, T};
use crate::page::Element;

const PAGE_MARGIN_TOP: &str = "36.0";
const PAGE_MARGIN_BOTTOM: &str = "36.0";
const PAGE_MARGIN_LEFT: &str = "72.0";
const PAGE_MARGIN_RIGHT: &str = "72.0";

const OUTLINE_HEIGHT: &str = "16.5";

/// Width and height in points, portrait. `None` for [`PaperSize::Automatic`].
pub fn paper_dimensions(paper: PaperSize) -> Option<(&'static str, &'static str)> {
    match paper {
        PaperSize::Automatic => None,
        PaperSize::Letter => Some(("612.0", "792.0")),
        PaperSize::Legal => Some(("612.0", "1008.0")),
        PaperSize::A4 => Some(("595.2755737304687", "841.8897094726562")),
    }
}

pub fn outline_position(paper: PaperSize) -> (&'static str, &'static str) {
    match paper {
        PaperSize::Automatic => ("36.0", "68.11085510253906"),
        _ => ("72.0", "89.71085357666015"),
    }
}

pub fn outline_width(paper: PaperSize) -> &'static str {
    match paper {
        PaperSize::A4 => "451.0",
        _ => "468.0",
    }
}

/// Rewrites `one:PageSize` for a fixed paper size. Automatic pages keep
/// whatever the store gave them.
pub fn apply_page_size(page_size: &mut Element, paper: PaperSize) {
    let Some((width, height)) = paper_dimensions(paper) else {
        return;
    };

    page_size.clear_children();
    page_size.push(Element::new("Orientation").with_attr("landscape", "false"));
    page_size.push(
        Element::new("Dimensions")
            .with_attr("width", width)
            .with_attr("height", height),
    );
    page_size.push(
        Element::new("Margins")
            .with_attr("top", PAGE_MARGIN_TOP)
            .with_attr("bottom", PAGE_MARGIN_BOTTOM)
            .with_attr("left", PAGE_MARGIN_LEFT)
            .with_attr("right", PAGE_MARGIN_RIGHT),
    );
}

/// Rebuilds `one:RuleLines` from the settings. Hidden rule lines carry no
/// children at all.
pub fn apply_rule_lines(rule_lines: &mut Element, settings: &PageSettings) {
    rule_lines.clear_children();
    if settings.rule_lines_visible {
        rule_lines.push(
            Element::new("Horizontal")
                .with_attr("color", settings.rule_lines_horizontal_color.xml_value())
                .with_attr("spacing", settings.rule_lines_horizontal_spacing.xml_value()),
        );
        rule_lines.push(
            Element::new("Margin").with_attr("color", settings.rule_lines_margin_color.xml_value()),
        );
    }
    rule_lines.set_attr(
        "visible",
        if settings.rule_lines_visible { "true" } else { "false" },
    );
}

pub fn rule_lines_visible(rule_lines: &Element) -> bool {
    rule_lines.attr("visible") == Some("true")
}

/// A single-entry outline placed for `paper`.
pub fn outline(paper: PaperSize, entry: Element) -> Element {
    let (x, y) = outline_position(paper);
    Element::new(OUTLINE)
        .with_child(
            Element::new("Position")
                .with_attr("x", x)
                .with_attr("y", y)
                .with_attr("z", "0"),
        )
        .with_child(
            Element::new("Size")
                .with_attr("width", outline_width(paper))
                .with_attr("height", OUTLINE_HEIGHT)
                .with_attr("isSetByUser", "true"),
        )
        .with_child(Element::new(OE_CHILDREN).with_child(entry))
}

pub fn text_entry(text: &str) -> Element {
    Element::new(OE).with_child(Element::new(T).with_cdata(text))
}
