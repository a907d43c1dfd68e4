//! SVG composition of a board.
//!
//! Preview and export go through [`compose`]; the only difference between
//! the two passes is the selection overlay, which is appended last and only
//! for [`RenderPass::Preview`].

use std::fmt::Write;

use meme_core::element::STICKER_FONT_SIZE;
use meme_core::geometry::{self, render_transform, RenderTransform, TEXT_PADDING};
use meme_core::{
    Background, BoardSize, Editor, Element, ElementId, ElementKind, ElementStore, TextAlign,
    TextMeasure, TextStyle,
};

use crate::watermark::ResolvedWatermark;

/// Id of the shared drop-shadow filter.
const SHADOW_FILTER_ID: &str = "text-shadow";
/// Baseline offset from a line's vertical centre, in em.
const BASELINE_SHIFT: f32 = 0.35;
/// Font stack used for sticker glyphs.
const STICKER_FONT_FAMILY: &str =
    "'Apple Color Emoji', 'Segoe UI Emoji', 'Noto Color Emoji', sans-serif";
/// Selection outline color.
const OVERLAY_COLOR: &str = "#00a8ff";
/// Radius of the drawn handle markers.
const HANDLE_MARKER_RADIUS: f32 = 6.0;

/// Which pass a composition is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPass {
    /// Live preview: includes the selection overlay.
    Preview,
    /// Final export: never includes the selection overlay.
    Export,
}

/// Borrowed view of everything that is drawn.
#[derive(Debug, Clone, Copy)]
pub struct RenderScene<'a> {
    /// Board background.
    pub background: &'a Background,
    /// Elements in paint order (back to front).
    pub elements: &'a [Element],
    /// Board size in CSS pixels.
    pub board: BoardSize,
    /// Text metrics used for element boxes.
    pub measurer: &'a dyn TextMeasure,
    /// Selected element, if any.
    pub selected: Option<ElementId>,
    /// Whether the selected element has its resize/rotate handles attached.
    pub handles: bool,
}

impl<'a> RenderScene<'a> {
    /// Scene for a store and background, with nothing selected.
    #[must_use]
    pub fn new(store: &'a ElementStore, background: &'a Background) -> Self {
        Self {
            background,
            elements: store.all(),
            board: store.board(),
            measurer: store.measurer(),
            selected: None,
            handles: false,
        }
    }

    /// The editor's current board, including its selection.
    #[must_use]
    pub fn from_editor(editor: &'a Editor) -> Self {
        let selection = editor.selection();
        let selected = selection.selected();
        Self {
            selected,
            handles: selection.handles_for().is_some(),
            ..Self::new(editor.store(), editor.background())
        }
    }

    /// Same scene with a different selection.
    #[must_use]
    pub fn with_selection(mut self, selected: Option<ElementId>, handles: bool) -> Self {
        self.selected = selected;
        self.handles = selected.is_some() && handles;
        self
    }
}

/// Output raster size for a board at a device pixel ratio.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn output_dimensions(board: BoardSize, device_pixel_ratio: f32) -> (u32, u32) {
    let w = (board.width * device_pixel_ratio).round().max(1.0) as u32;
    let h = (board.height * device_pixel_ratio).round().max(1.0) as u32;
    (w, h)
}

/// Compose the board as an SVG document.
pub(crate) fn compose(
    scene: &RenderScene<'_>,
    pass: RenderPass,
    device_pixel_ratio: f32,
    watermark: &ResolvedWatermark,
) -> String {
    let (out_w, out_h) = output_dimensions(scene.board, device_pixel_ratio);
    let view_w = scene.board.width;
    let view_h = scene.board.height;

    let mut svg = String::with_capacity(4096);
    let _ = write!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" xmlns:xlink=\"http://www.w3.org/1999/xlink\" width=\"{out_w}\" height=\"{out_h}\" viewBox=\"0 0 {view_w} {view_h}\">",
    );

    svg.push_str("<defs>");
    let _ = write!(
        svg,
        "<filter id=\"{SHADOW_FILTER_ID}\" x=\"-20%\" y=\"-20%\" width=\"140%\" height=\"140%\"><feDropShadow dx=\"2\" dy=\"2\" stdDeviation=\"2\" flood-color=\"#000000\" flood-opacity=\"0.5\"/></filter>",
    );
    write_background_defs(&mut svg, scene.background);
    svg.push_str("</defs>");

    write_background(&mut svg, scene.background);

    for element in scene.elements {
        write_element(&mut svg, element, scene.measurer);
    }

    watermark.write_svg(&mut svg, view_h);

    if pass == RenderPass::Preview {
        if let Some(element) = scene
            .selected
            .and_then(|id| scene.elements.iter().find(|e| e.id == id))
        {
            write_selection_overlay(&mut svg, element, scene.measurer, scene.handles);
        }
    }

    svg.push_str("</svg>");
    svg
}

fn write_background_defs(svg: &mut String, background: &Background) {
    let Some((x1, y1, x2, y2)) = background.gradient_endpoints() else {
        return;
    };
    if let Background::LinearGradient { from, to, .. } = background {
        let _ = write!(
            svg,
            "<linearGradient id=\"background\" x1=\"{x1}\" y1=\"{y1}\" x2=\"{x2}\" y2=\"{y2}\"><stop offset=\"0\" stop-color=\"{}\"/><stop offset=\"1\" stop-color=\"{}\"/></linearGradient>",
            escape_xml(from),
            escape_xml(to),
        );
    }
}

fn write_background(svg: &mut String, background: &Background) {
    match background {
        Background::Solid(color) => {
            let _ = write!(
                svg,
                "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
                escape_xml(color),
            );
        }
        Background::LinearGradient { .. } => {
            svg.push_str("<rect width=\"100%\" height=\"100%\" fill=\"url(#background)\"/>");
        }
    }
}

/// `translate(centre) rotate scale translate(-half size)`: the element's
/// local frame, pivoting about its own centre.
fn transform_attr(t: &RenderTransform) -> String {
    format!(
        "translate({} {}) rotate({}) scale({}) translate({} {})",
        t.center.x,
        t.center.y,
        t.rotation,
        t.scale,
        -t.width / 2.0,
        -t.height / 2.0,
    )
}

fn write_element(svg: &mut String, element: &Element, measurer: &dyn TextMeasure) {
    let transform = render_transform(element, measurer);
    let _ = write!(svg, "<g transform=\"{}\">", transform_attr(&transform));

    match &element.kind {
        ElementKind::Text { content, style } => {
            write_text(svg, content, style, &transform, measurer);
        }
        ElementKind::Sticker { glyph } => {
            let x = transform.width / 2.0;
            let y = transform.height / 2.0 + STICKER_FONT_SIZE * BASELINE_SHIFT;
            let _ = write!(
                svg,
                "<text x=\"{x}\" y=\"{y}\" font-family=\"{}\" font-size=\"{STICKER_FONT_SIZE}\" text-anchor=\"middle\">{}</text>",
                escape_xml(STICKER_FONT_FAMILY),
                escape_xml(glyph),
            );
        }
    }

    svg.push_str("</g>");
}

#[allow(clippy::cast_precision_loss)]
fn write_text(
    svg: &mut String,
    content: &str,
    style: &TextStyle,
    transform: &RenderTransform,
    measurer: &dyn TextMeasure,
) {
    if content.trim().is_empty() {
        return;
    }

    let size = style.font_size as f32;
    let line_height = measurer.line_height(size);
    let (x, anchor) = match style.text_align {
        TextAlign::Left => (TEXT_PADDING / 2.0, "start"),
        TextAlign::Center => (transform.width / 2.0, "middle"),
        TextAlign::Right => (transform.width - TEXT_PADDING / 2.0, "end"),
    };

    let lines: Vec<&str> = geometry::text_lines(content).collect();
    let top = (transform.height - lines.len() as f32 * line_height) / 2.0;

    let _ = write!(
        svg,
        "<text font-family=\"{}\" font-size=\"{size}\" font-weight=\"bold\" fill=\"{}\" text-anchor=\"{anchor}\" filter=\"url(#{SHADOW_FILTER_ID})\" xml:space=\"preserve\">",
        escape_xml(&style.font_family),
        escape_xml(&style.color),
    );
    for (index, line) in lines.iter().enumerate() {
        let centre = top + line_height * (index as f32 + 0.5);
        let baseline = centre + size * BASELINE_SHIFT;
        let _ = write!(
            svg,
            "<tspan x=\"{x}\" y=\"{baseline}\">{}</tspan>",
            escape_xml(line),
        );
    }
    svg.push_str("</text>");
}

/// Dashed outline plus handle markers. Preview only.
fn write_selection_overlay(
    svg: &mut String,
    element: &Element,
    measurer: &dyn TextMeasure,
    handles: bool,
) {
    let transform = render_transform(element, measurer);
    let stroke = 2.0 / transform.scale;
    let dash = 6.0 / transform.scale;
    let _ = write!(
        svg,
        "<g class=\"selection-overlay\"><rect transform=\"{}\" width=\"{}\" height=\"{}\" fill=\"none\" stroke=\"{OVERLAY_COLOR}\" stroke-width=\"{stroke}\" stroke-dasharray=\"{dash} {dash}\"/>",
        transform_attr(&transform),
        transform.width,
        transform.height,
    );

    if handles {
        for centre in [
            geometry::resize_handle_center(element, measurer),
            geometry::rotate_handle_center(element, measurer),
        ] {
            let _ = write!(
                svg,
                "<circle cx=\"{}\" cy=\"{}\" r=\"{HANDLE_MARKER_RADIUS}\" fill=\"#ffffff\" stroke=\"{OVERLAY_COLOR}\" stroke-width=\"2\"/>",
                centre.x, centre.y,
            );
        }
    }

    svg.push_str("</g>");
}

/// Escape special XML characters.
pub(crate) fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use meme_core::{Point, DEFAULT_BACKGROUND};

    fn label() -> ResolvedWatermark {
        ResolvedWatermark::Label("MEME VIBER".into())
    }

    fn store_with_caption(text: &str) -> (ElementStore, ElementId) {
        let mut store = ElementStore::with_estimate(BoardSize::new(400.0, 600.0));
        let id = store.create(ElementKind::text(text), Some(Point::new(100.0, 200.0)));
        (store, id)
    }

    #[test]
    fn test_root_has_scaled_size_and_board_viewbox() {
        let store = ElementStore::with_estimate(BoardSize::new(400.0, 600.0));
        let background = Background::default();
        let svg = compose(
            &RenderScene::new(&store, &background),
            RenderPass::Export,
            2.0,
            &label(),
        );
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains("width=\"800\" height=\"1200\" viewBox=\"0 0 400 600\""));
        assert!(svg.contains(&format!("fill=\"{DEFAULT_BACKGROUND}\"")));
    }

    #[test]
    fn test_gradient_background_uses_definition() {
        let store = ElementStore::with_estimate(BoardSize::new(400.0, 600.0));
        let background = Background::parse("linear-gradient(90deg, #ff0000, #0000ff)");
        let svg = compose(
            &RenderScene::new(&store, &background),
            RenderPass::Export,
            1.0,
            &label(),
        );
        assert!(svg.contains(
            "<linearGradient id=\"background\" x1=\"0\" y1=\"0.5\" x2=\"1\" y2=\"0.5\">"
        ));
        assert!(svg.contains("stop-color=\"#ff0000\""));
        assert!(svg.contains("fill=\"url(#background)\""));
    }

    #[test]
    fn test_text_transform_pivots_about_centre() {
        let (mut store, id) = store_with_caption("Hi");
        store.update(id, |e| {
            e.rotation = 45.0;
            e.set_scale(2.0);
        });
        let element = store.find(id).expect("exists");
        let t = render_transform(element, store.measurer());
        let background = Background::default();
        let svg = compose(
            &RenderScene::new(&store, &background),
            RenderPass::Export,
            1.0,
            &label(),
        );
        let expected = format!(
            "translate({} {}) rotate(45) scale(2) translate({} {})",
            t.center.x,
            t.center.y,
            -t.width / 2.0,
            -t.height / 2.0
        );
        assert!(svg.contains(&expected), "missing {expected} in {svg}");
    }

    #[test]
    fn test_multiline_text_gets_one_tspan_per_line() {
        let (store, _) = store_with_caption("top\nbottom");
        let background = Background::default();
        let svg = compose(
            &RenderScene::new(&store, &background),
            RenderPass::Export,
            1.0,
            &label(),
        );
        assert_eq!(svg.matches("<tspan").count(), 2);
        assert!(svg.contains("font-weight=\"bold\""));
        assert!(svg.contains("filter=\"url(#text-shadow)\""));
    }

    #[test]
    fn test_alignment_sets_anchor() {
        let (mut store, id) = store_with_caption("left");
        store.update(id, |e| {
            if let ElementKind::Text { style, .. } = &mut e.kind {
                style.text_align = TextAlign::Left;
            }
        });
        let background = Background::default();
        let svg = compose(
            &RenderScene::new(&store, &background),
            RenderPass::Export,
            1.0,
            &label(),
        );
        assert!(svg.contains("text-anchor=\"start\""));
        assert!(svg.contains("<tspan x=\"10\""));
    }

    #[test]
    fn test_text_content_is_escaped() {
        let (store, _) = store_with_caption("<b>&\"'");
        let background = Background::default();
        let svg = compose(
            &RenderScene::new(&store, &background),
            RenderPass::Export,
            1.0,
            &label(),
        );
        assert!(svg.contains("&lt;b&gt;&amp;&quot;&apos;"));
        assert!(!svg.contains("<b>"));
    }

    #[test]
    fn test_blank_text_draws_nothing() {
        let (store, _) = store_with_caption("   ");
        let background = Background::default();
        let svg = compose(
            &RenderScene::new(&store, &background),
            RenderPass::Export,
            1.0,
            &label(),
        );
        assert!(!svg.contains("<tspan"));
    }

    #[test]
    fn test_sticker_has_no_shadow() {
        let mut store = ElementStore::with_estimate(BoardSize::new(400.0, 600.0));
        store.create(ElementKind::sticker("🔥"), None);
        let background = Background::default();
        let svg = compose(
            &RenderScene::new(&store, &background),
            RenderPass::Export,
            1.0,
            &label(),
        );
        assert!(svg.contains(">🔥</text>"));
        assert!(svg.contains("font-size=\"60\""));
        assert!(!svg.contains("filter=\"url(#text-shadow)\""));
    }

    #[test]
    fn test_paint_order_follows_store_order() {
        let mut store = ElementStore::with_estimate(BoardSize::new(400.0, 600.0));
        store.create(ElementKind::text("first"), None);
        store.create(ElementKind::text("second"), None);
        let background = Background::default();
        let svg = compose(
            &RenderScene::new(&store, &background),
            RenderPass::Export,
            1.0,
            &label(),
        );
        let first = svg.find(">first<").expect("first drawn");
        let second = svg.find(">second<").expect("second drawn");
        assert!(first < second);
    }

    #[test]
    fn test_overlay_only_in_preview() {
        let (store, id) = store_with_caption("Hi");
        let background = Background::default();
        let scene = RenderScene::new(&store, &background).with_selection(Some(id), true);

        let preview = compose(&scene, RenderPass::Preview, 1.0, &label());
        let export = compose(&scene, RenderPass::Export, 1.0, &label());
        assert!(preview.contains("selection-overlay"));
        assert!(preview.contains("stroke-dasharray"));
        assert_eq!(preview.matches("<circle").count(), 2);
        assert!(!export.contains("selection-overlay"));
        assert!(!export.contains("<circle"));
    }

    #[test]
    fn test_overlay_drawn_after_watermark() {
        let (store, id) = store_with_caption("Hi");
        let background = Background::default();
        let scene = RenderScene::new(&store, &background).with_selection(Some(id), false);
        let preview = compose(&scene, RenderPass::Preview, 1.0, &label());
        let watermark = preview.find("MEME VIBER").expect("watermark");
        let overlay = preview.find("selection-overlay").expect("overlay");
        assert!(watermark < overlay);
        assert!(!preview.contains("<circle"));
    }

    #[test]
    fn test_preview_without_selection_matches_export() {
        let (store, _) = store_with_caption("same");
        let background = Background::default();
        let scene = RenderScene::new(&store, &background);
        assert_eq!(
            compose(&scene, RenderPass::Preview, 1.5, &label()),
            compose(&scene, RenderPass::Export, 1.5, &label())
        );
    }

    #[test]
    fn test_output_dimensions_round_and_floor_at_one() {
        assert_eq!(output_dimensions(BoardSize::new(400.0, 600.0), 1.5), (600, 900));
        assert_eq!(output_dimensions(BoardSize::new(0.0, 0.2), 1.0), (1, 1));
    }
}
