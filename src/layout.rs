//! Deterministic box model behind `offsetWidth`, `offsetHeight` and
//! `getClientRects()`.
//!
//! There is no real rendering engine. Sizes come from explicit `px` lengths
//! in inline style, or from a fixed metric (viewport width, character width,
//! line height). The goal is to answer "does this element produce a box, and
//! is it non-empty" the way a browser would for simple pages. Positions are
//! not laid out, so every rect sits at the origin.

use crate::core_dom_utils::parse_css_px;
use crate::dom::{Dom, NodeId};
use crate::{Error, Result};

const STACK_RED_ZONE: usize = 64 * 1024;
const STACK_GROWTH: usize = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutConfig {
    /// Width of the initial containing block.
    pub viewport_width: i64,
    /// Advance of one character of inline text.
    pub char_width: i64,
    /// Height of one line box.
    pub line_height: i64,
    /// Width of `input`, `select`, `textarea` and `button` boxes.
    pub control_width: i64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            viewport_width: 1024,
            char_width: 8,
            line_height: 18,
            control_width: 160,
        }
    }
}

impl LayoutConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        let fields = [
            ("viewport_width", self.viewport_width),
            ("char_width", self.char_width),
            ("line_height", self.line_height),
            ("control_width", self.control_width),
        ];
        for (name, value) in fields {
            if value <= 0 {
                return Err(Error::Runtime(format!(
                    "layout {name} must be positive (got {value})"
                )));
            }
        }
        Ok(())
    }

    fn control_height(&self) -> i64 {
        self.line_height.saturating_add(4)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DomRect {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Display {
    None,
    Contents,
    Block,
    InlineBlock,
    Inline,
}

impl Display {
    fn from_css(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "none" => Some(Self::None),
            "contents" => Some(Self::Contents),
            "block" | "flex" | "grid" | "flow-root" | "list-item" | "table" | "table-row"
            | "table-row-group" | "table-header-group" | "table-footer-group" => {
                Some(Self::Block)
            }
            "inline-block" | "inline-flex" | "inline-grid" | "inline-table" | "table-cell" => {
                Some(Self::InlineBlock)
            }
            "inline" => Some(Self::Inline),
            _ => None,
        }
    }

    fn for_tag(tag: &str) -> Self {
        match tag {
            "head" | "meta" | "link" | "script" | "style" | "title" | "template" | "base"
            | "noscript" => Self::None,
            "html" | "body" | "div" | "p" | "form" | "fieldset" | "legend" | "section"
            | "article" | "aside" | "header" | "footer" | "nav" | "main" | "h1" | "h2" | "h3"
            | "h4" | "h5" | "h6" | "ul" | "ol" | "li" | "dl" | "dt" | "dd" | "pre"
            | "blockquote" | "hr" | "figure" | "figcaption" | "address" | "details"
            | "summary" | "table" | "thead" | "tbody" | "tfoot" | "tr" | "caption" => Self::Block,
            "input" | "select" | "textarea" | "button" | "td" | "th" | "img" => {
                Self::InlineBlock
            }
            _ => Self::Inline,
        }
    }

    fn generates_box(self) -> bool {
        !matches!(self, Self::None | Self::Contents)
    }
}

fn is_form_control(tag: &str) -> bool {
    matches!(tag, "input" | "select" | "textarea" | "button")
}

fn collapsed_text_len(text: &str) -> i64 {
    let mut len = 0i64;
    for (idx, word) in text.split_whitespace().enumerate() {
        if idx > 0 {
            len += 1;
        }
        len += word.chars().count() as i64;
    }
    len
}

impl Dom {
    /// `None` for non-element nodes.
    pub(crate) fn computed_display(&self, node_id: NodeId) -> Option<Display> {
        let element = self.element(node_id)?;
        let inline = self
            .style_get(node_id, "display")
            .ok()
            .and_then(|value| Display::from_css(&value));
        if let Some(display) = inline {
            return Some(display);
        }
        if element.attrs.contains_key("hidden") {
            return Some(Display::None);
        }
        let tag = element.tag_name.as_str();
        if tag == "input"
            && element
                .attrs
                .get("type")
                .is_some_and(|kind| kind.eq_ignore_ascii_case("hidden"))
        {
            return Some(Display::None);
        }
        Some(Display::for_tag(tag))
    }

    /// Connected, and neither the element nor any ancestor is `display: none`.
    pub(crate) fn is_rendered(&self, node_id: NodeId) -> bool {
        if self.element(node_id).is_none() || !self.is_connected(node_id) {
            return false;
        }
        let mut cursor = Some(node_id);
        while let Some(node) = cursor {
            if self.computed_display(node) == Some(Display::None) {
                return false;
            }
            cursor = self.parent(node);
        }
        true
    }

    pub(crate) fn offset_width(&self, node_id: NodeId, config: &LayoutConfig) -> Result<i64> {
        self.require_layout_element(node_id, "offsetWidth")?;
        if !self.is_rendered(node_id) {
            return Ok(0);
        }
        Ok(self.box_width(node_id, config))
    }

    pub(crate) fn offset_height(&self, node_id: NodeId, config: &LayoutConfig) -> Result<i64> {
        self.require_layout_element(node_id, "offsetHeight")?;
        if !self.is_rendered(node_id) {
            return Ok(0);
        }
        Ok(self.box_height(node_id, config))
    }

    pub(crate) fn client_rects(&self, node_id: NodeId, config: &LayoutConfig) -> Result<Vec<DomRect>> {
        self.require_layout_element(node_id, "getClientRects")?;
        let generates_box = self
            .computed_display(node_id)
            .is_some_and(Display::generates_box);
        if !generates_box || !self.is_rendered(node_id) {
            return Ok(Vec::new());
        }
        Ok(vec![DomRect {
            x: 0,
            y: 0,
            width: self.box_width(node_id, config),
            height: self.box_height(node_id, config),
        }])
    }

    fn require_layout_element(&self, node_id: NodeId, what: &str) -> Result<()> {
        if self.element(node_id).is_none() {
            return Err(Error::Runtime(format!("{what} target is not an element")));
        }
        Ok(())
    }

    fn explicit_px(&self, node_id: NodeId, prop: &str) -> Option<i64> {
        self.style_get(node_id, prop)
            .ok()
            .and_then(|value| parse_css_px(&value))
    }

    fn box_width(&self, node_id: NodeId, config: &LayoutConfig) -> i64 {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH, || {
            let Some(display) = self.computed_display(node_id) else {
                return 0;
            };
            let is_control = self.tag_name(node_id).is_some_and(is_form_control);
            match display {
                Display::None | Display::Contents => 0,
                Display::Block => self
                    .explicit_px(node_id, "width")
                    .unwrap_or_else(|| self.containing_block_width(node_id, config)),
                Display::InlineBlock => self.explicit_px(node_id, "width").unwrap_or_else(|| {
                    if is_control {
                        config.control_width
                    } else {
                        self.inline_content_width(node_id, config)
                    }
                }),
                Display::Inline => self.inline_content_width(node_id, config),
            }
        })
    }

    fn box_height(&self, node_id: NodeId, config: &LayoutConfig) -> i64 {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH, || {
            let Some(display) = self.computed_display(node_id) else {
                return 0;
            };
            let is_control = self.tag_name(node_id).is_some_and(is_form_control);
            match display {
                Display::None | Display::Contents => 0,
                Display::Block | Display::InlineBlock => {
                    self.explicit_px(node_id, "height").unwrap_or_else(|| {
                        if is_control {
                            config.control_height()
                        } else {
                            self.content_height(node_id, config)
                        }
                    })
                }
                Display::Inline => {
                    if self.inline_content_width(node_id, config) > 0 {
                        config.line_height
                    } else {
                        0
                    }
                }
            }
        })
    }

    fn containing_block_width(&self, node_id: NodeId, config: &LayoutConfig) -> i64 {
        let mut cursor = self.parent(node_id);
        while let Some(ancestor) = cursor {
            if matches!(
                self.computed_display(ancestor),
                Some(Display::Block | Display::InlineBlock)
            ) {
                return self.box_width(ancestor, config);
            }
            cursor = self.parent(ancestor);
        }
        config.viewport_width
    }

    /// Width of the inline content laid out on a single line.
    fn inline_content_width(&self, node_id: NodeId, config: &LayoutConfig) -> i64 {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH, || {
            self.children(node_id)
                .iter()
                .map(|child| {
                    if let Some(text) = self.text(*child) {
                        return collapsed_text_len(text).saturating_mul(config.char_width);
                    }
                    match self.computed_display(*child) {
                        Some(Display::None) | None => 0,
                        Some(Display::Contents | Display::Inline) => {
                            self.inline_content_width(*child, config)
                        }
                        Some(Display::Block | Display::InlineBlock) => {
                            self.box_width(*child, config)
                        }
                    }
                })
                .fold(0i64, i64::saturating_add)
        })
    }

    /// Block children stack vertically; each run of inline content between
    /// them occupies one line.
    fn content_height(&self, node_id: NodeId, config: &LayoutConfig) -> i64 {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH, || {
            let mut total = 0i64;
            let mut line = 0i64;
            self.accumulate_content_height(node_id, config, &mut total, &mut line);
            total.saturating_add(line)
        })
    }

    fn accumulate_content_height(
        &self,
        node_id: NodeId,
        config: &LayoutConfig,
        total: &mut i64,
        line: &mut i64,
    ) {
        for child in self.children(node_id) {
            if let Some(text) = self.text(*child) {
                if collapsed_text_len(text) > 0 {
                    *line = (*line).max(config.line_height);
                }
                continue;
            }
            match self.computed_display(*child) {
                Some(Display::None) | None => {}
                Some(Display::Contents) => {
                    stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH, || {
                        self.accumulate_content_height(*child, config, total, line)
                    });
                }
                Some(Display::Block) => {
                    *total = total
                        .saturating_add(std::mem::take(line))
                        .saturating_add(self.box_height(*child, config));
                }
                Some(Display::InlineBlock) => {
                    *line = (*line).max(self.box_height(*child, config));
                }
                Some(Display::Inline) => {
                    *line = (*line).max(self.box_height(*child, config));
                }
            }
        }
    }
}
