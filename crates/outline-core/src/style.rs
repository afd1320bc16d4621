//! Style resolver contract and an in-memory stylesheet.
//!
//! A style key path is a dotted string (`"item.task.done"`). Resolution is a pure
//! function of the key path plus the resolver's generation: whenever the generation
//! changes, every computed value the core derived from styles must be thrown away.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::error::{OutlineError, Result};

/// Key path of the editor-wide style (guides, invisibles, default font).
pub const EDITOR_STYLE_KEY_PATH: &str = "editor";

/// An sRGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
    /// Alpha.
    pub a: u8,
}

impl Color {
    /// Opaque color.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 0xff }
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        let hex = value
            .strip_prefix('#')
            .ok_or_else(|| format!("color must start with '#': {value}"))?;
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16).map_err(|e| format!("{value}: {e}"))
        };
        match hex.len() {
            6 => Ok(Color::rgb(channel(0)?, channel(2)?, channel(4)?)),
            8 => Ok(Color {
                r: channel(0)?,
                g: channel(2)?,
                b: channel(4)?,
                a: channel(6)?,
            }),
            _ => Err(format!("expected #rrggbb or #rrggbbaa: {value}")),
        }
    }
}

impl From<Color> for String {
    fn from(c: Color) -> Self {
        if c.a == 0xff {
            format!("#{:02x}{:02x}{:02x}", c.r, c.g, c.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", c.r, c.g, c.b, c.a)
        }
    }
}

/// Font metrics used by the headless text measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontMetrics {
    /// Point size.
    pub size: f32,
    /// Advance of one narrow cell (the monospace cell used for column conversions).
    pub cell_advance: f32,
    /// Line height.
    pub line_height: f32,
    /// x-height, used to center the baseline.
    pub x_height: f32,
}

impl Default for FontMetrics {
    fn default() -> Self {
        Self {
            size: 13.0,
            cell_advance: 8.0,
            line_height: 18.0,
            x_height: 7.0,
        }
    }
}

/// Concrete paint and layout attributes for one key path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComputedStyle {
    /// Font metrics.
    pub font: FontMetrics,
    /// Text color.
    pub foreground: Option<Color>,
    /// Background color.
    pub background: Option<Color>,
    /// Space above a paragraph (not applied to the first paragraph).
    pub paragraph_spacing_before: f32,
    /// Space below a paragraph.
    pub paragraph_spacing_after: f32,
    /// Per-level indent override (editor style only).
    pub item_indent: Option<f32>,
    /// Handle bullet size; `None` means the node shows no handle.
    pub handle_size: Option<f32>,
    /// Handle fill.
    pub handle_color: Option<Color>,
    /// Handle stroke.
    pub handle_border_color: Option<Color>,
    /// Handle stroke width.
    pub handle_border_width: f32,
    /// Guide line color; `None` disables guides.
    pub guide_line_color: Option<Color>,
    /// Guide line width.
    pub guide_line_width: f32,
    /// Color of invisible glyphs.
    pub invisibles_color: Option<Color>,
    /// Editor-wide wrap column (editor style only).
    pub editor_wrap_to_column: Option<usize>,
    /// Per-item wrap column, honored for task nodes.
    pub item_wrap_to_column: Option<usize>,
    /// Strike the text through (e.g. done tasks).
    pub strikethrough: bool,
    /// Underline the text (e.g. links).
    pub underline: bool,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            font: FontMetrics::default(),
            foreground: None,
            background: None,
            paragraph_spacing_before: 0.0,
            paragraph_spacing_after: 0.0,
            item_indent: None,
            handle_size: None,
            handle_color: None,
            handle_border_color: None,
            handle_border_width: 1.0,
            guide_line_color: None,
            guide_line_width: 1.0,
            invisibles_color: None,
            editor_wrap_to_column: None,
            item_wrap_to_column: None,
            strikethrough: false,
            underline: false,
        }
    }
}

impl ComputedStyle {
    /// `true` if the style declares a visible handle.
    pub fn has_handle(&self) -> bool {
        self.handle_size.is_some()
    }

    /// `true` if guides should be drawn from handles of this style.
    pub fn draws_handle_paint(&self) -> bool {
        self.handle_size.is_some()
            && (self.handle_color.is_some() || self.handle_border_color.is_some())
    }
}

/// Style resolver contract.
pub trait StyleResolver {
    /// Resolve a key path to a computed style.
    fn computed_style(&self, key_path: &str) -> Rc<ComputedStyle>;

    /// Monotonic counter that changes whenever any resolution result may change.
    fn generation(&self) -> u64;
}

/// In-memory stylesheet keyed by dotted key paths.
///
/// Lookups fall back by dropping the last segment (`item.task.done` → `item.task` →
/// `item`) and finally to the default style.
#[derive(Debug, Default)]
pub struct StyleSheet {
    styles: RefCell<HashMap<String, Rc<ComputedStyle>>>,
    default_style: Rc<ComputedStyle>,
    generation: Cell<u64>,
}

impl StyleSheet {
    /// Empty stylesheet; every key resolves to [`ComputedStyle::default`].
    pub fn new() -> Self {
        Self::default()
    }

    /// The stylesheet used when nothing else is configured: top-level handles, guides,
    /// projects in a taller line.
    pub fn standard() -> Self {
        let sheet = Self::new();
        sheet.set_style(
            EDITOR_STYLE_KEY_PATH,
            ComputedStyle {
                guide_line_color: Some(Color::rgb(0xdd, 0xdd, 0xdd)),
                invisibles_color: Some(Color::rgb(0x33, 0x66, 0xff)),
                ..ComputedStyle::default()
            },
        );
        sheet.set_style(
            "item",
            ComputedStyle {
                handle_size: Some(6.0),
                handle_color: Some(Color::rgb(0x99, 0x99, 0x99)),
                ..ComputedStyle::default()
            },
        );
        sheet.set_style(
            "item.project",
            ComputedStyle {
                font: FontMetrics {
                    line_height: 22.0,
                    ..FontMetrics::default()
                },
                paragraph_spacing_before: 6.0,
                handle_size: Some(6.0),
                handle_color: Some(Color::rgb(0x99, 0x99, 0x99)),
                ..ComputedStyle::default()
            },
        );
        sheet
    }

    /// Parse a stylesheet from a JSON object mapping key paths to styles.
    pub fn from_json(json: &str) -> Result<Self> {
        let styles: HashMap<String, ComputedStyle> =
            serde_json::from_str(json).map_err(OutlineError::Settings)?;
        let sheet = Self::new();
        for (key, style) in styles {
            sheet.set_style(&key, style);
        }
        Ok(sheet)
    }

    /// Insert or replace a style and bump the generation.
    pub fn set_style(&self, key_path: &str, style: ComputedStyle) {
        self.styles
            .borrow_mut()
            .insert(key_path.to_string(), Rc::new(style));
        self.bump_generation();
    }

    /// Replace every style with those of `other` and bump the generation.
    pub fn replace_with(&self, other: StyleSheet) {
        *self.styles.borrow_mut() = other.styles.into_inner();
        self.bump_generation();
    }

    fn bump_generation(&self) {
        self.generation.set(self.generation.get().wrapping_add(1));
    }
}

impl StyleResolver for StyleSheet {
    fn computed_style(&self, key_path: &str) -> Rc<ComputedStyle> {
        let styles = self.styles.borrow();
        let mut key = key_path;
        loop {
            if let Some(style) = styles.get(key) {
                return style.clone();
            }
            match key.rfind('.') {
                Some(idx) => key = &key[..idx],
                None => return self.default_style.clone(),
            }
        }
    }

    fn generation(&self) -> u64 {
        self.generation.get()
    }
}
