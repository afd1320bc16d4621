//! Editor settings.
//!
//! Settings are plain data: loading them never touches layout state. Whoever owns the
//! [`EditorContext`](crate::context::EditorContext) bumps its generation when they change.

use serde::{Deserialize, Serialize};

use crate::error::{OutlineError, Result};

/// A single modifier key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModifierKey {
    /// Shift.
    Shift,
    /// Option / Alt.
    Option,
    /// Control.
    Control,
    /// Command / Super.
    Command,
}

/// Modifier keys held during a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    /// Shift held.
    pub shift: bool,
    /// Option / Alt held.
    pub option: bool,
    /// Control held.
    pub control: bool,
    /// Command / Super held.
    pub command: bool,
}

impl Modifiers {
    /// No modifiers.
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        option: false,
        control: false,
        command: false,
    };

    /// Only Shift.
    pub const SHIFT: Modifiers = Modifiers {
        shift: true,
        option: false,
        control: false,
        command: false,
    };

    /// `true` if `key` is held.
    pub fn contains(&self, key: ModifierKey) -> bool {
        match key {
            ModifierKey::Shift => self.shift,
            ModifierKey::Option => self.option,
            ModifierKey::Control => self.control,
            ModifierKey::Command => self.command,
        }
    }
}

/// User-tunable editor settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    /// Horizontal indent per tree level, in points.
    pub item_indent_per_level: f32,
    /// Narrowest width a paragraph is wrapped to, in points.
    pub min_item_wrap_width: f32,
    /// Wrap column applied to the whole editor.
    pub editor_wrap_to_column: Option<usize>,
    /// Show invisible glyphs inside the selection.
    pub show_invisibles: bool,
    /// Draw guide lines from handles to the last descendant.
    pub draw_guides: bool,
    /// Pointer travel (points) before a handle press becomes a drag.
    pub minimum_drag_distance: f32,
    /// Modifier that forces dropping *on* the target.
    pub force_on_modifier: ModifierKey,
    /// How many paragraphs a metadata cache miss fetches at once.
    pub metadata_batch_size: usize,
    /// Delay before a stylesheet change is applied, in milliseconds.
    pub stylesheet_reload_delay_ms: u64,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            item_indent_per_level: 20.0,
            min_item_wrap_width: 200.0,
            editor_wrap_to_column: None,
            show_invisibles: false,
            draw_guides: true,
            minimum_drag_distance: 5.0,
            force_on_modifier: ModifierKey::Shift,
            metadata_batch_size: 64,
            stylesheet_reload_delay_ms: 250,
        }
    }
}

impl EditorSettings {
    /// Parse settings from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(OutlineError::Settings)
    }

    /// Serialize settings to pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(OutlineError::Settings)
    }

    /// Padding on each side of a line fragment.
    pub fn line_fragment_padding(&self) -> f32 {
        self.item_indent_per_level / 2.0
    }
}
