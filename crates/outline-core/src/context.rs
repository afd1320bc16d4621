//! Explicit editor context.
//!
//! Holds the style resolver and the settings that every layout and metadata computation
//! reads. Nothing in the crate reaches for process-wide state; components receive a
//! context and compare [`EditorContext::generation`] to decide when derived values are
//! stale.

use std::cell::{Cell, Ref, RefCell};
use std::rc::Rc;

use crate::settings::EditorSettings;
use crate::style::{ComputedStyle, EDITOR_STYLE_KEY_PATH, StyleResolver, StyleSheet};

/// Style resolver + settings + invalidation generation.
pub struct EditorContext {
    styles: Rc<dyn StyleResolver>,
    settings: RefCell<EditorSettings>,
    generation: Cell<u64>,
}

impl std::fmt::Debug for EditorContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorContext")
            .field("settings", &self.settings)
            .field("generation", &self.generation())
            .finish_non_exhaustive()
    }
}

impl Default for EditorContext {
    fn default() -> Self {
        Self::new(Rc::new(StyleSheet::standard()), EditorSettings::default())
    }
}

impl EditorContext {
    /// Create a context.
    pub fn new(styles: Rc<dyn StyleResolver>, settings: EditorSettings) -> Self {
        Self {
            styles,
            settings: RefCell::new(settings),
            generation: Cell::new(0),
        }
    }

    /// The style resolver.
    pub fn styles(&self) -> &Rc<dyn StyleResolver> {
        &self.styles
    }

    /// Resolve a key path.
    pub fn style(&self, key_path: &str) -> Rc<ComputedStyle> {
        self.styles.computed_style(key_path)
    }

    /// The editor-wide style.
    pub fn editor_style(&self) -> Rc<ComputedStyle> {
        self.styles.computed_style(EDITOR_STYLE_KEY_PATH)
    }

    /// Current settings.
    pub fn settings(&self) -> Ref<'_, EditorSettings> {
        self.settings.borrow()
    }

    /// Replace settings and bump the generation.
    pub fn set_settings(&self, settings: EditorSettings) {
        *self.settings.borrow_mut() = settings;
        self.invalidate();
    }

    /// Mutate settings in place and bump the generation.
    pub fn update_settings(&self, f: impl FnOnce(&mut EditorSettings)) {
        f(&mut self.settings.borrow_mut());
        self.invalidate();
    }

    /// Mark every derived value stale.
    pub fn invalidate(&self) {
        self.generation.set(self.generation.get().wrapping_add(1));
        tracing::debug!(generation = self.generation.get(), "editor context invalidated");
    }

    /// Combined generation of the context and its style resolver.
    pub fn generation(&self) -> (u64, u64) {
        (self.generation.get(), self.styles.generation())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_change_bumps_generation() {
        let context = EditorContext::default();
        let before = context.generation();
        context.update_settings(|s| s.show_invisibles = true);
        assert_ne!(context.generation(), before);
        assert!(context.settings().show_invisibles);
    }

    #[test]
    fn test_style_change_changes_generation() {
        let sheet = Rc::new(StyleSheet::new());
        let context = EditorContext::new(sheet.clone(), EditorSettings::default());
        let before = context.generation();
        sheet.set_style("item", ComputedStyle::default());
        assert_ne!(context.generation(), before);
    }
}
