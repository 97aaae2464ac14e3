//! Keyboard shortcut table.

use crate::input::KeyEvent;

/// Editor commands reachable from the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShortcutAction {
    Copy,
    Paste,
    Cut,
    Duplicate,
    Undo,
    Redo,
    SelectAll,
    Delete,
    Group,
    Ungroup,
    BringToFront,
    SendToBack,
    /// Leave text editing, or drop the selection.
    Escape,
}

/// A keyboard shortcut definition. `command` means Ctrl, or Cmd on macOS.
#[derive(Debug, Clone, Copy)]
pub struct Shortcut {
    pub key: &'static str,
    pub command: bool,
    pub shift: bool,
    pub action: ShortcutAction,
    pub description: &'static str,
}

impl Shortcut {
    pub const fn new(
        key: &'static str,
        command: bool,
        shift: bool,
        action: ShortcutAction,
        description: &'static str,
    ) -> Self {
        Self {
            key,
            command,
            shift,
            action,
            description,
        }
    }

    /// Format the shortcut for display (e.g., "Ctrl+Shift+Z").
    pub fn format(&self) -> String {
        let key = self.key.to_uppercase();
        let mut parts = Vec::new();
        if self.command {
            parts.push("Ctrl");
        }
        if self.shift {
            parts.push("Shift");
        }
        parts.push(key.as_str());
        parts.join("+")
    }

    fn matches(&self, event: &KeyEvent) -> bool {
        if !self.key.eq_ignore_ascii_case(&event.key) {
            return false;
        }
        if self.command != event.modifiers.command() {
            return false;
        }
        // Plain keys ignore shift; command chords must match it exactly.
        !self.command || self.shift == event.modifiers.shift
    }
}

const SHORTCUTS: &[Shortcut] = &[
    Shortcut::new("c", true, false, ShortcutAction::Copy, "Copy selection"),
    Shortcut::new("v", true, false, ShortcutAction::Paste, "Paste"),
    Shortcut::new("x", true, false, ShortcutAction::Cut, "Cut selection"),
    Shortcut::new("d", true, false, ShortcutAction::Duplicate, "Duplicate selection"),
    Shortcut::new("z", true, false, ShortcutAction::Undo, "Undo"),
    Shortcut::new("z", true, true, ShortcutAction::Redo, "Redo"),
    Shortcut::new("y", true, false, ShortcutAction::Redo, "Redo"),
    Shortcut::new("a", true, false, ShortcutAction::SelectAll, "Select all"),
    Shortcut::new("g", true, false, ShortcutAction::Group, "Group selection"),
    Shortcut::new("g", true, true, ShortcutAction::Ungroup, "Ungroup selection"),
    Shortcut::new("]", true, false, ShortcutAction::BringToFront, "Bring to front"),
    Shortcut::new("[", true, false, ShortcutAction::SendToBack, "Send to back"),
    Shortcut::new("Delete", false, false, ShortcutAction::Delete, "Delete selection"),
    Shortcut::new("Backspace", false, false, ShortcutAction::Delete, "Delete selection"),
    Shortcut::new("Escape", false, false, ShortcutAction::Escape, "Cancel / leave text editing"),
];

/// Registry of all keyboard shortcuts.
pub struct ShortcutRegistry;

impl ShortcutRegistry {
    pub fn all() -> &'static [Shortcut] {
        SHORTCUTS
    }

    /// Find the action bound to a key event.
    pub fn resolve(event: &KeyEvent) -> Option<ShortcutAction> {
        SHORTCUTS.iter().find(|s| s.matches(event)).map(|s| s.action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Modifiers;

    fn chord(key: &str, ctrl: bool, shift: bool, meta: bool) -> KeyEvent {
        KeyEvent::new(
            key,
            Modifiers {
                ctrl,
                shift,
                meta,
                alt: false,
            },
        )
    }

    #[test]
    fn test_command_shortcuts() {
        assert_eq!(ShortcutRegistry::resolve(&chord("c", true, false, false)), Some(ShortcutAction::Copy));
        assert_eq!(ShortcutRegistry::resolve(&chord("V", true, false, false)), Some(ShortcutAction::Paste));
        assert_eq!(ShortcutRegistry::resolve(&chord("x", false, false, true)), Some(ShortcutAction::Cut));
        assert_eq!(ShortcutRegistry::resolve(&chord("d", true, false, false)), Some(ShortcutAction::Duplicate));
        assert_eq!(ShortcutRegistry::resolve(&chord("a", true, false, false)), Some(ShortcutAction::SelectAll));
    }

    #[test]
    fn test_undo_redo_variants() {
        assert_eq!(ShortcutRegistry::resolve(&chord("z", true, false, false)), Some(ShortcutAction::Undo));
        assert_eq!(ShortcutRegistry::resolve(&chord("Z", true, true, false)), Some(ShortcutAction::Redo));
        assert_eq!(ShortcutRegistry::resolve(&chord("y", false, false, true)), Some(ShortcutAction::Redo));
    }

    #[test]
    fn test_plain_keys() {
        assert_eq!(ShortcutRegistry::resolve(&KeyEvent::plain("Delete")), Some(ShortcutAction::Delete));
        assert_eq!(ShortcutRegistry::resolve(&KeyEvent::plain("Backspace")), Some(ShortcutAction::Delete));
        assert_eq!(ShortcutRegistry::resolve(&KeyEvent::plain("Escape")), Some(ShortcutAction::Escape));
        assert_eq!(ShortcutRegistry::resolve(&KeyEvent::plain("c")), None);
        assert_eq!(ShortcutRegistry::resolve(&chord("Delete", true, false, false)), None);
    }

    #[test]
    fn test_format() {
        let redo = ShortcutRegistry::all()
            .iter()
            .find(|s| s.action == ShortcutAction::Redo && s.shift)
            .unwrap();
        assert_eq!(redo.format(), "Ctrl+Shift+Z");
    }
}
