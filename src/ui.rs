//! Console glyphs for progress output.
//!
//! Unicode with plain-text fallbacks for terminals that cannot render
//! emoji, via `console::Emoji`.

use console::Emoji;

pub static CHECK: Emoji<'_, '_> = Emoji("✓", "[OK]");
pub static CROSS: Emoji<'_, '_> = Emoji("✗", "[FAIL]");
pub static ARROW: Emoji<'_, '_> = Emoji("→", "->");
pub static LOG_FILE: Emoji<'_, '_> = Emoji("📄 ", "");
pub static LOG_DIR: Emoji<'_, '_> = Emoji("📁 ", "");
pub static PENCIL: Emoji<'_, '_> = Emoji("📝 ", "");
pub static REPORT: Emoji<'_, '_> = Emoji("📊 ", "");
