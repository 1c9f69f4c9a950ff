use std::fs;

use egui::{Context, FontData, FontDefinitions, FontFamily};
use tracing::{info, warn};

const FALLBACK_FONT: &str = "calculator-fallback";

/// Appends the configured font after egui's built-ins so item names in
/// scripts the defaults lack (CJK in particular) still render.
pub fn install_fallback_font(ctx: &Context, path: Option<&str>) {
    let Some(path) = path.map(str::trim).filter(|path| !path.is_empty()) else {
        return;
    };
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(path, "fallback font unreadable: {}", err);
            return;
        }
    };
    // egui panics on fonts it cannot parse; reject obvious non-fonts up front.
    if !looks_like_font(&bytes) {
        warn!(path, "fallback font ignored: not a TrueType/OpenType file");
        return;
    }
    ctx.set_fonts(with_fallback_font(bytes));
    info!(path, "fallback font installed");
}

fn with_fallback_font(bytes: Vec<u8>) -> FontDefinitions {
    let mut fonts = FontDefinitions::default();
    fonts
        .font_data
        .insert(FALLBACK_FONT.to_owned(), FontData::from_owned(bytes));
    for family in [FontFamily::Proportional, FontFamily::Monospace] {
        fonts
            .families
            .entry(family)
            .or_default()
            .push(FALLBACK_FONT.to_owned());
    }
    fonts
}

fn looks_like_font(bytes: &[u8]) -> bool {
    matches!(
        bytes.get(..4),
        Some([0x00, 0x01, 0x00, 0x00]) | Some(b"OTTO") | Some(b"true") | Some(b"ttcf")
    )
}
