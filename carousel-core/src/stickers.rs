//! Built-in sticker catalog.

use std::sync::OnceLock;

use crate::ImageAsset;

/// A catalog sticker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sticker {
    /// Stable identifier.
    pub id: &'static str,
    /// Display name.
    pub name: &'static str,
    /// SVG image as a data URL.
    pub asset: ImageAsset,
}

const STAR_PATH: &str = r##"<path fill="#facc15" d="M128 18l30 78 84 6-65 52 20 82-69-46-69 46 20-82-65-52 84-6z"/>"##;
const HEART_PATH: &str = r##"<path fill="#fb7185" d="M128 228s-84-52-110-102C-6 78 32 34 76 34c22 0 40 10 52 26 12-16 30-26 52-26 44 0 82 44 58 92-26 50-110 102-110 102z"/>"##;
const ARROW_PATH: &str = r##"<path fill="#60a5fa" d="M24 128h144l-40-40 16-16 72 72-72 72-16-16 40-40H24z"/>"##;

fn sticker_svg(body: &str) -> String {
    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="256" height="256" viewBox="0 0 256 256">{body}</svg>"#
    )
}

/// All catalog stickers, in display order.
#[must_use]
pub fn catalog() -> &'static [Sticker] {
    static CATALOG: OnceLock<Vec<Sticker>> = OnceLock::new();
    CATALOG.get_or_init(|| {
        [("star", "Star", STAR_PATH), ("heart", "Heart", HEART_PATH), ("arrow", "Arrow", ARROW_PATH)]
            .into_iter()
            .map(|(id, name, body)| Sticker {
                id,
                name,
                asset: ImageAsset::svg(&sticker_svg(body)),
            })
            .collect()
    })
}

/// Look up a sticker by id.
#[must_use]
pub fn sticker(id: &str) -> Option<&'static Sticker> {
    catalog().iter().find(|s| s.id == id)
}
