//! Embedded fonts for report rendering.
//!
//! The fonts ship inside the binary via `typst-assets` and are parsed exactly
//! once per process; every render borrows the same cache.

use std::sync::OnceLock;

use typst::foundations::Bytes;
use typst::text::{Font, FontBook};
use typst::utils::LazyHash;

static FONT_CACHE: OnceLock<FontCache> = OnceLock::new();

pub struct FontCache {
    book: LazyHash<FontBook>,
    fonts: Vec<Font>,
}

/// Borrow the process-wide font cache, loading it on first use.
pub fn global_font_cache() -> &'static FontCache {
    FONT_CACHE.get_or_init(FontCache::new)
}

impl FontCache {
    fn new() -> Self {
        let mut book = FontBook::new();
        let mut fonts = Vec::new();

        for data in typst_assets::fonts() {
            let buffer = Bytes::from_static(data);
            for font in Font::iter(buffer) {
                book.push(font.info().clone());
                fonts.push(font);
            }
        }

        tracing::info!("Report font cache loaded ({} fonts)", fonts.len());

        Self {
            book: LazyHash::new(book),
            fonts,
        }
    }

    pub fn book(&self) -> &LazyHash<FontBook> {
        &self.book
    }

    pub fn font(&self, index: usize) -> Option<Font> {
        self.fonts.get(index).cloned()
    }
}
