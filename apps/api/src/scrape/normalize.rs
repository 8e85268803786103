//! Text normalization: turns scraped page content into plain prompt text.
//!
//! Pure and infallible: any input yields a (possibly empty) string with markup
//! removed, control characters dropped, and whitespace collapsed to single spaces.

use std::sync::LazyLock;

use html2text::render::text_renderer::TrivialDecorator;
use regex::Regex;
use tracing::debug;

/// Rendering width handed to html2text. Wrapping is undone by the whitespace collapse.
const RENDER_WIDTH: usize = 10_000;

static NOISE_BLOCKS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?is)<script\b.*?</script\s*>|<style\b.*?</style\s*>|<noscript\b.*?</noscript\s*>|<!--.*?-->",
    )
    .expect("static regex")
});

static MARKUP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[a-zA-Z!/][^>]*>").expect("static regex"));

pub fn normalize(raw: &str) -> String {
    let without_noise = NOISE_BLOCKS.replace_all(raw, " ");

    let text = if MARKUP.is_match(&without_noise) {
        render_html(&without_noise)
    } else {
        without_noise.into_owned()
    };

    let collapsed = collapse_whitespace(&text);
    debug!("Normalized {} raw bytes into {} bytes", raw.len(), collapsed.len());
    collapsed
}

fn render_html(html: &str) -> String {
    // Literal text only, so links leave no URL footnotes behind.
    let config = html2text::config::with_decorator(TrivialDecorator::new());
    match config.string_from_read(html.as_bytes(), RENDER_WIDTH) {
        Ok(text) => text,
        // Fall back to blunt tag removal; normalization never fails.
        Err(e) => {
            debug!("html2text failed ({e}); stripping tags instead");
            MARKUP.replace_all(html, " ").into_owned()
        }
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split(|c: char| c.is_whitespace() || c.is_control())
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
