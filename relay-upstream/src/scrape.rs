//! CSS-selector extraction for the scraped upstreams.
//!
//! Plain mechanical extraction: compiled selectors over a fetched page,
//! no state machine. The selector contract lives here; pages are fetched
//! by the caller so extraction stays synchronous and testable on fixtures.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use url::Url;

use crate::error::UpstreamError;

fn selector(pattern: &str) -> Selector {
    #[expect(clippy::expect_used, reason = "selector strings are compile-time constants")]
    let parsed = Selector::parse(pattern).expect("selector constant");
    parsed
}

static CARD: LazyLock<Selector> = LazyLock::new(|| selector("article.entry-card"));
static CARD_TITLE: LazyLock<Selector> = LazyLock::new(|| selector("h2.title"));
static CARD_LINK: LazyLock<Selector> = LazyLock::new(|| selector("a.link"));
static CARD_IMAGE: LazyLock<Selector> = LazyLock::new(|| selector("img.thumb"));
static CARD_SCORE: LazyLock<Selector> = LazyLock::new(|| selector(".score"));
static CARD_KIND: LazyLock<Selector> = LazyLock::new(|| selector(".type"));
static CARD_SYNOPSIS: LazyLock<Selector> = LazyLock::new(|| selector(".synopsis"));
static CARD_GENRE: LazyLock<Selector> = LazyLock::new(|| selector(".genres a"));
static PAGINATION_SPAN: LazyLock<Selector> = LazyLock::new(|| selector(".pagination span"));
static TOKEN_INPUT: LazyLock<Selector> = LazyLock::new(|| selector(r#"input[name="token"]"#));
static DOWNLOAD_LINK: LazyLock<Selector> = LazyLock::new(|| selector(".download-links a"));

static PAGE_OF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Page (\d+) of (\d+)").expect("pagination regex")
});

/// One listing card from a catalog search page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[non_exhaustive]
pub struct CatalogItem {
    pub title: String,
    pub url: Option<String>,
    pub image: Option<String>,
    pub score: Option<String>,
    pub kind: Option<String>,
    pub synopsis: Option<String>,
    pub genres: Vec<String>,
}

/// Pagination summary parsed from the listing footer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[non_exhaustive]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u32,
    pub has_next: bool,
}

fn text_of(card: ElementRef<'_>, sel: &Selector) -> Option<String> {
    card.select(sel)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_owned())
        .filter(|t| !t.is_empty())
}

fn attr_of(card: ElementRef<'_>, sel: &Selector, attr: &str) -> Option<String> {
    card.select(sel)
        .next()
        .and_then(|el| el.value().attr(attr))
        .map(str::to_owned)
}

/// Extract listing cards from a catalog search page. Cards without a title
/// are skipped.
#[must_use]
pub fn catalog_items(html: &str) -> Vec<CatalogItem> {
    let document = Html::parse_document(html);
    let mut items = Vec::new();

    for card in document.select(&CARD) {
        let Some(title) = text_of(card, &CARD_TITLE) else {
            continue;
        };
        items.push(CatalogItem {
            title,
            url: attr_of(card, &CARD_LINK, "href"),
            image: attr_of(card, &CARD_IMAGE, "src"),
            score: text_of(card, &CARD_SCORE),
            kind: text_of(card, &CARD_KIND),
            synopsis: text_of(card, &CARD_SYNOPSIS),
            genres: card
                .select(&CARD_GENRE)
                .map(|el| el.text().collect::<String>().trim().to_owned())
                .filter(|g| !g.is_empty())
                .collect(),
        });
    }

    items
}

/// Parse the `Page X of Y` pagination footer. A missing footer means a
/// single page.
#[must_use]
pub fn catalog_pagination(html: &str, current_page: u32) -> Pagination {
    let document = Html::parse_document(html);
    let footer = document
        .select(&PAGINATION_SPAN)
        .next()
        .map(|el| el.text().collect::<String>());

    match footer.as_deref().and_then(parse_page_of) {
        Some((current, total)) => Pagination {
            current_page: current,
            total_pages: total,
            has_next: current < total,
        },
        None => Pagination { current_page, total_pages: current_page, has_next: false },
    }
}

/// Parse `Page X of Y` out of a footer string.
#[must_use]
pub fn parse_page_of(text: &str) -> Option<(u32, u32)> {
    let caps = PAGE_OF.captures(text)?;
    let current = caps.get(1)?.as_str().parse().ok()?;
    let total = caps.get(2)?.as_str().parse().ok()?;
    Some((current, total))
}

/// Pull the anti-CSRF form token out of a fetched page.
///
/// # Errors
/// Returns [`UpstreamError::MissingElement`] when the token input is absent
/// or empty.
pub fn form_token(html: &str) -> Result<String, UpstreamError> {
    let document = Html::parse_document(html);
    document
        .select(&TOKEN_INPUT)
        .next()
        .and_then(|el| el.value().attr("value"))
        .map(str::to_owned)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| UpstreamError::MissingElement {
            what: "input[name=\"token\"]".to_owned(),
        })
}

/// Collect download links from a result block, resolving root-relative
/// hrefs against `base` and dropping placeholder and app-store links.
#[must_use]
pub fn media_links(html: &str, base: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let base_url = Url::parse(base).ok();

    document
        .select(&DOWNLOAD_LINK)
        .filter_map(|el| el.value().attr("href"))
        .filter(|href| *href != "/" && !href.contains("play.google.com"))
        .filter_map(|href| {
            if href.starts_with("http") {
                Some(href.to_owned())
            } else {
                base_url
                    .as_ref()
                    .and_then(|b| b.join(href).ok())
                    .map(Into::into)
            }
        })
        .collect()
}
