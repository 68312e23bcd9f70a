//! Typed extraction records for each scrape stage.
//!
//! Extractors never fail. Every optional field is pulled independently and
//! comes back as `None` (or empty) when the page does not carry it.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;

use super::page::{PageDocument, PageElement};
use super::slug::{dedup_by_title, Titled};

/// Currency recorded for every product.
pub const DEFAULT_CURRENCY: &str = "GBP";

/// Maximum product cards read from one listing page.
pub const MAX_CARDS_PER_PAGE: usize = 20;

const NAV_LINK_SELECTOR: &str = "nav a, header a, .menu a";
const CATEGORY_TITLE_SELECTOR: &str = "h1, .category-title, .page-title";
const PRODUCT_CARD_SELECTOR: &str = ".product-item, .product-card, [data-product-id]";
const CARD_TITLE_SELECTOR: &str = "h2, h3, .product-title, .title";
const CARD_AUTHOR_SELECTOR: &str = ".author, .product-author";
const CARD_PRICE_SELECTOR: &str = ".price, .product-price";
const DESCRIPTION_SELECTOR: &str = ".description, .product-description, [itemprop=\"description\"]";
const RATING_SELECTOR: &str = ".rating, .stars, [itemprop=\"ratingValue\"]";
const REVIEW_COUNT_SELECTOR: &str = ".review-count, [itemprop=\"reviewCount\"]";
const REVIEW_SELECTOR: &str = ".review, .review-item";
const REVIEW_AUTHOR_SELECTOR: &str = ".author, .reviewer";
const REVIEW_TEXT_SELECTOR: &str = ".review-text, .comment";
const SPEC_SELECTOR: &str = ".spec-item, .product-spec";
const SPEC_LABEL_SELECTOR: &str = ".label, .spec-label";
const SPEC_VALUE_SELECTOR: &str = ".value, .spec-value";
const RECOMMENDATION_SELECTOR: &str = ".recommendations a, .related-products a";

const UNKNOWN_CATEGORY: &str = "Unknown Category";
const UNKNOWN_PRODUCT: &str = "Unknown Product";

/// Menu entries that are account chrome rather than catalog headings.
static NAV_NOISE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)sign|login|cart|account").unwrap());

/// Leading decimal number, as a browser's `parseFloat` would read it.
static LEADING_DECIMAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)").unwrap());

/// A heading from the site menu.
#[derive(Debug, Clone, PartialEq)]
pub struct NavigationLink {
    pub title: String,
    /// Absolute URL.
    pub url: String,
}

impl Titled for NavigationLink {
    fn title(&self) -> &str {
        &self.title
    }
}

/// Category page header.
#[derive(Debug, Clone, PartialEq)]
pub struct CategorySummary {
    pub title: String,
    pub url: String,
    pub product_count: u32,
}

/// One product card on a listing page.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductCard {
    pub source_id: String,
    pub title: String,
    pub author: Option<String>,
    pub price: Option<f64>,
    pub currency: String,
    pub image_url: Option<String>,
    /// Absolute URL of the product page.
    pub source_url: String,
}

/// A review as it appears on a product page.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewEntry {
    pub author: Option<String>,
    pub rating: Option<u8>,
    pub text: Option<String>,
    pub review_date: Option<DateTime<Utc>>,
}

/// Everything read from a product page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetailPage {
    pub description: Option<String>,
    pub ratings_avg: Option<f64>,
    pub reviews_count: Option<u32>,
    pub specs: BTreeMap<String, String>,
    pub reviews: Vec<ReviewEntry>,
    pub recommendations: Vec<String>,
}

/// Menu links worth keeping as navigation headings.
///
/// Links need an href and a title longer than two characters. The first link
/// wins for each title, and account/cart links are dropped.
pub fn navigation_links(doc: &PageDocument) -> Vec<NavigationLink> {
    let candidates = doc
        .select(NAV_LINK_SELECTOR)
        .into_iter()
        .filter_map(|a| {
            let title = a.own_text()?;
            let href = a.own_attr("href")?;
            (title.chars().count() > 2).then_some((title, href))
        })
        .filter_map(|(title, href)| {
            let url = doc.resolve(&href)?;
            Some(NavigationLink { title, url })
        })
        .collect();

    dedup_by_title(candidates)
        .into_iter()
        .filter(|link| !NAV_NOISE.is_match(&link.title))
        .collect()
}

/// Title and product count of a category page.
pub fn category_summary(doc: &PageDocument) -> CategorySummary {
    CategorySummary {
        title: doc
            .text(CATEGORY_TITLE_SELECTOR)
            .unwrap_or_else(|| UNKNOWN_CATEGORY.to_string()),
        url: doc.url().to_string(),
        product_count: doc.count(PRODUCT_CARD_SELECTOR) as u32,
    }
}

/// Product cards on a listing page, at most [`MAX_CARDS_PER_PAGE`].
///
/// Cards without a link are skipped since the link is the product's identity.
pub fn product_cards(doc: &PageDocument) -> Vec<ProductCard> {
    doc.select(PRODUCT_CARD_SELECTOR)
        .into_iter()
        .take(MAX_CARDS_PER_PAGE)
        .filter_map(|card| product_card(doc, card))
        .collect()
}

fn product_card(doc: &PageDocument, card: PageElement<'_>) -> Option<ProductCard> {
    let href = card.attr("a", "href")?;
    let source_url = doc.resolve(&href)?;

    Some(ProductCard {
        source_id: source_id_from_url(&source_url),
        title: card
            .text(CARD_TITLE_SELECTOR)
            .unwrap_or_else(|| UNKNOWN_PRODUCT.to_string()),
        author: card.text(CARD_AUTHOR_SELECTOR),
        price: card.text(CARD_PRICE_SELECTOR).and_then(|t| parse_price(&t)),
        currency: DEFAULT_CURRENCY.to_string(),
        image_url: card
            .attr("img", "src")
            .or_else(|| card.attr("img", "data-src"))
            .and_then(|src| doc.resolve(&src)),
        source_url,
    })
}

/// Description, ratings, reviews, specs and recommendations of a product page.
pub fn product_detail(doc: &PageDocument) -> DetailPage {
    let specs = doc
        .select(SPEC_SELECTOR)
        .into_iter()
        .filter_map(|spec| {
            let label = spec.text(SPEC_LABEL_SELECTOR)?;
            let value = spec.text(SPEC_VALUE_SELECTOR)?;
            Some((label, value))
        })
        .collect();

    let reviews = doc
        .select(REVIEW_SELECTOR)
        .into_iter()
        .map(|review| ReviewEntry {
            author: review.text(REVIEW_AUTHOR_SELECTOR),
            rating: review.text(".rating").and_then(|t| parse_review_rating(&t)),
            text: review.text(REVIEW_TEXT_SELECTOR),
            review_date: review
                .attr("time[datetime]", "datetime")
                .or_else(|| review.text(".review-date"))
                .and_then(|t| parse_review_date(&t)),
        })
        .collect();

    let mut recommendations: Vec<String> = Vec::new();
    for link in doc.select(RECOMMENDATION_SELECTOR) {
        if let Some(url) = link.own_attr("href").and_then(|h| doc.resolve(&h)) {
            if !recommendations.contains(&url) {
                recommendations.push(url);
            }
        }
    }

    DetailPage {
        description: doc.text(DESCRIPTION_SELECTOR),
        ratings_avg: doc.text(RATING_SELECTOR).and_then(|t| parse_rating(&t)),
        reviews_count: doc.text(REVIEW_COUNT_SELECTOR).and_then(|t| parse_count(&t)),
        specs,
        reviews,
        recommendations,
    }
}

/// Last path segment of a product URL, or a timestamped placeholder.
pub fn source_id_from_url(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()?
                .filter(|seg| !seg.is_empty())
                .last()
                .map(str::to_string)
        })
        .unwrap_or_else(|| format!("product-{}", Utc::now().timestamp_millis()))
}

fn parse_leading_decimal(s: &str) -> Option<f64> {
    let m = LEADING_DECIMAL.find(s.trim())?;
    m.as_str().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Price text like `£1,234.50` to a number.
pub fn parse_price(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| !matches!(c, '£' | '$' | '€' | ','))
        .collect();
    parse_leading_decimal(&cleaned)
}

/// Average rating from text such as `4.5 out of 5 stars` (digits and dots only).
pub fn parse_rating(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    parse_leading_decimal(&cleaned)
}

/// Count from text such as `(1,024 reviews)`.
pub fn parse_count(text: &str) -> Option<u32> {
    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// Star rating of a single review. Anything outside 1-5 is discarded.
pub fn parse_review_rating(text: &str) -> Option<u8> {
    parse_count(text)
        .and_then(|n| u8::try_from(n).ok())
        .filter(|n| (1..=5).contains(n))
}

fn parse_review_date(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%d", "%d/%m/%Y", "%d %B %Y", "%B %d, %Y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOME: &str = r#"
        <html><body>
          <header>
            <a href="/">Go</a>
            <a href="/en-gb/category/fiction">Fiction</a>
            <a href="/en-gb/account/login">Sign In</a>
            <a href="/en-gb/basket">My Cart</a>
          </header>
          <nav>
            <a href="/en-gb/category/fiction-books">Fiction</a>
            <a href="https://www.worldofbooks.com/en-gb/category/history">History</a>
            <a>No Link</a>
          </nav>
        </body></html>
    "#;

    const LISTING: &str = r#"
        <html><body>
          <h1>Crime Fiction</h1>
          <div class="product-card">
            <a href="/en-gb/products/the-big-sleep"><img src="/img/sleep.jpg"></a>
            <h3>The Big Sleep</h3>
            <span class="author">Raymond Chandler</span>
            <span class="price">£1,204.50</span>
          </div>
          <div class="product-card">
            <a href="/en-gb/products/gone-girl"><img data-src="https://cdn.example/gone.jpg"></a>
            <h3>Gone Girl</h3>
          </div>
          <div class="product-card">
            <h3>Orphan card without a link</h3>
          </div>
        </body></html>
    "#;

    const DETAIL: &str = r#"
        <html><body>
          <div class="product-description">A private eye in Los Angeles.</div>
          <div class="stars">4.5 out of 5</div>
          <span itemprop="reviewCount">(1,024 reviews)</span>
          <ul>
            <li class="spec-item"><span class="label">ISBN</span><span class="value">9780241956281</span></li>
            <li class="spec-item"><span class="label">Pages</span><span class="value">288</span></li>
            <li class="spec-item"><span class="label">Binding</span></li>
          </ul>
          <div class="review-item">
            <span class="reviewer">Ann</span><span class="rating">5</span>
            <p class="comment">Classic.</p><time datetime="2024-03-15">15 March</time>
          </div>
          <div class="review-item">
            <span class="reviewer">Bob</span><span class="rating">10/10</span>
            <span class="review-date">02/01/2023</span>
          </div>
          <div class="recommendations">
            <a href="/en-gb/products/farewell-my-lovely">Farewell</a>
            <a href="/en-gb/products/farewell-my-lovely">Farewell again</a>
          </div>
        </body></html>
    "#;

    #[test]
    fn test_navigation_links() {
        let doc = PageDocument::parse("https://www.worldofbooks.com/", HOME);
        let links = navigation_links(&doc);

        let titles: Vec<_> = links.iter().map(|l| l.title.as_str()).collect();
        assert_eq!(titles, vec!["Fiction", "History"]);
        // First-seen link wins for duplicate titles.
        assert_eq!(
            links[0].url,
            "https://www.worldofbooks.com/en-gb/category/fiction"
        );
    }

    #[test]
    fn test_category_summary() {
        let doc = PageDocument::parse("https://example.com/c/crime", LISTING);
        let summary = category_summary(&doc);
        assert_eq!(summary.title, "Crime Fiction");
        assert_eq!(summary.product_count, 3);
        assert_eq!(summary.url, "https://example.com/c/crime");

        let empty = PageDocument::parse("https://example.com/c/x", "<html></html>");
        let summary = category_summary(&empty);
        assert_eq!(summary.title, "Unknown Category");
        assert_eq!(summary.product_count, 0);
    }

    #[test]
    fn test_product_cards() {
        let doc = PageDocument::parse("https://example.com/c/crime?page=1", LISTING);
        let cards = product_cards(&doc);
        assert_eq!(cards.len(), 2);

        let sleep = &cards[0];
        assert_eq!(sleep.title, "The Big Sleep");
        assert_eq!(sleep.author.as_deref(), Some("Raymond Chandler"));
        assert_eq!(sleep.price, Some(1204.5));
        assert_eq!(sleep.source_id, "the-big-sleep");
        assert_eq!(sleep.source_url, "https://example.com/en-gb/products/the-big-sleep");
        assert_eq!(sleep.image_url.as_deref(), Some("https://example.com/img/sleep.jpg"));

        let gone = &cards[1];
        assert_eq!(gone.price, None);
        assert_eq!(gone.currency, "GBP");
        assert_eq!(gone.author, None);
        assert_eq!(gone.image_url.as_deref(), Some("https://cdn.example/gone.jpg"));
    }

    #[test]
    fn test_product_cards_capped() {
        let cards: String = (0..30)
            .map(|i| format!(r#"<div class="product-item"><a href="/p/{i}">x</a></div>"#))
            .collect();
        let doc = PageDocument::parse("https://example.com/c", &cards);
        assert_eq!(product_cards(&doc).len(), MAX_CARDS_PER_PAGE);
    }

    #[test]
    fn test_product_detail() {
        let doc = PageDocument::parse("https://example.com/en-gb/products/the-big-sleep", DETAIL);
        let detail = product_detail(&doc);

        assert_eq!(detail.description.as_deref(), Some("A private eye in Los Angeles."));
        assert_eq!(detail.ratings_avg, Some(4.55));
        assert_eq!(detail.reviews_count, Some(1024));
        assert_eq!(detail.specs.len(), 2);
        assert_eq!(detail.specs["Pages"], "288");

        assert_eq!(detail.reviews.len(), 2);
        assert_eq!(detail.reviews[0].author.as_deref(), Some("Ann"));
        assert_eq!(detail.reviews[0].rating, Some(5));
        assert_eq!(detail.reviews[0].text.as_deref(), Some("Classic."));
        assert!(detail.reviews[0].review_date.is_some());
        assert_eq!(detail.reviews[1].rating, None);
        assert!(detail.reviews[1].review_date.is_some());

        assert_eq!(
            detail.recommendations,
            vec!["https://example.com/en-gb/products/farewell-my-lovely".to_string()]
        );
    }

    #[test]
    fn test_empty_detail_page() {
        let doc = PageDocument::parse("https://example.com/p/x", "<html><body></body></html>");
        assert_eq!(product_detail(&doc), DetailPage::default());
    }

    #[test]
    fn test_parsers() {
        assert_eq!(parse_price("£12.99"), Some(12.99));
        assert_eq!(parse_price("€ 3"), Some(3.0));
        assert_eq!(parse_price("$1,000 RRP"), Some(1000.0));
        assert_eq!(parse_price("Out of stock"), None);
        assert_eq!(parse_price(""), None);

        assert_eq!(parse_rating("Rated 4.2"), Some(4.2));
        assert_eq!(parse_rating("no stars"), None);

        assert_eq!(parse_count("(87 reviews)"), Some(87));
        assert_eq!(parse_count("none"), None);

        assert_eq!(parse_review_rating("4"), Some(4));
        assert_eq!(parse_review_rating("0"), None);
        assert_eq!(parse_review_rating("6"), None);
        assert_eq!(parse_review_rating("n/a"), None);
    }

    #[test]
    fn test_source_id_from_url() {
        assert_eq!(
            source_id_from_url("https://example.com/en-gb/products/dune?ref=x"),
            "dune"
        );
        assert_eq!(source_id_from_url("https://example.com/p/dune/"), "dune");
        assert!(source_id_from_url("https://example.com").starts_with("product-"));
    }
}
