//! Page fetching, HTML stripping, and breadth-first crawling for web sources.

use std::collections::HashSet;
use std::time::Duration;

use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, warn};
use url::Url;

use crate::types::RagError;

/// Elements whose text never belongs in extracted content.
const STRIPPED_ELEMENTS: [&str; 7] = [
    "script", "style", "nav", "header", "footer", "aside", "noscript",
];

/// Selectors tried in order to locate the main content region.
const MAIN_CONTENT_SELECTOR: &str = "main, article, .content, .main-content, .post-content, #content";

/// Options steering a breadth-first crawl.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlOptions {
    /// How many link hops away from the start page to follow.
    pub max_depth: usize,
    /// Upper bound on fetched pages.
    pub max_pages: usize,
    /// Pause between page fetches.
    pub delay: Duration,
    /// When set, only links on the start page's origin are followed.
    pub same_origin_only: bool,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            max_depth: 2,
            max_pages: 5,
            delay: Duration::from_millis(1000),
            same_origin_only: true,
        }
    }
}

/// Fetches pages and reduces their HTML to readable plain text.
#[derive(Clone)]
pub struct PageScraper {
    http: Client,
}

impl PageScraper {
    /// Creates a scraper over the shared HTTP client.
    pub fn new(http: Client) -> Self {
        Self { http }
    }

    /// Fetches a single page and returns its cleaned body text.
    ///
    /// Script, style, and chrome elements are stripped; a main-content region
    /// is preferred over the full body when one exists. Lines are trimmed and
    /// blank lines dropped.
    pub async fn scrape(&self, url: &Url) -> Result<String, RagError> {
        let html = self.fetch(url).await?;
        Ok(extract_page_text(&html))
    }

    /// Crawls breadth-first from `start`, returning the concatenated text of
    /// every fetched page, each framed as a title/URL header followed by its
    /// body text.
    pub async fn crawl(&self, start: &Url, options: &CrawlOptions) -> Result<String, RagError> {
        let mut visited: HashSet<Url> = HashSet::new();
        let mut queue: Vec<(Url, usize)> = vec![(normalize(start), 0)];
        let mut sections: Vec<String> = Vec::new();

        while let Some((url, depth)) = queue.pop() {
            if sections.len() >= options.max_pages {
                break;
            }
            if !visited.insert(url.clone()) {
                continue;
            }

            if !sections.is_empty() && !options.delay.is_zero() {
                tokio::time::sleep(options.delay).await;
            }

            let html = match self.fetch(&url).await {
                Ok(html) => html,
                Err(err) => {
                    // One bad page never sinks the crawl.
                    warn!(%url, error = %err, "skipping unfetchable page");
                    continue;
                }
            };

            let title = extract_title(&html).unwrap_or_else(|| url.to_string());
            let body = extract_page_text(&html);
            info!(%url, depth, chars = body.len(), "crawled page");
            sections.push(format!("=== {title} ({url}) ===\n{body}"));

            if depth < options.max_depth {
                for link in extract_links(&html, &url) {
                    if options.same_origin_only && link.origin() != start.origin() {
                        continue;
                    }
                    if !visited.contains(&link) {
                        // Front insertion keeps the scan breadth-first since
                        // pop() takes from the back.
                        queue.insert(0, (link, depth + 1));
                    }
                }
            }
        }

        if sections.is_empty() {
            return Err(RagError::Extraction(format!(
                "crawl of {start} yielded no pages"
            )));
        }
        Ok(sections.join("\n\n"))
    }

    async fn fetch(&self, url: &Url) -> Result<String, RagError> {
        debug!(%url, "fetching page");
        let response = self.http.get(url.clone()).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }
}

/// Reduces an HTML document to cleaned plain text.
pub fn extract_page_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let main_selector = Selector::parse(MAIN_CONTENT_SELECTOR).expect("static selector");
    let body_selector = Selector::parse("body").expect("static selector");

    let region = document
        .select(&main_selector)
        .next()
        .or_else(|| document.select(&body_selector).next());

    let Some(region) = region else {
        return String::new();
    };

    let mut text = String::new();
    collect_text(region, &mut text);
    clean_lines(&text)
}

fn extract_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("title").expect("static selector");
    let title = document
        .select(&selector)
        .next()?
        .text()
        .collect::<String>()
        .trim()
        .to_string();
    (!title.is_empty()).then_some(title)
}

fn extract_links(html: &str, base: &Url) -> Vec<Url> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("a[href]").expect("static selector");

    let mut links = Vec::new();
    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        if href.starts_with('#') {
            continue;
        }
        if let Ok(url) = base.join(href) {
            match url.scheme() {
                "http" | "https" => {
                    let url = normalize(&url);
                    if !links.contains(&url) {
                        links.push(url);
                    }
                }
                _ => {}
            }
        }
    }
    links
}

fn normalize(url: &Url) -> Url {
    let mut url = url.clone();
    url.set_fragment(None);
    url
}

/// Recursively collects text, skipping stripped elements entirely.
fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child_element) = ElementRef::wrap(child) {
            let name = child_element.value().name();
            if STRIPPED_ELEMENTS.contains(&name) {
                continue;
            }
            collect_text(child_element, out);
            if is_block_element(name) {
                out.push('\n');
            }
        }
    }
}

fn is_block_element(name: &str) -> bool {
    matches!(
        name,
        "p" | "div"
            | "section"
            | "article"
            | "li"
            | "ul"
            | "ol"
            | "table"
            | "tr"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "br"
            | "blockquote"
            | "pre"
    )
}

/// Trims every line and drops the blanks, as the chunker expects.
fn clean_lines(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
