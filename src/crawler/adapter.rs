//! Catalog adapter boundary
//!
//! The orchestrator never talks to a site directly; it drives a
//! `CatalogAdapter` and works purely with the structured values coming back.
//! `HttpCatalogAdapter` is the default implementation: plain HTTP GET plus
//! CSS-selector extraction, configured entirely through `SiteConfig`.

use crate::config::{SiteConfig, UserAgentConfig};
use crate::output::ItemRecord;
use crate::{ConfigError, ConfigResult, Result, StocktakeError};
use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use url::Url;

/// One page the orchestrator wants visited
///
/// `url` is set when the previous page supplied a next-page locator;
/// otherwise the adapter derives the address from the page number.
#[derive(Debug, Clone)]
pub struct PageTarget {
    pub number: u32,
    pub url: Option<Url>,
}

/// The raw result of fetching one page
#[derive(Debug, Clone)]
pub struct PageCapture {
    /// Page number the capture belongs to
    pub page: u32,

    /// Address the content was actually served from
    pub url: Url,

    /// Page body as text
    pub body: String,
}

/// One extracted item, not yet admitted to the dataset
///
/// Mirrors the dataset record minus the image reference, which is only
/// known after the download attempt. Candidate URLs are ranked, preferred
/// variant first.
#[derive(Debug, Clone)]
pub struct RawItem {
    pub id: String,
    pub name: String,
    pub price: Option<f64>,
    pub stock_quantity: u32,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    pub short_description: Option<String>,
    pub brand: Option<String>,
    pub grade: Option<String>,
    pub packaging: Option<String>,
    pub color: Option<String>,
    pub model: Option<String>,
    pub compatibility: Option<String>,
    pub image_candidates: Vec<Url>,
}

impl RawItem {
    /// Finalizes the item into a dataset record once the image outcome is
    /// known
    pub fn into_record(self, image: Option<String>) -> ItemRecord {
        ItemRecord {
            id: self.id,
            name: self.name,
            price: self.price,
            stock_quantity: self.stock_quantity,
            image,
            categories: self.categories,
            tags: self.tags,
            short_description: self.short_description,
            brand: self.brand,
            grade: self.grade,
            packaging: self.packaging,
            color: self.color,
            model: self.model,
            compatibility: self.compatibility,
        }
    }
}

/// Structured yield of one page
#[derive(Debug, Clone)]
pub struct PageYield {
    /// Items in page order, duplicates not yet removed
    pub items: Vec<RawItem>,

    /// Locator of the following page, if the page advertises one
    pub next_page: Option<Url>,
}

/// Boundary between the crawl engine and a concrete catalog source
///
/// Implementations own their transport. `fetch_page` and `open` are async
/// because the default adapter does network I/O; `extract` is pure and
/// synchronous.
#[async_trait]
pub trait CatalogAdapter: Send {
    /// Prepares the adapter for a run; called once before the first page
    async fn open(&mut self) -> Result<()>;

    /// Fetches one catalog page
    async fn fetch_page(&mut self, target: &PageTarget) -> Result<PageCapture>;

    /// Extracts the structured yield from a captured page
    fn extract(&self, capture: &PageCapture) -> Result<PageYield>;

    /// Releases adapter resources; called once during shutdown
    async fn close(&mut self);
}

/// Selectors compiled once at configuration time
#[derive(Debug, Clone)]
struct CompiledSelectors {
    item: Selector,
    name: Selector,
    price: Option<Selector>,
    stock: Option<Selector>,
    brand: Option<Selector>,
    grade: Option<Selector>,
    packaging: Option<Selector>,
    color: Option<Selector>,
    model: Option<Selector>,
    compatibility: Option<Selector>,
    category: Option<Selector>,
    description: Option<Selector>,
    next_page: Option<Selector>,
}

/// Default adapter: HTTP GET plus CSS-selector extraction
#[derive(Debug)]
pub struct HttpCatalogAdapter {
    site: SiteConfig,
    user_agent: String,
    timeout: Duration,
    selectors: CompiledSelectors,
    client: Option<Client>,
}

impl HttpCatalogAdapter {
    /// Builds the adapter, compiling every configured selector up front so
    /// a typo fails at startup rather than on page one
    pub fn new(site: SiteConfig, user_agent: &UserAgentConfig) -> ConfigResult<Self> {
        let selectors = CompiledSelectors {
            item: compile_selector(&site.item_selector)?,
            name: compile_selector(&site.name_selector)?,
            price: compile_optional(&site.price_selector)?,
            stock: compile_optional(&site.stock_selector)?,
            brand: compile_optional(&site.brand_selector)?,
            grade: compile_optional(&site.grade_selector)?,
            packaging: compile_optional(&site.packaging_selector)?,
            color: compile_optional(&site.color_selector)?,
            model: compile_optional(&site.model_selector)?,
            compatibility: compile_optional(&site.compatibility_selector)?,
            category: compile_optional(&site.category_selector)?,
            description: compile_optional(&site.description_selector)?,
            next_page: compile_optional(&site.next_page_selector)?,
        };

        // Format: CrawlerName/Version (+ContactURL; ContactEmail)
        let agent = format!(
            "{}/{} (+{}; {})",
            user_agent.crawler_name,
            user_agent.crawler_version,
            user_agent.contact_url,
            user_agent.contact_email
        );

        Ok(Self {
            site,
            user_agent: agent,
            timeout: Duration::from_secs(30),
            selectors,
            client: None,
        })
    }

    /// Address of a catalog page derived from the URL template
    pub fn page_url(&self, number: u32) -> Result<Url> {
        let raw = self
            .site
            .page_url_template
            .replace("{page}", &number.to_string());
        Ok(Url::parse(&raw)?)
    }

    /// Ranked image candidate URLs for one item identifier
    fn image_candidates(&self, id: &str) -> Vec<Url> {
        self.site
            .image_candidate_templates
            .iter()
            .filter_map(|template| Url::parse(&template.replace("{id}", id)).ok())
            .collect()
    }

    /// Extracts one item from its container element
    ///
    /// Returns None when the container carries no identifier or no name;
    /// such fragments are navigation chrome, not items.
    fn extract_item(&self, element: ElementRef<'_>) -> Option<RawItem> {
        let id = element
            .value()
            .attr(&self.site.id_attribute)
            .map(str::trim)
            .filter(|v| !v.is_empty())?
            .to_string();

        let name = select_text(element, Some(&self.selectors.name))?;

        let price = select_text(element, self.selectors.price.as_ref())
            .as_deref()
            .and_then(parse_price);
        let stock_quantity = select_text(element, self.selectors.stock.as_ref())
            .as_deref()
            .and_then(parse_quantity)
            .unwrap_or(0);
        let categories = select_text(element, self.selectors.category.as_ref())
            .map(|text| {
                text.split(',')
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        let image_candidates = self.image_candidates(&id);

        Some(RawItem {
            name,
            price,
            stock_quantity,
            categories,
            tags: Vec::new(),
            short_description: select_text(element, self.selectors.description.as_ref()),
            brand: select_text(element, self.selectors.brand.as_ref()),
            grade: select_text(element, self.selectors.grade.as_ref()),
            packaging: select_text(element, self.selectors.packaging.as_ref()),
            color: select_text(element, self.selectors.color.as_ref()),
            model: select_text(element, self.selectors.model.as_ref()),
            compatibility: select_text(element, self.selectors.compatibility.as_ref()),
            image_candidates,
            id,
        })
    }
}

#[async_trait]
impl CatalogAdapter for HttpCatalogAdapter {
    async fn open(&mut self) -> Result<()> {
        let client = Client::builder()
            .user_agent(self.user_agent.clone())
            .timeout(self.timeout)
            .connect_timeout(Duration::from_secs(10))
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(|e| StocktakeError::Startup(format!("HTTP client setup failed: {}", e)))?;

        self.client = Some(client);
        tracing::debug!("HTTP catalog adapter ready, user agent: {}", self.user_agent);
        Ok(())
    }

    async fn fetch_page(&mut self, target: &PageTarget) -> Result<PageCapture> {
        let url = match &target.url {
            Some(url) => url.clone(),
            None => self.page_url(target.number)?,
        };

        let client = self.client.as_ref().ok_or_else(|| StocktakeError::Fetch {
            page: target.number,
            message: "adapter not opened".to_string(),
        })?;

        tracing::debug!("Fetching page {} from {}", target.number, url);

        let response = client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| StocktakeError::Fetch {
                page: target.number,
                message: describe_http_error(&e),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(StocktakeError::Fetch {
                page: target.number,
                message: format!("HTTP {}", status.as_u16()),
            });
        }

        // Redirects may land the content on a different address; keep the
        // final one for relative next-page resolution
        let final_url = response.url().clone();

        let body = response.text().await.map_err(|e| StocktakeError::Fetch {
            page: target.number,
            message: describe_http_error(&e),
        })?;

        Ok(PageCapture {
            page: target.number,
            url: final_url,
            body,
        })
    }

    fn extract(&self, capture: &PageCapture) -> Result<PageYield> {
        let document = Html::parse_document(&capture.body);

        let mut items = Vec::new();
        for element in document.select(&self.selectors.item) {
            match self.extract_item(element) {
                Some(item) => items.push(item),
                None => tracing::debug!(
                    "Skipping fragment without {} on page {}",
                    self.site.id_attribute,
                    capture.page
                ),
            }
        }

        // With no next-page selector configured the catalog paginates purely
        // by number, so the locator comes from the URL template instead
        let next_page = match &self.selectors.next_page {
            Some(selector) => document.select(selector).next().and_then(|link| {
                let href = link.value().attr("href")?;
                match capture.url.join(href) {
                    Ok(url) => Some(url),
                    Err(e) => {
                        tracing::warn!(
                            "Unusable next-page locator {:?} on page {}: {}",
                            href,
                            capture.page,
                            e
                        );
                        None
                    }
                }
            }),
            None => self.page_url(capture.page + 1).ok(),
        };

        tracing::debug!(
            "Page {}: {} items extracted, next page {:?}",
            capture.page,
            items.len(),
            next_page.as_ref().map(Url::as_str)
        );

        Ok(PageYield { items, next_page })
    }

    async fn close(&mut self) {
        self.client = None;
    }
}

fn compile_selector(raw: &str) -> ConfigResult<Selector> {
    Selector::parse(raw).map_err(|e| ConfigError::InvalidSelector(format!("{}: {}", raw, e)))
}

fn compile_optional(raw: &Option<String>) -> ConfigResult<Option<Selector>> {
    raw.as_deref().map(compile_selector).transpose()
}

/// Text of the first match under `element`, trimmed; None when the selector
/// is unconfigured or nothing matches
fn select_text(element: ElementRef<'_>, selector: Option<&Selector>) -> Option<String> {
    let selector = selector?;
    let found = element.select(selector).next()?;
    let text = found.text().collect::<String>();
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Parses a price out of display text like "€ 1.299,95" or "$12.50"
fn parse_price(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    // Both separators present: the last one is the decimal point
    let normalized = match (cleaned.rfind('.'), cleaned.rfind(',')) {
        (Some(dot), Some(comma)) if comma > dot => {
            cleaned.replace('.', "").replace(',', ".")
        }
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (None, Some(_)) => cleaned.replace(',', "."),
        _ => cleaned,
    };

    normalized.parse().ok()
}

/// Parses a quantity out of display text like "12 in stock"
fn parse_quantity(text: &str) -> Option<u32> {
    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok()
}

fn describe_http_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "request timeout".to_string()
    } else if e.is_connect() {
        "connection refused".to_string()
    } else {
        e.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_site() -> SiteConfig {
        SiteConfig {
            page_url_template: "https://shop.example.com/catalog?page={page}".to_string(),
            item_selector: "div.product".to_string(),
            id_attribute: "data-sku".to_string(),
            name_selector: "h2.title".to_string(),
            price_selector: Some("span.price".to_string()),
            stock_selector: Some("span.stock".to_string()),
            brand_selector: Some("span.brand".to_string()),
            grade_selector: None,
            packaging_selector: None,
            color_selector: None,
            model_selector: None,
            compatibility_selector: None,
            category_selector: Some("span.category".to_string()),
            description_selector: None,
            next_page_selector: Some("a.next".to_string()),
            image_candidate_templates: vec![
                "https://img.example.com/large/{id}.jpg".to_string(),
                "https://img.example.com/thumb/{id}.jpg".to_string(),
            ],
        }
    }

    fn create_test_agent() -> UserAgentConfig {
        UserAgentConfig {
            crawler_name: "TestHarvester".to_string(),
            crawler_version: "1.0".to_string(),
            contact_url: "https://example.com/about".to_string(),
            contact_email: "admin@example.com".to_string(),
        }
    }

    fn create_adapter() -> HttpCatalogAdapter {
        HttpCatalogAdapter::new(create_test_site(), &create_test_agent()).unwrap()
    }

    fn capture(page: u32, body: &str) -> PageCapture {
        PageCapture {
            page,
            url: Url::parse(&format!("https://shop.example.com/catalog?page={}", page)).unwrap(),
            body: body.to_string(),
        }
    }

    const PAGE_HTML: &str = r#"
        <html><body>
          <div class="product" data-sku="SKU-100">
            <h2 class="title">Widget  Alpha</h2>
            <span class="price">€ 1.299,95</span>
            <span class="stock">12 in stock</span>
            <span class="brand">Acme</span>
            <span class="category">Widgets, Gadgets</span>
          </div>
          <div class="product" data-sku="SKU-101">
            <h2 class="title">Widget Beta</h2>
            <span class="price">$12.50</span>
          </div>
          <div class="product">
            <h2 class="title">Chrome without an identifier</h2>
          </div>
          <a class="next" href="/catalog?page=2">Next</a>
        </body></html>
    "#;

    #[test]
    fn test_extract_items() {
        let adapter = create_adapter();
        let yield_ = adapter.extract(&capture(1, PAGE_HTML)).unwrap();

        assert_eq!(yield_.items.len(), 2);

        let first = &yield_.items[0];
        assert_eq!(first.id, "SKU-100");
        assert_eq!(first.name, "Widget Alpha");
        assert_eq!(first.price, Some(1299.95));
        assert_eq!(first.stock_quantity, 12);
        assert_eq!(first.brand.as_deref(), Some("Acme"));
        assert_eq!(first.categories, vec!["Widgets", "Gadgets"]);

        let second = &yield_.items[1];
        assert_eq!(second.price, Some(12.50));
        assert_eq!(second.stock_quantity, 0);
        assert!(second.brand.is_none());
    }

    #[test]
    fn test_extract_image_candidates_ranked() {
        let adapter = create_adapter();
        let yield_ = adapter.extract(&capture(1, PAGE_HTML)).unwrap();

        let candidates = &yield_.items[0].image_candidates;
        assert_eq!(candidates.len(), 2);
        assert_eq!(
            candidates[0].as_str(),
            "https://img.example.com/large/SKU-100.jpg"
        );
        assert_eq!(
            candidates[1].as_str(),
            "https://img.example.com/thumb/SKU-100.jpg"
        );
    }

    #[test]
    fn test_extract_resolves_relative_next_page() {
        let adapter = create_adapter();
        let yield_ = adapter.extract(&capture(1, PAGE_HTML)).unwrap();

        assert_eq!(
            yield_.next_page.unwrap().as_str(),
            "https://shop.example.com/catalog?page=2"
        );
    }

    #[test]
    fn test_extract_empty_page() {
        let adapter = create_adapter();
        let yield_ = adapter
            .extract(&capture(3, "<html><body><p>Nothing here</p></body></html>"))
            .unwrap();

        assert!(yield_.items.is_empty());
        assert!(yield_.next_page.is_none());
    }

    #[test]
    fn test_next_page_from_template_when_unconfigured() {
        let mut site = create_test_site();
        site.next_page_selector = None;
        let adapter = HttpCatalogAdapter::new(site, &create_test_agent()).unwrap();

        let yield_ = adapter.extract(&capture(4, PAGE_HTML)).unwrap();
        assert_eq!(
            yield_.next_page.unwrap().as_str(),
            "https://shop.example.com/catalog?page=5"
        );
    }

    #[test]
    fn test_page_url_from_template() {
        let adapter = create_adapter();
        assert_eq!(
            adapter.page_url(7).unwrap().as_str(),
            "https://shop.example.com/catalog?page=7"
        );
    }

    #[test]
    fn test_invalid_selector_rejected_up_front() {
        let mut site = create_test_site();
        site.item_selector = "div[[".to_string();
        let result = HttpCatalogAdapter::new(site, &create_test_agent());
        assert!(matches!(result, Err(ConfigError::InvalidSelector(_))));
    }

    #[test]
    fn test_parse_price_formats() {
        assert_eq!(parse_price("€ 1.299,95"), Some(1299.95));
        assert_eq!(parse_price("$12.50"), Some(12.50));
        assert_eq!(parse_price("1,299.95"), Some(1299.95));
        assert_eq!(parse_price("7,50"), Some(7.50));
        assert_eq!(parse_price("42"), Some(42.0));
        assert_eq!(parse_price("call us"), None);
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("12 in stock"), Some(12));
        assert_eq!(parse_quantity("out of stock"), None);
    }
}
