//! Bounded same-host page discovery

use lazy_static::lazy_static;
use scraper::{Html, Selector};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use url::Url;

use audit_core::error::{AuditError, Result};
use audit_core::page::{normalize_url, PagePriority, PageRef, PageType};
use audit_core::request::ScanMode;

lazy_static! {
    static ref LINK_SELECTOR: Selector = Selector::parse("a[href]").unwrap();
    static ref TITLE_SELECTOR: Selector = Selector::parse("title").unwrap();
    static ref ANY_SELECTOR: Selector = Selector::parse("*").unwrap();
}

/// File extensions that are never HTML pages
const DENYLIST_EXTENSIONS: &[&str] = &[
    "pdf", "jpg", "jpeg", "png", "gif", "svg", "webp", "ico", "zip", "gz", "tar", "exe", "dmg",
    "doc", "docx", "xls", "xlsx", "ppt", "pptx", "mp3", "mp4", "avi", "mov", "wmv", "css", "js",
    "json", "xml", "rss", "woff", "woff2", "ttf",
];

/// Discovery bounds from the scan request
#[derive(Debug, Clone, Copy)]
pub struct DiscoveryBounds {
    /// Maximum pages returned (the seed counts)
    pub max_pages: u32,
    /// Maximum link depth from the seed
    pub max_depth: u32,
}

/// What one fetch produced: outgoing links plus page metadata
struct FetchedPage {
    links: Vec<String>,
    title: String,
    element_count: u32,
}

/// Bounded BFS crawler producing the prioritized page list for one scan.
///
/// Same-host only, with a fixed worker pool, a per-fetch timeout and a
/// wall-clock budget for the whole phase; hitting the budget returns the
/// partial list instead of failing.
pub struct PageDiscoverer {
    client: reqwest::Client,
    concurrency: usize,
    fetch_timeout: Duration,
    phase_timeout: Duration,
}

impl PageDiscoverer {
    /// Discoverer with the given worker pool size and timeouts
    pub fn new(concurrency: usize, fetch_timeout: Duration, phase_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(fetch_timeout)
            .pool_max_idle_per_host(concurrency)
            .user_agent("eaa-audit-crawler/0.1")
            .build()
            .map_err(|e| AuditError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            concurrency: concurrency.max(1),
            fetch_timeout,
            phase_timeout,
        })
    }

    /// Discover pages starting from `seed`.
    ///
    /// The seed is always the first element. In simulate mode no network
    /// traffic happens: child pages are synthesized deterministically so
    /// offline multi-page scans stay reproducible.
    pub async fn discover(
        &self,
        seed: &Url,
        bounds: DiscoveryBounds,
        mode: ScanMode,
        cancel: &CancellationToken,
    ) -> Result<Vec<PageRef>> {
        if mode == ScanMode::Simulate {
            return Ok(synthesize_pages(seed, bounds));
        }

        let seed_normalized = normalize_url(seed);
        let max_pages = bounds.max_pages.max(1) as usize;

        let mut pages = vec![PageRef {
            url: seed_normalized.clone(),
            depth: 0,
            page_type: classify(seed.path(), ""),
            priority: PagePriority::High,
            estimated_elements: None,
        }];
        if max_pages == 1 {
            return Ok(pages);
        }

        let deadline = Instant::now() + self.phase_timeout;
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(seed_normalized.clone());

        // Frontier of pages whose links we still want, with their depth.
        let mut frontier: VecDeque<(Url, u32, usize)> = VecDeque::new();
        frontier.push_back((seed.clone(), 0, 0));
        let mut seed_fetched = false;

        while !frontier.is_empty() && pages.len() < max_pages {
            if cancel.is_cancelled() || Instant::now() >= deadline {
                break;
            }

            // Fetch the whole current batch concurrently, then walk the
            // results in frontier order so the page list stays stable.
            let batch: Vec<(Url, u32, usize)> = frontier.drain(..).collect();
            let mut join: JoinSet<(usize, Option<FetchedPage>)> = JoinSet::new();
            for (slot, (url, _, _)) in batch.iter().cloned().enumerate() {
                let client = self.client.clone();
                let semaphore = Arc::clone(&semaphore);
                let fetch_timeout = self.fetch_timeout;
                let cancel = cancel.clone();
                join.spawn(async move {
                    let _permit = semaphore.acquire_owned().await;
                    let fetched = tokio::select! {
                        f = fetch_page(&client, &url, fetch_timeout) => f,
                        _ = cancel.cancelled() => None,
                    };
                    (slot, fetched)
                });
            }

            let mut fetched: Vec<Option<FetchedPage>> = (0..batch.len()).map(|_| None).collect();
            while let Some(joined) = join.join_next().await {
                if let Ok((slot, result)) = joined {
                    fetched[slot] = result;
                }
                if Instant::now() >= deadline || cancel.is_cancelled() {
                    join.abort_all();
                    break;
                }
            }

            for (slot, (url, depth, page_index)) in batch.iter().enumerate() {
                if cancel.is_cancelled() {
                    break;
                }
                let Some(page) = fetched[slot].take() else {
                    if *depth == 0 && !seed_fetched {
                        return Err(AuditError::Discovery(format!(
                            "seed page {url} could not be fetched"
                        )));
                    }
                    continue;
                };
                if *depth == 0 {
                    seed_fetched = true;
                    pages[0].page_type = classify(url.path(), &page.title);
                    pages[0].estimated_elements = Some(page.element_count);
                } else {
                    pages[*page_index].estimated_elements = Some(page.element_count);
                    pages[*page_index].page_type = classify(url.path(), &page.title);
                }

                let child_depth = depth + 1;
                for link in page.links {
                    if pages.len() >= max_pages {
                        break;
                    }
                    let Some(resolved) = resolve_link(&link, url, seed) else {
                        continue;
                    };
                    let normalized = normalize_url(&resolved);
                    if !visited.insert(normalized.clone()) {
                        continue;
                    }
                    pages.push(PageRef {
                        url: normalized,
                        depth: child_depth,
                        page_type: classify(resolved.path(), ""),
                        priority: PagePriority::for_depth(child_depth),
                        estimated_elements: None,
                    });
                    if child_depth < bounds.max_depth {
                        frontier.push_back((resolved, child_depth, pages.len() - 1));
                    }
                }
            }
        }

        tracing::info!(
            seed = %seed_normalized,
            pages = pages.len(),
            "page discovery finished"
        );
        Ok(pages)
    }
}

/// Fetch one page and extract links, title and a rough element count.
/// Any failure is a `None`: discovery treats unreachable non-seed pages
/// as leaves.
async fn fetch_page(client: &reqwest::Client, url: &Url, timeout: Duration) -> Option<FetchedPage> {
    let response = match tokio::time::timeout(timeout, client.get(url.clone()).send()).await {
        Ok(Ok(r)) => r,
        Ok(Err(e)) => {
            tracing::debug!(url = %url, error = %e, "discovery fetch failed");
            return None;
        }
        Err(_) => {
            tracing::debug!(url = %url, "discovery fetch timed out");
            return None;
        }
    };

    if !response.status().is_success() {
        tracing::debug!(url = %url, status = %response.status(), "discovery fetch non-success");
        return None;
    }

    let body = response.text().await.ok()?;
    Some(extract(&body))
}

/// Parse the HTML and pull out hrefs, title and element count. Purely
/// synchronous so the non-Send DOM never lives across an await point.
fn extract(body: &str) -> FetchedPage {
    let document = Html::parse_document(body);

    let links = document
        .select(&LINK_SELECTOR)
        .filter_map(|a| a.value().attr("href"))
        .map(str::to_string)
        .collect();

    let title = document
        .select(&TITLE_SELECTOR)
        .next()
        .map(|t| t.text().collect::<String>().trim().to_string())
        .unwrap_or_default();

    let element_count = document.select(&ANY_SELECTOR).count() as u32;

    FetchedPage {
        links,
        title,
        element_count,
    }
}

/// Resolve a raw href against its page, keeping only same-host http(s)
/// URLs that are not in the binary/media denylist
fn resolve_link(href: &str, base: &Url, seed: &Url) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    let resolved = base.join(href).ok()?;
    if resolved.scheme() != "http" && resolved.scheme() != "https" {
        return None;
    }
    if !resolved
        .host_str()
        .map(|h| h.eq_ignore_ascii_case(seed.host_str().unwrap_or_default()))
        .unwrap_or(false)
    {
        return None;
    }
    if let Some(extension) = resolved.path().rsplit('.').next() {
        if resolved.path().contains('.')
            && DENYLIST_EXTENSIONS.contains(&extension.to_ascii_lowercase().as_str())
        {
            return None;
        }
    }
    Some(resolved)
}

/// Classify a page from its path and title
fn classify(path: &str, title: &str) -> PageType {
    let path = path.to_ascii_lowercase();
    let title = title.to_ascii_lowercase();

    if path.is_empty() || path == "/" {
        return PageType::Homepage;
    }
    if path.contains("contact") || path.contains("contatti") {
        return PageType::Contact;
    }
    if path.contains("form")
        || path.contains("login")
        || path.contains("register")
        || path.contains("signup")
        || path.contains("checkout")
        || title.contains("form")
        || title.contains("login")
    {
        return PageType::Form;
    }
    if path.contains("about")
        || path.contains("blog")
        || path.contains("news")
        || path.contains("article")
        || path.contains("product")
        || path.contains("service")
        || path.ends_with(".html")
        || path.ends_with(".htm")
        || path.matches('/').count() >= 2
    {
        return PageType::Content;
    }
    PageType::Other
}

/// Offline page list: the seed plus deterministic children, so simulate
/// runs exercise the multi-page path without network access
fn synthesize_pages(seed: &Url, bounds: DiscoveryBounds) -> Vec<PageRef> {
    let seed_normalized = normalize_url(seed);
    let mut pages = vec![PageRef {
        url: seed_normalized,
        depth: 0,
        page_type: classify(seed.path(), ""),
        priority: PagePriority::High,
        estimated_elements: Some(186),
    }];

    for i in 2..=bounds.max_pages.max(1) {
        if bounds.max_depth < 1 {
            break;
        }
        let mut child = seed.clone();
        let path = format!("{}/page-{}", child.path().trim_end_matches('/'), i);
        child.set_path(&path);
        pages.push(PageRef {
            url: normalize_url(&child),
            depth: 1,
            page_type: PageType::Content,
            priority: PagePriority::Medium,
            estimated_elements: Some(120),
        });
    }

    pages
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_link_filters() {
        let seed = Url::parse("https://example.com/").unwrap();
        let base = Url::parse("https://example.com/docs/").unwrap();

        assert!(resolve_link("/about", &base, &seed).is_some());
        assert!(resolve_link("guide.html", &base, &seed).is_some());
        assert!(resolve_link("https://other.example/", &base, &seed).is_none());
        assert!(resolve_link("mailto:team@example.com", &base, &seed).is_none());
        assert!(resolve_link("javascript:void(0)", &base, &seed).is_none());
        assert!(resolve_link("/brochure.pdf", &base, &seed).is_none());
        assert!(resolve_link("/logo.PNG", &base, &seed).is_none());
        assert!(resolve_link("#section", &base, &seed).is_none());
        assert!(resolve_link("", &base, &seed).is_none());
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify("/", ""), PageType::Homepage);
        assert_eq!(classify("", ""), PageType::Homepage);
        assert_eq!(classify("/contatti", ""), PageType::Contact);
        assert_eq!(classify("/contact-us", ""), PageType::Contact);
        assert_eq!(classify("/login", ""), PageType::Form);
        assert_eq!(classify("/checkout/step-1", ""), PageType::Form);
        assert_eq!(classify("/blog/post-1", ""), PageType::Content);
        assert_eq!(classify("/whatever", "My form page"), PageType::Form);
    }

    #[test]
    fn test_extract_links_and_title() {
        let html = r#"<html><head><title> Docs </title></head>
            <body><a href="/a">A</a><a href="/b">B</a><p>text</p></body></html>"#;
        let page = extract(html);
        assert_eq!(page.links, vec!["/a", "/b"]);
        assert_eq!(page.title, "Docs");
        assert!(page.element_count >= 6);
    }

    #[test]
    fn test_synthesized_pages_respect_bounds() {
        let seed = Url::parse("https://simulate.local/home").unwrap();
        let pages = synthesize_pages(&seed, DiscoveryBounds { max_pages: 3, max_depth: 2 });
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0].url, "https://simulate.local/home");
        assert_eq!(pages[1].url, "https://simulate.local/home/page-2");
        assert_eq!(pages[2].url, "https://simulate.local/home/page-3");
        assert_eq!(pages[1].depth, 1);

        let urls: HashSet<_> = pages.iter().map(|p| p.url.clone()).collect();
        assert_eq!(urls.len(), pages.len());
    }

    #[tokio::test]
    async fn test_simulate_discovery_is_offline() {
        let discoverer = PageDiscoverer::new(
            5,
            Duration::from_secs(10),
            Duration::from_secs(60),
        )
        .unwrap();
        let seed = Url::parse("https://simulate.local/home").unwrap();
        let pages = discoverer
            .discover(
                &seed,
                DiscoveryBounds { max_pages: 2, max_depth: 2 },
                ScanMode::Simulate,
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].depth, 0);
    }

    #[tokio::test]
    async fn test_single_page_bound_skips_crawling() {
        let discoverer = PageDiscoverer::new(
            5,
            Duration::from_secs(10),
            Duration::from_secs(60),
        )
        .unwrap();
        // max_pages 1 never touches the network, so an unreachable host
        // is fine here.
        let seed = Url::parse("https://nonexistent.invalid/").unwrap();
        let pages = discoverer
            .discover(
                &seed,
                DiscoveryBounds { max_pages: 1, max_depth: 1 },
                ScanMode::Real,
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].url, "https://nonexistent.invalid/");
    }
}
