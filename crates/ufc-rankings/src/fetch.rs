/// `ImageFetcher` backed by ufc.com athlete profile pages.
///
/// Links are fetched directly. Name lookups go through the site search, which
/// redirects to the athlete page on an exact hit.
use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::debug;

use rankings_common::error::CommonError;
use rankings_common::fetch::ImageFetcher;
use rankings_common::http::HttpClient;

use crate::parser::{extract_profile_image, resolve_url};

pub struct ProfileImageFetcher {
    client: HttpClient,
    base_url: String,
}

impl ProfileImageFetcher {
    pub fn new(client: HttpClient, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    async fn fetch(&self, link: &str) -> Result<Option<String>, CommonError> {
        if link.trim().is_empty() {
            debug!("no profile link, nothing to fetch");
            return Ok(None);
        }
        let url = resolve_url(link.trim(), Some(&self.base_url));
        let (body, final_url) = self.client.get_text(&url).await?;
        let image = extract_profile_image(&body).map(|src| resolve_url(&src, Some(&self.base_url)));
        debug!(url = %final_url, found = image.is_some(), "profile page parsed");
        Ok(image)
    }

    async fn search(&self, name: &str) -> Result<Option<String>, CommonError> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(None);
        }
        let search_url = format!("{}/search", self.base_url);
        let (body, final_url) = self
            .client
            .get_text_with_query(&search_url, &[("query", name)])
            .await?;
        let image = image_from_search(&body, &final_url, &self.base_url);
        debug!(fighter = name, url = %final_url, found = image.is_some(), "search parsed");
        Ok(image)
    }
}

/// A search that landed on an athlete page yields that page's headshot; a
/// results listing yields nothing.
fn image_from_search(body: &str, final_url: &str, base_url: &str) -> Option<String> {
    if !final_url.contains("/athlete/") {
        return None;
    }
    extract_profile_image(body).map(|src| resolve_url(&src, Some(base_url)))
}

impl ImageFetcher for ProfileImageFetcher {
    fn fetch_image<'a>(&'a self, link: &'a str) -> BoxFuture<'a, Result<Option<String>, CommonError>> {
        self.fetch(link).boxed()
    }

    fn search_image<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Option<String>, CommonError>> {
        self.search(name).boxed()
    }
}
