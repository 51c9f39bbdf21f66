/// Patch operations over a `RankingDocument`.
///
/// Each operation mutates the document in place, touches only the fields it
/// names, and never reorders categories or fighters. Fighters are joined by
/// name through the reconciler's `NameMatcher` (exact string equality unless
/// configured otherwise).
use tracing::{debug, info, warn};

use crate::error::CommonError;
use crate::fetch::ImageFetcher;
use crate::matcher::{ExactMatch, NameIndex, NameMatcher};
use crate::model::{Fighter, FighterDetails, RankingDocument};

/// Outcome of `fill_missing_fighter_images` and `fill_images_by_name`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FillReport {
    /// Entries handed to the fetcher.
    pub attempted: usize,
    pub filled: usize,
    /// Fetcher answered but found nothing.
    pub not_found: usize,
    /// Fetcher returned an error; the fighter was skipped.
    pub failed: usize,
}

impl FillReport {
    fn record(&mut self, fighter: &mut Fighter, result: Result<Option<String>, CommonError>) {
        match result {
            Ok(Some(url)) if !url.is_empty() => {
                info!(fighter = %fighter.name, image = %url, "found image");
                fighter.image = Some(url);
                self.filled += 1;
            }
            Ok(_) => {
                info!(fighter = %fighter.name, "image not found");
                self.not_found += 1;
            }
            Err(e) => {
                warn!(fighter = %fighter.name, error = %e, "image fetch failed, skipping");
                self.failed += 1;
            }
        }
    }
}

pub struct Reconciler<'m> {
    matcher: &'m dyn NameMatcher,
}

impl Default for Reconciler<'static> {
    fn default() -> Self {
        Self::new(&ExactMatch)
    }
}

impl<'m> Reconciler<'m> {
    pub fn new(matcher: &'m dyn NameMatcher) -> Self {
        Self { matcher }
    }

    /// Replace `details` wholesale on every fighter of `category` named in the
    /// table. Returns the number of fighters updated; an unknown category is a
    /// no-op. When two rows share a match key the later row wins.
    pub fn merge_details(
        &self,
        doc: &mut RankingDocument,
        category: &str,
        details: &[(String, FighterDetails)],
    ) -> usize {
        let Some(cat) = doc.category_mut(category) else {
            warn!(category, "category not found, details not merged");
            return 0;
        };
        let index = NameIndex::build(self.matcher, details.iter().map(|(k, v)| (k, v)));

        let mut updated = 0;
        for fighter in cat.fighters.iter_mut() {
            if let Some(d) = index.get(&fighter.name) {
                fighter.details = Some((*d).clone());
                updated += 1;
            }
        }
        info!(category, updated, table = details.len(), "merged fighter details");
        updated
    }

    /// Set `image_url` on every champion and ranked entry named `target`, in
    /// every category. Returns `true` iff at least one entry matched.
    pub fn merge_image(&self, doc: &mut RankingDocument, target: &str, image_url: &str) -> bool {
        let mut matched = 0;
        for cat in doc.categories.iter_mut() {
            if let Some(champion) = cat.champion.as_mut() {
                if self.matcher.matches(&champion.name, target) {
                    champion.image = Some(image_url.to_string());
                    matched += 1;
                }
            }
            for fighter in cat.fighters.iter_mut() {
                if self.matcher.matches(&fighter.name, target) {
                    fighter.image = Some(image_url.to_string());
                    matched += 1;
                }
            }
        }
        if matched == 0 {
            warn!(fighter = target, "fighter not found in rankings");
        } else {
            info!(fighter = target, entries = matched, "merged image");
        }
        matched > 0
    }

    /// Bulk form of `merge_image`, optionally restricted to one category.
    /// Returns the number of entries set.
    pub fn merge_images(
        &self,
        doc: &mut RankingDocument,
        images: &[(String, String)],
        scope: Option<&str>,
    ) -> usize {
        let index = NameIndex::build(self.matcher, images.iter().map(|(k, v)| (k, v)));
        let mut matched = 0;
        for cat in doc.categories.iter_mut() {
            if scope.is_some_and(|s| s != cat.name) {
                continue;
            }
            let entries = cat.champion.iter_mut().chain(cat.fighters.iter_mut());
            for fighter in entries {
                if let Some(url) = index.get(&fighter.name) {
                    fighter.image = Some((*url).clone());
                    matched += 1;
                }
            }
        }
        info!(
            entries = matched,
            table = images.len(),
            scope = scope.unwrap_or("*"),
            "merged image table"
        );
        matched
    }

    /// Set the champion image of a single category. Returns `false` when the
    /// category or its champion is missing.
    pub fn set_champion_image(&self, doc: &mut RankingDocument, category: &str, image_url: &str) -> bool {
        let Some(champion) = doc.category_mut(category).and_then(|c| c.champion.as_mut()) else {
            warn!(category, "category or champion not found");
            return false;
        };
        info!(category, champion = %champion.name, "set champion image");
        champion.image = Some(image_url.to_string());
        true
    }

    /// Copy every champion's image onto all appearances of that champion,
    /// including ranked lists of other categories. Returns the number of
    /// entries whose image changed.
    ///
    /// If two categories crown champions with the same name, the later
    /// category's image is the one propagated.
    pub fn propagate_champion_images(&self, doc: &mut RankingDocument) -> usize {
        let mut pairs: Vec<(String, String)> = Vec::new();
        for cat in &doc.categories {
            let Some(champion) = cat.champion.as_ref() else { continue };
            if champion.name.is_empty() || !champion.has_image() {
                continue;
            }
            if let Some((_, earlier)) = pairs.iter().find(|(n, _)| self.matcher.matches(n, &champion.name)) {
                if earlier != champion.image_str() {
                    warn!(
                        champion = %champion.name,
                        category = %cat.name,
                        "champion name appears in several categories, later image wins"
                    );
                }
            }
            pairs.push((champion.name.clone(), champion.image_str().to_string()));
        }
        let index = NameIndex::build(self.matcher, pairs);

        let mut changed = 0;
        for cat in doc.categories.iter_mut() {
            let entries = cat.champion.iter_mut().chain(cat.fighters.iter_mut());
            for fighter in entries {
                if let Some(img) = index.get(&fighter.name) {
                    if fighter.image.as_deref() != Some(img.as_str()) {
                        fighter.image = Some(img.clone());
                        changed += 1;
                    }
                }
            }
        }
        info!(champions = index.len(), changed, "propagated champion images");
        changed
    }

    /// Point every non-empty champion image at `prefix` + its file name.
    /// Ranked-list images are deliberately left as they are.
    pub fn rewrite_image_paths(&self, doc: &mut RankingDocument, prefix: &str) -> usize {
        let mut rewritten = 0;
        for cat in doc.categories.iter_mut() {
            let Some(champion) = cat.champion.as_mut() else { continue };
            if !champion.has_image() {
                continue;
            }
            let new_path = format!("{prefix}{}", basename(champion.image_str()));
            debug!(category = %cat.name, from = champion.image_str(), to = %new_path, "rewrite");
            champion.image = Some(new_path);
            rewritten += 1;
        }
        info!(prefix, rewritten, "rewrote champion image paths");
        rewritten
    }

    /// Ask `fetcher` for an image for each ranked fighter without one, one
    /// fighter at a time in document order. Failures skip that fighter only.
    pub async fn fill_missing_fighter_images(
        &self,
        doc: &mut RankingDocument,
        fetcher: &dyn ImageFetcher,
    ) -> FillReport {
        let mut report = FillReport::default();
        for cat in doc.categories.iter_mut() {
            for fighter in cat.fighters.iter_mut() {
                if fighter.has_image() {
                    continue;
                }
                report.attempted += 1;
                debug!(fighter = %fighter.name, link = fighter.link_str(), "fetching image");
                let result = fetcher.fetch_image(fighter.link_str()).await;
                report.record(fighter, result);
            }
        }
        info!(
            attempted = report.attempted,
            filled = report.filled,
            not_found = report.not_found,
            failed = report.failed,
            "filled missing fighter images"
        );
        report
    }

    /// Look champions and ranked fighters up by name through
    /// `fetcher.search_image`, within one category when `scope` is given, and
    /// set the image whenever the lookup finds one. With `missing_only`,
    /// entries that already have an image are not looked up.
    pub async fn fill_images_by_name(
        &self,
        doc: &mut RankingDocument,
        fetcher: &dyn ImageFetcher,
        scope: Option<&str>,
        missing_only: bool,
    ) -> FillReport {
        let mut report = FillReport::default();
        for cat in doc.categories.iter_mut() {
            if scope.is_some_and(|s| s != cat.name) {
                continue;
            }
            let entries = cat.champion.iter_mut().chain(cat.fighters.iter_mut());
            for fighter in entries {
                if fighter.name.is_empty() || (missing_only && fighter.has_image()) {
                    continue;
                }
                report.attempted += 1;
                debug!(fighter = %fighter.name, "searching image by name");
                let result = fetcher.search_image(&fighter.name).await;
                report.record(fighter, result);
            }
        }
        info!(
            attempted = report.attempted,
            filled = report.filled,
            not_found = report.not_found,
            failed = report.failed,
            scope = scope.unwrap_or("*"),
            "filled images by name"
        );
        report
    }
}

/// Final path component, accepting both `/` and `\` separators.
fn basename(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}
