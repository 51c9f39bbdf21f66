/// HTML adapters for ufc.com markup.
///
/// - `parse_rankings_page`: a saved rankings page into a `RankingDocument`
/// - `extract_profile_image`: the headshot URL from an athlete profile page
///
/// Extraction is per field: each lookup yields `Field::Found` or
/// `Field::Missing`, and `ParseOptions::strict` decides whether a missing
/// champion field fails the import or falls back to a placeholder.
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use rankings_common::model::{Category, Fighter, RankingDocument};

use crate::error::AppError;

const MISSING_CHAMPION_NAME: &str = "N/A";

/// Result of looking up one field in the markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field<T> {
    Found(T),
    Missing,
}

impl<T> Field<T> {
    pub fn from_option(value: Option<T>) -> Self {
        match value {
            Some(v) => Field::Found(v),
            None => Field::Missing,
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Field::Found(v) => Some(v),
            Field::Missing => None,
        }
    }

    /// Strict: a missing value is a parse error. Lenient: use `fallback`.
    pub fn resolve(
        self,
        strict: bool,
        context: &str,
        field: &'static str,
        fallback: impl FnOnce() -> T,
    ) -> Result<T, AppError> {
        match self {
            Field::Found(v) => Ok(v),
            Field::Missing if strict => Err(AppError::Parse {
                context: context.to_string(),
                field,
            }),
            Field::Missing => {
                debug!(context, field, "field missing, using fallback");
                Ok(fallback())
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Fail on a missing champion name or image instead of substituting.
    pub strict: bool,
    /// Resolves relative `href`s (e.g. "https://www.ufc.com").
    pub base_url: Option<String>,
    /// Prepended to relative image sources; falls back to `base_url`.
    pub image_base: Option<String>,
}

struct Selectors {
    grouping: Selector,
    header: Selector,
    champion: Selector,
    champion_name: Selector,
    img: Selector,
    anchor: Selector,
    row: Selector,
    rank_cell: Selector,
    name_cell: Selector,
    whitespace: Regex,
}

impl Selectors {
    fn new() -> Self {
        let sel = |s: &str| Selector::parse(s).expect("valid selector");
        Self {
            grouping: sel("div.view-grouping"),
            header: sel("div.view-grouping-header"),
            champion: sel("div.rankings--athlete--champion"),
            champion_name: sel("h5"),
            img: sel("img"),
            anchor: sel("a"),
            row: sel("tbody tr"),
            rank_cell: sel("td.views-field-weight-class-rank"),
            name_cell: sel("td.views-field-title"),
            whitespace: Regex::new(r"\s+").expect("valid regex"),
        }
    }

    fn text(&self, el: ElementRef<'_>) -> String {
        let raw: String = el.text().collect();
        self.whitespace.replace_all(raw.trim(), " ").into_owned()
    }

    fn first_text(&self, scope: ElementRef<'_>, selector: &Selector) -> Field<String> {
        Field::from_option(
            scope
                .select(selector)
                .next()
                .map(|el| self.text(el))
                .filter(|t| !t.is_empty()),
        )
    }

    fn first_attr(&self, scope: ElementRef<'_>, selector: &Selector, attr: &str) -> Field<String> {
        Field::from_option(
            scope
                .select(selector)
                .next()
                .and_then(|el| el.value().attr(attr))
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string),
        )
    }
}

/// Parse a saved rankings page. Groupings without a header or champion block
/// are skipped, as are table rows lacking a rank or name cell.
pub fn parse_rankings_page(html: &str, options: &ParseOptions) -> Result<RankingDocument, AppError> {
    let document = Html::parse_document(html);
    let s = Selectors::new();
    let image_base = options.image_base.as_deref().or(options.base_url.as_deref());

    let mut categories = Vec::new();
    for grouping in document.select(&s.grouping) {
        let Field::Found(name) = s.first_text(grouping, &s.header) else {
            debug!("grouping without header, skipped");
            continue;
        };
        let Some(champion_div) = grouping.select(&s.champion).next() else {
            debug!(category = %name, "grouping without champion block, skipped");
            continue;
        };

        let champion_name = s
            .first_text(champion_div, &s.champion_name)
            .resolve(options.strict, &name, "champion name", || MISSING_CHAMPION_NAME.to_string())?;
        let champion_image = s
            .first_attr(champion_div, &s.img, "src")
            .resolve(options.strict, &name, "champion image", String::new)?;
        let champion_link = s.first_attr(champion_div, &s.anchor, "href").into_option();

        let champion = Fighter {
            image: Some(resolve_url(&champion_image, image_base)),
            link: champion_link.map(|l| resolve_url(&l, options.base_url.as_deref())),
            ..Fighter::new(champion_name)
        };

        let mut fighters = Vec::new();
        for row in grouping.select(&s.row) {
            let (Some(rank_td), Some(name_td)) =
                (row.select(&s.rank_cell).next(), row.select(&s.name_cell).next())
            else {
                continue;
            };
            let fighter_name = s.text(name_td);
            if fighter_name.is_empty() {
                continue;
            }
            let link = s.first_attr(name_td, &s.anchor, "href").into_option();
            let image = s.first_attr(row, &s.img, "src").into_option();
            fighters.push(Fighter {
                rank: Some(s.text(rank_td)),
                image: Some(image.map(|i| resolve_url(&i, image_base)).unwrap_or_default()),
                link: link.map(|l| resolve_url(&l, options.base_url.as_deref())),
                ..Fighter::new(fighter_name)
            });
        }

        debug!(category = %name, fighters = fighters.len(), "parsed category");
        categories.push(Category {
            champion: Some(champion),
            fighters,
            ..Category::new(name)
        });
    }

    if categories.is_empty() {
        warn!("no ranking groupings found in page");
    }
    Ok(RankingDocument::new(categories))
}

/// Headshot URL from an athlete profile page, trying the hero image first and
/// then the bio image variants.
pub fn extract_profile_image(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    ["img.hero-profile__image", "img.c-bio__image", "div.c-bio__image > img"]
        .iter()
        .map(|s| Selector::parse(s).expect("valid selector"))
        .find_map(|selector| {
            document
                .select(&selector)
                .filter_map(|img| img.value().attr("src"))
                .map(str::trim)
                .find(|src| !src.is_empty())
                .map(str::to_string)
        })
}

/// Make `raw` absolute against `base` when it is relative. Protocol-relative
/// URLs get `https:`; leading `./` and `/` are dropped before joining.
pub fn resolve_url(raw: &str, base: Option<&str>) -> String {
    if raw.is_empty() || raw.starts_with("http://") || raw.starts_with("https://") {
        return raw.to_string();
    }
    if let Some(rest) = raw.strip_prefix("//") {
        return format!("https://{rest}");
    }
    match base {
        Some(base) => format!(
            "{}/{}",
            base.trim_end_matches('/'),
            raw.trim_start_matches(['.', '/'])
        ),
        None => raw.to_string(),
    }
}
