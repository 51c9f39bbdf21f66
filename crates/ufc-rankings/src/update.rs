/// Patch pipeline: load the rankings document, apply one patch, persist.
///
/// Import is the exception: it builds a fresh document from a saved rankings
/// page instead of loading the existing one.
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::{info, warn};

use rankings_common::fetch::ImageFetcher;
use rankings_common::http::HttpClient;
use rankings_common::matcher::NameMatcher;
use rankings_common::model::{FighterDetails, RankingDocument};
use rankings_common::reconcile::Reconciler;
use rankings_common::store::{self, RankingStore};

use crate::config::Config;
use crate::error::AppError;
use crate::fetch::ProfileImageFetcher;
use crate::parser::{self, ParseOptions};

#[derive(Debug, Clone)]
pub enum Patch {
    Import { html_path: PathBuf, options: ParseOptions },
    MergeDetails { category: String, table_path: PathBuf },
    MergeImage { name: String, url: String },
    MergeImages { table_path: PathBuf, category: Option<String> },
    SetChampionImage { category: String, url: String },
    PropagateChampionImages,
    RewriteImagePaths { prefix: String },
    FillMissingImages,
    FillImagesByName { category: Option<String>, missing_only: bool },
}

impl Patch {
    pub fn name(&self) -> &'static str {
        match self {
            Patch::Import { .. } => "import",
            Patch::MergeDetails { .. } => "merge-details",
            Patch::MergeImage { .. } => "merge-image",
            Patch::MergeImages { .. } => "merge-images",
            Patch::SetChampionImage { .. } => "set-champion-image",
            Patch::PropagateChampionImages => "propagate-champion-images",
            Patch::RewriteImagePaths { .. } => "rewrite-image-paths",
            Patch::FillMissingImages => "fill-missing-images",
            Patch::FillImagesByName { .. } => "fill-images-by-name",
        }
    }
}

/// Result of one patch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchResult {
    /// Entries the patch changed (categories, for import).
    pub changed: usize,
    /// Where the document was written, if it was.
    pub written_to: Option<PathBuf>,
}

/// What a patch did to the in-memory document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Applied {
    pub changed: usize,
    /// `false` when the patch found nothing to act on and the file should be
    /// left alone.
    pub persist: bool,
}

pub struct PatchService {
    config: Config,
    output: Option<PathBuf>,
    matcher: Box<dyn NameMatcher>,
    fetcher: Option<Box<dyn ImageFetcher>>,
}

impl PatchService {
    /// `fetcher` overrides the HTTP profile fetcher used by the fill patches.
    pub fn new(
        config: Config,
        output: Option<PathBuf>,
        matcher: Box<dyn NameMatcher>,
        fetcher: Option<Box<dyn ImageFetcher>>,
    ) -> Self {
        Self {
            config,
            output,
            matcher,
            fetcher,
        }
    }

    fn output_path(&self) -> &Path {
        self.output.as_deref().unwrap_or(&self.config.document_path)
    }

    pub async fn run(&self, patch: Patch) -> Result<PatchResult, AppError> {
        info!(patch = patch.name(), document = %self.config.document_path.display(), "running patch");

        let mut doc = match &patch {
            Patch::Import { html_path, options } => {
                let html = read_file(html_path)?;
                let doc = parser::parse_rankings_page(&html, options)?;
                info!(
                    categories = doc.categories.len(),
                    fighters = doc.fighter_count(),
                    "parsed rankings page"
                );
                doc
            }
            _ => RankingStore::new(&self.config.document_path).load()?,
        };

        let applied = match &patch {
            Patch::Import { .. } => Applied {
                changed: doc.categories.len(),
                persist: true,
            },
            other => self.apply(&mut doc, other).await?,
        };

        if !applied.persist {
            info!(patch = patch.name(), "nothing matched, document left unchanged");
            return Ok(PatchResult {
                changed: 0,
                written_to: None,
            });
        }

        let out = self.output_path();
        store::save_to(out, &doc)?;
        info!(path = %out.display(), changed = applied.changed, "rankings document written");
        Ok(PatchResult {
            changed: applied.changed,
            written_to: Some(out.to_path_buf()),
        })
    }

    /// Apply a document patch in memory. `Import` is rejected here since it
    /// does not operate on an existing document.
    pub async fn apply(&self, doc: &mut RankingDocument, patch: &Patch) -> Result<Applied, AppError> {
        let reconciler = Reconciler::new(self.matcher.as_ref());
        let applied = match patch {
            Patch::Import { .. } => {
                return Err(AppError::Config("import cannot be applied to a loaded document".into()))
            }
            Patch::MergeDetails {
                category,
                table_path,
            } => {
                let table: Vec<(String, FighterDetails)> = read_table(table_path)?;
                changed(reconciler.merge_details(doc, category, &table))
            }
            Patch::MergeImage { name, url } => {
                let updated = reconciler.merge_image(doc, name, url);
                Applied {
                    changed: usize::from(updated),
                    persist: updated,
                }
            }
            Patch::MergeImages {
                table_path,
                category,
            } => {
                let table: Vec<(String, String)> = read_table(table_path)?;
                changed(reconciler.merge_images(doc, &table, category.as_deref()))
            }
            Patch::SetChampionImage { category, url } => {
                let updated = reconciler.set_champion_image(doc, category, url);
                Applied {
                    changed: usize::from(updated),
                    persist: updated,
                }
            }
            Patch::PropagateChampionImages => changed(reconciler.propagate_champion_images(doc)),
            Patch::RewriteImagePaths { prefix } => changed(reconciler.rewrite_image_paths(doc, prefix)),
            Patch::FillMissingImages | Patch::FillImagesByName { .. } => {
                let built;
                let fetcher: &dyn ImageFetcher = match &self.fetcher {
                    Some(fetcher) => fetcher.as_ref(),
                    None => {
                        let client = HttpClient::new(self.config.http.clone())?;
                        built = ProfileImageFetcher::new(client, self.config.base_url.clone());
                        &built
                    }
                };
                let report = match patch {
                    Patch::FillImagesByName {
                        category,
                        missing_only,
                    } => {
                        reconciler
                            .fill_images_by_name(doc, fetcher, category.as_deref(), *missing_only)
                            .await
                    }
                    _ => reconciler.fill_missing_fighter_images(doc, fetcher).await,
                };
                if report.failed > 0 {
                    warn!(failed = report.failed, "some images could not be fetched");
                }
                changed(report.filled)
            }
        };
        Ok(applied)
    }
}

fn changed(n: usize) -> Applied {
    Applied {
        changed: n,
        persist: true,
    }
}

fn read_file(path: &Path) -> Result<String, AppError> {
    std::fs::read_to_string(path).map_err(|e| AppError::Input {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Read a JSON object keyed by fighter name, keeping the file's row order.
fn read_table<T: DeserializeOwned>(path: &Path) -> Result<Vec<(String, T)>, AppError> {
    let invalid = |e: serde_json::Error| AppError::Input {
        path: path.display().to_string(),
        message: e.to_string(),
    };
    let content = read_file(path)?;
    let rows: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&content).map_err(invalid)?;
    rows.into_iter()
        .map(|(name, value)| serde_json::from_value(value).map(|row| (name, row)).map_err(invalid))
        .collect()
}

#[cfg(test)]
mod tests {
    use futures::future::BoxFuture;
    use futures::FutureExt;

    use rankings_common::error::CommonError;
    use rankings_common::matcher::ExactMatch;

    use super::*;

    const DOC: &str = r#"[
  {
    "category": "밴텀급",
    "champion": {
      "name": "Merab Dvalishvili",
      "image": "C:/Users/me/ufc 랭커 데이터/files/merab.png"
    },
    "fighters": [
      {
        "rank": "1",
        "name": "Sean O'Malley",
        "image": "",
        "link": "https://www.ufc.com/athlete/sean-omalley",
        "flag": "us"
      },
      {
        "rank": "2",
        "name": "Umar Nurmagomedov",
        "image": "",
        "link": "https://www.ufc.com/athlete/umar-nurmagomedov"
      }
    ]
  }
]"#;

    struct Fixture {
        dir: tempfile::TempDir,
        service: PatchService,
    }

    impl Fixture {
        fn new() -> Self {
            Self::build(None, None)
        }

        fn with_output(output: &str) -> Self {
            Self::build(Some(output), None)
        }

        fn with_fetcher(fetcher: Box<dyn ImageFetcher>) -> Self {
            Self::build(None, Some(fetcher))
        }

        fn build(output: Option<&str>, fetcher: Option<Box<dyn ImageFetcher>>) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let doc_path = dir.path().join("rankings.json");
            std::fs::write(&doc_path, DOC).unwrap();
            let config = Config::from_lookup(Some(doc_path), |_| None).unwrap();
            let output = output.map(|o| dir.path().join(o));
            let service = PatchService::new(config, output, Box::new(ExactMatch), fetcher);
            Self { dir, service }
        }

        fn path(&self, name: &str) -> PathBuf {
            self.dir.path().join(name)
        }

        fn read(&self, name: &str) -> String {
            std::fs::read_to_string(self.path(name)).unwrap()
        }

        fn write(&self, name: &str, content: &str) -> PathBuf {
            let p = self.path(name);
            std::fs::write(&p, content).unwrap();
            p
        }
    }

    #[tokio::test]
    async fn merge_details_from_table_file() {
        let fx = Fixture::new();
        let table = fx.write(
            "details.json",
            r#"{ "Sean O'Malley": { "record": "18-3-0", "age": "30", "leg_reach": "40.00" } }"#,
        );
        let result = fx
            .service
            .run(Patch::MergeDetails {
                category: "밴텀급".into(),
                table_path: table,
            })
            .await
            .unwrap();
        assert_eq!(result.changed, 1);

        let out: serde_json::Value = serde_json::from_str(&fx.read("rankings.json")).unwrap();
        let omalley = &out[0]["fighters"][0];
        assert_eq!(omalley["details"]["leg_reach"], "40.00");
        assert_eq!(omalley["flag"], "us");
        assert!(out[0]["fighters"][1].get("details").is_none());
    }

    #[tokio::test]
    async fn merge_image_miss_does_not_rewrite() {
        let fx = Fixture::new();
        // Reformat on disk so any rewrite would be detectable.
        let compact = serde_json::to_string(&serde_json::from_str::<serde_json::Value>(DOC).unwrap()).unwrap();
        fx.write("rankings.json", &compact);

        let result = fx
            .service
            .run(Patch::MergeImage {
                name: "Shavkat Rakhmonov".into(),
                url: "https://cdn/s.png".into(),
            })
            .await
            .unwrap();
        assert_eq!(result.written_to, None);
        assert_eq!(fx.read("rankings.json"), compact);
    }

    #[tokio::test]
    async fn rewrite_paths_to_separate_output() {
        let fx = Fixture::with_output("frontend.json");
        let result = fx
            .service
            .run(Patch::RewriteImagePaths {
                prefix: "/images/rankings/".into(),
            })
            .await
            .unwrap();
        assert_eq!(result.written_to, Some(fx.path("frontend.json")));
        assert_eq!(fx.read("rankings.json"), DOC);

        let out: serde_json::Value = serde_json::from_str(&fx.read("frontend.json")).unwrap();
        assert_eq!(out[0]["champion"]["image"], "/images/rankings/merab.png");
    }

    #[tokio::test]
    async fn import_writes_parsed_page() {
        let fx = Fixture::new();
        let html = fx.write(
            "page.html",
            r#"<div class="view-grouping">
                 <div class="view-grouping-header">헤비급</div>
                 <div class="rankings--athlete--champion"><h5>Jon Jones</h5><img src="jones.png"></div>
                 <table><tbody><tr>
                   <td class="views-field-weight-class-rank">1</td>
                   <td class="views-field-title">Tom Aspinall</td>
                 </tr></tbody></table>
               </div>"#,
        );
        let result = fx
            .service
            .run(Patch::Import {
                html_path: html,
                options: ParseOptions::default(),
            })
            .await
            .unwrap();
        assert_eq!(result.changed, 1);

        let written = fx.read("rankings.json");
        assert!(written.contains("\"category\": \"헤비급\""));
        let doc: RankingDocument = serde_json::from_str(&written).unwrap();
        assert_eq!(doc.categories[0].fighters[0].name, "Tom Aspinall");
    }

    #[tokio::test]
    async fn missing_document_is_reported() {
        let fx = Fixture::new();
        std::fs::remove_file(fx.path("rankings.json")).unwrap();
        let err = fx.service.run(Patch::PropagateChampionImages).await.unwrap_err();
        assert!(matches!(err, AppError::Common(CommonError::DocumentNotFound(_))));
    }

    struct OnlyUmar;

    impl ImageFetcher for OnlyUmar {
        fn fetch_image<'a>(&'a self, link: &'a str) -> BoxFuture<'a, Result<Option<String>, CommonError>> {
            async move {
                if link.ends_with("umar-nurmagomedov") {
                    Ok(Some("https://cdn/umar.png".to_string()))
                } else {
                    Err(CommonError::Upstream {
                        status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
                        url: link.to_string(),
                    })
                }
            }
            .boxed()
        }
    }

    #[tokio::test]
    async fn fill_missing_images_with_injected_fetcher() {
        let fx = Fixture::with_fetcher(Box::new(OnlyUmar));

        let result = fx.service.run(Patch::FillMissingImages).await.unwrap();
        assert_eq!(result.changed, 1);

        let doc: RankingDocument = serde_json::from_str(&fx.read("rankings.json")).unwrap();
        assert_eq!(doc.categories[0].fighters[0].image_str(), "");
        assert_eq!(doc.categories[0].fighters[1].image_str(), "https://cdn/umar.png");
    }

    #[tokio::test]
    async fn bad_table_is_reported() {
        let fx = Fixture::new();
        let table = fx.write("images.json", "[1, 2, 3]");
        let err = fx
            .service
            .run(Patch::MergeImages {
                table_path: table,
                category: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Input { .. }));
    }

    #[test]
    fn table_rows_keep_file_order() {
        let fx = Fixture::new();
        let table = fx.write(
            "images.json",
            r#"{ "Petr Yan": "https://cdn/yan.png", "Aljamain Sterling": "https://cdn/aljo.png", "Cory Sandhagen": "https://cdn/cory.png" }"#,
        );
        let rows: Vec<(String, String)> = read_table(&table).unwrap();
        let names: Vec<&str> = rows.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["Petr Yan", "Aljamain Sterling", "Cory Sandhagen"]);
    }

    struct SearchByName;

    impl ImageFetcher for SearchByName {
        fn fetch_image<'a>(&'a self, _link: &'a str) -> BoxFuture<'a, Result<Option<String>, CommonError>> {
            async { Ok(None) }.boxed()
        }

        fn search_image<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Option<String>, CommonError>> {
            async move {
                Ok((name == "Merab Dvalishvili").then(|| "https://cdn/merab-hero.png".to_string()))
            }
            .boxed()
        }
    }

    #[tokio::test]
    async fn fill_images_by_name_updates_champion_without_link() {
        let fx = Fixture::with_fetcher(Box::new(SearchByName));

        let result = fx
            .service
            .run(Patch::FillImagesByName {
                category: Some("밴텀급".into()),
                missing_only: false,
            })
            .await
            .unwrap();
        assert_eq!(result.changed, 1);

        let doc: RankingDocument = serde_json::from_str(&fx.read("rankings.json")).unwrap();
        let bw = &doc.categories[0];
        assert_eq!(bw.champion.as_ref().unwrap().image_str(), "https://cdn/merab-hero.png");
        assert_eq!(bw.fighters[0].image_str(), "");
    }

    #[tokio::test]
    async fn null_image_stays_null_on_rewrite() {
        let fx = Fixture::new();
        fx.write(
            "rankings.json",
            r#"[{"category":"Vacant","champion":null,"fighters":[{"rank":"1","name":"Ilia Topuria","image":null,"details":null}]}]"#,
        );
        fx.service
            .run(Patch::RewriteImagePaths {
                prefix: "/images/rankings/".into(),
            })
            .await
            .unwrap();

        let out: serde_json::Value = serde_json::from_str(&fx.read("rankings.json")).unwrap();
        assert_eq!(out[0].as_object().unwrap().get("champion"), Some(&serde_json::Value::Null));
        let fighter = out[0]["fighters"][0].as_object().unwrap();
        assert_eq!(fighter.get("image"), Some(&serde_json::Value::Null));
        assert_eq!(fighter.get("details"), Some(&serde_json::Value::Null));
    }
}
