use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use rankings_common::matcher::{ExactMatch, NameMatcher, NormalizedMatch};

use crate::parser::ParseOptions;
use crate::update::Patch;

#[derive(Parser, Debug)]
#[command(
    name = "ufc-rankings",
    version,
    about = "Patch a UFC rankings JSON document",
    arg_required_else_help = true
)]
pub struct Cli {
    /// Rankings document (default: $RANKINGS_PATH).
    #[arg(long, global = true, value_name = "PATH")]
    pub document: Option<PathBuf>,

    /// Write the result here instead of back to the document.
    #[arg(long, global = true, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// How fighter names are compared across sources.
    #[arg(long = "match", global = true, value_enum, default_value_t = MatchMode::Exact)]
    pub match_mode: MatchMode,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Byte-for-byte equal names.
    Exact,
    /// Equal after Unicode NFC and whitespace collapsing.
    Normalized,
}

impl MatchMode {
    pub fn matcher(self) -> Box<dyn NameMatcher> {
        match self {
            MatchMode::Exact => Box::new(ExactMatch),
            MatchMode::Normalized => Box::new(NormalizedMatch),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the document from a saved rankings page.
    Import {
        /// Saved HTML of the rankings page.
        #[arg(long, value_name = "FILE")]
        html: PathBuf,
        /// Fail when a champion's name or image is missing.
        #[arg(long)]
        strict: bool,
        /// Base URL for relative athlete links.
        #[arg(long, value_name = "URL")]
        base_url: Option<String>,
        /// Prefix for relative image sources (defaults to --base-url).
        #[arg(long, value_name = "URL")]
        image_base: Option<String>,
    },

    /// Replace details of fighters in one category from a JSON table.
    MergeDetails {
        #[arg(long)]
        category: String,
        /// JSON object: fighter name -> details record.
        #[arg(long, value_name = "FILE")]
        details: PathBuf,
    },

    /// Set the image of every entry with the given name.
    MergeImage {
        #[arg(long)]
        name: String,
        #[arg(long)]
        url: String,
    },

    /// Set images from a JSON table (fighter name -> image URL).
    MergeImages {
        #[arg(long, value_name = "FILE")]
        table: PathBuf,
        /// Only touch this category.
        #[arg(long)]
        category: Option<String>,
    },

    /// Set the champion image of one category.
    SetChampionImage {
        #[arg(long)]
        category: String,
        #[arg(long)]
        url: String,
    },

    /// Copy champion images onto every appearance of the champion.
    PropagateChampionImages,

    /// Point champion images at PREFIX + file name.
    RewriteImagePaths {
        #[arg(long, default_value = "/images/rankings/")]
        prefix: String,
    },

    /// Fetch headshots for ranked fighters that have none.
    FillMissingImages,

    /// Look champions and fighters up by name on the site search.
    FillImagesByName {
        /// Only touch this category.
        #[arg(long)]
        category: Option<String>,
        /// Skip entries that already have an image.
        #[arg(long)]
        missing_only: bool,
    },
}

impl Command {
    pub fn into_patch(self) -> Patch {
        match self {
            Command::Import {
                html,
                strict,
                base_url,
                image_base,
            } => Patch::Import {
                html_path: html,
                options: ParseOptions {
                    strict,
                    base_url,
                    image_base,
                },
            },
            Command::MergeDetails { category, details } => Patch::MergeDetails {
                category,
                table_path: details,
            },
            Command::MergeImage { name, url } => Patch::MergeImage { name, url },
            Command::MergeImages { table, category } => Patch::MergeImages {
                table_path: table,
                category,
            },
            Command::SetChampionImage { category, url } => Patch::SetChampionImage { category, url },
            Command::PropagateChampionImages => Patch::PropagateChampionImages,
            Command::RewriteImagePaths { prefix } => Patch::RewriteImagePaths { prefix },
            Command::FillMissingImages => Patch::FillMissingImages,
            Command::FillImagesByName {
                category,
                missing_only,
            } => Patch::FillImagesByName {
                category,
                missing_only,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_merge_image_with_globals() {
        let cli = Cli::try_parse_from([
            "ufc-rankings",
            "merge-image",
            "--name",
            "Shavkat Rakhmonov",
            "--url",
            "https://ufc.com/images/RAKHMONOV.png",
            "--document",
            "rankings.json",
            "--match",
            "normalized",
        ])
        .unwrap();
        assert_eq!(cli.document, Some(PathBuf::from("rankings.json")));
        assert_eq!(cli.match_mode, MatchMode::Normalized);
        match cli.command.into_patch() {
            Patch::MergeImage { name, url } => {
                assert_eq!(name, "Shavkat Rakhmonov");
                assert_eq!(url, "https://ufc.com/images/RAKHMONOV.png");
            }
            other => panic!("unexpected patch {other:?}"),
        }
    }

    #[test]
    fn rewrite_prefix_default() {
        let cli = Cli::try_parse_from(["ufc-rankings", "rewrite-image-paths"]).unwrap();
        assert_eq!(cli.match_mode, MatchMode::Exact);
        assert!(matches!(
            cli.command.into_patch(),
            Patch::RewriteImagePaths { prefix } if prefix == "/images/rankings/"
        ));
    }

    #[test]
    fn merge_details_requires_category() {
        assert!(Cli::try_parse_from(["ufc-rankings", "merge-details", "--details", "d.json"]).is_err());
    }

    #[test]
    fn fill_images_by_name_flags() {
        let cli = Cli::try_parse_from([
            "ufc-rankings",
            "fill-images-by-name",
            "--category",
            "페더급",
            "--missing-only",
        ])
        .unwrap();
        assert!(matches!(
            cli.command.into_patch(),
            Patch::FillImagesByName { category: Some(c), missing_only: true } if c == "페더급"
        ));
    }
}
