//! Content module - loads posts, pages, the home entry and audio excerpts

mod frontmatter;
pub mod loader;
mod markdown;
mod post;
pub mod slug;

use std::path::PathBuf;
use thiserror::Error;

pub use frontmatter::{
    parse_date, AudioExcerptMeta, AudioPlayerRef, BlogPostMeta, FooterCredit, FrontMatter,
    HomeMeta, NavigationItem, PageMeta, SocialLink, SubNavItem,
};
pub use loader::ContentLoader;
pub use markdown::MarkdownRenderer;
pub use post::{AudioExcerpt, ContentItem, Home, Page, Post, SiteContent};
pub use slug::{derive_slug, normalize_slug, ContentType};

/// Errors raised while loading a single content file
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("missing front-matter block")]
    MissingFrontMatter,

    #[error("invalid front-matter: {0}")]
    FrontMatter(#[from] serde_yaml::Error),

    #[error("expected templatekey {expected:?}, found {found:?}")]
    WrongTemplate {
        expected: &'static str,
        found: &'static str,
    },

    #[error("invalid date {0:?}")]
    InvalidDate(String),

    #[error("slug {slug} is derived from both {first:?} and {second:?}")]
    SlugCollision {
        slug: String,
        first: PathBuf,
        second: PathBuf,
    },
}
