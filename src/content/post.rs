//! Content item models

use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use std::path::PathBuf;

use super::{AudioExcerptMeta, BlogPostMeta, ContentType, HomeMeta, PageMeta};

/// A blog post
#[derive(Debug, Clone, Serialize)]
pub struct Post {
    /// Derived slug, e.g. `/blog/new-year`
    pub slug: String,

    pub meta: BlogPostMeta,

    /// Publication date parsed from the front-matter
    pub date: DateTime<FixedOffset>,

    /// Raw markdown body
    pub raw: String,

    /// Rendered HTML body
    pub content: String,

    /// Text before `<!-- more -->`, else the description, else empty
    pub excerpt: String,

    /// Estimated minutes to read
    pub reading_time: u32,

    /// Date formatted for display, e.g. `January 2, 2021`
    pub formatted_date: String,

    /// Directory of the source file relative to the blog root
    pub image_base_path: String,

    /// Source file path (relative to the content root)
    pub source: String,

    /// Full source file path
    pub full_source: PathBuf,
}

impl Post {
    pub fn title(&self) -> &str {
        &self.meta.title
    }

    /// Slug without the `/blog/` prefix
    pub fn short_slug(&self) -> &str {
        self.slug.trim_start_matches("/blog/")
    }

    /// The newer neighbour in a newest-first list
    pub fn prev<'a>(&self, posts: &'a [Post]) -> Option<&'a Post> {
        let pos = posts.iter().position(|p| p.slug == self.slug)?;
        if pos > 0 {
            Some(&posts[pos - 1])
        } else {
            None
        }
    }

    /// The older neighbour in a newest-first list
    pub fn next<'a>(&self, posts: &'a [Post]) -> Option<&'a Post> {
        let pos = posts.iter().position(|p| p.slug == self.slug)?;
        posts.get(pos + 1)
    }
}

/// A standalone page
#[derive(Debug, Clone, Serialize)]
pub struct Page {
    /// Derived slug, e.g. `/about` or `/coaching/groups`
    pub slug: String,
    pub meta: PageMeta,
    pub raw: String,
    pub content: String,
    pub source: String,
    pub full_source: PathBuf,
}

impl Page {
    pub fn title(&self) -> &str {
        &self.meta.title
    }
}

/// The home entry; its front-matter also carries site navigation and footer
#[derive(Debug, Clone, Serialize)]
pub struct Home {
    pub meta: HomeMeta,
    pub raw: String,
    pub content: String,
    pub source: String,
    pub full_source: PathBuf,
}

impl Home {
    pub fn slug(&self) -> &'static str {
        "/"
    }
}

/// A published audio clip that pages and posts can embed
#[derive(Debug, Clone, Serialize)]
pub struct AudioExcerpt {
    /// File stem of the excerpt's markdown file
    pub slug: String,
    pub meta: AudioExcerptMeta,
    pub source: String,
    pub full_source: PathBuf,
}

/// Any loaded content item
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentItem {
    Post(Post),
    Page(Page),
    Home(Home),
}

impl ContentItem {
    pub fn content_type(&self) -> ContentType {
        match self {
            ContentItem::Post(_) => ContentType::Blog,
            ContentItem::Page(_) => ContentType::Pages,
            ContentItem::Home(_) => ContentType::Home,
        }
    }

    pub fn slug(&self) -> &str {
        match self {
            ContentItem::Post(p) => &p.slug,
            ContentItem::Page(p) => &p.slug,
            ContentItem::Home(h) => h.slug(),
        }
    }

    pub fn title(&self) -> &str {
        match self {
            ContentItem::Post(p) => p.title(),
            ContentItem::Page(p) => p.title(),
            ContentItem::Home(h) => &h.meta.title,
        }
    }

    /// Rendered HTML body
    pub fn html(&self) -> &str {
        match self {
            ContentItem::Post(p) => &p.content,
            ContentItem::Page(p) => &p.content,
            ContentItem::Home(h) => &h.content,
        }
    }

    /// Raw markdown body
    pub fn raw(&self) -> &str {
        match self {
            ContentItem::Post(p) => &p.raw,
            ContentItem::Page(p) => &p.raw,
            ContentItem::Home(h) => &h.raw,
        }
    }

    pub fn source(&self) -> &str {
        match self {
            ContentItem::Post(p) => &p.source,
            ContentItem::Page(p) => &p.source,
            ContentItem::Home(h) => &h.source,
        }
    }
}

/// Everything a build needs, loaded in one pass
#[derive(Debug, Clone, Default)]
pub struct SiteContent {
    /// Newest first
    pub posts: Vec<Post>,
    pub pages: Vec<Page>,
    pub home: Option<Home>,
    /// Published excerpts sorted by title
    pub audio: Vec<AudioExcerpt>,
}

impl SiteContent {
    pub fn audio_by_slug(&self, slug: &str) -> Option<&AudioExcerpt> {
        self.audio.iter().find(|a| a.slug == slug)
    }

    /// Posts marked `featuredpost`, newest first
    pub fn featured_posts(&self, limit: usize) -> Vec<&Post> {
        self.posts
            .iter()
            .filter(|p| p.meta.featuredpost)
            .take(limit)
            .collect()
    }
}
