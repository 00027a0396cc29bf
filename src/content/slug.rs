//! Slug derivation for content items
//!
//! A slug is a pure function of the content type and the file's path
//! relative to that type's root directory.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path};
use std::str::FromStr;

/// The content collections a site is built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Blog,
    Pages,
    Home,
}

impl ContentType {
    /// All content types, in build order
    pub const ALL: [ContentType; 3] = [ContentType::Blog, ContentType::Pages, ContentType::Home];

    /// Directory name under the content root
    pub fn dir_name(&self) -> &'static str {
        match self {
            ContentType::Blog => "blog",
            ContentType::Pages => "pages",
            ContentType::Home => "home",
        }
    }

    /// The `templatekey` every file of this type must declare
    pub fn template_key(&self) -> &'static str {
        match self {
            ContentType::Blog => "blog-post",
            ContentType::Pages => "page",
            ContentType::Home => "index-page",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

impl FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "blog" | "post" | "posts" => Ok(ContentType::Blog),
            "page" | "pages" => Ok(ContentType::Pages),
            "home" | "index" => Ok(ContentType::Home),
            other => Err(format!(
                "unknown content type: {}. Available: blog, pages, home",
                other
            )),
        }
    }
}

/// Derive the slug for a file, given its path relative to the type root.
///
/// - blog: `/blog/<last directory segment>`; a file directly in the root
///   uses its file stem
/// - pages: `/<relative directory>`, plus the file stem for non-index files
/// - home: always `/`
pub fn derive_slug(content_type: ContentType, relative: &Path) -> String {
    let dirs: Vec<String> = relative
        .parent()
        .map(|p| {
            p.components()
                .filter_map(|c| match c {
                    Component::Normal(s) => Some(s.to_string_lossy().to_string()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();

    let stem = relative
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| *s != "index");

    let slug = match content_type {
        ContentType::Blog => {
            let last = dirs
                .last()
                .map(String::as_str)
                .or(stem)
                .unwrap_or_default();
            format!("/blog/{}", last)
        }
        ContentType::Pages => {
            let mut parts = dirs;
            if let Some(stem) = stem {
                parts.push(stem.to_string());
            }
            format!("/{}", parts.join("/"))
        }
        ContentType::Home => "/".to_string(),
    };

    collapse_slashes(&slug)
}

/// Canonicalize a slug supplied by a caller (URL segment, CLI argument, ...)
/// so that it compares equal to a derived slug.
pub fn normalize_slug(content_type: ContentType, slug: &str) -> String {
    let trimmed = slug.trim().trim_matches('/');
    match content_type {
        ContentType::Blog => {
            let name = trimmed.strip_prefix("blog/").unwrap_or(trimmed);
            collapse_slashes(&format!("/blog/{}", name))
        }
        ContentType::Pages => collapse_slashes(&format!("/{}", trimmed)),
        ContentType::Home => "/".to_string(),
    }
}

/// Collapse runs of `/` into a single slash
fn collapse_slashes(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_slash = false;
    for c in s.chars() {
        if c == '/' {
            if !prev_slash {
                out.push(c);
            }
            prev_slash = true;
        } else {
            out.push(c);
            prev_slash = false;
        }
    }
    out
}
