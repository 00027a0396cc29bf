//! Create a new post, page or audio excerpt

use anyhow::Result;
use std::fs;
use std::path::PathBuf;

use crate::content::loader::AUDIO_DIR;
use crate::content::ContentType;
use crate::Folio;

/// Create a new content file and return its path.
///
/// `kind` is `post`, `page` or `audio`; `path` overrides the slugified
/// title as the file or directory name.
pub fn create(folio: &Folio, kind: &str, title: &str, path: Option<&str>) -> Result<PathBuf> {
    let now = chrono::Local::now();
    let name = match path {
        Some(p) => p.trim_matches('/').to_string(),
        None => slug::slugify(title),
    };
    if name.is_empty() {
        anyhow::bail!("Cannot derive a file name from title {:?}", title);
    }

    // Quote the title so YAML special characters survive
    let quoted = serde_json::to_string(title)?;

    let (file_path, content) = match kind {
        "post" | "blog" => (
            folio
                .content_dir
                .join(ContentType::Blog.dir_name())
                .join(&name)
                .join("index.md"),
            format!(
                "---\ntemplatekey: blog-post\ntitle: {}\ndate: {}\ndescription: ''\nfeaturedpost: false\n---\n\n",
                quoted,
                now.format("%Y-%m-%d")
            ),
        ),
        "page" => (
            folio
                .content_dir
                .join(ContentType::Pages.dir_name())
                .join(format!("{}.md", name)),
            format!("---\ntemplatekey: page\ntitle: {}\n---\n\n", quoted),
        ),
        "audio" => (
            folio
                .content_dir
                .join(AUDIO_DIR)
                .join(format!("{}.md", name)),
            format!(
                "---\ntemplatekey: audio-excerpt\ntitle: {}\naudiofile: /audio/{}.mp3\npublished: false\n---\n",
                quoted, name
            ),
        ),
        _ => anyhow::bail!("Unknown type: {}. Available: post, page, audio", kind),
    };

    // Check if file already exists
    if file_path.exists() {
        anyhow::bail!("File already exists: {:?}", file_path);
    }

    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&file_path, content)?;

    Ok(file_path)
}
