//! List site content

use anyhow::Result;

use crate::content::{ContentLoader, ContentType};
use crate::Folio;

/// List site content by type
pub fn run(folio: &Folio, content_type: &str) -> Result<()> {
    for line in listing(folio, content_type)? {
        println!("{}", line);
    }
    Ok(())
}

fn listing(folio: &Folio, content_type: &str) -> Result<Vec<String>> {
    let loader = ContentLoader::new(folio);
    let mut lines = Vec::new();

    match content_type {
        "post" | "posts" => {
            let posts = loader.load_posts();
            lines.push(format!("Posts ({}):", posts.len()));
            for post in posts {
                let marker = if post.meta.featuredpost { " *" } else { "" };
                lines.push(format!(
                    "  {} - {}{} [{}]",
                    post.date.format("%Y-%m-%d"),
                    post.title(),
                    marker,
                    post.source
                ));
            }
        }
        "page" | "pages" => {
            let pages = loader.load_pages();
            lines.push(format!("Pages ({}):", pages.len()));
            for page in pages {
                lines.push(format!("  {} [{}]", page.title(), page.source));
            }
        }
        "audio" => {
            let excerpts = loader.load_audio_excerpts();
            lines.push(format!("Audio excerpts ({}):", excerpts.len()));
            for excerpt in excerpts {
                lines.push(format!(
                    "  {} - {} [{}]",
                    excerpt.slug, excerpt.meta.title, excerpt.meta.audiofile
                ));
            }
        }
        "slug" | "slugs" | "route" => {
            let mut slugs = vec!["/".to_string()];
            for content_type in [ContentType::Blog, ContentType::Pages] {
                slugs.extend(
                    loader
                        .list_all(content_type)
                        .iter()
                        .map(|item| item.slug().to_string()),
                );
            }
            lines.push(format!("Slugs ({}):", slugs.len()));
            lines.extend(slugs.into_iter().map(|s| format!("  {}", s)));
        }
        _ => {
            anyhow::bail!(
                "Unknown type: {}. Available: post, page, audio, slug",
                content_type
            );
        }
    }

    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::new;
    use tempfile::TempDir;

    #[test]
    fn test_listing() {
        let tmp = TempDir::new().unwrap();
        let folio = Folio::new(tmp.path()).unwrap();
        new::create(&folio, "post", "First Light", None).unwrap();
        new::create(&folio, "page", "Contact", None).unwrap();

        let posts = listing(&folio, "post").unwrap();
        assert_eq!(posts[0], "Posts (1):");
        assert!(posts[1].contains("First Light"));

        let slugs = listing(&folio, "slug").unwrap();
        assert_eq!(slugs[1..], ["  /", "  /blog/first-light", "  /contact"]);

        assert_eq!(listing(&folio, "audio").unwrap(), vec!["Audio excerpts (0):"]);
        assert!(listing(&folio, "tags").is_err());
    }
}
