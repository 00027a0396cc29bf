//! Content loader - reads blog posts, pages, the home entry and audio
//! excerpts from the content directory

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::{
    derive_slug, normalize_slug, AudioExcerpt, ContentError, ContentItem, ContentType,
    FrontMatter, Home, MarkdownRenderer, Page, Post, SiteContent,
};
use crate::Folio;

/// Directory under the content root holding audio excerpts
pub const AUDIO_DIR: &str = "audio-excerpts";

/// Loads content from the content directory
pub struct ContentLoader<'a> {
    folio: &'a Folio,
    renderer: MarkdownRenderer,
}

impl<'a> ContentLoader<'a> {
    /// Create a new content loader
    pub fn new(folio: &'a Folio) -> Self {
        let highlight = &folio.config.highlight;
        let renderer = MarkdownRenderer::with_options(&highlight.theme, highlight.line_number);
        Self { folio, renderer }
    }

    /// Root directory of one content type
    pub fn type_dir(&self, content_type: ContentType) -> PathBuf {
        self.folio.content_dir.join(content_type.dir_name())
    }

    /// All valid items of a type.
    ///
    /// Posts are sorted newest first, ties keep encounter order. Pages and
    /// the home entry keep encounter order. Malformed files are skipped and
    /// only the first file mapping to a slug is kept.
    pub fn list_all(&self, content_type: ContentType) -> Vec<ContentItem> {
        let mut items: Vec<ContentItem> = Vec::new();
        let mut seen: HashMap<String, PathBuf> = HashMap::new();

        for path in self.markdown_files(content_type) {
            let item = match self.load_item(content_type, &path) {
                Ok(item) => item,
                Err(e) => {
                    tracing::warn!("Skipping {:?}: {}", path, e);
                    continue;
                }
            };

            if let Some(first) = seen.get(item.slug()) {
                let err = ContentError::SlugCollision {
                    slug: item.slug().to_string(),
                    first: first.clone(),
                    second: path.clone(),
                };
                tracing::error!("{}; keeping the first", err);
                continue;
            }
            seen.insert(item.slug().to_string(), path);
            items.push(item);
        }

        if content_type == ContentType::Blog {
            // sort_by is stable, so equal dates keep encounter order
            items.sort_by(|a, b| match (a, b) {
                (ContentItem::Post(a), ContentItem::Post(b)) => b.date.cmp(&a.date),
                _ => std::cmp::Ordering::Equal,
            });
        }

        items
    }

    /// Look up one item by slug. Accepts slugs with or without the type
    /// prefix and surrounding slashes.
    pub fn get_by_slug(&self, content_type: ContentType, slug: &str) -> Option<ContentItem> {
        let target = normalize_slug(content_type, slug);
        let root = self.type_dir(content_type);

        self.markdown_files(content_type)
            .into_iter()
            .filter(|path| {
                let relative = path.strip_prefix(&root).unwrap_or(path);
                derive_slug(content_type, relative) == target
            })
            .find_map(|path| match self.load_item(content_type, &path) {
                Ok(item) => Some(item),
                Err(e) => {
                    tracing::warn!("Skipping {:?}: {}", path, e);
                    None
                }
            })
    }

    /// Fail when two files of a type map to the same slug
    pub fn check_slugs(&self, content_type: ContentType) -> Result<(), ContentError> {
        let root = self.type_dir(content_type);
        let mut seen: HashMap<String, PathBuf> = HashMap::new();

        for path in self.markdown_files(content_type) {
            let relative = path.strip_prefix(&root).unwrap_or(&path);
            let slug = derive_slug(content_type, relative);
            if let Some(first) = seen.get(&slug) {
                return Err(ContentError::SlugCollision {
                    slug,
                    first: first.clone(),
                    second: path,
                });
            }
            seen.insert(slug, path);
        }
        Ok(())
    }

    /// All blog posts, newest first
    pub fn load_posts(&self) -> Vec<Post> {
        self.list_all(ContentType::Blog)
            .into_iter()
            .filter_map(|item| match item {
                ContentItem::Post(post) => Some(post),
                _ => None,
            })
            .collect()
    }

    /// All pages, in encounter order
    pub fn load_pages(&self) -> Vec<Page> {
        self.list_all(ContentType::Pages)
            .into_iter()
            .filter_map(|item| match item {
                ContentItem::Page(page) => Some(page),
                _ => None,
            })
            .collect()
    }

    /// The home entry, if present and valid
    pub fn load_home(&self) -> Option<Home> {
        self.list_all(ContentType::Home)
            .into_iter()
            .find_map(|item| match item {
                ContentItem::Home(home) => Some(home),
                _ => None,
            })
    }

    /// Load every collection in one pass
    pub fn load_site(&self) -> SiteContent {
        SiteContent {
            posts: self.load_posts(),
            pages: self.load_pages(),
            home: self.load_home(),
            audio: self.load_audio_excerpts(),
        }
    }

    pub fn post_by_slug(&self, slug: &str) -> Option<Post> {
        match self.get_by_slug(ContentType::Blog, slug)? {
            ContentItem::Post(post) => Some(post),
            _ => None,
        }
    }

    pub fn page_by_slug(&self, slug: &str) -> Option<Page> {
        match self.get_by_slug(ContentType::Pages, slug)? {
            ContentItem::Page(page) => Some(page),
            _ => None,
        }
    }

    /// Post slugs without the `/blog/` prefix, in encounter order
    pub fn post_paths(&self) -> Vec<String> {
        self.slugs(ContentType::Blog)
            .into_iter()
            .map(|slug| slug.trim_start_matches("/blog/").to_string())
            .collect()
    }

    /// Page slugs without the leading slash, in encounter order
    pub fn page_paths(&self) -> Vec<String> {
        self.slugs(ContentType::Pages)
            .into_iter()
            .map(|slug| slug.trim_start_matches('/').to_string())
            .collect()
    }

    /// Posts marked `featuredpost`, newest first
    pub fn featured_posts(&self, limit: usize) -> Vec<Post> {
        self.load_posts()
            .into_iter()
            .filter(|p| p.meta.featuredpost)
            .take(limit)
            .collect()
    }

    /// The newer and older neighbours of a post
    pub fn adjacent_posts(&self, slug: &str) -> (Option<Post>, Option<Post>) {
        let target = normalize_slug(ContentType::Blog, slug);
        let posts = self.load_posts();
        let Some(current) = posts.iter().find(|p| p.slug == target) else {
            return (None, None);
        };
        (
            current.prev(&posts).cloned(),
            current.next(&posts).cloned(),
        )
    }

    /// Case-insensitive substring search over title, description and body
    pub fn search_posts(&self, query: &str) -> Vec<Post> {
        let query = query.to_lowercase();
        self.load_posts()
            .into_iter()
            .filter(|post| {
                let haystack = format!(
                    "{} {} {}",
                    post.meta.title,
                    post.meta.description.as_deref().unwrap_or_default(),
                    post.raw
                )
                .to_lowercase();
                haystack.contains(&query)
            })
            .collect()
    }

    /// Published audio excerpts, sorted by title
    pub fn load_audio_excerpts(&self) -> Vec<AudioExcerpt> {
        let dir = self.folio.content_dir.join(AUDIO_DIR);
        if !dir.is_dir() {
            return Vec::new();
        }

        let mut excerpts: Vec<AudioExcerpt> = WalkDir::new(&dir)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && e.path().extension().is_some_and(|x| x == "md"))
            .filter_map(|e| match self.load_audio(e.path()) {
                Ok(excerpt) => Some(excerpt),
                Err(err) => {
                    tracing::warn!("Skipping audio excerpt {:?}: {}", e.path(), err);
                    None
                }
            })
            .filter(|a| a.meta.published)
            .collect();

        excerpts.sort_by(|a, b| a.meta.title.cmp(&b.meta.title));
        excerpts
    }

    /// One audio excerpt by slug, published or not
    pub fn audio_excerpt_by_slug(&self, slug: &str) -> Option<AudioExcerpt> {
        if slug.is_empty() || slug.contains(['/', '\\']) || slug.contains("..") {
            return None;
        }
        let path = self
            .folio
            .content_dir
            .join(AUDIO_DIR)
            .join(format!("{}.md", slug));
        if !path.is_file() {
            return None;
        }
        self.load_audio(&path)
            .map_err(|e| tracing::warn!("Failed to load audio excerpt {:?}: {}", path, e))
            .ok()
    }

    /// Published excerpts for every `audio-player` slug in `text`, in
    /// first-occurrence order
    pub fn audio_excerpts_for(&self, text: &str) -> Vec<AudioExcerpt> {
        crate::shortcode::audio_player_slugs(text)
            .iter()
            .filter_map(|slug| self.audio_excerpt_by_slug(slug))
            .filter(|a| a.meta.published)
            .collect()
    }

    /// Markdown files under a type's root, in sorted directory order
    fn markdown_files(&self, content_type: ContentType) -> Vec<PathBuf> {
        let dir = self.type_dir(content_type);
        if !dir.is_dir() {
            return Vec::new();
        }

        WalkDir::new(&dir)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && is_markdown_file(e.path()))
            .map(|e| e.into_path())
            .collect()
    }

    fn slugs(&self, content_type: ContentType) -> Vec<String> {
        self.list_all(content_type)
            .iter()
            .map(|item| item.slug().to_string())
            .collect()
    }

    /// Load a single file as an item of `content_type`
    fn load_item(&self, content_type: ContentType, path: &Path) -> Result<ContentItem, ContentError> {
        let content = fs::read_to_string(path).map_err(|source| ContentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let (fm, body) = FrontMatter::parse(&content)?;

        let root = self.type_dir(content_type);
        let relative = path.strip_prefix(&root).unwrap_or(path);
        let slug = derive_slug(content_type, relative);
        let source = path
            .strip_prefix(&self.folio.content_dir)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/");
        let rel_dir = relative
            .parent()
            .map(|p| p.to_string_lossy().replace('\\', "/"))
            .unwrap_or_default();

        match (content_type, fm) {
            (ContentType::Blog, FrontMatter::BlogPost(meta)) => {
                let date = super::parse_date(&meta.date, self.folio.config.tz())
                    .ok_or_else(|| ContentError::InvalidDate(meta.date.clone()))?;

                let (excerpt_md, full_md) = MarkdownRenderer::split_excerpt(body);
                let excerpt = excerpt_md
                    .or_else(|| meta.description.clone())
                    .unwrap_or_default();

                let asset_base = self.asset_base(ContentType::Blog, &rel_dir);
                let html = self.renderer.render_content(&full_md, &asset_base);

                Ok(ContentItem::Post(Post {
                    slug,
                    date,
                    raw: body.to_string(),
                    content: html,
                    excerpt,
                    reading_time: reading_time(body, self.folio.config.words_per_minute),
                    formatted_date: date.format("%B %-d, %Y").to_string(),
                    image_base_path: rel_dir,
                    source,
                    full_source: path.to_path_buf(),
                    meta,
                }))
            }
            (ContentType::Pages, FrontMatter::Page(meta)) => {
                let asset_base = self.asset_base(ContentType::Pages, &rel_dir);
                Ok(ContentItem::Page(Page {
                    slug,
                    meta,
                    raw: body.to_string(),
                    content: self.renderer.render_content(body, &asset_base),
                    source,
                    full_source: path.to_path_buf(),
                }))
            }
            (ContentType::Home, FrontMatter::IndexPage(meta)) => {
                let asset_base = self.asset_base(ContentType::Home, "");
                Ok(ContentItem::Home(Home {
                    meta,
                    raw: body.to_string(),
                    content: self.renderer.render_content(body, &asset_base),
                    source,
                    full_source: path.to_path_buf(),
                }))
            }
            (content_type, fm) => Err(ContentError::WrongTemplate {
                expected: content_type.template_key(),
                found: fm.template_key(),
            }),
        }
    }

    fn load_audio(&self, path: &Path) -> Result<AudioExcerpt, ContentError> {
        let content = fs::read_to_string(path).map_err(|source| ContentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let (fm, _body) = FrontMatter::parse(&content)?;
        let FrontMatter::AudioExcerpt(meta) = fm else {
            return Err(ContentError::WrongTemplate {
                expected: "audio-excerpt",
                found: fm.template_key(),
            });
        };

        let slug = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        let source = path
            .strip_prefix(&self.folio.content_dir)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/");

        Ok(AudioExcerpt {
            slug,
            meta,
            source,
            full_source: path.to_path_buf(),
        })
    }

    /// Public URL prefix of a content directory's copied assets
    fn asset_base(&self, content_type: ContentType, rel_dir: &str) -> String {
        let root = self.folio.config.root.trim_end_matches('/');
        let base = format!("{}/content/{}", root, content_type.dir_name());
        if rel_dir.is_empty() {
            base
        } else {
            format!("{}/{}", base, rel_dir)
        }
    }
}

/// Minutes to read `text` at `words_per_minute`, rounded up
pub fn reading_time(text: &str, words_per_minute: usize) -> u32 {
    let words = text.split_whitespace().count();
    words.div_ceil(words_per_minute.max(1)) as u32
}

/// Check if a file is a markdown file
fn is_markdown_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e == "md" || e == "markdown")
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn post_md(title: &str, date: &str, featured: bool, body: &str) -> String {
        format!(
            "---\ntemplatekey: blog-post\ntitle: {}\ndate: {}\nfeaturedpost: {}\n---\n{}\n",
            title, date, featured, body
        )
    }

    fn site() -> (TempDir, Folio) {
        let tmp = TempDir::new().unwrap();
        let c = tmp.path().join("content");
        write(&c, "blog/2021/12/new-year/index.md", &post_md("New Year", "2021-12-31", true, "Happy *new* year.\n\n![](./fireworks.jpg)"));
        write(&c, "blog/2022/01/winter/index.md", &post_md("Winter", "2022-01-15", false, "Cold outside."));
        write(&c, "blog/2022/01/same-day-a/index.md", &post_md("Same A", "2022-01-15", true, "First <!-- more --> rest"));
        write(&c, "blog/2020/broken/index.md", "---\ntemplatekey: blog-post\ntitle: [unclosed\n---\nbody");
        write(&c, "blog/2020/wrong/index.md", "---\ntemplatekey: page\ntitle: Wrong\n---\nbody");
        write(&c, "blog/2020/baddate/index.md", &post_md("Bad", "someday", false, "x"));
        write(&c, "pages/about/index.md", "---\ntemplatekey: page\ntitle: About\n---\nAbout me.\n");
        write(&c, "pages/coaching/groups/index.md", "---\ntemplatekey: page\ntitle: Groups\n---\n<audio-player slug=\"calm\"></audio-player>\n");
        write(&c, "home/index.md", "---\ntemplatekey: index-page\ntitle: Home\ntagline: Hello\n---\nWelcome.\n");
        write(&c, "audio-excerpts/calm.md", "---\ntemplatekey: audio-excerpt\ntitle: Calm\naudiofile: /content/audio/calm.mp3\n---\n");
        write(&c, "audio-excerpts/draft.md", "---\ntemplatekey: audio-excerpt\ntitle: Draft\naudiofile: /d.mp3\npublished: false\n---\n");
        write(&c, "audio-excerpts/breath.md", "---\ntemplatekey: audio-excerpt\ntitle: Breath\naudiofile: /b.mp3\n---\n");
        let folio = Folio::new(tmp.path()).unwrap();
        (tmp, folio)
    }

    #[test]
    fn test_posts_sorted_newest_first_with_stable_ties() {
        let (_tmp, folio) = site();
        let loader = ContentLoader::new(&folio);
        let slugs: Vec<_> = loader.load_posts().into_iter().map(|p| p.slug).collect();
        // same-day-a and winter share a date; same-day-a is encountered first
        assert_eq!(
            slugs,
            vec!["/blog/same-day-a", "/blog/winter", "/blog/new-year"]
        );
    }

    #[test]
    fn test_malformed_files_are_skipped() {
        let (_tmp, folio) = site();
        let loader = ContentLoader::new(&folio);
        assert_eq!(loader.list_all(ContentType::Blog).len(), 3);
        assert!(loader.post_by_slug("broken").is_none());
        assert!(loader.post_by_slug("wrong").is_none());
        assert!(loader.post_by_slug("baddate").is_none());
    }

    #[test]
    fn test_post_fields() {
        let (_tmp, folio) = site();
        let loader = ContentLoader::new(&folio);
        let post = loader.post_by_slug("/blog/new-year/").unwrap();
        assert_eq!(post.title(), "New Year");
        assert_eq!(post.formatted_date, "December 31, 2021");
        assert_eq!(post.image_base_path, "2021/12/new-year");
        assert_eq!(post.reading_time, 1);
        assert!(post.content.contains("<em>new</em>"));
        assert!(post
            .content
            .contains(r#"src="/content/blog/2021/12/new-year/fireworks.jpg""#));

        let post = loader.post_by_slug("same-day-a").unwrap();
        assert_eq!(post.excerpt, "First");
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let tmp = TempDir::new().unwrap();
        let folio = Folio::new(tmp.path()).unwrap();
        let loader = ContentLoader::new(&folio);
        assert!(loader.list_all(ContentType::Blog).is_empty());
        assert!(loader.load_home().is_none());
        assert!(loader.get_by_slug(ContentType::Pages, "/about").is_none());
    }

    #[test]
    fn test_pages_and_home() {
        let (_tmp, folio) = site();
        let loader = ContentLoader::new(&folio);
        assert_eq!(loader.page_paths(), vec!["about", "coaching/groups"]);
        assert_eq!(loader.page_by_slug("about/").unwrap().title(), "About");
        let home = loader.get_by_slug(ContentType::Home, "/").unwrap();
        assert_eq!(home.title(), "Home");
        assert_eq!(home.slug(), "/");
    }

    #[test]
    fn test_post_paths_and_featured() {
        let (_tmp, folio) = site();
        let loader = ContentLoader::new(&folio);
        let mut paths = loader.post_paths();
        paths.sort();
        assert_eq!(paths, vec!["new-year", "same-day-a", "winter"]);

        let featured: Vec<_> = loader.featured_posts(3).into_iter().map(|p| p.slug).collect();
        assert_eq!(featured, vec!["/blog/same-day-a", "/blog/new-year"]);
        assert_eq!(loader.featured_posts(1).len(), 1);
    }

    #[test]
    fn test_adjacent_posts() {
        let (_tmp, folio) = site();
        let loader = ContentLoader::new(&folio);
        let (prev, next) = loader.adjacent_posts("winter");
        assert_eq!(prev.unwrap().slug, "/blog/same-day-a");
        assert_eq!(next.unwrap().slug, "/blog/new-year");
        assert_eq!(loader.adjacent_posts("nope").0.map(|p| p.slug), None);
    }

    #[test]
    fn test_search_posts() {
        let (_tmp, folio) = site();
        let loader = ContentLoader::new(&folio);
        let hits: Vec<_> = loader.search_posts("COLD").into_iter().map(|p| p.slug).collect();
        assert_eq!(hits, vec!["/blog/winter"]);
        assert_eq!(loader.search_posts("new year").len(), 1);
    }

    #[test]
    fn test_slug_collision() {
        let (tmp, folio) = site();
        write(
            &tmp.path().join("content"),
            "blog/2023/05/winter/index.md",
            &post_md("Winter Again", "2023-05-01", false, "Again"),
        );
        let loader = ContentLoader::new(&folio);
        assert!(matches!(
            loader.check_slugs(ContentType::Blog),
            Err(ContentError::SlugCollision { ref slug, .. }) if slug == "/blog/winter"
        ));
        // 2022/01/winter sorts before 2023/05/winter and wins
        let winters: Vec<_> = loader
            .load_posts()
            .into_iter()
            .filter(|p| p.slug == "/blog/winter")
            .collect();
        assert_eq!(winters.len(), 1);
        assert_eq!(winters[0].title(), "Winter");
        assert!(loader.check_slugs(ContentType::Pages).is_ok());
    }

    #[test]
    fn test_audio_excerpts() {
        let (_tmp, folio) = site();
        let loader = ContentLoader::new(&folio);
        let titles: Vec<_> = loader
            .load_audio_excerpts()
            .into_iter()
            .map(|a| a.meta.title)
            .collect();
        assert_eq!(titles, vec!["Breath", "Calm"]);

        assert!(loader.audio_excerpt_by_slug("draft").is_some());
        assert!(loader.audio_excerpt_by_slug("../home/index").is_none());

        let page = loader.page_by_slug("/coaching/groups").unwrap();
        let used = loader.audio_excerpts_for(&page.raw);
        assert_eq!(used.len(), 1);
        assert_eq!(used[0].slug, "calm");
        assert!(loader
            .audio_excerpts_for(r#"<audio-player slug="draft"></audio-player>"#)
            .is_empty());
    }

    #[test]
    fn test_reading_time() {
        assert_eq!(reading_time("", 200), 0);
        assert_eq!(reading_time("one two", 200), 1);
        let words = "w ".repeat(401);
        assert_eq!(reading_time(&words, 200), 3);
    }
}
