//! Generator module - writes the static site using the embedded Tera templates

use anyhow::Result;
use std::fs;
use std::path::Path;

use tera::Context;
use walkdir::WalkDir;

use crate::cart::{currency, Catalog};
use crate::content::{ContentType, Home, Page, Post, SiteContent};
use crate::render::PageRenderer;
use crate::templates::{
    default_navigation, strip_html, FooterData, NavPost, PageData, PostData, ProductData,
    SiteData, TemplateRenderer,
};
use crate::Folio;

/// Static site generator using Tera templates
pub struct Generator {
    folio: Folio,
    renderer: TemplateRenderer,
    catalog: Catalog,
}

impl Generator {
    /// Create a new generator
    pub fn new(folio: &Folio) -> Result<Self> {
        let renderer = TemplateRenderer::new()?;
        let catalog = Catalog::load(folio.catalog_path())?;

        Ok(Self {
            folio: folio.clone(),
            renderer,
            catalog,
        })
    }

    /// Generate the entire site
    pub fn generate(&self, site: &SiteContent) -> Result<()> {
        // Ensure public directory exists
        fs::create_dir_all(&self.folio.public_dir)?;

        // Copy content assets (images, audio, etc.)
        self.copy_content_assets()?;

        // Copy static files verbatim
        self.copy_static_files()?;

        let site_data = self.build_site_data(site);
        let pages = PageRenderer::new(&self.renderer, site, &self.catalog, &self.folio.config.root);

        self.generate_home(site, &site_data, &pages)?;
        self.generate_blog_index(&site.posts, &site_data)?;
        self.generate_post_pages(&site.posts, &site_data, &pages)?;
        self.generate_page_pages(&site.pages, &site_data, &pages)?;
        self.generate_store_pages(&site_data)?;
        self.generate_checkout_pages(&site_data)?;
        self.generate_not_found(&site_data)?;
        self.generate_search_index(site)?;

        Ok(())
    }

    /// Build site data for templates
    fn build_site_data(&self, site: &SiteContent) -> SiteData {
        let config = &self.folio.config;
        let home = site.home.as_ref().map(|h| &h.meta);

        let navigation = home
            .map(|m| m.navigation.clone())
            .filter(|nav| !nav.is_empty())
            .unwrap_or_else(default_navigation);

        let current_year = match config.tz() {
            Some(tz) => chrono::Utc::now().with_timezone(&tz).format("%Y").to_string(),
            None => chrono::Local::now().format("%Y").to_string(),
        };

        SiteData {
            title: config.title.clone(),
            description: config.description.clone(),
            author: config.author.clone(),
            url: config.url.clone(),
            root: self.root(),
            language: config.language.clone(),
            navigation,
            footer: home.map(FooterData::from_home).unwrap_or_default(),
            current_year,
        }
    }

    /// Site root, always ending with a slash
    fn root(&self) -> String {
        format!("{}/", self.folio.config.root.trim_end_matches('/'))
    }

    /// Create a base context with common variables
    fn create_base_context(&self, site_data: &SiteData) -> Context {
        let mut context = Context::new();
        context.insert("site", site_data);
        context.insert("config", &self.folio.config);
        context
    }

    /// Write `html` to `relative` under the public dir
    fn write_output(&self, relative: &str, html: &str) -> Result<()> {
        let output_path = self.folio.public_dir.join(relative);
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&output_path, html)?;
        tracing::debug!("Generated: {:?}", output_path);
        Ok(())
    }

    /// Generate the home page
    fn generate_home(
        &self,
        site: &SiteContent,
        site_data: &SiteData,
        pages: &PageRenderer,
    ) -> Result<()> {
        let mut context = self.create_base_context(site_data);

        let home_view = match &site.home {
            Some(home) => self.home_view(home, pages),
            None => serde_json::json!({
                "title": self.folio.config.title,
                "tagline": self.folio.config.description,
                "quote": "",
                "image": "",
                "content": "",
            }),
        };
        context.insert("home", &home_view);

        let audio = site
            .home
            .as_ref()
            .and_then(|h| h.meta.featuredaudio.as_deref())
            .and_then(|slug| pages.audio(slug, None));
        context.insert("audio", &audio);

        // Show a featured section unless the content already places a grid
        let show_featured = site
            .home
            .as_ref()
            .map(|h| !h.raw.contains("<post-grid"))
            .unwrap_or(true);
        let featured: Vec<PostData> = if show_featured {
            site.featured_posts(self.folio.config.featured_count)
                .into_iter()
                .map(|p| PostData::from_post(p, &self.folio.config.root))
                .collect()
        } else {
            Vec::new()
        };
        context.insert("featured_posts", &featured);

        let html = self.renderer.render("home.html", &context)?;
        self.write_output("index.html", &html)
    }

    fn home_view(&self, home: &Home, pages: &PageRenderer) -> serde_json::Value {
        let root = self.folio.config.root.trim_end_matches('/');
        let image = &home.meta.featuredimage;
        let image = if image.is_empty() || image.starts_with("http") || image.starts_with('/') {
            image.clone()
        } else {
            format!("{}/content/home/{}", root, image.trim_start_matches("./"))
        };

        serde_json::json!({
            "title": home.meta.title,
            "tagline": home.meta.tagline,
            "quote": home.meta.homequote,
            "image": image,
            "content": pages.resolve(&home.content),
        })
    }

    /// Generate the blog listing
    fn generate_blog_index(&self, posts: &[Post], site_data: &SiteData) -> Result<()> {
        let post_data: Vec<PostData> = posts
            .iter()
            .map(|p| PostData::from_post(p, &self.folio.config.root))
            .collect();

        let mut context = self.create_base_context(site_data);
        context.insert("posts", &post_data);

        let html = self.renderer.render("blog.html", &context)?;
        self.write_output("blog/index.html", &html)?;
        tracing::info!("Generated blog index with {} posts", posts.len());
        Ok(())
    }

    /// Generate individual post pages
    fn generate_post_pages(
        &self,
        posts: &[Post],
        site_data: &SiteData,
        pages: &PageRenderer,
    ) -> Result<()> {
        let root = &self.folio.config.root;

        for post in posts {
            let prev_post = post.prev(posts).map(|p| NavPost::from_post(p, root));
            let next_post = post.next(posts).map(|p| NavPost::from_post(p, root));

            let mut post_data = PostData::from_post(post, root);
            post_data.content = pages.resolve(&post.content);

            let audio = post
                .meta
                .audioexcerpt
                .as_deref()
                .and_then(|slug| pages.audio(slug, None));

            let mut context = self.create_base_context(site_data);
            context.insert("post", &post_data);
            context.insert("prev_post", &prev_post);
            context.insert("next_post", &next_post);
            context.insert("audio", &audio);

            let html = self.renderer.render("post.html", &context)?;
            let output = format!("{}/index.html", post.slug.trim_start_matches('/'));
            self.write_output(&output, &html)?;
        }

        tracing::info!("Generated {} posts", posts.len());
        Ok(())
    }

    /// Generate standalone pages
    fn generate_page_pages(
        &self,
        site_pages: &[Page],
        site_data: &SiteData,
        pages: &PageRenderer,
    ) -> Result<()> {
        for page in site_pages {
            let relative = page.slug.trim_matches('/');
            if relative.is_empty() {
                tracing::warn!("Skipping page {} that would replace the home page", page.source);
                continue;
            }

            let page_data =
                PageData::from_page(page, &self.folio.config.root, pages.resolve(&page.content));
            let audio_players: Vec<_> = page
                .meta
                .audioplayers
                .iter()
                .filter_map(|r| pages.audio(&r.excerpt, None))
                .collect();

            let mut context = self.create_base_context(site_data);
            context.insert("page", &page_data);
            context.insert("audio_players", &audio_players);

            let html = self.renderer.render("page.html", &context)?;
            self.write_output(&format!("{}/index.html", relative), &html)?;
        }

        tracing::info!("Generated {} pages", site_pages.len());
        Ok(())
    }

    /// Generate the store listing and one detail page per product
    fn generate_store_pages(&self, site_data: &SiteData) -> Result<()> {
        let root = &self.folio.config.root;
        let products: Vec<ProductData> = self
            .catalog
            .products
            .iter()
            .map(|p| ProductData::from_product(p, root))
            .collect();

        let mut context = self.create_base_context(site_data);
        context.insert("products", &products);
        let html = self.renderer.render("store.html", &context)?;
        self.write_output("store/index.html", &html)?;

        for (product, data) in self.catalog.products.iter().zip(&products) {
            if product.id.is_empty() || product.id.contains(['/', '\\']) || product.id == ".." {
                tracing::warn!("Skipping product with unusable id {:?}", product.id);
                continue;
            }

            let code = product.prices.first().map(|p| p.currency.as_str()).unwrap_or("usd");
            let starting_price = product
                .price_range()
                .map(|(min, _)| currency::format_price(min, code))
                .unwrap_or_default();

            let mut context = self.create_base_context(site_data);
            context.insert("product", data);
            context.insert("starting_price", &starting_price);
            let html = self.renderer.render("product.html", &context)?;
            self.write_output(&format!("store/product/{}/index.html", product.id), &html)?;
        }

        tracing::info!("Generated store with {} products", products.len());
        Ok(())
    }

    /// Generate the cart page and the pages the payments provider redirects
    /// back to
    fn generate_checkout_pages(&self, site_data: &SiteData) -> Result<()> {
        let mut context = self.create_base_context(site_data);
        // Embedded in a script tag, so `</` must not appear literally
        let catalog_json = serde_json::to_string(&self.catalog.products)?.replace("</", "<\\/");
        context.insert("products", &!self.catalog.is_empty());
        context.insert("catalog_json", &catalog_json);
        context.insert("storage_key", &self.folio.config.cart.storage_key);
        let html = self.renderer.render("checkout.html", &context)?;
        self.write_output("checkout/index.html", &html)?;

        let context = self.create_base_context(site_data);

        let html = self.renderer.render("checkout_success.html", &context)?;
        self.write_output("checkout/success/index.html", &html)?;

        let html = self.renderer.render("checkout_cancelled.html", &context)?;
        self.write_output("checkout/cancelled/index.html", &html)
    }

    fn generate_not_found(&self, site_data: &SiteData) -> Result<()> {
        let context = self.create_base_context(site_data);
        let html = self.renderer.render("not_found.html", &context)?;
        self.write_output("404.html", &html)
    }

    /// Generate search index (JSON)
    fn generate_search_index(&self, site: &SiteContent) -> Result<()> {
        let root = self.folio.config.root.trim_end_matches('/');

        let mut search_data: Vec<serde_json::Value> = site
            .posts
            .iter()
            .map(|p| {
                serde_json::json!({
                    "type": ContentType::Blog.template_key(),
                    "title": p.title(),
                    "url": format!("{}{}/", root, p.slug),
                    "content": strip_html(&p.content),
                    "date": p.date.format("%Y-%m-%d").to_string(),
                })
            })
            .collect();

        search_data.extend(site.pages.iter().map(|p| {
            serde_json::json!({
                "type": ContentType::Pages.template_key(),
                "title": p.title(),
                "url": format!("{}{}/", root, p.slug.trim_end_matches('/')),
                "content": strip_html(&p.content),
            })
        }));

        let output_path = self.folio.public_dir.join("search.json");
        let json = serde_json::to_string_pretty(&search_data)?;
        fs::write(&output_path, json)?;
        tracing::info!("Generated search.json");

        Ok(())
    }

    /// Copy non-markdown files from the content tree to `public/content`
    fn copy_content_assets(&self) -> Result<()> {
        let dest_root = self.folio.public_dir.join("content");
        copy_tree(&self.folio.content_dir, &dest_root, |path| {
            let ext = path.extension().and_then(|e| e.to_str());
            // Markdown is processed separately
            !matches!(ext, Some("md") | Some("markdown"))
        })
    }

    /// Copy `static/` into the public dir as is
    fn copy_static_files(&self) -> Result<()> {
        let static_dir = self.folio.base_dir.join("static");
        if !static_dir.is_dir() {
            return Ok(());
        }
        copy_tree(&static_dir, &self.folio.public_dir, |_| true)
    }
}

/// Copy every file under `src` accepted by `keep` to the same relative path
/// under `dest`
fn copy_tree(src: &Path, dest: &Path, keep: impl Fn(&Path) -> bool) -> Result<()> {
    if !src.is_dir() {
        return Ok(());
    }

    for entry in WalkDir::new(src)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.is_file() || !keep(path) {
            continue;
        }

        let relative = path.strip_prefix(src)?;
        let target = dest.join(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(path, &target)?;
    }

    Ok(())
}
