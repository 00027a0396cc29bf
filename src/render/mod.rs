//! Turns shortcodes left in rendered content into site components

use anyhow::Result;
use tera::Context;

use crate::cart::Catalog;
use crate::content::{normalize_slug, ContentType, SiteContent};
use crate::shortcode::{
    self, AudioPlayerProps, CalendlyButtonProps, FeaturedProductsProps, PostGridProps, Segment,
    Shortcode, ShortcodeProps, TilesGrid,
};
use crate::templates::{AudioData, PostData, ProductData, TemplateRenderer};

/// Renders the shortcodes of one build against the loaded site
pub struct PageRenderer<'a> {
    templates: &'a TemplateRenderer,
    site: &'a SiteContent,
    catalog: &'a Catalog,
    root: String,
}

impl<'a> PageRenderer<'a> {
    pub fn new(
        templates: &'a TemplateRenderer,
        site: &'a SiteContent,
        catalog: &'a Catalog,
        root: &str,
    ) -> Self {
        Self {
            templates,
            site,
            catalog,
            root: root.trim_end_matches('/').to_string(),
        }
    }

    /// Replace every shortcode in `html` with its component markup.
    /// Shortcodes that cannot be rendered are kept as written.
    pub fn resolve(&self, html: &str) -> String {
        let mut out = String::with_capacity(html.len());
        for segment in shortcode::expand(html) {
            match segment {
                Segment::Html(text) => out.push_str(&text),
                Segment::Shortcode(sc) => match self.render_shortcode(&sc) {
                    Ok(Some(rendered)) => out.push_str(&rendered),
                    Ok(None) => out.push_str(&sc.source),
                    Err(e) => {
                        tracing::warn!("Failed to render <{}>: {}", sc.kind, e);
                        out.push_str(&sc.source);
                    }
                },
            }
        }
        out
    }

    /// A published audio excerpt, ready for the audio player partial
    pub fn audio(&self, slug: &str, title: Option<&str>) -> Option<AudioData> {
        self.site
            .audio_by_slug(slug)
            .map(|excerpt| AudioData::from_excerpt(excerpt, title))
    }

    fn render_shortcode(&self, sc: &Shortcode) -> Result<Option<String>> {
        let Some(props) = sc.props() else {
            return Ok(None);
        };

        match props {
            ShortcodeProps::PostGrid(p) => self.post_grid(&p).map(Some),
            ShortcodeProps::TilesGrid(grid) => self.tiles_grid(&grid).map(Some),
            ShortcodeProps::AudioPlayer(p) => self.audio_player(&p),
            ShortcodeProps::FeaturedProducts(p) => self.featured_products(&p).map(Some),
            ShortcodeProps::CalendlyButton(p) => self.calendly_button(&p).map(Some),
        }
    }

    fn post_grid(&self, props: &PostGridProps) -> Result<String> {
        let exclude = props
            .slug
            .as_deref()
            .map(|s| normalize_slug(ContentType::Blog, s));

        let posts: Vec<PostData> = self
            .site
            .posts
            .iter()
            .filter(|p| !props.featured || p.meta.featuredpost)
            .filter(|p| exclude.as_deref() != Some(p.slug.as_str()))
            .take(props.count)
            .map(|p| PostData::from_post(p, &self.root))
            .collect();

        let mut context = Context::new();
        context.insert("posts", &posts);
        self.templates.render("shortcodes/post_grid.html", &context)
    }

    fn tiles_grid(&self, grid: &TilesGrid) -> Result<String> {
        let tiles: Vec<_> = grid
            .tiles
            .iter()
            .map(|tile| {
                let mut tile = tile.clone();
                tile.image = tile.image.map(|img| {
                    if img.starts_with("http") || img.starts_with('/') {
                        img
                    } else {
                        format!("{}/content/home/{}", self.root, img)
                    }
                });
                tile
            })
            .collect();

        let mut context = Context::new();
        context.insert("tiles", &tiles);
        self.templates.render("shortcodes/tiles_grid.html", &context)
    }

    fn audio_player(&self, props: &AudioPlayerProps) -> Result<Option<String>> {
        let Some(audio) = self.audio(&props.slug, props.title.as_deref()) else {
            tracing::warn!("Audio excerpt not found: {}", props.slug);
            return Ok(None);
        };

        let mut context = Context::new();
        context.insert("audio", &audio);
        self.templates
            .render("shortcodes/audio_player.html", &context)
            .map(Some)
    }

    fn featured_products(&self, props: &FeaturedProductsProps) -> Result<String> {
        let products: Vec<ProductData> = match &props.id {
            Some(id) => self
                .catalog
                .product(id)
                .map(|p| ProductData::from_product(p, &self.root))
                .into_iter()
                .collect(),
            None => self
                .catalog
                .listing(props.count, props.featured)
                .into_iter()
                .map(|p| ProductData::from_product(p, &self.root))
                .collect(),
        };

        let mut context = Context::new();
        context.insert("products", &products);
        context.insert("count", &props.count);
        context.insert("featured", &props.featured);
        self.templates
            .render("shortcodes/featured_products.html", &context)
    }

    fn calendly_button(&self, props: &CalendlyButtonProps) -> Result<String> {
        let mut context = Context::new();
        context.insert("url", &props.url);
        context.insert("label", &props.label);
        self.templates.render("shortcodes/calendly_button.html", &context)
    }
}
