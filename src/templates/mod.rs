//! Built-in site templates using the Tera template engine
//!
//! All templates are embedded directly in the binary.

use anyhow::Result;
use serde::Serialize;
use std::collections::HashMap;
use tera::{Context, Tera};

use crate::cart::{currency, Product};
use crate::content::{AudioExcerpt, FooterCredit, HomeMeta, NavigationItem, Page, Post, SocialLink};

/// Template renderer with the embedded site theme
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Create a new renderer with all templates loaded
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();

        // Content is already HTML; text fields are escaped in the templates
        tera.autoescape_on(vec![]);

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("site/layout.html")),
            ("home.html", include_str!("site/home.html")),
            ("blog.html", include_str!("site/blog.html")),
            ("post.html", include_str!("site/post.html")),
            ("page.html", include_str!("site/page.html")),
            ("not_found.html", include_str!("site/not_found.html")),
            (
                "checkout_success.html",
                include_str!("site/checkout_success.html"),
            ),
            (
                "checkout_cancelled.html",
                include_str!("site/checkout_cancelled.html"),
            ),
            ("checkout.html", include_str!("site/checkout.html")),
            ("store.html", include_str!("site/store.html")),
            ("product.html", include_str!("site/product.html")),
            // Partials
            (
                "partials/header.html",
                include_str!("site/partials/header.html"),
            ),
            (
                "partials/footer.html",
                include_str!("site/partials/footer.html"),
            ),
            (
                "partials/post_card.html",
                include_str!("site/partials/post_card.html"),
            ),
            (
                "partials/audio_player.html",
                include_str!("site/partials/audio_player.html"),
            ),
            (
                "partials/product_card.html",
                include_str!("site/partials/product_card.html"),
            ),
            // Shortcode components
            (
                "shortcodes/post_grid.html",
                include_str!("site/shortcodes/post_grid.html"),
            ),
            (
                "shortcodes/tiles_grid.html",
                include_str!("site/shortcodes/tiles_grid.html"),
            ),
            (
                "shortcodes/audio_player.html",
                include_str!("site/shortcodes/audio_player.html"),
            ),
            (
                "shortcodes/featured_products.html",
                include_str!("site/shortcodes/featured_products.html"),
            ),
            (
                "shortcodes/calendly_button.html",
                include_str!("site/shortcodes/calendly_button.html"),
            ),
        ])?;

        tera.register_filter("strip_html", strip_html_filter);
        tera.register_filter("truncate_chars", truncate_chars_filter);
        tera.register_filter("price", price_filter);

        Ok(Self { tera })
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(template_name, context)?)
    }
}

/// Strip HTML tags from a string
pub fn strip_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut in_tag = false;
    for c in s.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(c),
            _ => {}
        }
    }
    result
}

/// Tera filter: strip HTML tags
fn strip_html_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("strip_html", "value", String, value);
    Ok(tera::Value::String(strip_html(&s)))
}

/// Tera filter: truncate by character count
fn truncate_chars_filter(
    value: &tera::Value,
    args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("truncate_chars", "value", String, value);
    let length = match args.get("length") {
        Some(val) => tera::try_get_value!("truncate_chars", "length", usize, val),
        None => 150,
    };
    let omission = match args.get("omission") {
        Some(val) => tera::try_get_value!("truncate_chars", "omission", String, val),
        None => "…".to_string(),
    };

    if s.chars().count() <= length {
        Ok(tera::Value::String(s))
    } else {
        let truncated: String = s.chars().take(length).collect();
        Ok(tera::Value::String(format!(
            "{}{}",
            truncated.trim_end(),
            omission
        )))
    }
}

/// Tera filter: format a minor-unit amount, `{{ 1250 | price(currency="usd") }}`
fn price_filter(
    value: &tera::Value,
    args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let amount = tera::try_get_value!("price", "value", u64, value);
    let code = match args.get("currency") {
        Some(val) => tera::try_get_value!("price", "currency", String, val),
        None => "usd".to_string(),
    };
    Ok(tera::Value::String(currency::format_price(amount, &code)))
}

/// Fallback navigation when the home entry defines none
pub fn default_navigation() -> Vec<NavigationItem> {
    [
        ("Home", "/", false),
        ("Blog", "/blog", false),
        ("About", "/about", false),
        ("Coaching", "/coaching", false),
        ("Contact", "/contact", false),
        ("Store", "/store", false),
        ("Checkout", "/checkout", true),
    ]
    .into_iter()
    .map(|(title, slug, showcartindicator)| NavigationItem {
        title: title.to_string(),
        slug: slug.to_string(),
        showcartindicator,
        subnav: Vec::new(),
    })
    .collect()
}

/// Data structures for template context

#[derive(Debug, Clone, Serialize)]
pub struct SiteData {
    pub title: String,
    pub description: String,
    pub author: String,
    pub url: String,
    pub root: String,
    pub language: String,
    pub navigation: Vec<NavigationItem>,
    pub footer: FooterData,
    pub current_year: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FooterData {
    pub bio_image: String,
    pub bio_text: String,
    pub meet_text: String,
    pub social_links: Vec<SocialLink>,
    pub credits: Vec<FooterCredit>,
}

impl FooterData {
    pub fn from_home(meta: &HomeMeta) -> Self {
        Self {
            bio_image: meta.footerbioimage.clone(),
            bio_text: meta.footerbiotext.clone(),
            meet_text: meta.footermeettext.clone(),
            social_links: meta.sociallinks.clone(),
            credits: meta.footercredits.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PostData {
    pub title: String,
    pub slug: String,
    pub url: String,
    pub date: String,
    pub formatted_date: String,
    pub description: String,
    pub excerpt: String,
    pub featured: bool,
    pub image: Option<String>,
    pub reading_time: u32,
    pub content: String,
}

impl PostData {
    /// Template view of a post; `content` is left for the caller to fill
    pub fn from_post(post: &Post, root: &str) -> Self {
        let root = root.trim_end_matches('/');
        let image = post.meta.featuredimage.as_ref().map(|img| {
            if img.starts_with("http") || img.starts_with('/') {
                img.clone()
            } else {
                let base = format!("{}/content/blog/{}", root, post.image_base_path);
                format!("{}/{}", base.trim_end_matches('/'), img.trim_start_matches("./"))
            }
        });

        Self {
            title: post.meta.title.clone(),
            slug: post.slug.clone(),
            url: format!("{}{}/", root, post.slug),
            date: post.date.to_rfc3339(),
            formatted_date: post.formatted_date.clone(),
            description: post.meta.description.clone().unwrap_or_default(),
            excerpt: post.excerpt.clone(),
            featured: post.meta.featuredpost,
            image,
            reading_time: post.reading_time,
            content: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PageData {
    pub title: String,
    pub slug: String,
    pub url: String,
    pub content: String,
}

impl PageData {
    pub fn from_page(page: &Page, root: &str, content: String) -> Self {
        let root = root.trim_end_matches('/');
        Self {
            title: page.meta.title.clone(),
            slug: page.slug.clone(),
            url: format!("{}{}/", root, page.slug.trim_end_matches('/')),
            content,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NavPost {
    pub title: String,
    pub url: String,
}

impl NavPost {
    pub fn from_post(post: &Post, root: &str) -> Self {
        Self {
            title: post.meta.title.clone(),
            url: format!("{}{}/", root.trim_end_matches('/'), post.slug),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AudioData {
    pub slug: String,
    pub title: String,
    pub src: String,
    pub description: String,
}

impl AudioData {
    pub fn from_excerpt(excerpt: &AudioExcerpt, title: Option<&str>) -> Self {
        Self {
            slug: excerpt.slug.clone(),
            title: title.unwrap_or(&excerpt.meta.title).to_string(),
            src: excerpt.meta.audiofile.clone(),
            description: excerpt.meta.description.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductData {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Detail page under `/store/product/<id>/`
    pub url: String,
    pub image: Option<String>,
    pub images: Vec<String>,
    pub price_label: String,
    pub prices: Vec<PriceData>,
    /// Metadata shown as badges: featured, category, color, gender
    pub badges: Vec<String>,
    pub featured: bool,
    pub hide_quantity: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PriceData {
    pub id: String,
    pub label: String,
    pub nickname: String,
    /// Nickname, or `Option <n>` when the price has none
    pub option: String,
}

impl ProductData {
    pub fn from_product(product: &Product, root: &str) -> Self {
        let code = product
            .prices
            .first()
            .map(|p| p.currency.as_str())
            .unwrap_or("usd");
        let price_label = product
            .price_range()
            .map(|(min, max)| currency::format_price_range(min, max, code))
            .unwrap_or_default();

        let badges = ["category", "color", "gender"]
            .iter()
            .filter_map(|key| product.metadata.get(*key))
            .filter(|value| !value.is_empty())
            .cloned()
            .collect();

        Self {
            id: product.id.clone(),
            name: product.name.clone(),
            description: product.description.clone().unwrap_or_default(),
            url: format!(
                "{}/store/product/{}/",
                root.trim_end_matches('/'),
                product.id
            ),
            image: product.images.first().cloned(),
            images: product.images.clone(),
            price_label,
            prices: product
                .prices
                .iter()
                .filter(|p| p.active)
                .enumerate()
                .map(|(i, p)| {
                    let nickname = p.nickname.clone().unwrap_or_default();
                    PriceData {
                        id: p.id.clone(),
                        label: currency::format_price(p.unit_amount, &p.currency),
                        option: if nickname.is_empty() {
                            format!("Option {}", i + 1)
                        } else {
                            nickname.clone()
                        },
                        nickname,
                    }
                })
                .collect(),
            badges,
            featured: product.is_featured(),
            hide_quantity: product
                .metadata
                .get("hidequantity")
                .is_some_and(|v| v == "true"),
        }
    }
}
