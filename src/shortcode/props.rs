//! Typed shortcode parameters

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use super::{Shortcode, ShortcodeKind};

lazy_static! {
    static ref ANCHOR_START_RE: Regex = Regex::new(r"(?i)<a\s+href=").unwrap();
    static ref HREF_RE: Regex = Regex::new(r#"href="([^"]*?)""#).unwrap();
    static ref H2_RE: Regex = Regex::new(r"(?is)<h2[^>]*?>(.*?)</h2>").unwrap();
    static ref SRC_RE: Regex = Regex::new(r#"src="([^"]+)""#).unwrap();
}

/// Parameters of a recognised shortcode
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ShortcodeProps {
    PostGrid(PostGridProps),
    TilesGrid(TilesGrid),
    AudioPlayer(AudioPlayerProps),
    FeaturedProducts(FeaturedProductsProps),
    CalendlyButton(CalendlyButtonProps),
}

impl ShortcodeProps {
    pub fn from_shortcode(sc: &Shortcode) -> Option<Self> {
        let props = match sc.kind {
            ShortcodeKind::PostGrid => ShortcodeProps::PostGrid(PostGridProps {
                featured: bool_attr(sc, "featured").unwrap_or(true),
                count: usize_attr(sc, "count").unwrap_or(3),
                slug: non_empty_attr(sc, "slug"),
            }),
            ShortcodeKind::VerticalTilesGrid => {
                ShortcodeProps::TilesGrid(TilesGrid::parse(&sc.inner))
            }
            ShortcodeKind::AudioPlayer => ShortcodeProps::AudioPlayer(AudioPlayerProps {
                slug: non_empty_attr(sc, "slug")?,
                title: non_empty_attr(sc, "title"),
            }),
            ShortcodeKind::FeaturedProducts => {
                ShortcodeProps::FeaturedProducts(FeaturedProductsProps {
                    count: usize_attr(sc, "count").unwrap_or(3),
                    featured: bool_attr(sc, "featured").unwrap_or(false),
                    id: non_empty_attr(sc, "id"),
                })
            }
            ShortcodeKind::CalendlyButton => {
                ShortcodeProps::CalendlyButton(CalendlyButtonProps {
                    url: non_empty_attr(sc, "url"),
                    label: sc.inner.trim().to_string(),
                })
            }
        };
        Some(props)
    }
}

/// `<post-grid featured count slug>`: a grid of blog post cards
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostGridProps {
    pub featured: bool,
    pub count: usize,
    /// Slug of the post the grid sits on, excluded from the grid
    pub slug: Option<String>,
}

/// `<audio-player slug title>`: an inline player for an audio excerpt
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioPlayerProps {
    pub slug: String,
    pub title: Option<String>,
}

/// `<featured-products count featured id>`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeaturedProductsProps {
    pub count: usize,
    pub featured: bool,
    pub id: Option<String>,
}

/// `<calendly-button url>label</calendly-button>`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendlyButtonProps {
    pub url: Option<String>,
    pub label: String,
}

/// `<vertical-tiles-grid>` wrapping a list of linked tiles
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TilesGrid {
    pub tiles: Vec<Tile>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tile {
    pub href: String,
    pub title: String,
    /// Image path relative to the home content directory
    pub image: Option<String>,
}

impl TilesGrid {
    /// Parse one tile per `<a href=...>` element in the inner HTML
    pub fn parse(inner: &str) -> Self {
        let starts: Vec<usize> = ANCHOR_START_RE.find_iter(inner).map(|m| m.start()).collect();

        let tiles = starts
            .iter()
            .enumerate()
            .map(|(i, &start)| {
                let end = starts.get(i + 1).copied().unwrap_or(inner.len());
                let chunk = &inner[start..end];
                Tile {
                    href: capture(&HREF_RE, chunk).unwrap_or_else(|| "#".to_string()),
                    title: capture(&H2_RE, chunk).unwrap_or_default().trim().to_string(),
                    image: capture(&SRC_RE, chunk)
                        .map(|src| src.trim_start_matches("./").to_string()),
                }
            })
            .collect();

        Self { tiles }
    }
}

fn capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

fn non_empty_attr(sc: &Shortcode, name: &str) -> Option<String> {
    sc.attr(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn bool_attr(sc: &Shortcode, name: &str) -> Option<bool> {
    sc.attr(name).map(|v| v.trim().eq_ignore_ascii_case("true"))
}

fn usize_attr(sc: &Shortcode, name: &str) -> Option<usize> {
    sc.attr(name).and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shortcode::{expand, Segment};

    fn first_props(html: &str) -> Option<ShortcodeProps> {
        expand(html).into_iter().find_map(|s| match s {
            Segment::Shortcode(sc) => Some(sc.props()),
            Segment::Html(_) => None,
        })?
    }

    #[test]
    fn test_post_grid_defaults() {
        let props = first_props("<post-grid></post-grid>").unwrap();
        assert_eq!(
            props,
            ShortcodeProps::PostGrid(PostGridProps {
                featured: true,
                count: 3,
                slug: None
            })
        );
    }

    #[test]
    fn test_post_grid_explicit() {
        let props =
            first_props(r#"<post-grid featured="false" count="6" slug="/blog/a"></post-grid>"#)
                .unwrap();
        assert_eq!(
            props,
            ShortcodeProps::PostGrid(PostGridProps {
                featured: false,
                count: 6,
                slug: Some("/blog/a".to_string())
            })
        );
    }

    #[test]
    fn test_bad_count_falls_back_to_default() {
        let props = first_props(r#"<featured-products count="many"></featured-products>"#);
        assert_eq!(
            props,
            Some(ShortcodeProps::FeaturedProducts(FeaturedProductsProps {
                count: 3,
                featured: false,
                id: None
            }))
        );
    }

    #[test]
    fn test_audio_player_requires_slug() {
        assert!(first_props(r#"<audio-player title="x"></audio-player>"#).is_none());
        let props = first_props(r#"<audio-player slug="calm" title="Calm"></audio-player>"#);
        assert_eq!(
            props,
            Some(ShortcodeProps::AudioPlayer(AudioPlayerProps {
                slug: "calm".to_string(),
                title: Some("Calm".to_string())
            }))
        );
    }

    #[test]
    fn test_calendly_label_from_inner() {
        let props = first_props(
            r#"<calendly-button url="https://calendly.com/me"> Book a call </calendly-button>"#,
        );
        assert_eq!(
            props,
            Some(ShortcodeProps::CalendlyButton(CalendlyButtonProps {
                url: Some("https://calendly.com/me".to_string()),
                label: "Book a call".to_string()
            }))
        );
    }

    #[test]
    fn test_tiles_grid_parse() {
        let inner = r#"
<a href="/coaching"><h2>Coaching</h2><img src="./coaching.jpg"></a>
<a href="/blog"><h2 class="t">Writing</h2></a>
<a href=x><h2>No quotes</h2></a>
"#;
        let grid = TilesGrid::parse(inner);
        assert_eq!(grid.tiles.len(), 3);
        assert_eq!(grid.tiles[0].href, "/coaching");
        assert_eq!(grid.tiles[0].title, "Coaching");
        assert_eq!(grid.tiles[0].image.as_deref(), Some("coaching.jpg"));
        assert_eq!(grid.tiles[1].title, "Writing");
        assert_eq!(grid.tiles[1].image, None);
        assert_eq!(grid.tiles[2].href, "#");
    }
}
