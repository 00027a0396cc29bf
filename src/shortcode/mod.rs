//! Shortcode expansion
//!
//! Content may embed custom pseudo-tags such as
//! `<post-grid featured="true" count="3"></post-grid>` or
//! `<audio-player slug="morning" />`. [`expand`] splits a document into an
//! ordered list of literal HTML and typed shortcode segments with a single
//! left-to-right scan. Anything it does not recognise stays literal.
//!
//! Nested occurrences of the same tag are not supported: the first closing
//! tag ends the shortcode.

mod props;

use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

pub use props::{
    AudioPlayerProps, CalendlyButtonProps, FeaturedProductsProps, PostGridProps, ShortcodeProps,
    Tile, TilesGrid,
};

/// The pseudo-tags the site knows how to render
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShortcodeKind {
    PostGrid,
    VerticalTilesGrid,
    AudioPlayer,
    FeaturedProducts,
    CalendlyButton,
}

impl ShortcodeKind {
    pub const ALL: [ShortcodeKind; 5] = [
        ShortcodeKind::PostGrid,
        ShortcodeKind::VerticalTilesGrid,
        ShortcodeKind::AudioPlayer,
        ShortcodeKind::FeaturedProducts,
        ShortcodeKind::CalendlyButton,
    ];

    pub fn tag_name(&self) -> &'static str {
        match self {
            ShortcodeKind::PostGrid => "post-grid",
            ShortcodeKind::VerticalTilesGrid => "vertical-tiles-grid",
            ShortcodeKind::AudioPlayer => "audio-player",
            ShortcodeKind::FeaturedProducts => "featured-products",
            ShortcodeKind::CalendlyButton => "calendly-button",
        }
    }
}

impl fmt::Display for ShortcodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag_name())
    }
}

impl FromStr for ShortcodeKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.tag_name().eq_ignore_ascii_case(s))
            .ok_or(())
    }
}

/// A recognised pseudo-tag occurrence
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Shortcode {
    pub kind: ShortcodeKind,
    /// Attributes in source order, keys lowercased
    pub attrs: IndexMap<String, String>,
    /// Raw text between the opening and closing tag
    pub inner: String,
    /// The exact source text of the whole tag
    pub source: String,
}

impl Shortcode {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    /// Typed parameters for this shortcode, `None` when required ones are
    /// missing
    pub fn props(&self) -> Option<ShortcodeProps> {
        ShortcodeProps::from_shortcode(self)
    }
}

/// One piece of an expanded document
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Html(String),
    Shortcode(Shortcode),
}

impl Segment {
    /// The source text this segment was cut from
    pub fn source(&self) -> &str {
        match self {
            Segment::Html(html) => html,
            Segment::Shortcode(sc) => &sc.source,
        }
    }
}

/// Concatenate the source text of all segments
pub fn reassemble(segments: &[Segment]) -> String {
    segments.iter().map(Segment::source).collect()
}

/// Split `html` into literal and shortcode segments, in source order
pub fn expand(html: &str) -> Vec<Segment> {
    let lower = html.to_ascii_lowercase();
    let mut segments = Vec::new();
    let mut literal_start = 0;
    let mut pos = 0;

    while let Some(offset) = lower[pos..].find('<') {
        let start = pos + offset;
        match scan_tag(html, &lower, start) {
            Some((shortcode, end)) => {
                push_literal(&mut segments, &html[literal_start..start]);
                segments.push(Segment::Shortcode(shortcode));
                literal_start = end;
                pos = end;
            }
            None => pos = start + 1,
        }
    }

    push_literal(&mut segments, &html[literal_start..]);
    segments
}

/// Slugs of every `audio-player` shortcode in `text`, first occurrence
/// order, without duplicates
pub fn audio_player_slugs(text: &str) -> Vec<String> {
    let mut slugs: Vec<String> = Vec::new();
    for segment in expand(text) {
        if let Segment::Shortcode(sc) = segment {
            if sc.kind != ShortcodeKind::AudioPlayer {
                continue;
            }
            if let Some(slug) = sc.attr("slug").filter(|s| !s.is_empty()) {
                if !slugs.iter().any(|s| s == slug) {
                    slugs.push(slug.to_string());
                }
            }
        }
    }
    slugs
}

fn push_literal(segments: &mut Vec<Segment>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(Segment::Html(prev)) = segments.last_mut() {
        prev.push_str(text);
    } else {
        segments.push(Segment::Html(text.to_string()));
    }
}

/// Try to read a complete shortcode starting at the `<` at `start`.
/// Returns the shortcode and the byte offset just past it.
fn scan_tag(html: &str, lower: &str, start: usize) -> Option<(Shortcode, usize)> {
    let after_lt = &lower[start + 1..];
    let kind = ShortcodeKind::ALL.iter().copied().find(|k| {
        after_lt
            .strip_prefix(k.tag_name())
            .and_then(|rest| rest.chars().next())
            .is_some_and(|c| c.is_ascii_whitespace() || c == '>' || c == '/')
    })?;
    let name = kind.tag_name();

    let attrs_start = start + 1 + name.len();
    let open_end = find_tag_end(html, attrs_start)?;
    let mut attr_text = &html[attrs_start..open_end];

    let self_closing = attr_text.trim_end().ends_with('/');
    if self_closing {
        attr_text = attr_text.trim_end().trim_end_matches('/');
    }
    let attrs = parse_attrs(attr_text);
    let body_start = open_end + 1;

    let (inner, end) = if self_closing {
        (String::new(), body_start)
    } else {
        let closing = format!("</{}", name);
        let close_rel = lower[body_start..].find(&closing)?;
        let close_start = body_start + close_rel;
        let close_gt = lower[close_start..].find('>')? + close_start;
        // Only whitespace may sit between the name and '>'
        if !lower[close_start + closing.len()..close_gt].trim().is_empty() {
            return None;
        }
        (html[body_start..close_start].to_string(), close_gt + 1)
    };

    Some((
        Shortcode {
            kind,
            attrs,
            inner,
            source: html[start..end].to_string(),
        },
        end,
    ))
}

/// Find the `>` closing an opening tag, skipping quoted attribute values
fn find_tag_end(html: &str, from: usize) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, c) in html[from..].char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(c),
            (None, '>') => return Some(from + i),
            (None, '<') => return None,
            _ => {}
        }
    }
    None
}

/// Parse `name="value"`, `name='value'`, `name=value` and bare `name`
fn parse_attrs(text: &str) -> IndexMap<String, String> {
    let mut attrs = IndexMap::new();
    let mut chars = text.chars().peekable();

    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        let mut name = String::new();
        while let Some(&c) = chars.peek() {
            if c.is_whitespace() || c == '=' {
                break;
            }
            name.push(c);
            chars.next();
        }
        if name.is_empty() {
            match chars.next() {
                // Stray '=' with no name
                Some(_) => continue,
                None => break,
            }
        }

        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        let mut value = String::new();
        if chars.peek() == Some(&'=') {
            chars.next();
            while chars.peek().is_some_and(|c| c.is_whitespace()) {
                chars.next();
            }
            match chars.peek().copied() {
                Some(q) if q == '"' || q == '\'' => {
                    chars.next();
                    for c in chars.by_ref() {
                        if c == q {
                            break;
                        }
                        value.push(c);
                    }
                }
                _ => {
                    while let Some(&c) = chars.peek() {
                        if c.is_whitespace() {
                            break;
                        }
                        value.push(c);
                        chars.next();
                    }
                }
            }
        }
        attrs.insert(name.to_ascii_lowercase(), value);
    }

    attrs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shortcodes(segments: &[Segment]) -> Vec<&Shortcode> {
        segments
            .iter()
            .filter_map(|s| match s {
                Segment::Shortcode(sc) => Some(sc),
                Segment::Html(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_plain_html_is_one_segment() {
        let html = "<h1>Hello</h1><p>World</p>";
        let segments = expand(html);
        assert_eq!(segments, vec![Segment::Html(html.to_string())]);
    }

    #[test]
    fn test_post_grid_with_attributes() {
        let html = r#"<p>Intro</p><post-grid featured="true" count="4" slug="/blog/x"></post-grid><p>Outro</p>"#;
        let segments = expand(html);
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0], Segment::Html("<p>Intro</p>".to_string()));
        let Segment::Shortcode(sc) = &segments[1] else {
            panic!("expected shortcode");
        };
        assert_eq!(sc.kind, ShortcodeKind::PostGrid);
        assert_eq!(sc.attr("featured"), Some("true"));
        assert_eq!(sc.attr("count"), Some("4"));
        assert_eq!(sc.attr("slug"), Some("/blog/x"));
        assert_eq!(segments[2], Segment::Html("<p>Outro</p>".to_string()));
    }

    #[test]
    fn test_order_matches_first_occurrence() {
        let html = concat!(
            r#"<audio-player slug="b"></audio-player>"#,
            "<p>x</p>",
            r#"<post-grid></post-grid>"#,
            r#"<audio-player slug="a" />"#,
        );
        let kinds: Vec<_> = shortcodes(&expand(html)).iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ShortcodeKind::AudioPlayer,
                ShortcodeKind::PostGrid,
                ShortcodeKind::AudioPlayer
            ]
        );
    }

    #[test]
    fn test_unknown_tag_passes_through() {
        let html = r#"<p>a</p><mystery-box size="2"></mystery-box><p>b</p>"#;
        let segments = expand(html);
        assert_eq!(segments, vec![Segment::Html(html.to_string())]);
    }

    #[test]
    fn test_similar_prefix_is_not_a_shortcode() {
        let html = "<post-grid-extra></post-grid-extra>";
        assert_eq!(expand(html), vec![Segment::Html(html.to_string())]);
    }

    #[test]
    fn test_unclosed_tag_passes_through() {
        let html = r#"<p>a</p><post-grid count="2"><p>never closed</p>"#;
        assert_eq!(expand(html), vec![Segment::Html(html.to_string())]);

        let html = r#"<post-grid count="2"#;
        assert_eq!(expand(html), vec![Segment::Html(html.to_string())]);
    }

    #[test]
    fn test_reassemble_reproduces_input() {
        let html = concat!(
            "<p>one</p>",
            r#"<vertical-tiles-grid><a href="/a"><h2>A</h2></a></vertical-tiles-grid>"#,
            "<unknown-tag></unknown-tag>",
            r#"<calendly-button url="https://calendly.com/x">Book</calendly-button>"#,
            "<p>two</p>",
        );
        let segments = expand(html);
        assert_eq!(shortcodes(&segments).len(), 2);
        assert_eq!(reassemble(&segments), html);
    }

    #[test]
    fn test_case_insensitive_tag_names() {
        let html = r#"<Post-Grid Count="2"></POST-GRID>"#;
        let segments = expand(html);
        let sc = shortcodes(&segments)[0];
        assert_eq!(sc.kind, ShortcodeKind::PostGrid);
        assert_eq!(sc.attr("count"), Some("2"));
        assert_eq!(sc.source, html);
    }

    #[test]
    fn test_quoted_gt_in_attribute() {
        let html = r#"<audio-player slug="a" title="a > b"></audio-player>"#;
        let segments = expand(html);
        let sc = shortcodes(&segments)[0];
        assert_eq!(sc.attr("title"), Some("a > b"));
    }

    #[test]
    fn test_parse_attrs_forms() {
        let attrs = parse_attrs(r#" a="1" b='two words' c=3 d "#);
        assert_eq!(attrs.get("a").map(String::as_str), Some("1"));
        assert_eq!(attrs.get("b").map(String::as_str), Some("two words"));
        assert_eq!(attrs.get("c").map(String::as_str), Some("3"));
        assert_eq!(attrs.get("d").map(String::as_str), Some(""));
        let keys: Vec<_> = attrs.keys().cloned().collect();
        assert_eq!(keys, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_nested_same_tag_ends_at_first_close() {
        let html = "<post-grid><post-grid></post-grid></post-grid>";
        let segments = expand(html);
        let sc = shortcodes(&segments)[0];
        assert_eq!(sc.inner, "<post-grid>");
        assert_eq!(reassemble(&segments), html);
    }

    #[test]
    fn test_audio_player_slugs() {
        let text = concat!(
            r#"<audio-player slug="morning" title="Morning"></audio-player>"#,
            r#"<audio-player slug="evening"></audio-player>"#,
            r#"<audio-player slug="morning"></audio-player>"#,
            r#"<audio-player></audio-player>"#,
        );
        assert_eq!(audio_player_slugs(text), vec!["morning", "evening"]);
    }
}
