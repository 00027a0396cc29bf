//! Markdown rendering with syntax highlighting

use lazy_static::lazy_static;
use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd};
use regex::{Captures, Regex};
use syntect::highlighting::ThemeSet;
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;

use crate::shortcode::{self, Segment, ShortcodeKind};

const MORE_MARKER: &str = "<!-- more -->";

lazy_static! {
    static ref IMG_RE: Regex = Regex::new(r"(?i)<img([^>]*?)>").unwrap();
    static ref IMG_SRC_RE: Regex = Regex::new(r#"(?i)<img([^>]*?)src="([^"]*?)"([^>]*?)>"#).unwrap();
    static ref SRC_ATTR_RE: Regex = Regex::new(r#"src="([^"]*?)""#).unwrap();
    static ref TITLE_ATTR_RE: Regex = Regex::new(r#"title="([^"]*?)""#).unwrap();
    static ref EMPTY_P_RE: Regex = Regex::new(r"(?i)<p>\s*</p>").unwrap();
}

/// Markdown renderer with syntax highlighting
pub struct MarkdownRenderer {
    syntax_set: SyntaxSet,
    theme_set: ThemeSet,
    theme_name: String,
    line_numbers: bool,
}

impl MarkdownRenderer {
    /// Create a new markdown renderer
    pub fn new() -> Self {
        Self::with_options("base16-ocean.dark", false)
    }

    /// Create with custom settings
    pub fn with_options(theme: &str, line_numbers: bool) -> Self {
        Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme_set: ThemeSet::load_defaults(),
            theme_name: theme.to_string(),
            line_numbers,
        }
    }

    /// Render a content body: markdown to HTML with shortcodes kept intact,
    /// `#css` image titles turned into wrappers and relative image sources
    /// resolved against `asset_base`
    pub fn render_content(&self, markdown: &str, asset_base: &str) -> String {
        let (protected, tags) = protect_shortcodes(markdown);
        let html = self.render(&protected);
        let html = style_images(&html);
        let html = rewrite_image_sources(&html, asset_base);
        let html = EMPTY_P_RE.replace_all(&html, "");
        restore_shortcodes(&html, &tags)
    }

    /// Render markdown to HTML
    pub fn render(&self, markdown: &str) -> String {
        // Front-matter is split off before rendering, so no metadata blocks
        let options = Options::ENABLE_TABLES
            | Options::ENABLE_FOOTNOTES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS
            | Options::ENABLE_SMART_PUNCTUATION
            | Options::ENABLE_HEADING_ATTRIBUTES;
        let parser = Parser::new_ext(markdown, options);

        let mut events: Vec<Event> = Vec::new();
        let mut in_code_block = false;
        let mut code_block_lang: Option<String> = None;
        let mut code_block_content = String::new();

        for event in parser {
            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    in_code_block = true;
                    code_block_lang = match kind {
                        CodeBlockKind::Fenced(lang) if !lang.is_empty() => Some(lang.to_string()),
                        _ => None,
                    };
                    code_block_content.clear();
                }
                Event::End(TagEnd::CodeBlock) => {
                    let highlighted =
                        self.highlight_code(&code_block_content, code_block_lang.as_deref());
                    events.push(Event::Html(CowStr::from(highlighted)));
                    in_code_block = false;
                    code_block_lang = None;
                }
                Event::Text(text) if in_code_block => {
                    code_block_content.push_str(&text);
                }
                _ if in_code_block => {}
                _ => events.push(event),
            }
        }

        let mut html_output = String::new();
        html::push_html(&mut html_output, events.into_iter());
        html_output
    }

    /// Highlight a code block
    fn highlight_code(&self, code: &str, lang: Option<&str>) -> String {
        let lang = lang.unwrap_or("text");

        let syntax = self
            .syntax_set
            .find_syntax_by_token(lang)
            .or_else(|| self.syntax_set.find_syntax_by_extension(lang))
            .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text());

        let theme = self
            .theme_set
            .themes
            .get(&self.theme_name)
            .or_else(|| self.theme_set.themes.values().next());

        let highlighted = theme.and_then(|theme| {
            highlighted_html_for_string(code, &self.syntax_set, syntax, theme).ok()
        });

        match highlighted {
            Some(highlighted) if self.line_numbers => self.add_line_numbers(&highlighted, lang),
            Some(highlighted) => format!(
                r#"<figure class="highlight {}">{}</figure>"#,
                lang, highlighted
            ),
            None => format!(
                r#"<pre><code class="language-{}">{}</code></pre>"#,
                lang,
                html_escape(code)
            ),
        }
    }

    /// Add line numbers to highlighted code
    fn add_line_numbers(&self, code: &str, lang: &str) -> String {
        let lines: Vec<&str> = code.lines().collect();

        let gutter = (1..=lines.len())
            .map(|n| format!(r#"<span class="line-number">{}</span>"#, n))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            r#"<figure class="highlight {}"><table><tr><td class="gutter"><pre>{}</pre></td><td class="code">{}</td></tr></table></figure>"#,
            lang,
            gutter,
            lines.join("\n")
        )
    }

    /// Split a body at `<!-- more -->`.
    /// Returns the excerpt (if the marker is present) and the body without
    /// the marker.
    pub fn split_excerpt(content: &str) -> (Option<String>, String) {
        if let Some(pos) = content.find(MORE_MARKER) {
            let excerpt = content[..pos].trim().to_string();
            let remaining = content[pos + MORE_MARKER.len()..].trim();
            let full = format!("{}\n\n{}", excerpt, remaining);
            (Some(excerpt), full)
        } else {
            (None, content.to_string())
        }
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// A shortcode swapped out of the markdown source
struct ProtectedTag {
    token: String,
    kind: ShortcodeKind,
    source: String,
}

fn placeholder(n: usize) -> String {
    format!("FOLIOSHORTCODE{}END", n)
}

/// Replace every complete shortcode with an inert token
fn protect_shortcodes(markdown: &str) -> (String, Vec<ProtectedTag>) {
    let mut out = String::with_capacity(markdown.len());
    let mut tags = Vec::new();

    for segment in shortcode::expand(markdown) {
        match segment {
            Segment::Html(text) => out.push_str(&text),
            Segment::Shortcode(sc) => {
                let token = placeholder(tags.len());
                out.push_str(&token);
                tags.push(ProtectedTag {
                    token,
                    kind: sc.kind,
                    source: sc.source,
                });
            }
        }
    }

    (out, tags)
}

/// Put protected shortcodes back, unwrapping paragraphs that hold nothing
/// but the token
fn restore_shortcodes(html: &str, tags: &[ProtectedTag]) -> String {
    let mut html = html.to_string();
    for tag in tags {
        let restored = if tag.kind == ShortcodeKind::VerticalTilesGrid {
            format!(r#"<div class="clear-both"></div>{}"#, tag.source)
        } else {
            tag.source.clone()
        };

        let wrapped = format!("<p>{}</p>", tag.token);
        if html.contains(&wrapped) {
            html = html.replacen(&wrapped, &restored, 1);
        } else {
            html = html.replacen(&tag.token, &restored, 1);
        }
    }
    html
}

/// Turn images titled `#<css>` into a wrapper div carrying utility classes
fn style_images(html: &str) -> String {
    IMG_RE
        .replace_all(html, |caps: &Captures| {
            let attrs = &caps[1];
            let src = SRC_ATTR_RE.captures(attrs).map(|c| c[1].to_string());
            let title = TITLE_ATTR_RE.captures(attrs).map(|c| c[1].to_string());

            match (src, title) {
                (Some(src), Some(title)) if title.starts_with('#') => {
                    let css = &title[1..];
                    let classes = css_wrapper_classes(css);
                    format!(
                        r#"<div class="{}"><img src="{}" alt="" class="w-full h-auto"></div>"#,
                        classes.join(" "),
                        src
                    )
                }
                _ => caps[0].to_string(),
            }
        })
        .into_owned()
}

fn css_wrapper_classes(css: &str) -> Vec<&'static str> {
    let has = |prop: &str, value: &str| {
        css.contains(&format!("{}={}", prop, value)) || css.contains(&format!("{}:{}", prop, value))
    };

    let mut classes = Vec::new();
    if has("position", "relative") {
        classes.push("relative");
    }
    if has("float", "right") {
        classes.push("float-right");
    }
    if has("width", "50%") {
        classes.push("w-1/2");
    }
    if has("margin", "0 0 20px 20px") {
        classes.push("mb-5 ml-5");
    }
    classes
}

/// Resolve relative image sources against the item's public asset directory
fn rewrite_image_sources(html: &str, asset_base: &str) -> String {
    if asset_base.is_empty() {
        return html.to_string();
    }
    let base = asset_base.trim_end_matches('/');

    IMG_SRC_RE
        .replace_all(html, |caps: &Captures| {
            let src = &caps[2];
            if src.is_empty()
                || src.starts_with("http")
                || src.starts_with('/')
                || src.starts_with("data:")
            {
                return caps[0].to_string();
            }
            format!(
                r#"<img{}src="{}/{}"{}>"#,
                &caps[1],
                base,
                src.trim_start_matches("./"),
                &caps[3]
            )
        })
        .into_owned()
}

/// Simple HTML escaping
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_basic_markdown() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("# Hello World\n\nThis is a test.");
        assert!(html.contains("<h1>Hello World</h1>"));
        assert!(html.contains("<p>This is a test.</p>"));
    }

    #[test]
    fn test_render_code_block() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("```rust\nfn main() {}\n```");
        assert!(html.contains("highlight"));
        assert!(!html.contains("<code>fn main"));
    }

    #[test]
    fn test_line_numbers() {
        let renderer = MarkdownRenderer::with_options("base16-ocean.dark", true);
        let html = renderer.render("```\na\nb\n```");
        assert!(html.contains(r#"<span class="line-number">2</span>"#));
    }

    #[test]
    fn test_split_excerpt() {
        let content = "This is excerpt.\n<!-- more -->\nThis is more content.";
        let (excerpt, full) = MarkdownRenderer::split_excerpt(content);
        assert_eq!(excerpt, Some("This is excerpt.".to_string()));
        assert!(full.contains("This is excerpt."));
        assert!(full.contains("This is more content."));
        assert!(!full.contains("<!-- more -->"));
    }

    #[test]
    fn test_shortcode_survives_markdown() {
        let renderer = MarkdownRenderer::new();
        let md = "Intro *text*\n\n<post-grid featured=\"true\" count=\"2\"></post-grid>\n\nOutro";
        let html = renderer.render_content(md, "");
        assert!(html.contains(r#"<post-grid featured="true" count="2"></post-grid>"#));
        assert!(!html.contains("<p><post-grid"));
        assert!(html.contains("<em>text</em>"));
        assert!(!html.contains("FOLIOSHORTCODE"));
    }

    #[test]
    fn test_tiles_grid_gets_clear_div() {
        let renderer = MarkdownRenderer::new();
        let md = "Before\n\n<vertical-tiles-grid><a href=\"/a\"><h2>A</h2></a></vertical-tiles-grid>\n";
        let html = renderer.render_content(md, "");
        assert!(html.contains(r#"<div class="clear-both"></div><vertical-tiles-grid>"#));
    }

    #[test]
    fn test_inline_tiles_grid_keeps_clear_div() {
        let renderer = MarkdownRenderer::new();
        let md = "Intro text <vertical-tiles-grid><a href=\"/a\"><h2>A</h2></a></vertical-tiles-grid>\n";
        let html = renderer.render_content(md, "");
        assert!(html.contains(
            r#"<p>Intro text <div class="clear-both"></div><vertical-tiles-grid>"#
        ));
        assert!(!html.contains("FOLIOSHORTCODE"));
    }

    #[test]
    fn test_unknown_tag_untouched() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render_content("<mystery-box></mystery-box>\n", "");
        assert!(html.contains("<mystery-box></mystery-box>"));
    }

    #[test]
    fn test_css_image_wrapper() {
        let renderer = MarkdownRenderer::new();
        let md = r##"![](photo.jpg "#float:right;width=50%;margin:0 0 20px 20px")"##;
        let html = renderer.render_content(md, "/content/blog/2021/12/x");
        assert!(html.contains(r#"<div class="float-right w-1/2 mb-5 ml-5">"#));
        assert!(html.contains(r#"src="/content/blog/2021/12/x/photo.jpg""#));
        assert!(html.contains(r#"class="w-full h-auto""#));
    }

    #[test]
    fn test_relative_image_rewrite() {
        let renderer = MarkdownRenderer::new();
        let md = "![a](./a.png)\n\n![b](/static/b.png)\n\n![c](https://cdn.example.com/c.png)";
        let html = renderer.render_content(md, "/content/pages/about");
        assert!(html.contains(r#"src="/content/pages/about/a.png""#));
        assert!(html.contains(r#"src="/static/b.png""#));
        assert!(html.contains(r#"src="https://cdn.example.com/c.png""#));
    }

    #[test]
    fn test_empty_paragraphs_removed() {
        assert_eq!(EMPTY_P_RE.replace_all("<p> </p><p>x</p>", ""), "<p>x</p>");
    }
}
