//! Front-matter parsing
//!
//! Every content file starts with a YAML block whose `templatekey` decides
//! which shape the rest of the block must have.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};

use super::ContentError;

/// Front-matter data, discriminated by `templatekey`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "templatekey")]
pub enum FrontMatter {
    #[serde(rename = "blog-post")]
    BlogPost(BlogPostMeta),
    #[serde(rename = "page")]
    Page(PageMeta),
    #[serde(rename = "index-page")]
    IndexPage(HomeMeta),
    #[serde(rename = "audio-excerpt")]
    AudioExcerpt(AudioExcerptMeta),
}

/// Blog post front-matter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlogPostMeta {
    pub title: String,
    pub date: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub featuredpost: bool,
    #[serde(default)]
    pub featuredimage: Option<String>,
    /// Slug of an audio excerpt played above the post body
    #[serde(default)]
    pub audioexcerpt: Option<String>,
}

/// Generic page front-matter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageMeta {
    pub title: String,
    #[serde(default)]
    pub audioplayers: Vec<AudioPlayerRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioPlayerRef {
    pub excerpt: String,
}

/// Home page front-matter: site-wide navigation and footer live here
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HomeMeta {
    pub title: String,
    #[serde(default)]
    pub navigation: Vec<NavigationItem>,
    #[serde(default)]
    pub tagline: String,
    #[serde(default)]
    pub homequote: String,
    #[serde(default)]
    pub featuredimage: String,
    #[serde(default)]
    pub footerbioimage: String,
    #[serde(default)]
    pub footerbiotext: String,
    #[serde(default)]
    pub sociallinks: Vec<SocialLink>,
    #[serde(default)]
    pub footermeettext: String,
    #[serde(default)]
    pub footercredits: Vec<FooterCredit>,
    #[serde(default)]
    pub featuredaudio: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationItem {
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub showcartindicator: bool,
    #[serde(default)]
    pub subnav: Vec<SubNavItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubNavItem {
    pub title: String,
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialLink {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FooterCredit {
    pub text: String,
    pub linktext: String,
    pub url: String,
}

/// Audio excerpt front-matter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioExcerptMeta {
    pub title: String,
    pub audiofile: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_published")]
    pub published: bool,
}

fn default_published() -> bool {
    true
}

impl FrontMatter {
    /// Parse front-matter from a file's content.
    /// Returns (front_matter, remaining_content)
    pub fn parse(content: &str) -> Result<(Self, &str), ContentError> {
        let (yaml, body) = split(content).ok_or(ContentError::MissingFrontMatter)?;
        let fm = serde_yaml::from_str::<FrontMatter>(yaml)?;
        Ok((fm, body))
    }

    /// The `templatekey` this front-matter was declared with
    pub fn template_key(&self) -> &'static str {
        match self {
            FrontMatter::BlogPost(_) => "blog-post",
            FrontMatter::Page(_) => "page",
            FrontMatter::IndexPage(_) => "index-page",
            FrontMatter::AudioExcerpt(_) => "audio-excerpt",
        }
    }

    pub fn title(&self) -> &str {
        match self {
            FrontMatter::BlogPost(m) => &m.title,
            FrontMatter::Page(m) => &m.title,
            FrontMatter::IndexPage(m) => &m.title,
            FrontMatter::AudioExcerpt(m) => &m.title,
        }
    }
}

/// Split a `---` delimited YAML block off the start of `content`.
/// Returns `None` when there is no complete block.
pub fn split(content: &str) -> Option<(&str, &str)> {
    let content = content.trim_start_matches('\u{feff}').trim_start();
    let rest = content.strip_prefix("---")?;
    let rest = rest.trim_start_matches([' ', '\t']);
    let rest = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))?;

    // An empty block closes immediately
    if let Some(remaining) = rest.strip_prefix("---") {
        return Some(("", trim_body_start(remaining)));
    }

    let end_pos = rest.find("\n---")?;
    let yaml = &rest[..end_pos];
    let remaining = &rest[end_pos + 4..];
    Some((yaml, trim_body_start(remaining)))
}

fn trim_body_start(s: &str) -> &str {
    // Drop the rest of the closing delimiter line
    let s = match s.find('\n') {
        Some(pos) if s[..pos].trim().is_empty() => &s[pos + 1..],
        None if s.trim().is_empty() => "",
        _ => s,
    };
    s.trim_start_matches(['\n', '\r'])
}

/// Parse a front-matter date string.
///
/// RFC 3339 strings keep their offset. Dates and date-times without an
/// offset are interpreted in `tz` when given, UTC otherwise.
pub fn parse_date(s: &str, tz: Option<chrono_tz::Tz>) -> Option<DateTime<FixedOffset>> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt);
    }

    let formats = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y/%m/%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M",
    ];

    let naive = formats
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            ["%Y-%m-%d", "%Y/%m/%d"]
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })?;

    match tz {
        Some(tz) => tz
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.fixed_offset()),
        None => Some(naive.and_utc().fixed_offset()),
    }
}
