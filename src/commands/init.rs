//! Initialize a new Folio site

use anyhow::Result;
use std::fs;
use std::path::Path;

const CONFIG: &str = r#"# Folio Configuration

# Site
title: Folio
description: ''
author: John Doe
language: en
timezone: ''

# URL
url: http://localhost:4000
root: /

# Directory
content_dir: content
public_dir: public

# Writing
words_per_minute: 200
featured_count: 3
highlight:
  line_number: false
  theme: base16-ocean.dark

# Cart
cart:
  storage_dir: .folio
  storage_key: cart-storage
  catalog: _products.yml

# Checkout (the secret key is read from the named environment variable)
checkout:
  api_base: https://api.stripe.com/v1
  secret_key_env: STRIPE_SECRET_KEY
  success_path: "/checkout/success?session_id={CHECKOUT_SESSION_ID}"
  cancel_path: /checkout/cancelled
  automatic_tax: true
  allowed_countries: [US, CA]
"#;

const PRODUCTS: &str = r#"# Products offered in the store. Price ids must match the payments provider.
products:
  - id: prod_sample
    name: Sample Product
    description: Replace me with something worth buying
    metadata:
      featured: "true"
    prices:
      - id: price_sample
        currency: usd
        unit_amount: 1500
"#;

const HOME: &str = r#"---
templatekey: index-page
title: Welcome
tagline: A calm place for words and practice
navigation:
  - title: Home
    slug: /
  - title: Blog
    slug: /blog
  - title: About
    slug: /about
  - title: Checkout
    slug: /checkout
    showcartindicator: true
---

Glad you are here.

<post-grid featured="true" count="3"></post-grid>
"#;

const ABOUT: &str = r#"---
templatekey: page
title: About
---

Tell your visitors who you are.
"#;

const AUDIO: &str = r#"---
templatekey: audio-excerpt
title: Morning Practice
audiofile: /audio/morning-practice.mp3
description: A short guided practice
published: false
---
"#;

/// Initialize a new site in the given directory
pub fn init_site(target_dir: &Path) -> Result<()> {
    let content = target_dir.join("content");
    for dir in ["blog", "pages", "home", "audio-excerpts"] {
        fs::create_dir_all(content.join(dir))?;
    }
    fs::create_dir_all(target_dir.join("static"))?;

    let date = chrono::Local::now().format("%Y-%m-%d");
    let hello = format!(
        r#"---
templatekey: blog-post
title: Hello World
date: {}
description: The first post on this site
featuredpost: true
---

Welcome! This is your very first post.

<!-- more -->

Create another one with `folio-rs new post "My New Post"`, then preview the
site with `folio-rs server`.
"#,
        date
    );

    let files = [
        (target_dir.join("_config.yml"), CONFIG.to_string()),
        (target_dir.join("_products.yml"), PRODUCTS.to_string()),
        (content.join("home/index.md"), HOME.to_string()),
        (content.join("pages/about.md"), ABOUT.to_string()),
        (content.join("audio-excerpts/morning-practice.md"), AUDIO.to_string()),
        (content.join("blog/hello-world/index.md"), hello),
    ];

    for (path, body) in files {
        if path.exists() {
            tracing::warn!("Keeping existing {:?}", path);
            continue;
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, body)?;
        tracing::debug!("Created: {:?}", path);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::Catalog;
    use crate::content::{ContentLoader, ContentType};
    use crate::Folio;
    use tempfile::TempDir;

    #[test]
    fn test_init_scaffold_loads() {
        let tmp = TempDir::new().unwrap();
        init_site(tmp.path()).unwrap();

        let folio = Folio::new(tmp.path()).unwrap();
        assert_eq!(folio.config.cart.storage_key, "cart-storage");

        let loader = ContentLoader::new(&folio);
        let site = loader.load_site();
        assert_eq!(site.posts.len(), 1);
        assert_eq!(site.posts[0].slug, "/blog/hello-world");
        assert_eq!(site.pages[0].slug, "/about");
        assert!(site.home.is_some());
        // The sample excerpt ships unpublished
        assert!(site.audio.is_empty());
        assert!(loader.check_slugs(ContentType::Blog).is_ok());

        let catalog = Catalog::load(folio.catalog_path()).unwrap();
        assert!(catalog.find_price("price_sample").is_some());
    }

    #[test]
    fn test_init_keeps_existing_files() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("_config.yml"), "title: Mine\n").unwrap();
        init_site(tmp.path()).unwrap();
        let config = fs::read_to_string(tmp.path().join("_config.yml")).unwrap();
        assert_eq!(config, "title: Mine\n");
    }
}
