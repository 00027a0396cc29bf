//! Configuration module

mod site;

pub use site::CartConfig;
pub use site::CheckoutConfig;
pub use site::HighlightConfig;
pub use site::SiteConfig;
