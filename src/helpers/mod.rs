//! Helper functions for templates
//!
//! These functions back the template filters and functions and provide
//! common functionality like URL generation, date formatting and HTML
//! fragments.

mod date;
mod html;
mod url;

pub use date::*;
pub use html::*;
pub use url::*;

use chrono_tz::Tz;

use crate::config::SiteConfig;
use crate::i18n::I18n;

/// Collection of helper functions bound to one site
#[derive(Debug, Clone)]
pub struct Helpers {
    config: SiteConfig,
    i18n: I18n,
    tz: Tz,
}

impl Helpers {
    /// Create a new helpers instance
    pub fn new(config: SiteConfig, i18n: I18n) -> Self {
        let tz = config.tz();
        Self { config, i18n, tz }
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    pub fn i18n(&self) -> &I18n {
        &self.i18n
    }

    /// Get url_for helper
    pub fn url_for(&self, path: &str) -> String {
        url_for(&self.config, path)
    }

    /// Public URL of a post
    pub fn post_url(&self, uid: &str) -> String {
        post_url(&self.config, uid)
    }

    /// Format a timestamp; unparseable input is returned unchanged
    pub fn date(&self, value: &str, format: Option<&str>) -> String {
        let format = format.unwrap_or(&self.config.date_format);
        format_timestamp(value, format, self.tz, &self.i18n).unwrap_or_else(|| value.to_string())
    }

    /// Comment widget mount, empty when disabled
    pub fn comments(&self) -> String {
        comments_mount(&self.config.comments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_helpers_date() {
        let helpers = Helpers::new(SiteConfig::default(), I18n::new("pt-BR"));
        assert_eq!(helpers.date("2021-03-25T19:25:28+0000", None), "25 mar 2021");
        assert_eq!(
            helpers.date("2021-03-05T19:25:28+0000", Some("d MMM y")),
            "5 mar 2021"
        );
        assert_eq!(helpers.date("garbage", None), "garbage");
    }
}
