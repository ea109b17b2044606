//! HTML helper functions

use crate::config::CommentsConfig;

/// Escape text for use in HTML content and attribute values
pub fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Generate the comment widget mount point
///
/// The utterances client replaces its own `<script>` tag with an iframe,
/// so the script is placed inside the mount element. Returns an empty
/// string when no comments repository is configured.
///
/// # Examples
/// ```ignore
/// comments_mount(&config) // -> <div id="comments"><script src="https://utteranc.es/client.js" ...
/// ```
pub fn comments_mount(config: &CommentsConfig) -> String {
    if !config.enabled() {
        return String::new();
    }

    let mut attrs = vec![
        ("src", config.script.as_str()),
        ("repo", config.repo.trim()),
        ("issue-term", config.issue_term.as_str()),
        ("theme", config.theme.as_str()),
    ];
    if !config.label.is_empty() {
        attrs.push(("label", config.label.as_str()));
    }
    attrs.push(("crossorigin", "anonymous"));

    let attrs: String = attrs
        .iter()
        .map(|(name, value)| format!(r#" {}="{}""#, name, html_escape(value)))
        .collect();

    format!(
        r#"<div id="{}"><script{} async></script></div>"#,
        html_escape(&config.mount_id),
        attrs
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_escape() {
        assert_eq!(
            html_escape(r#"<a href="x">'&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_comments_mount_disabled() {
        assert_eq!(comments_mount(&CommentsConfig::default()), "");
    }

    #[test]
    fn test_comments_mount() {
        let config = CommentsConfig {
            repo: "me/blog-comments".to_string(),
            label: "💬 comments".to_string(),
            ..Default::default()
        };
        let html = comments_mount(&config);
        assert!(html.starts_with(r#"<div id="comments"><script src="https://utteranc.es/client.js""#));
        assert!(html.contains(r#"repo="me/blog-comments""#));
        assert!(html.contains(r#"issue-term="pathname""#));
        assert!(html.contains(r#"theme="github-dark""#));
        assert!(html.contains(r#"label="💬 comments""#));
        assert!(html.ends_with("async></script></div>"));
    }
}
