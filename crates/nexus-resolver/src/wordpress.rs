//! WordPress plugin/theme version handling.
//!
//! Unlike every other ecosystem, WordPress has no version-resolution step:
//! the request URL's own shape (`tags/<v>` vs. `trunk` for plugins; a bare
//! version for themes) already says everything the cache needs to know, so
//! there is no upstream metadata fetch here at all.

/// The zip archive URL for a WordPress plugin at a tag, or its trunk (the
/// latest stable build, which is what `downloads.wordpress.org` always
/// serves regardless of SVN `trunk`'s literal contents).
#[must_use]
pub fn plugin_archive_url(slug: &str, version: &str) -> String {
    if version == "trunk" {
        format!("https://downloads.wordpress.org/plugin/{slug}.zip")
    } else {
        let version = version.strip_prefix("tags/").unwrap_or(version);
        format!("https://downloads.wordpress.org/plugin/{slug}.{version}.zip")
    }
}

/// The zip archive URL for a WordPress theme at `version`. Themes have no
/// `trunk` route in the CDN grammar, so every theme key is
/// immutable.
#[must_use]
pub fn theme_archive_url(slug: &str, version: &str) -> String {
    format!("https://downloads.wordpress.org/theme/{slug}.{version}.zip")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plugin_tag_url() {
        assert_eq!(
            plugin_archive_url("akismet", "tags/5.3"),
            "https://downloads.wordpress.org/plugin/akismet.5.3.zip"
        );
    }

    #[test]
    fn plugin_trunk_url_has_no_version_suffix() {
        assert_eq!(
            plugin_archive_url("akismet", "trunk"),
            "https://downloads.wordpress.org/plugin/akismet.zip"
        );
    }

    #[test]
    fn theme_url() {
        assert_eq!(
            theme_archive_url("twentytwentyfour", "1.2"),
            "https://downloads.wordpress.org/theme/twentytwentyfour.1.2.zip"
        );
    }
}
