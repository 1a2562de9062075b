//! Directory listing pages.
//!
//! Deliberately minimal: one link per immediate child, directories marked
//! with `[d]`. Uses [maud](https://maud.lambda.xyz/) so names are HTML-escaped
//! at compile-checked interpolation points; link targets are additionally
//! percent-encoded per path segment.

use crate::source::DirEntry;
use maud::{DOCTYPE, Markup, html};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

/// Characters that must be escaped inside a single URL path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// URL of a child entry under `/gallery`.
pub fn child_href(dir: &str, name: &str) -> String {
    let mut href = String::from("/gallery");
    for segment in dir.split('/').filter(|s| !s.is_empty()).chain([name]) {
        href.push('/');
        href.extend(utf8_percent_encode(segment, SEGMENT));
    }
    href
}

/// Render the listing page for the directory at `logical`.
pub fn render_listing(logical: &str, entries: &[DirEntry]) -> Markup {
    let title = format!("Gallery - /{logical}");
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                title { (title) }
            }
            body {
                h1 { (title) }
                ul {
                    @for entry in entries {
                        li {
                            a href=(child_href(logical, &entry.name)) { (entry.name) }
                            @if entry.is_dir {
                                " " b { "[d]" }
                            }
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, is_dir: bool) -> DirEntry {
        DirEntry {
            name: name.into(),
            is_dir,
        }
    }

    #[test]
    fn href_joins_directory_and_child() {
        assert_eq!(child_href("", "photos"), "/gallery/photos");
        assert_eq!(child_href("photos", "cat.png"), "/gallery/photos/cat.png");
        assert_eq!(child_href("a/b", "c"), "/gallery/a/b/c");
    }

    #[test]
    fn href_escapes_reserved_characters() {
        assert_eq!(
            child_href("my photos", "100% #1?.jpg"),
            "/gallery/my%20photos/100%25%20%231%3F.jpg"
        );
    }

    #[test]
    fn listing_includes_doctype_and_title() {
        let page = render_listing("photos", &[]).into_string();
        assert!(page.starts_with("<!DOCTYPE html>"));
        assert!(page.contains("<title>Gallery - /photos</title>"));
    }

    #[test]
    fn listing_links_each_child_and_marks_directories() {
        let page = render_listing(
            "",
            &[entry("cover.jpeg", false), entry("photos", true)],
        )
        .into_string();

        assert!(page.contains(r#"<a href="/gallery/cover.jpeg">cover.jpeg</a>"#));
        assert!(page.contains(r#"<a href="/gallery/photos">photos</a> <b>[d]</b>"#));
        assert_eq!(page.matches("[d]").count(), 1);
    }

    #[test]
    fn listing_escapes_names() {
        let page = render_listing("", &[entry("<script>.png", false)]).into_string();
        assert!(!page.contains("<script>"));
        assert!(page.contains("&lt;script&gt;.png"));
    }
}
