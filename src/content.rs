use comrak::ComrakOptions;
use gray_matter::engine::YAML;
use gray_matter::Matter;
use std::path::Path;

use crate::domain::{Frontmatter, Preview};
use crate::error::NoteError;
use crate::notes::read_note;

/// Options for previewing a note as the editor shows it: every newline is a
/// line break, and HTML typed into a note is shown as text rather than run.
pub fn preview_options() -> ComrakOptions {
    let mut options = ComrakOptions::default();
    options.extension.table = true;
    options.extension.strikethrough = true;
    options.extension.tasklist = true;
    options.extension.autolink = true;
    options.extension.footnotes = true;
    options.render.hardbreaks = true;
    options.render.escape = true;
    options
}

/// Renders the note at `relative` to HTML. YAML front matter is stripped from
/// the body; its `title` wins over the file stem.
pub fn preview_note(root: &Path, relative: &str) -> Result<Preview, NoteError> {
    let data = read_note(root, relative)?;
    let markdown = String::from_utf8_lossy(&data);
    let fallback_title = Path::new(relative)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("untitled");
    Ok(render_markdown(&markdown, fallback_title, &preview_options()))
}

pub fn render_markdown(markdown: &str, fallback_title: &str, options: &ComrakOptions) -> Preview {
    let matter = Matter::<YAML>::new();
    let result = matter.parse(markdown);

    let frontmatter = match result.data {
        Some(data) => data.deserialize::<Frontmatter>().unwrap_or_else(|e| {
            log::debug!("Ignoring unreadable front matter in {fallback_title}: {e}");
            Frontmatter::default()
        }),
        None => Frontmatter::default(),
    };

    Preview {
        title: frontmatter
            .title
            .unwrap_or_else(|| fallback_title.to_string()),
        date: frontmatter.date,
        tags: frontmatter.tags,
        html: comrak::markdown_to_html(&result.content, options),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn front_matter_is_stripped_and_used() {
        let md = "---\ntitle: Trip plan\ntags: [travel]\n---\n# Day one\n\n- [x] book train\n";
        let preview = render_markdown(md, "trip", &preview_options());
        assert_eq!(preview.title, "Trip plan");
        assert_eq!(preview.tags, Some(vec!["travel".to_string()]));
        assert!(preview.html.contains("<h1>Day one</h1>"));
        assert!(!preview.html.contains("title:"));
    }

    #[test]
    fn newlines_break_and_raw_html_is_escaped() {
        let preview = render_markdown(
            "first line\nsecond line\n\n<script>alert(1)</script>\n\n~~gone~~",
            "scratch",
            &preview_options(),
        );
        assert!(preview.html.contains("first line<br />"));
        assert!(preview.html.contains("&lt;script&gt;"));
        assert!(!preview.html.contains("<script>"));
        assert!(preview.html.contains("<del>gone</del>"));
    }

    #[test]
    fn title_falls_back_to_file_stem() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("groceries.md"), "| a | b |\n|---|---|\n| 1 | 2 |\n")
            .unwrap();
        let preview = preview_note(temp.path(), "groceries.md").unwrap();
        assert_eq!(preview.title, "groceries");
        assert!(preview.html.contains("<table>"));
    }

    #[test]
    fn missing_note_propagates_not_found() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            preview_note(temp.path(), "nope.md"),
            Err(NoteError::NotFound { .. })
        ));
    }
}
