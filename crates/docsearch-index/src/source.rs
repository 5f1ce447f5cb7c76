//! Document sources feeding the index builder.
//!
//! A [`DocumentSource`] enumerates the files of a documentation tree and
//! turns each one into a [`DocumentRecord`]. [`MdxDocumentSource`] is the
//! filesystem implementation for `.mdx` pages with YAML frontmatter.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use gray_matter::engine::YAML;
use gray_matter::Matter;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};
use walkdir::WalkDir;

use docsearch_types::{DocumentRecord, Metadata};

use crate::error::SourceError;

/// Extension of documentation pages.
pub const DEFAULT_EXTENSION: &str = "mdx";

/// Producer of document records for a rebuild pass.
pub trait DocumentSource: Send + Sync {
    /// All document files, in the order they should be indexed.
    fn list_documents(&self) -> Vec<PathBuf>;

    /// Parse one file into a record.
    fn parse_document(&self, path: &Path) -> Result<DocumentRecord, SourceError>;
}

/// `.mdx` files under a root directory.
#[derive(Debug, Clone)]
pub struct MdxDocumentSource {
    root: PathBuf,
}

impl MdxDocumentSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// URL path for a file under the root, e.g. `root/sdk/camera.mdx` -> `/sdk/camera`.
    pub fn url_path(&self, file: &Path) -> Result<String, SourceError> {
        let relative = file
            .strip_prefix(&self.root)
            .map_err(|_| SourceError::OutsideRoot(file.display().to_string()))?;
        let relative = relative.to_string_lossy().replace('\\', "/");
        let suffix = format!(".{}", DEFAULT_EXTENSION);
        let trimmed = relative.strip_suffix(&suffix).unwrap_or(&relative);
        Ok(format!("/{}", trimmed))
    }
}

impl DocumentSource for MdxDocumentSource {
    fn list_documents(&self) -> Vec<PathBuf> {
        if !self.root.exists() {
            warn!(path = ?self.root, "Documentation directory not found");
            return Vec::new();
        }

        let suffix = format!(".{}", DEFAULT_EXTENSION);
        let files: Vec<PathBuf> = WalkDir::new(&self.root)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable directory entry");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(&suffix))
            .map(|entry| entry.into_path())
            .collect();

        debug!(root = ?self.root, files = files.len(), "Listed documentation files");
        files
    }

    fn parse_document(&self, path: &Path) -> Result<DocumentRecord, SourceError> {
        let raw = fs::read_to_string(path).map_err(|source| SourceError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let url_path = self.url_path(path)?;
        let (metadata, body) = split_frontmatter(&raw, path)?;

        let title = match metadata.get("title") {
            Some(Value::String(title)) if !title.trim().is_empty() => title.clone(),
            _ => title_from_filename(path).unwrap_or_else(|| url_path.clone()),
        };
        let description = match metadata.get("description") {
            Some(Value::String(description)) => Some(description.clone()),
            _ => None,
        };

        let mut record = DocumentRecord::new(title, url_path)
            .with_content(strip_mdx(&body))
            .with_source_location(path.display().to_string())
            .with_metadata(metadata);
        record.description = description;
        Ok(record)
    }
}

/// Separate YAML frontmatter from the page body.
///
/// A block that is not valid YAML (unquoted colons in a title are common)
/// is read with [`parse_frontmatter_lines`] instead of dropping the page.
pub fn split_frontmatter(raw: &str, path: &Path) -> Result<(Metadata, String), SourceError> {
    let matter = Matter::<YAML>::new();
    match matter.parse::<Value>(raw) {
        Ok(parsed) => {
            let metadata = match parsed.data {
                Some(Value::Object(map)) => map,
                _ => Metadata::new(),
            };
            Ok((metadata, parsed.content))
        }
        Err(e) => {
            let (metadata, body) =
                parse_frontmatter_lines(raw).ok_or_else(|| SourceError::Frontmatter {
                    path: path.display().to_string(),
                    message: e.to_string(),
                })?;
            warn!(path = ?path, error = %e, "Frontmatter is not valid YAML, read line by line");
            Ok((metadata, body))
        }
    }
}

/// Lenient `key: value` reader for a `---` delimited frontmatter block.
///
/// Each line splits on its first colon. Surrounding quotes are removed,
/// `true`/`false` become booleans and `[a, b]` becomes a list of strings.
/// Returns `None` when there is no complete block.
pub fn parse_frontmatter_lines(raw: &str) -> Option<(Metadata, String)> {
    let mut lines = raw.split_inclusive('\n');
    let first = lines.next()?;
    if first.trim_end() != "---" {
        return None;
    }

    let mut metadata = Metadata::new();
    let mut offset = first.len();
    for line in lines {
        offset += line.len();
        let line = line.trim_end_matches(['\n', '\r']);
        if line.trim_end() == "---" {
            return Some((metadata, raw[offset..].to_string()));
        }
        if let Some((key, value)) = line.split_once(':') {
            let key = key.trim();
            if !key.is_empty() {
                metadata.insert(key.to_string(), frontmatter_value(value.trim()));
            }
        }
    }
    None
}

fn strip_quotes(value: &str) -> &str {
    let quoted = value.len() >= 2
        && ((value.starts_with('\'') && value.ends_with('\''))
            || (value.starts_with('"') && value.ends_with('"')));
    if quoted {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

fn frontmatter_value(raw: &str) -> Value {
    let value = strip_quotes(raw);
    match value {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ if value.starts_with('[') && value.ends_with(']') => Value::Array(
            value[1..value.len() - 1]
                .split(',')
                .map(|item| item.trim())
                .filter(|item| !item.is_empty())
                .map(|item| {
                    let item = item.strip_prefix(['\'', '"']).unwrap_or(item);
                    let item = item.strip_suffix(['\'', '"']).unwrap_or(item);
                    Value::String(item.to_string())
                })
                .collect(),
        ),
        _ => Value::String(value.to_string()),
    }
}

/// Readable title from a file name: `app-config.mdx` -> `App Config`.
pub fn title_from_filename(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_string_lossy();
    let stem = name
        .strip_suffix(".mdx")
        .or_else(|| name.strip_suffix(".md"))
        .unwrap_or(&name);

    let title = stem
        .split('-')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ");

    if title.trim().is_empty() {
        None
    } else {
        Some(title)
    }
}

static IMPORT_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?m)^import\s+.*?from\s+['"].*?['"];?\s*$"#).unwrap());
static JSX_SELF_CLOSING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[A-Z][a-zA-Z0-9]*[^>]*/>").unwrap());
static JSX_PAIRED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<[A-Z][a-zA-Z0-9]*[^>]*>[\s\S]*?</[A-Z][a-zA-Z0-9]*>").unwrap()
});
static HTML_COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<!--[\s\S]*?-->").unwrap());
static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"```[\s\S]*?```").unwrap());
static INLINE_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`([^`]+)`").unwrap());
static IMAGE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"!\[([^\]]*)\]\([^)]+\)").unwrap());
static LINK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\([^)]+\)").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Reduce an MDX body to searchable plain text.
pub fn strip_mdx(body: &str) -> String {
    let text = IMPORT_LINE.replace_all(body, "");
    let text = JSX_SELF_CLOSING.replace_all(&text, "");
    let text = JSX_PAIRED.replace_all(&text, "");
    let text = HTML_COMMENT.replace_all(&text, "");
    let text = CODE_FENCE.replace_all(&text, "[code block]");
    let text = INLINE_CODE.replace_all(&text, "$1");
    let text = IMAGE.replace_all(&text, "");
    let text = LINK.replace_all(&text, "$1");
    let text = WHITESPACE.replace_all(&text, " ");
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, content: &str) -> PathBuf {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_strip_mdx() {
        let body = "import { Tabs } from '~/ui/Tabs';\n\n# Camera\n\n<Callout type=\"info\">Hidden note</Callout>\n\
            Use `Camera.requestPermissions()` before <Badge /> taking pictures.\n\n\
            <!-- internal -->\n```js\nconst x = 1;\n```\n\
            See [the guide](/guides/permissions) ![diagram](/img/a.png)";
        let text = strip_mdx(body);
        assert_eq!(
            text,
            "# Camera Use Camera.requestPermissions() before taking pictures. [code block] See the guide"
        );
    }

    #[test]
    fn test_title_from_filename() {
        assert_eq!(
            title_from_filename(Path::new("/docs/app-config.mdx")).as_deref(),
            Some("App Config")
        );
        assert_eq!(
            title_from_filename(Path::new("intro.md")).as_deref(),
            Some("Intro")
        );
    }

    #[test]
    fn test_url_path() {
        let source = MdxDocumentSource::new("/srv/docs");
        assert_eq!(
            source.url_path(Path::new("/srv/docs/sdk/camera.mdx")).unwrap(),
            "/sdk/camera"
        );
        assert!(source.url_path(Path::new("/elsewhere/a.mdx")).is_err());
    }

    #[test]
    fn test_list_documents_in_walk_order() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "sdk/camera.mdx", "Camera");
        write(temp.path(), "get-started/introduction.mdx", "Intro");
        write(temp.path(), "get-started/notes.txt", "ignored");
        write(temp.path(), "sdk/audio.mdx", "Audio");

        let source = MdxDocumentSource::new(temp.path());
        let names: Vec<String> = source
            .list_documents()
            .iter()
            .map(|p| source.url_path(p).unwrap())
            .collect();
        assert_eq!(
            names,
            vec!["/get-started/introduction", "/sdk/audio", "/sdk/camera"]
        );
    }

    #[test]
    fn test_list_documents_missing_root() {
        let temp = TempDir::new().unwrap();
        let source = MdxDocumentSource::new(temp.path().join("missing"));
        assert!(source.list_documents().is_empty());
    }

    #[test]
    fn test_parse_document_with_frontmatter() {
        let temp = TempDir::new().unwrap();
        let path = write(
            temp.path(),
            "sdk/camera.mdx",
            "---\ntitle: Camera\ndescription: 'Take pictures'\npackageName: expo-camera\nplatforms: ['android', 'ios']\n---\n\nCamera module permissions\n",
        );

        let source = MdxDocumentSource::new(temp.path());
        let doc = source.parse_document(&path).unwrap();
        assert_eq!(doc.title, "Camera");
        assert_eq!(doc.description.as_deref(), Some("Take pictures"));
        assert_eq!(doc.path, "/sdk/camera");
        assert_eq!(doc.content, "Camera module permissions");
        assert_eq!(doc.metadata["packageName"], "expo-camera");
        assert_eq!(doc.metadata["platforms"][1], "ios");
        assert!(doc.source_location.ends_with("camera.mdx"));
    }

    #[test]
    fn test_parse_document_without_frontmatter() {
        let temp = TempDir::new().unwrap();
        let path = write(temp.path(), "guides/app-config.mdx", "Configure the app");

        let source = MdxDocumentSource::new(temp.path());
        let doc = source.parse_document(&path).unwrap();
        assert_eq!(doc.title, "App Config");
        assert!(doc.description.is_none());
        assert!(doc.metadata.is_empty());
        assert_eq!(doc.content, "Configure the app");
    }

    #[test]
    fn test_parse_document_with_colons_in_frontmatter() {
        let temp = TempDir::new().unwrap();
        let path = write(
            temp.path(),
            "router/tutorial.mdx",
            "---\ntitle: Tutorial: Using the router\ndescription: Learn how to: navigate\n---\n\nRouter body",
        );

        let source = MdxDocumentSource::new(temp.path());
        let doc = source.parse_document(&path).unwrap();
        assert_eq!(doc.title, "Tutorial: Using the router");
        assert_eq!(doc.description.as_deref(), Some("Learn how to: navigate"));
        assert_eq!(doc.content, "Router body");
        assert_eq!(doc.path, "/router/tutorial");
    }

    #[test]
    fn test_parse_frontmatter_lines() {
        let raw = "---\r\ntitle: 'Quoted: title'\r\nhideTOC: true\r\nplatforms: ['android', \"ios\"]\r\nnot a pair\r\n---\r\nBody";
        let (metadata, body) = parse_frontmatter_lines(raw).unwrap();
        assert_eq!(metadata["title"], "Quoted: title");
        assert_eq!(metadata["hideTOC"], true);
        assert_eq!(metadata["platforms"], serde_json::json!(["android", "ios"]));
        assert_eq!(metadata.len(), 3);
        assert_eq!(body, "Body");

        assert!(parse_frontmatter_lines("no frontmatter").is_none());
        assert!(parse_frontmatter_lines("---\ntitle: open").is_none());
    }

    #[test]
    fn test_parse_missing_file_fails() {
        let temp = TempDir::new().unwrap();
        let source = MdxDocumentSource::new(temp.path());
        let err = source
            .parse_document(&temp.path().join("gone.mdx"))
            .unwrap_err();
        assert!(matches!(err, SourceError::Read { .. }));
    }
}
