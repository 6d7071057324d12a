//! Per-page output directories.
//!
//! Every page ends up in `<target>/<namespace>/<clean page name>/` as a set of
//! small UTF-8 files. The same files can be read back into a `PageSnapshot`
//! by downstream tools.

use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use itertools::Itertools;
use lazy_regex::{regex_replace_all, regex};
use serde::Serialize;
use url::Url;

use crate::dump::model::Page;
use crate::errors::{MigrateError, Result};

pub const TEXT_FILE: &str = "_text.txt";
pub const ORIGINAL_FILE: &str = "_original.txt";
pub const TITLE_FILE: &str = "_title.txt";
pub const CATEGORIES_FILE: &str = "_categories.txt";
pub const FILES_FILE: &str = "_files.txt";
pub const TIMESTAMP_FILE: &str = "_timestamp.txt";
pub const USER_FILE: &str = "_user.txt";
pub const WGET_FILE: &str = "_wget_files.cmd";

/// Make a title usable as a single path component.
///
/// Drops `. : / \ ? * " < > | # [ ] { }`, collapses whitespace runs and trims.
/// A name with nothing left becomes `_`.
pub fn clean_name(name: &str) -> String {
    let stripped = regex!(r#"[.:/\\?*"<>|#\[\]{}]"#).replace_all(name, "");
    let collapsed = regex_replace_all!(r"\s+", &stripped, " ");
    let cleaned = collapsed.trim();
    if cleaned.is_empty() {
        "_".to_string()
    } else {
        cleaned.to_string()
    }
}

fn lines<'a, I: IntoIterator<Item = &'a String>>(items: I) -> String {
    items.into_iter().map(|s| format!("{}\n", s)).join("")
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    fs::write(path, content).map_err(|e| MigrateError::io(path, e))
}

/// Writes page directories below a target root.
#[derive(Debug)]
pub struct PageWriter {
    target: PathBuf,
    download: Option<Url>,
    wget_dirs: Vec<PathBuf>,
}

impl PageWriter {
    pub fn new<P: Into<PathBuf>>(target: P, download: Option<Url>) -> Self {
        Self {
            target: target.into(),
            download,
            wget_dirs: Vec::new(),
        }
    }

    /// Directory a page goes to.
    pub fn page_dir(&self, page: &Page, namespace: &str) -> PathBuf {
        self.target.join(namespace).join(clean_name(page.title()))
    }

    /// Write every file of `page` and return its directory.
    pub fn write(&mut self, page: &Page, namespace: &str) -> Result<PathBuf> {
        let dir = self.page_dir(page, namespace);
        fs::create_dir_all(&dir).map_err(|e| MigrateError::io(&dir, e))?;
        log::debug!("saving page {:?} to {}", page.title(), dir.display());

        write_file(&dir.join(TEXT_FILE), page.text())?;
        write_file(&dir.join(ORIGINAL_FILE), page.original())?;
        write_file(&dir.join(TITLE_FILE), page.title())?;
        if !page.categories().is_empty() {
            write_file(&dir.join(CATEGORIES_FILE), &lines(page.categories()))?;
        }
        if !page.files().is_empty() {
            let cleaned: Vec<String> = page.files().iter().map(|f| clean_name(f)).collect();
            write_file(&dir.join(FILES_FILE), &lines(&cleaned))?;
            self.write_download_script(page, &dir)?;
        }
        if let Some(millis) = page.revision_millis() {
            write_file(&dir.join(TIMESTAMP_FILE), &millis.to_string())?;
        }
        write_file(&dir.join(USER_FILE), page.author())?;

        Ok(dir)
    }

    fn write_download_script(&mut self, page: &Page, dir: &Path) -> Result<()> {
        let Some(base) = &self.download else {
            return Ok(());
        };
        let mut script = String::new();
        for file in page.files() {
            match base.join(file) {
                Ok(url) => {
                    script.push_str(&format!("wget \"{}\" -O \"{}\"\n", url, clean_name(file)))
                }
                Err(e) => log::warn!("cannot build download url for {:?}: {}", file, e),
            }
        }
        write_file(&dir.join(WGET_FILE), &script)?;
        self.wget_dirs.push(dir.to_path_buf());
        Ok(())
    }

    /// Write the download summary at the target root, when any page has a
    /// download script. Returns the summary path.
    pub fn finish(&self) -> Result<Option<PathBuf>> {
        if self.wget_dirs.is_empty() {
            return Ok(None);
        }
        fs::create_dir_all(&self.target).map_err(|e| MigrateError::io(&self.target, e))?;
        let path = self.target.join(WGET_FILE);
        log::info!("writing download summary {}", path.display());
        let content = self
            .wget_dirs
            .iter()
            .map(|dir| format!("cd \"{}\" && sh {}\n", dir.display(), WGET_FILE))
            .join("");
        write_file(&path, &content)?;
        Ok(Some(path))
    }
}

/// A page directory read back from disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PageSnapshot {
    pub title: String,
    pub text: String,
    pub original: String,
    pub categories: Vec<String>,
    pub files: Vec<String>,
    /// Milliseconds since the Unix epoch.
    pub timestamp: Option<i64>,
    pub author: String,
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(MigrateError::io(path, e)),
    }
}

impl PageSnapshot {
    /// Read a page directory. Missing files read as empty or absent.
    pub fn read_from(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(MigrateError::io(
                dir,
                std::io::Error::new(ErrorKind::NotFound, "not a page directory"),
            ));
        }
        let text_of = |name: &str| -> Result<String> {
            Ok(read_optional(&dir.join(name))?.unwrap_or_default())
        };
        let lines_of = |name: &str| -> Result<Vec<String>> {
            Ok(text_of(name)?
                .lines()
                .filter(|l| !l.is_empty())
                .map(str::to_owned)
                .collect())
        };

        Ok(Self {
            title: text_of(TITLE_FILE)?,
            text: text_of(TEXT_FILE)?,
            original: text_of(ORIGINAL_FILE)?,
            categories: lines_of(CATEGORIES_FILE)?,
            files: lines_of(FILES_FILE)?,
            timestamp: read_optional(&dir.join(TIMESTAMP_FILE))?
                .and_then(|t| t.trim().parse().ok()),
            author: text_of(USER_FILE)?,
        })
    }
}

impl fmt::Display for PageSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "title:      {}", self.title)?;
        writeln!(f, "author:     {}", self.author)?;
        match self.timestamp {
            Some(ts) => writeln!(f, "timestamp:  {}", ts)?,
            None => writeln!(f, "timestamp:  -")?,
        }
        writeln!(f, "categories: {}", self.categories.iter().join(", "))?;
        writeln!(f, "files:      {}", self.files.iter().join(", "))?;
        writeln!(f)?;
        write!(f, "{}", self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dump::model::parse_revision;

    fn sample_page() -> Page {
        let mut page = Page::new(
            "Main: Page?",
            "<p>original</p>",
            "Alice",
            parse_revision("2008-06-01T00:00:00Z"),
        );
        page.set_text("converted");
        page.add_category("Animals");
        page.add_category("Birds");
        page.add_file("cat photo.png");
        page
    }

    #[test]
    fn clean_name_strips_and_collapses() {
        assert_eq!(clean_name("Main: Page?"), "Main Page");
        assert_eq!(clean_name("  a  /  b\t\tc "), "a b c");
        assert_eq!(clean_name("file.name[1]{x}"), "filename1x");
        assert_eq!(clean_name("???"), "_");
        assert_eq!(clean_name("Über Straße"), "Über Straße");
    }

    #[test]
    fn writes_all_files() {
        let root = tempfile::tempdir().unwrap();
        let mut writer = PageWriter::new(root.path(), None);
        let dir = writer.write(&sample_page(), "Sandbox").unwrap();

        assert_eq!(dir, root.path().join("Sandbox").join("Main Page"));
        assert_eq!(fs::read_to_string(dir.join(TEXT_FILE)).unwrap(), "converted");
        assert_eq!(fs::read_to_string(dir.join(ORIGINAL_FILE)).unwrap(), "<p>original</p>");
        assert_eq!(fs::read_to_string(dir.join(TITLE_FILE)).unwrap(), "Main: Page?");
        assert_eq!(fs::read_to_string(dir.join(CATEGORIES_FILE)).unwrap(), "Animals\nBirds\n");
        assert_eq!(fs::read_to_string(dir.join(FILES_FILE)).unwrap(), "cat photopng\n");
        assert_eq!(fs::read_to_string(dir.join(TIMESTAMP_FILE)).unwrap(), "1212278400000");
        assert_eq!(fs::read_to_string(dir.join(USER_FILE)).unwrap(), "Alice");
        assert!(!dir.join(WGET_FILE).exists());
        assert_eq!(writer.finish().unwrap(), None);
    }

    #[test]
    fn optional_files_are_skipped() {
        let root = tempfile::tempdir().unwrap();
        let mut writer = PageWriter::new(root.path(), None);
        let page = Page::new("Plain", "text", "Bob", None);
        let dir = writer.write(&page, "Main").unwrap();
        assert!(!dir.join(CATEGORIES_FILE).exists());
        assert!(!dir.join(FILES_FILE).exists());
        assert!(!dir.join(TIMESTAMP_FILE).exists());
        assert!(dir.join(USER_FILE).exists());
    }

    #[test]
    fn download_scripts() {
        let root = tempfile::tempdir().unwrap();
        let base = Url::parse("http://wiki.example.org/images/").unwrap();
        let mut writer = PageWriter::new(root.path(), Some(base));
        let dir = writer.write(&sample_page(), "Sandbox").unwrap();
        writer.write(&Page::new("No Files", "", "", None), "Sandbox").unwrap();

        let script = fs::read_to_string(dir.join(WGET_FILE)).unwrap();
        assert_eq!(
            script,
            "wget \"http://wiki.example.org/images/cat%20photo.png\" -O \"cat photopng\"\n"
        );

        let summary = writer.finish().unwrap().expect("summary written");
        assert_eq!(summary, root.path().join(WGET_FILE));
        let content = fs::read_to_string(summary).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert!(content.contains(&format!("cd \"{}\"", dir.display())));
        assert!(content.trim_end().ends_with("&& sh _wget_files.cmd"));
    }

    #[test]
    fn read_back_matches_written_page() {
        let root = tempfile::tempdir().unwrap();
        let mut writer = PageWriter::new(root.path(), None);
        let dir = writer.write(&sample_page(), "Sandbox").unwrap();

        let snapshot = PageSnapshot::read_from(&dir).unwrap();
        assert_eq!(
            snapshot,
            PageSnapshot {
                title: "Main: Page?".to_string(),
                text: "converted".to_string(),
                original: "<p>original</p>".to_string(),
                categories: vec!["Animals".to_string(), "Birds".to_string()],
                files: vec!["cat photopng".to_string()],
                timestamp: Some(1_212_278_400_000),
                author: "Alice".to_string(),
            }
        );
        let json: serde_json::Value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["timestamp"], 1_212_278_400_000i64);
        assert_eq!(json["categories"][1], "Birds");

        let shown = snapshot.to_string();
        assert!(shown.contains("Animals, Birds"));
        assert!(shown.ends_with("converted"));
    }

    #[test]
    fn read_back_of_sparse_directory() {
        let root = tempfile::tempdir().unwrap();
        fs::write(root.path().join(TITLE_FILE), "Only Title").unwrap();
        let snapshot = PageSnapshot::read_from(root.path()).unwrap();
        assert_eq!(snapshot.title, "Only Title");
        assert!(snapshot.text.is_empty());
        assert!(snapshot.categories.is_empty());
        assert_eq!(snapshot.timestamp, None);

        let missing = root.path().join("missing");
        assert_eq!(PageSnapshot::read_from(&missing).unwrap_err().kind(), "Io");
    }
}
