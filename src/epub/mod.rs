//! EPUB writer. Consumes a `Book` and writes EPUB 2 or EPUB 3 (mimetype, container, OPF, nav/NCX, chapters).

use crate::clean::{escape_attr, escape_text};
use crate::model::Book;
use std::io::{Seek, Write};
use std::path::Path;
use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const CONTAINER_XML: &[u8] = b"<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<container version=\"1.0\" xmlns=\"urn:oasis:names:tc:opendocument:xmlns:container\">\n  <rootfiles>\n    <rootfile full-path=\"OEBPS/content.opf\" media-type=\"application/oebps-package+xml\"/>\n  </rootfiles>\n</container>";

const MIMETYPE: &[u8] = b"application/epub+zip";
const OEBPS_PREFIX: &str = "OEBPS/";

/// EPUB format version.
///
/// Default is EPUB 3 (OPF 3.0, nav.xhtml, HTML5 chapters). Use `Epub2` for legacy readers (OPF 2.0, NCX, XHTML 1.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpubVersion {
    Epub3,
    Epub2,
}

/// Package layout switches besides the version.
#[derive(Debug, Clone, Copy)]
pub struct EpubOptions {
    pub version: EpubVersion,
    /// Include toc.ncx in EPUB 3 (EPUB 2 always has it).
    pub include_ncx: bool,
    /// Visible table-of-contents page at the start of the spine.
    pub include_toc_page: bool,
}

impl Default for EpubOptions {
    fn default() -> Self {
        Self {
            version: EpubVersion::Epub3,
            include_ncx: false,
            include_toc_page: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum EpubError {
    #[error("Cannot write EPUB: book title is empty.")]
    EmptyTitle,

    #[error("Cannot write EPUB: book author is empty.")]
    EmptyAuthor,

    #[error("Cannot write EPUB: book has no chapters.")]
    NoChapters,

    #[error("Failed to create EPUB file: {path}: {source}")]
    CreateFile {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write EPUB archive: {0}")]
    Zip(#[from] zip::result::ZipError),
}

impl From<std::io::Error> for EpubError {
    fn from(e: std::io::Error) -> Self {
        EpubError::Zip(zip::result::ZipError::Io(e))
    }
}

/// Lower-cased series name with spaces as dashes, plus `.epub`.
pub fn epub_file_name(name: &str) -> String {
    format!("{}.epub", name.trim().to_lowercase().replace(' ', "-"))
}

/// Write a [Book](crate::model::Book) to an EPUB file at `path`.
pub fn write_epub(book: &Book, path: &Path, options: EpubOptions) -> Result<(), EpubError> {
    validate_book(book)?;

    let file = std::fs::File::create(path).map_err(|e| EpubError::CreateFile {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut zip = ZipWriter::new(file);

    let options_stored = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored)
        .unix_permissions(0o644);
    let options_deflate = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .unix_permissions(0o644);

    // Mimetype first, uncompressed.
    zip.start_file("mimetype", options_stored)?;
    zip.write_all(MIMETYPE)?;

    zip.start_file("META-INF/container.xml", options_deflate)?;
    zip.write_all(CONTAINER_XML)?;

    let include_ncx = options.include_ncx || options.version == EpubVersion::Epub2;
    write_opf(book, options, include_ncx, &mut zip, options_deflate)?;
    if options.version == EpubVersion::Epub3 {
        write_nav_xhtml(book, &mut zip, options_deflate)?;
    }
    if include_ncx {
        write_ncx(book, &mut zip, options_deflate)?;
    }
    if options.include_toc_page {
        write_toc_page_xhtml(book, options.version, &mut zip, options_deflate)?;
    }
    write_chapters(book, options.version, &mut zip, options_deflate)?;

    zip.finish()?;
    Ok(())
}

fn validate_book(book: &Book) -> Result<(), EpubError> {
    if book.title.trim().is_empty() {
        return Err(EpubError::EmptyTitle);
    }
    if book.author.trim().is_empty() {
        return Err(EpubError::EmptyAuthor);
    }
    if book.chapters.is_empty() {
        return Err(EpubError::NoChapters);
    }
    Ok(())
}

fn identifier(book: &Book) -> String {
    book.identifier.clone().unwrap_or_else(|| {
        format!(
            "urn:nlscrape:{}",
            book.title.trim().to_lowercase().replace(' ', "-")
        )
    })
}

fn write_opf(
    book: &Book,
    options: EpubOptions,
    include_ncx: bool,
    zip: &mut ZipWriter<impl Write + Seek>,
    file_options: SimpleFileOptions,
) -> Result<(), EpubError> {
    let (package_version, spine_attr) = match options.version {
        EpubVersion::Epub3 => ("3.0", ""),
        EpubVersion::Epub2 => ("2.0", r#" toc="ncx""#),
    };

    let mut manifest = String::new();
    if options.version == EpubVersion::Epub3 {
        manifest.push_str(
            r#"    <item id="nav" href="nav.xhtml" media-type="application/xhtml+xml" properties="nav"/>
"#,
        );
    }
    if include_ncx {
        manifest.push_str(
            r#"    <item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>
"#,
        );
    }
    if options.include_toc_page {
        manifest.push_str(
            r#"    <item id="toc-page" href="toc.xhtml" media-type="application/xhtml+xml"/>
"#,
        );
    }
    for (i, _) in book.chapters.iter().enumerate() {
        manifest.push_str(&format!(
            r#"    <item id="chapter-{n}" href="chapter-{n}.xhtml" media-type="application/xhtml+xml"/>
"#,
            n = i + 1
        ));
    }

    // Reading order: optional toc page, then chapters. Nav is not in the spine.
    let mut spine = String::new();
    if options.include_toc_page {
        spine.push_str("    <itemref idref=\"toc-page\"/>\n");
    }
    for (i, _) in book.chapters.iter().enumerate() {
        spine.push_str(&format!("    <itemref idref=\"chapter-{}\"/>\n", i + 1));
    }

    let opf = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" unique-identifier="book-id" version="{package_version}">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:identifier id="book-id">{id}</dc:identifier>
    <dc:title>{title}</dc:title>
    <dc:creator>{creator}</dc:creator>
    <dc:language>{language}</dc:language>
  </metadata>
  <manifest>
{manifest}  </manifest>
  <spine{spine_attr}>
{spine}  </spine>
</package>
"#,
        package_version = package_version,
        id = escape_text(&identifier(book)),
        title = escape_text(&book.title),
        creator = escape_text(&book.author),
        language = escape_text(&book.language),
        manifest = manifest,
        spine_attr = spine_attr,
        spine = spine,
    );

    zip.start_file(format!("{}content.opf", OEBPS_PREFIX), file_options)?;
    zip.write_all(opf.as_bytes())?;
    Ok(())
}

fn chapter_list_items(book: &Book) -> String {
    book.chapters
        .iter()
        .enumerate()
        .map(|(i, ch)| {
            format!(
                "      <li><a href=\"chapter-{}.xhtml\">{}</a></li>\n",
                i + 1,
                escape_attr(&ch.title)
            )
        })
        .collect()
}

fn write_nav_xhtml(
    book: &Book,
    zip: &mut ZipWriter<impl Write + Seek>,
    options: SimpleFileOptions,
) -> Result<(), EpubError> {
    let nav = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops" lang="{lang}" xml:lang="{lang}">
<head>
  <meta charset="UTF-8"/>
  <title>Table of Contents</title>
</head>
<body>
  <nav epub:type="toc">
    <h1>Contents</h1>
    <ol>
{items}    </ol>
  </nav>
</body>
</html>
"#,
        lang = escape_attr(&book.language),
        items = chapter_list_items(book)
    );
    zip.start_file(format!("{}nav.xhtml", OEBPS_PREFIX), options)?;
    zip.write_all(nav.as_bytes())?;
    Ok(())
}

/// Doctype for content documents: HTML5 in EPUB 3, XHTML 1.1 in EPUB 2.
fn doctype(version: EpubVersion) -> &'static str {
    match version {
        EpubVersion::Epub3 => "<!DOCTYPE html>",
        EpubVersion::Epub2 => {
            r#"<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.1//EN" "http://www.w3.org/TR/xhtml11/DTD/xhtml11.dtd">"#
        }
    }
}

/// Visible table-of-contents page (toc.xhtml), first in the spine.
fn write_toc_page_xhtml(
    book: &Book,
    version: EpubVersion,
    zip: &mut ZipWriter<impl Write + Seek>,
    options: SimpleFileOptions,
) -> Result<(), EpubError> {
    let toc_xhtml = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
{doctype}
<html xmlns="http://www.w3.org/1999/xhtml">
<head>
  <meta http-equiv="Content-Type" content="text/html; charset=utf-8"/>
  <title>{title}</title>
</head>
<body>
  <h1>{title}</h1>
    <ol>
{items}    </ol>
</body>
</html>
"#,
        doctype = doctype(version),
        title = escape_attr(&book.title),
        items = chapter_list_items(book)
    );
    zip.start_file(format!("{}toc.xhtml", OEBPS_PREFIX), options)?;
    zip.write_all(toc_xhtml.as_bytes())?;
    Ok(())
}

fn write_ncx(
    book: &Book,
    zip: &mut ZipWriter<impl Write + Seek>,
    options: SimpleFileOptions,
) -> Result<(), EpubError> {
    let mut nav_points = String::new();
    for (i, ch) in book.chapters.iter().enumerate() {
        nav_points.push_str(&format!(
            r#"    <navPoint id="navpoint-{n}" playOrder="{n}">
      <navLabel><text>{label}</text></navLabel>
      <content src="chapter-{n}.xhtml"/>
    </navPoint>
"#,
            n = i + 1,
            label = escape_text(&ch.title),
        ));
    }
    let ncx = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head>
    <meta name="dtb:uid" content="{}"/>
  </head>
  <docTitle>
    <text>{}</text>
  </docTitle>
  <navMap>
{}  </navMap>
</ncx>
"#,
        escape_attr(&identifier(book)),
        escape_text(&book.title),
        nav_points
    );
    zip.start_file(format!("{}toc.ncx", OEBPS_PREFIX), options)?;
    zip.write_all(ncx.as_bytes())?;
    Ok(())
}

fn write_chapters(
    book: &Book,
    version: EpubVersion,
    zip: &mut ZipWriter<impl Write + Seek>,
    options: SimpleFileOptions,
) -> Result<(), EpubError> {
    for (i, ch) in book.chapters.iter().enumerate() {
        let html = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
{doctype}
<html xmlns="http://www.w3.org/1999/xhtml">
<head>
  <meta http-equiv="Content-Type" content="text/html; charset=utf-8"/>
  <title>{title}</title>
</head>
<body>
{body}
</body>
</html>
"#,
            doctype = doctype(version),
            title = escape_text(&ch.title),
            body = ch.body
        );
        let name = format!("{}chapter-{}.xhtml", OEBPS_PREFIX, i + 1);
        zip.start_file(name, options)?;
        zip.write_all(html.as_bytes())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Chapter;
    use std::io::Read;
    use zip::read::ZipArchive;

    fn minimal_book() -> Book {
        Book {
            title: "La Mia Serie".to_string(),
            author: "Autore".to_string(),
            language: "it".to_string(),
            identifier: Some("https://www.novelleleggere.com/category/la-mia-serie".to_string()),
            chapters: vec![
                Chapter {
                    title: "Capitolo 1".to_string(),
                    index: 1,
                    body: "<div><p>Primo paragrafo.</p></div>".to_string(),
                },
                Chapter {
                    title: "Capitolo 2 & fine".to_string(),
                    index: 2,
                    body: "<div><p>Secondo.</p></div>".to_string(),
                },
            ],
        }
    }

    fn read_entry(zip: &mut ZipArchive<std::fs::File>, name: &str) -> String {
        let mut entry = zip.by_name(name).unwrap();
        let mut content = String::new();
        entry.read_to_string(&mut content).unwrap();
        content
    }

    #[test]
    fn epub_file_name_from_series_name() {
        assert_eq!(epub_file_name("La Mia Serie"), "la-mia-serie.epub");
        assert_eq!(epub_file_name(" Solo "), "solo.epub");
    }

    #[test]
    fn rejects_invalid_books() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("void.epub");

        let mut book = minimal_book();
        book.title.clear();
        assert!(matches!(
            write_epub(&book, &path, EpubOptions::default()),
            Err(EpubError::EmptyTitle)
        ));

        let mut book = minimal_book();
        book.author = "  ".to_string();
        assert!(matches!(
            write_epub(&book, &path, EpubOptions::default()),
            Err(EpubError::EmptyAuthor)
        ));

        let mut book = minimal_book();
        book.chapters.clear();
        assert!(matches!(
            write_epub(&book, &path, EpubOptions::default()),
            Err(EpubError::NoChapters)
        ));
    }

    #[test]
    fn epub3_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("la-mia-serie.epub");
        write_epub(&minimal_book(), &path, EpubOptions::default()).unwrap();

        let mut zip = ZipArchive::new(std::fs::File::open(&path).unwrap()).unwrap();
        assert_eq!(zip.by_index(0).unwrap().name(), "mimetype");
        let names: Vec<String> = zip.file_names().map(String::from).collect();
        for expected in [
            "META-INF/container.xml",
            "OEBPS/content.opf",
            "OEBPS/nav.xhtml",
            "OEBPS/toc.xhtml",
            "OEBPS/chapter-1.xhtml",
            "OEBPS/chapter-2.xhtml",
        ] {
            assert!(names.iter().any(|n| n == expected), "missing {}", expected);
        }
        assert!(!names.iter().any(|n| n == "OEBPS/toc.ncx"));

        let opf = read_entry(&mut zip, "OEBPS/content.opf");
        assert!(opf.contains(r#"version="3.0""#));
        assert!(opf.contains("<dc:language>it</dc:language>"));
        assert!(opf.contains("<dc:title>La Mia Serie</dc:title>"));
        let toc_pos = opf.find(r#"idref="toc-page""#).unwrap();
        let ch1_pos = opf.find(r#"idref="chapter-1""#).unwrap();
        assert!(toc_pos < ch1_pos);

        let nav = read_entry(&mut zip, "OEBPS/nav.xhtml");
        assert!(nav.contains("Capitolo 2 &amp; fine"));

        let chapter = read_entry(&mut zip, "OEBPS/chapter-1.xhtml");
        assert!(chapter.contains("<title>Capitolo 1</title>"));
        assert!(chapter.contains("<div><p>Primo paragrafo.</p></div>"));
    }

    #[test]
    fn epub2_layout_has_ncx_and_no_nav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("la-mia-serie.epub");
        let options = EpubOptions {
            version: EpubVersion::Epub2,
            include_ncx: false,
            include_toc_page: false,
        };
        write_epub(&minimal_book(), &path, options).unwrap();

        let mut zip = ZipArchive::new(std::fs::File::open(&path).unwrap()).unwrap();
        let names: Vec<String> = zip.file_names().map(String::from).collect();
        assert!(names.iter().any(|n| n == "OEBPS/toc.ncx"));
        assert!(!names.iter().any(|n| n == "OEBPS/nav.xhtml"));
        assert!(!names.iter().any(|n| n == "OEBPS/toc.xhtml"));

        let opf = read_entry(&mut zip, "OEBPS/content.opf");
        assert!(opf.contains(r#"version="2.0""#));
        assert!(opf.contains(r#"<spine toc="ncx">"#));
        assert!(!opf.contains("toc-page"));

        let ncx = read_entry(&mut zip, "OEBPS/toc.ncx");
        assert!(ncx.contains("https://www.novelleleggere.com/category/la-mia-serie"));
        assert!(ncx.contains(r#"playOrder="2""#));
    }

    #[test]
    fn epub2_toc_page_uses_xhtml11_doctype() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("toc2.epub");
        let options = EpubOptions {
            version: EpubVersion::Epub2,
            include_ncx: false,
            include_toc_page: true,
        };
        write_epub(&minimal_book(), &path, options).unwrap();

        let mut zip = ZipArchive::new(std::fs::File::open(&path).unwrap()).unwrap();
        let toc = read_entry(&mut zip, "OEBPS/toc.xhtml");
        assert!(toc.contains("XHTML 1.1"));
        assert!(!toc.contains("<meta charset"));
        assert!(toc.contains("<h1>La Mia Serie</h1>"));
        let chapter = read_entry(&mut zip, "OEBPS/chapter-1.xhtml");
        assert!(chapter.contains("XHTML 1.1"));

        let dir3 = tempfile::tempdir().unwrap();
        let path3 = dir3.path().join("toc3.epub");
        write_epub(&minimal_book(), &path3, EpubOptions::default()).unwrap();
        let mut zip3 = ZipArchive::new(std::fs::File::open(&path3).unwrap()).unwrap();
        let toc3 = read_entry(&mut zip3, "OEBPS/toc.xhtml");
        assert!(toc3.contains("<!DOCTYPE html>\n"));
        assert!(!toc3.contains("XHTML 1.1"));
    }

    #[test]
    fn epub3_with_ncx_includes_toc_ncx() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ncx.epub");
        let options = EpubOptions {
            include_ncx: true,
            ..EpubOptions::default()
        };
        write_epub(&minimal_book(), &path, options).unwrap();
        let zip = ZipArchive::new(std::fs::File::open(&path).unwrap()).unwrap();
        let names: Vec<String> = zip.file_names().map(String::from).collect();
        assert!(names.iter().any(|n| n == "OEBPS/toc.ncx"));
        assert!(names.iter().any(|n| n == "OEBPS/nav.xhtml"));
    }
}
