use std::ffi::OsString;
use std::fs::read_dir;
use std::io;
use std::path::Path;

/// Escape < > & ' " into HTML entities.
pub struct HtmlEscaped<'a>(pub &'a str);

impl<'a> std::fmt::Display for HtmlEscaped<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for c in self.0.chars() {
            match c {
                '<' => write!(f, "&lt;")?,
                '>' => write!(f, "&gt;")?,
                '&' => write!(f, "&amp;")?,
                '\'' => write!(f, "&apos;")?,
                '"' => write!(f, "&quot;")?,
                c => write!(f, "{}", c)?,
            }
        }
        Ok(())
    }
}

/// Link list for a directory listing. Each entry is both the href and the label.
struct Listing<'a>(&'a [String]);

impl<'a> std::fmt::Display for Listing<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for name in self.0 {
            writeln!(
                f,
                "<li><a href=\"{}\">{}</a></li>",
                HtmlEscaped(name),
                HtmlEscaped(name)
            )?;
        }
        Ok(())
    }
}

/// Names of the immediate children of `dir`, sorted by name. Directories get a trailing slash.
///
/// Entries that vanish or can't be read mid-listing are skipped with a warning.
pub fn list_entries(dir: &Path) -> io::Result<Vec<String>> {
    let mut entries: Vec<(OsString, bool)> = read_dir(dir)?
        .filter_map(|entry| skip_unreadable(dir, entry))
        .map(|entry| {
            // Like `ls -F`, a symlink to a directory isn't marked.
            let is_dir = entry
                .file_type()
                .map(|file_type| file_type.is_dir())
                .unwrap_or(false);
            (entry.file_name(), is_dir)
        })
        .collect();
    entries.sort();
    Ok(entries
        .into_iter()
        .map(|(name, is_dir)| {
            let mut name = name.to_string_lossy().into_owned();
            if is_dir {
                name.push('/');
            }
            name
        })
        .collect())
}

fn skip_unreadable<T>(dir: &Path, entry: io::Result<T>) -> Option<T> {
    match entry {
        Ok(entry) => Some(entry),
        Err(e) => {
            eprintln!("warning: skipping entry of {}: {}", dir.display(), e);
            None
        }
    }
}

/// HTML page listing `dir`, headed by the request path it was reached through.
pub fn generate_dir_listing(dir: &Path, request_path: &str) -> io::Result<String> {
    let entries = list_entries(dir)?;
    Ok(format!(
        "<html>\n<head>\n<title>Directory listing for {}</title>\n</head>\n\
        <body>\n<h1>Directory listing for {}</h1>\n<ul>\n\
        {}\
        </ul>\n</body>\n</html>\n",
        HtmlEscaped(request_path),
        HtmlEscaped(request_path),
        Listing(&entries),
    ))
}
