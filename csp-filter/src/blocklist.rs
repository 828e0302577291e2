use std::path::{Path, PathBuf};
use std::{fmt, fs, io};

/// Prefixes of blocked URIs that are known to be noise.
const DEFAULT_BLOCKED_PREFIXES: &[&str] = &[
    "resource://",
    "chromenull://",
    "chrome-extension://",
    "safari-extension://",
    "moz-extension://",
    "mxjscall://",
    "webviewprogressproxy://",
    "res://",
    "mx://",
    "safari-resource://",
    "chromeinvoke://",
    "chromeinvokeimmediate://",
    "mbinit://",
    "opera://",
    "ms-appx://",
    "ms-appx-web://",
    "localhost",
    "127.0.0.1",
    "none://",
    "about:blank",
    "android-webview",
    "ms-browser-extension",
    "wvjbscheme://__wvjb_queue_message__",
    "nativebaiduhd://adblock",
    "bdvideo://error",
];

/// Failed to load a blocklist file.
#[derive(Debug, thiserror::Error)]
#[error("could not read blocklist file {}", path.display())]
pub struct BlocklistError {
    path: PathBuf,
    #[source]
    source: io::Error,
}

impl BlocklistError {
    /// The path of the file that failed to load.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// An ordered list of URI prefixes, matched against the blocked URI of violations.
///
/// The blocklist is built once at startup and never changes afterwards.
#[derive(Clone, Eq, PartialEq)]
pub struct Blocklist {
    prefixes: Vec<String>,
}

impl Blocklist {
    /// Creates a blocklist from the given prefixes, preserving their order.
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }

    /// Loads the blocklist from a newline-delimited file, or returns the default blocklist if no
    /// path is given.
    ///
    /// Blank lines and lines starting with `#` are ignored.
    pub fn load(path: Option<&Path>) -> Result<Self, BlocklistError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let content = fs::read_to_string(path).map_err(|source| BlocklistError {
            path: path.to_owned(),
            source,
        })?;

        Ok(Self::new(trim_empty_and_comments(content.lines())))
    }

    /// Returns the first prefix of the blocklist that `uri` starts with.
    pub fn matches(&self, uri: &str) -> Option<&str> {
        self.prefixes
            .iter()
            .map(String::as_str)
            .find(|prefix| uri.starts_with(prefix))
    }

    /// Returns the prefixes of this blocklist in order.
    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    /// Returns the number of prefixes in this blocklist.
    pub fn len(&self) -> usize {
        self.prefixes.len()
    }

    /// Returns `true` if this blocklist has no prefixes and matches nothing.
    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }
}

impl Default for Blocklist {
    fn default() -> Self {
        Self::new(DEFAULT_BLOCKED_PREFIXES.iter().copied())
    }
}

impl fmt::Debug for Blocklist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.prefixes).finish()
    }
}

/// Removes blank lines and comment lines from a list of blocklist entries.
///
/// Comment lines are lines whose first non-whitespace character is `#`. The remaining entries are
/// trimmed and keep their order.
///
/// ```
/// let lines = ["resource://", "", "# comment", "chrome-extension://", ""];
/// let trimmed = csp_filter::trim_empty_and_comments(lines);
///
/// assert_eq!(trimmed, ["resource://", "chrome-extension://"]);
/// ```
pub fn trim_empty_and_comments<I, S>(lines: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    lines
        .into_iter()
        .filter_map(|line| {
            let line = line.as_ref().trim();
            if line.is_empty() || line.starts_with('#') {
                None
            } else {
                Some(line.to_owned())
            }
        })
        .collect()
}
