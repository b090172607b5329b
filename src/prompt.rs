use std::path::{Path, PathBuf};

/// Text shown right before the cursor.
pub const PROMPT: &str = "$ ";

const BOLD_GREEN: &str = "\x1b[1;32m";
const BOLD_BLUE: &str = "\x1b[1;34m";
const RESET: &str = "\x1b[0m";

/// Renders the line printed above each prompt.
#[derive(Debug, Clone)]
pub struct PromptStyle {
    home: Option<PathBuf>,
    color: bool,
}

impl PromptStyle {
    pub fn new(home: Option<PathBuf>, color: bool) -> Self {
        Self { home, color }
    }

    /// `[mini-shell] <cwd>` with the home directory shown as `~`.
    pub fn header(&self, cwd: &Path) -> String {
        let path = display_path(cwd, self.home.as_deref());
        if self.color {
            format!("{BOLD_GREEN}[mini-shell]{RESET} {BOLD_BLUE}{path}{RESET}")
        } else {
            format!("[mini-shell] {path}")
        }
    }

    pub fn banner(&self) -> String {
        let title = "mini-shell: type 'help' for the list of built-in commands";
        if self.color {
            format!("{BOLD_GREEN}{title}{RESET}")
        } else {
            title.to_owned()
        }
    }

    pub fn farewell(&self) -> String {
        let text = "Goodbye! Thanks for using mini-shell.";
        if self.color {
            format!("{BOLD_GREEN}{text}{RESET}")
        } else {
            text.to_owned()
        }
    }
}

/// Shortens `cwd` to start with `~` when it lies inside `home`.
///
/// Only whole path components are matched, so `/home/user2` is not shortened
/// for a home of `/home/user`.
pub fn display_path(cwd: &Path, home: Option<&Path>) -> String {
    let Some(home) = home.filter(|h| !h.as_os_str().is_empty() && *h != Path::new("/")) else {
        return cwd.display().to_string();
    };
    match cwd.strip_prefix(home) {
        Ok(rest) if rest.as_os_str().is_empty() => "~".to_owned(),
        Ok(rest) => format!("~/{}", rest.display()),
        Err(_) => cwd.display().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn home_itself_is_tilde() {
        let home = Path::new("/home/ann");
        assert_eq!(display_path(home, Some(home)), "~");
    }

    #[test]
    fn inside_home_is_shortened() {
        let home = Path::new("/home/ann");
        assert_eq!(
            display_path(Path::new("/home/ann/src/shell"), Some(home)),
            "~/src/shell"
        );
    }

    #[test]
    fn sibling_with_common_prefix_is_kept() {
        let home = Path::new("/home/ann");
        assert_eq!(
            display_path(Path::new("/home/anna"), Some(home)),
            "/home/anna"
        );
    }

    #[test]
    fn no_home_or_root_home_is_kept() {
        let cwd = Path::new("/tmp");
        assert_eq!(display_path(cwd, None), "/tmp");
        assert_eq!(display_path(cwd, Some(Path::new("/"))), "/tmp");
    }

    #[test]
    fn header_without_color() {
        let style = PromptStyle::new(Some(PathBuf::from("/home/ann")), false);
        assert_eq!(
            style.header(Path::new("/home/ann/work")),
            "[mini-shell] ~/work"
        );
    }

    #[test]
    fn banners_without_color() {
        let style = PromptStyle::new(None, false);
        assert!(style.banner().contains("'help'"));
        assert_eq!(style.farewell(), "Goodbye! Thanks for using mini-shell.");
    }

    #[test]
    fn farewell_with_color_is_reset() {
        let farewell = PromptStyle::new(None, true).farewell();
        assert!(farewell.starts_with(BOLD_GREEN));
        assert!(farewell.ends_with(RESET));
    }

    #[test]
    fn header_with_color_wraps_in_escapes() {
        let style = PromptStyle::new(None, true);
        let header = style.header(Path::new("/tmp"));
        assert!(header.starts_with("\x1b[1;32m[mini-shell]"));
        assert!(header.ends_with("/tmp\x1b[0m"));
    }
}
