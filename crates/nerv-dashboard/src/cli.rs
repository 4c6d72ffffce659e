use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "nerv-dashboard",
    author,
    version,
    about = "NERV e-paper desk terminal"
)]
pub struct Cli {
    /// Data root holding config/ and logs/ (defaults to $NERV_ROOT, /var/lib/nerv-dashboard or the current directory)
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Render once and exit instead of running the refresh loop
    #[arg(long)]
    pub once: bool,

    /// Page to show first (dashboard, todos, satellite, experimental)
    #[arg(long)]
    pub page: Option<String>,

    /// Write frames as PNG to this path instead of driving the panel
    #[arg(long)]
    pub preview: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_flags() {
        let cli = Cli::parse_from([
            "nerv-dashboard",
            "--root",
            "/srv/nerv",
            "--once",
            "--page",
            "todos",
            "--preview",
            "/tmp/frame.png",
        ]);
        assert_eq!(cli.root, Some(PathBuf::from("/srv/nerv")));
        assert!(cli.once);
        assert_eq!(cli.page.as_deref(), Some("todos"));
        assert_eq!(cli.preview, Some(PathBuf::from("/tmp/frame.png")));
    }

    #[test]
    fn defaults_to_loop_mode() {
        let cli = Cli::parse_from(["nerv-dashboard"]);
        assert!(!cli.once);
        assert!(cli.page.is_none());
    }
}
