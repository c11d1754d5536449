use std::path::Path;

use anyhow::{Context, Result, bail};
use console::{Term, style};
use tokio::process::Command;

/// `$VISUAL`, then `$EDITOR`, then a platform default.
pub fn editor_command() -> String {
    ["VISUAL", "EDITOR"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|value| !value.trim().is_empty())
        .unwrap_or_else(|| {
            if cfg!(windows) {
                "notepad".to_string()
            } else {
                "vi".to_string()
            }
        })
}

/// Open `path` in the user's editor and wait for it to exit.
pub async fn edit_file(path: &Path) -> Result<()> {
    let editor = editor_command();
    let mut parts = editor.split_whitespace();
    let Some(program) = parts.next() else {
        bail!("no editor configured");
    };

    let status = Command::new(program)
        .args(parts)
        .arg(path)
        .status()
        .await
        .with_context(|| format!("failed to launch editor `{}`", editor))?;

    if !status.success() {
        bail!("editor `{}` exited with {}", editor, status);
    }
    Ok(())
}

/// Ask a yes/no question on the terminal. Anything but `y`/`yes` is a no.
pub fn confirm(question: &str) -> Result<bool> {
    let term = Term::stderr();
    term.write_str(&format!(
        "{} {} {} ",
        style("?").yellow().bold(),
        question,
        style("[y/N]").dim()
    ))?;
    let answer = term.read_line()?;
    Ok(is_yes(&answer))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}
