use anyhow::Context;

use crate::eid::Eid;

const MARKER: &str = "# ---- everything below this line is ignored ----";

fn parse_editor_note(input: &str) -> anyhow::Result<String> {
    let content = input
        .lines()
        .take_while(|line| line.trim() != MARKER)
        .collect::<Vec<_>>()
        .join("\n");

    let content = content.trim();
    if content.is_empty() {
        anyhow::bail!("note cannot be empty!")
    }

    Ok(content.to_string())
}

/// Opens `$EDITOR` on `initial` and returns what was written.
pub fn edit(initial: &str) -> anyhow::Result<String> {
    let editor = std::env::var("EDITOR").unwrap_or("vim".into());

    let temp_file = std::env::temp_dir().join(format!("spark-{}.md", Eid::new()));
    std::fs::write(
        &temp_file,
        format!(
            r###"{initial}



{MARKER}
# Write your note above. Saving an empty note aborts.
"###
        ),
    )
    .context("error writing temp file")?;

    let shell = std::env::var("SHELL").unwrap_or("/bin/sh".into());
    let status = std::process::Command::new(shell)
        .arg("-c")
        .arg(format!("{editor} {}", temp_file.display()))
        .status()
        .context("failed to run editor")?;

    let content = std::fs::read_to_string(&temp_file).context("error reading temp file");
    std::fs::remove_file(&temp_file).context("error deleting temp file")?;

    if !status.success() {
        anyhow::bail!("editor exited with {status}");
    }

    parse_editor_note(&content?)
}
