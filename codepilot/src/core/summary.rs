//! Rendering of the codebase snapshot handed to the completion service.

/// One file as seen by the summarizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSnapshot {
    Readable { name: String, lines: Vec<String> },
    Unreadable { name: String, error: String },
}

const TRUNCATION_MARKER: &str = "\n[truncated]";

/// Concatenate file names and contents into one summary text, capped at
/// `budget_bytes`.
pub fn render_summary(files: &[FileSnapshot], budget_bytes: usize) -> String {
    let mut out = String::new();
    for file in files {
        match file {
            FileSnapshot::Readable { name, lines } => {
                out.push_str("\n---\nFilename: ");
                out.push_str(name);
                out.push('\n');
                for line in lines {
                    out.push_str(line);
                    out.push('\n');
                }
            }
            FileSnapshot::Unreadable { name, error } => {
                out.push_str("\n---\nFilename: ");
                out.push_str(name);
                out.push_str("\n[unreadable: ");
                out.push_str(error);
                out.push_str("]\n");
            }
        }
    }
    truncate_to_budget(out, budget_bytes)
}

fn truncate_to_budget(mut text: String, budget: usize) -> String {
    if text.len() <= budget {
        return text;
    }
    let mut cut = budget.saturating_sub(TRUNCATION_MARKER.len());
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    text.truncate(cut);
    text.push_str(TRUNCATION_MARKER);
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_readable_and_unreadable_files() {
        let files = vec![
            FileSnapshot::Readable {
                name: "a.py".to_string(),
                lines: vec!["print('a')".to_string()],
            },
            FileSnapshot::Unreadable {
                name: "b.bin".to_string(),
                error: "invalid utf-8".to_string(),
            },
        ];
        let summary = render_summary(&files, 10_000);
        assert_eq!(
            summary,
            "\n---\nFilename: a.py\nprint('a')\n\n---\nFilename: b.bin\n[unreadable: invalid utf-8]\n"
        );
    }

    #[test]
    fn empty_codebase_renders_empty_summary() {
        assert_eq!(render_summary(&[], 100), "");
    }

    #[test]
    fn truncates_on_char_boundary() {
        let files = vec![FileSnapshot::Readable {
            name: "u.txt".to_string(),
            lines: vec!["é".repeat(50)],
        }];
        let summary = render_summary(&files, 40);
        assert!(summary.len() <= 40);
        assert!(summary.ends_with("[truncated]"));
    }
}
