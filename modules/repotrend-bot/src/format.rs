//! Message formatting. Pure and deterministic: same repos in, same text out.
//! An empty input renders an explicit "nothing found" line, never an empty
//! string.

use github_client::Repo;

/// Longest description rendered before truncation.
const MAX_DESCRIPTION_CHARS: usize = 120;

/// Render one broadcast message for a keyword's discovered repos.
pub fn format_repos(repos: &[Repo], keyword: &str) -> String {
    if repos.is_empty() {
        return format!("No new trending repositories found for *{keyword}* today.");
    }

    let mut lines = vec![format!("🔥 *Trending repos — {keyword}*"), String::new()];

    for (i, repo) in repos.iter().enumerate() {
        lines.push(format!(
            "{}. *{}* — ⭐ {}",
            i + 1,
            repo.full_name,
            repo.stargazers_count
        ));
        if let Some(desc) = repo.description.as_deref() {
            let desc = truncate(desc.trim(), MAX_DESCRIPTION_CHARS);
            if !desc.is_empty() {
                lines.push(format!("   {desc}"));
            }
        }
        if let Some(lang) = repo.language.as_deref() {
            lines.push(format!("   {lang} · {}", repo.html_url));
        } else {
            lines.push(format!("   {}", repo.html_url));
        }
        lines.push(String::new());
    }

    lines.join("\n").trim_end().to_string()
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{}…", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::make_repo;

    #[test]
    fn empty_input_renders_no_items_text() {
        let text = format_repos(&[], "AI");
        assert!(!text.is_empty());
        assert!(text.contains("No new trending repositories"));
        assert!(text.contains("AI"));
    }

    #[test]
    fn lists_name_stars_and_url() {
        let mut repo = make_repo(1, "acme/widget", 1234);
        repo.description = Some("A widget factory".to_string());
        repo.language = Some("Rust".to_string());

        let text = format_repos(&[repo], "rust");
        assert!(text.contains("acme/widget"));
        assert!(text.contains("1234"));
        assert!(text.contains("A widget factory"));
        assert!(text.contains("https://github.com/acme/widget"));
        assert!(text.contains("Rust"));
    }

    #[test]
    fn long_descriptions_are_truncated() {
        let mut repo = make_repo(1, "a/b", 10);
        repo.description = Some("x".repeat(500));

        let text = format_repos(&[repo], "AI");
        assert!(text.contains('…'));
        assert!(!text.contains(&"x".repeat(200)));
    }

    #[test]
    fn deterministic_for_same_input() {
        let repos = vec![make_repo(1, "a/b", 10), make_repo(2, "c/d", 20)];
        assert_eq!(format_repos(&repos, "AI"), format_repos(&repos, "AI"));
    }
}
