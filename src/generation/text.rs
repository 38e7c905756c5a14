//! Text utilities shared by the generation client and the pipeline stages.

/// Normalize provider output.
///
/// Line endings become `\n`, trailing whitespace is stripped from every line,
/// any run of two or more blank lines collapses to one blank line and the
/// result is trimmed. Applying it twice yields the same string.
pub fn normalize_text(input: &str) -> String {
    let unified = input.replace("\r\n", "\n").replace('\r', "\n");
    let mut out = String::with_capacity(unified.len());
    let mut blank_run = 0usize;

    for line in unified.split('\n') {
        let line = line.trim_end();
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }

    out.trim().to_string()
}

/// Whitespace-separated token count.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Join context blocks and cap them at `budget_chars` characters.
///
/// Empty blocks are skipped. When the joined text exceeds the budget it is cut
/// on a character boundary and a truncation marker is appended.
pub fn cap_context(blocks: &[String], budget_chars: usize) -> String {
    let joined = blocks
        .iter()
        .map(|block| block.as_str())
        .filter(|block| !block.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");

    match joined.char_indices().nth(budget_chars) {
        Some((cut, _)) => format!(
            "{}\n\n[Context truncated to {} characters]",
            &joined[..cut],
            budget_chars
        ),
        None => joined,
    }
}

/// Build the provider input: capped context, a blank line, then the prompt.
pub fn compose_input(blocks: &[String], prompt: &str, budget_chars: usize) -> String {
    let context = cap_context(blocks, budget_chars);
    if context.is_empty() {
        prompt.to_string()
    } else {
        format!("{}\n\n{}", context, prompt)
    }
}

/// The last `max_chars` characters of `text`.
pub fn trailing_excerpt(text: &str, max_chars: usize) -> &str {
    let total = text.chars().count();
    if total <= max_chars {
        return text;
    }
    match text.char_indices().nth(total - max_chars) {
        Some((start, _)) => &text[start..],
        None => text,
    }
}

/// Strip list numbering and bullet markers ("1.", "2)", "-", "*") from a line.
pub fn strip_list_marker(line: &str) -> &str {
    let trimmed = line.trim_start();
    let digits = trimmed.len() - trimmed.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    let rest = if digits > 0 {
        let after = &trimmed[digits..];
        after
            .strip_prefix('.')
            .or_else(|| after.strip_prefix(')'))
            .unwrap_or(trimmed)
    } else {
        trimmed
            .strip_prefix("- ")
            .or_else(|| trimmed.strip_prefix("* "))
            .or_else(|| trimmed.strip_prefix("• "))
            .unwrap_or(trimmed)
    };
    rest.trim()
}
