pub(crate) fn escape_c_string(input: &str) -> String {
    input
        .chars()
        .map(|ch| match ch {
            '\\' => "\\\\".to_string(),
            '"' => "\\\"".to_string(),
            '\n' => "\\n".to_string(),
            '\r' => "\\r".to_string(),
            '\t' => "\\t".to_string(),
            _ => ch.to_string(),
        })
        .collect::<Vec<_>>()
        .join("")
}

/// Appends `line` at `indent`. Embedded newlines keep the text after them
/// as written, so only the first line is padded.
pub(crate) fn push_line(out: &mut String, indent: usize, line: &str) {
    out.push_str(&"  ".repeat(indent));
    out.push_str(line);
    out.push('\n');
}

/// Appends `block` at `indent`, stripping its common leading whitespace and
/// the blank first/last lines a raw string literal leaves behind.
pub(crate) fn push_block(out: &mut String, indent: usize, block: &str) {
    if block.is_empty() {
        return;
    }
    let pad = "  ".repeat(indent);
    let mut lines: Vec<&str> = block.split('\n').collect();
    if matches!(lines.first(), Some(line) if line.trim().is_empty()) {
        lines.remove(0);
    }
    if matches!(lines.last(), Some(line) if line.trim().is_empty()) {
        lines.pop();
    }

    let min_indent = lines
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.chars().take_while(|c| *c == ' ' || *c == '\t').count())
        .min()
        .unwrap_or(0);

    for line in lines {
        if line.trim().is_empty() {
            out.push('\n');
            continue;
        }
        out.push_str(&pad);
        out.push_str(&line[min_indent..]);
        out.push('\n');
    }
}

/// Opening and closing lines for a `a::b::c` namespace path.
pub(crate) fn namespace_guards(namespace: &str) -> (String, String) {
    let parts: Vec<&str> = namespace
        .split("::")
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect();
    if parts.is_empty() {
        return (String::new(), String::new());
    }
    let open = parts
        .iter()
        .map(|part| format!("namespace {part} {{"))
        .collect::<Vec<_>>()
        .join(" ");
    let close = format!("{} // namespace {}", "}".repeat(parts.len()), parts.join("::"));
    (open, close)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_block_dedents_raw_strings() {
        let mut out = String::new();
        push_block(
            &mut out,
            1,
            r#"
                if (x) {
                  y();
                }
            "#,
        );
        assert_eq!(out, "  if (x) {\n    y();\n  }\n");
    }

    #[test]
    fn push_line_pads_only_the_first_line() {
        let mut out = String::new();
        push_line(&mut out, 2, "auto r = f(a,\n    b);");
        assert_eq!(out, "    auto r = f(a,\n    b);\n");
    }

    #[test]
    fn namespace_guards_nest_each_component() {
        let (open, close) = namespace_guards("torch::autograd::generated");
        assert_eq!(
            open,
            "namespace torch { namespace autograd { namespace generated {"
        );
        assert_eq!(close, "}}} // namespace torch::autograd::generated");
        assert_eq!(namespace_guards(""), (String::new(), String::new()));
    }

    #[test]
    fn escape_quotes_and_backslashes() {
        assert_eq!(escape_c_string("a\"b\\c"), "a\\\"b\\\\c");
    }
}
