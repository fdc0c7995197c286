// src/utils/sanitize.rs

use std::sync::LazyLock;

use regex::Regex;

/// LaTeX commands that can reach outside the formula: links, file access,
/// macro (re)definition and raw HTML extensions. Any braced arguments that
/// directly follow are dropped with the command.
static UNSAFE_LATEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\\(?:href|url|includegraphics|input|include|def|edef|gdef|let|newcommand|renewcommand|providecommand|write|immediate|openin|openout|read|catcode|html[A-Za-z]*)\b\s*(?:\[[^\]]*\]\s*)?(?:\{[^{}]*\}\s*)*",
    )
    .expect("unsafe LaTeX pattern is valid")
});

/// Inline `$...$` and display `$$...$$` math segments.
static MATH_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\$[^$]+\$\$|\$[^$]+\$").expect("math segment pattern is valid"));

/// Clean HTML content using the ammonia library.
///
/// Whitelist-based: safe tags (like <b>, <p>) survive, dangerous tags (like
/// <script>, <iframe>) and attributes (like onclick) are stripped.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

/// Removes unsafe commands from a LaTeX expression. Everything else,
/// including `<` and `>` used as relations, is left as typed.
pub fn sanitize_latex(input: &str) -> String {
    UNSAFE_LATEX.replace_all(input, "").trim().to_string()
}

/// Sanitizes question text that mixes prose and `$...$` math.
///
/// Prose goes through [`clean_html`]; math segments through [`sanitize_latex`]
/// so relations like `a < b` are not turned into markup.
pub fn sanitize_rich_text(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last = 0;
    for m in MATH_SEGMENT.find_iter(input) {
        out.push_str(&clean_html(&input[last..m.start()]));
        let delimiter = if m.as_str().starts_with("$$") { "$$" } else { "$" };
        let body = &m.as_str()[delimiter.len()..m.as_str().len() - delimiter.len()];
        out.push_str(delimiter);
        out.push_str(&sanitize_latex(body));
        out.push_str(delimiter);
        last = m.end();
    }
    out.push_str(&clean_html(&input[last..]));
    out
}
