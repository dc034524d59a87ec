//! URL slugs.

/// Lower-cases and trims `text`, drops characters other than word
/// characters, whitespace and `-`, then collapses runs of whitespace and `-`
/// into a single `-`.
pub fn slugify(text: &str) -> String {
    let lowered = text.to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    let mut in_separator = false;
    for c in lowered.trim().chars() {
        if c.is_whitespace() || c == '-' {
            if !in_separator {
                out.push('-');
                in_separator = true;
            }
        } else if c.is_alphanumeric() || c == '_' {
            out.push(c);
            in_separator = false;
        }
    }
    out
}
