//! Small text helpers shared by tools and the orchestrator

/// Render a measurement without a trailing `.0` for whole values
pub fn num(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Like [`num`] for an optional value, `?` when absent
pub fn num_or(value: Option<f64>, missing: &str) -> String {
    value.map(num).unwrap_or_else(|| missing.to_string())
}

/// Cut `s` to at most `max_bytes`, backing off to a char boundary
pub fn truncate_at_boundary(s: &mut String, max_bytes: usize) -> bool {
    if s.len() <= max_bytes {
        return false;
    }
    let mut cut = max_bytes;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    s.truncate(cut);
    true
}

/// First `n` characters of `s`
pub fn prefix_chars(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}
