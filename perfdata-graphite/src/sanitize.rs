//! Path sanitizing for Carbon's dot-delimited metric names.

/// Make a free-form host, service or check command name safe to embed in
/// a Graphite path.
///
/// Leading and trailing whitespace is trimmed, each run of inner whitespace
/// becomes a single `_`, every `/` and `.` becomes `_`, and a literal comma
/// is escaped as `\,` since Graphite uses commas to separate list items.
pub fn sanitize_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut in_whitespace = false;

    for c in path.trim().chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                out.push('_');
            }
            in_whitespace = true;
            continue;
        }
        in_whitespace = false;

        match c {
            '/' | '.' => out.push('_'),
            ',' => out.push_str("\\,"),
            _ => out.push(c),
        }
    }

    out
}
