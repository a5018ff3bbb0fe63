use crate::extract::candidates;

/// Remove every modai directive encoding from `text`.
///
/// Spans are deleted when they were accepted as directives, and also when
/// they carried the modai sentinel but failed validation, so no
/// half-formed directive reaches the user. Foreign JSON is left alone.
/// Whitespace is only tidied when something was actually removed.
pub fn strip_all(text: &str) -> String {
    let mut kept = String::with_capacity(text.len());
    let mut last = 0;

    for candidate in candidates(text) {
        if !candidate.is_strippable() {
            continue;
        }
        let span = candidate.span();
        kept.push_str(&text[last..span.start]);
        last = span.end;
    }

    if last == 0 {
        return text.to_string();
    }
    kept.push_str(&text[last..]);
    tidy(&kept)
}

/// Collapse runs of blank lines into one and trim the ends. Line
/// terminators are kept as written.
fn tidy(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous_blank = false;

    for line in text.split_inclusive('\n') {
        let blank = line.trim().is_empty();
        if blank && previous_blank {
            continue;
        }
        if blank {
            out.push_str(if line.ends_with("\r\n") {
                "\r\n"
            } else if line.ends_with('\n') {
                "\n"
            } else {
                ""
            });
        } else {
            out.push_str(line);
        }
        previous_blank = blank;
    }

    out.trim().to_string()
}
