//! JSON-with-comments preprocessing.
//!
//! A character state machine that removes `//` and `/* */` comments and the
//! trailing commas they tend to leave behind, while leaving string literals
//! (including `"//"`) untouched. Newlines inside comments are preserved so
//! parse errors still point at the right line.

/// Strip comments and trailing commas, returning plain JSON.
pub fn strip_jsonc(input: &str) -> String {
    remove_trailing_commas(&remove_comments(input))
}

fn remove_comments(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut in_string = false;
    let mut in_single_line_comment = false;
    let mut in_multi_line_comment = false;

    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if in_single_line_comment {
            if c == '\n' {
                in_single_line_comment = false;
                out.push('\n');
            }
            i += 1;
        } else if in_multi_line_comment {
            if c == '*' && chars.get(i + 1) == Some(&'/') {
                in_multi_line_comment = false;
                i += 2;
            } else {
                if c == '\n' {
                    out.push('\n');
                }
                i += 1;
            }
        } else if in_string {
            out.push(c);
            if c == '"' && !escaped(&chars, i) {
                in_string = false;
            }
            i += 1;
        } else {
            match c {
                '"' => {
                    in_string = true;
                    out.push(c);
                    i += 1;
                }
                '/' if chars.get(i + 1) == Some(&'/') => {
                    in_single_line_comment = true;
                    i += 2;
                }
                '/' if chars.get(i + 1) == Some(&'*') => {
                    in_multi_line_comment = true;
                    i += 2;
                }
                _ => {
                    out.push(c);
                    i += 1;
                }
            }
        }
    }
    out
}

/// A quote is escaped iff preceded by an odd-length run of backslashes.
fn escaped(chars: &[char], idx: usize) -> bool {
    let mut backslashes = 0;
    let mut j = idx;
    while j > 0 && chars[j - 1] == '\\' {
        backslashes += 1;
        j -= 1;
    }
    backslashes % 2 == 1
}

/// Drop commas whose next non-whitespace character is `}` or `]`.
fn remove_trailing_commas(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut in_string = false;

    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if in_string {
            out.push(c);
            if c == '"' && !escaped(&chars, i) {
                in_string = false;
            }
            i += 1;
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                out.push(c);
                i += 1;
            }
            ',' => {
                let mut j = i + 1;
                while j < chars.len() && chars[j].is_whitespace() {
                    j += 1;
                }
                if matches!(chars.get(j), Some('}') | Some(']')) {
                    // Trailing comma: drop it, keep the whitespace.
                    i += 1;
                } else {
                    out.push(',');
                    i += 1;
                }
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }
    out
}
