// src/core/pubsub/glob.rs

//! Redis-style glob matching used to route published messages to pattern subscribers.
//! Supports `*`, `?`, `[...]`, `[^...]`, ranges inside sets, and `\` escapes.

/// Returns true if `channel` matches `pattern`.
///
/// Iterative with single-star backtracking, so pathological patterns cannot blow the stack.
pub fn glob_match(pattern: &[u8], channel: &[u8]) -> bool {
    let mut p = 0;
    let mut c = 0;
    // (pattern index after the last '*', channel index that star currently absorbs up to)
    let mut backtrack: Option<(usize, usize)> = None;

    while c < channel.len() {
        let step = match pattern.get(p) {
            Some(b'*') => {
                backtrack = Some((p + 1, c));
                p += 1;
                continue;
            }
            Some(b'?') => Some(1),
            Some(b'[') => match_char_set(&pattern[p..], channel[c]),
            Some(b'\\') if p + 1 < pattern.len() => (pattern[p + 1] == channel[c]).then_some(2),
            Some(&ch) => (ch == channel[c]).then_some(1),
            None => None,
        };

        match (step, backtrack) {
            (Some(len), _) => {
                p += len;
                c += 1;
            }
            (None, Some((star_p, star_c))) => {
                // Let the last star swallow one more byte and retry.
                p = star_p;
                c = star_c + 1;
                backtrack = Some((star_p, star_c + 1));
            }
            (None, None) => return false,
        }
    }

    while pattern.get(p) == Some(&b'*') {
        p += 1;
    }
    p == pattern.len()
}

/// Matches `ch` against the set starting at `segment[0] == b'['`.
/// Returns the length of the set including brackets when it matches.
fn match_char_set(segment: &[u8], ch: u8) -> Option<usize> {
    if segment.len() < 3 {
        return None;
    }

    let mut i = 1;
    let negated = segment[i] == b'^';
    if negated {
        i += 1;
    }

    let mut matched = false;
    while i < segment.len() && segment[i] != b']' {
        let lo = segment[i];
        let is_range = i + 2 < segment.len() && segment[i + 1] == b'-' && segment[i + 2] != b']';
        if is_range {
            matched |= (lo..=segment[i + 2]).contains(&ch);
            i += 3;
        } else {
            matched |= lo == ch;
            i += 1;
        }
    }

    // An unterminated set never matches.
    (i < segment.len() && matched != negated).then_some(i + 1)
}
