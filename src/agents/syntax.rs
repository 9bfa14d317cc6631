//! Byte-level scanning helpers for the small slice of TypeScript syntax the
//! module patcher needs: brackets, string literals and comments.
//!
//! All delimiters are ASCII, so every index returned here falls on a UTF-8
//! character boundary of the scanned text.

/// Tracks bracket depth across successive chunks of text.
///
/// Fed with the text starting at an opening bracket, it reports where the
/// matching closing bracket ends.
#[derive(Debug, Default)]
pub struct BracketScanner {
    depth: usize,
    string: Option<u8>,
    block_comment: bool,
}

impl BracketScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the offset just past the bracket that closes the outermost group.
    pub fn feed(&mut self, chunk: &str) -> Option<usize> {
        let b = chunk.as_bytes();
        let mut i = 0;
        while i < b.len() {
            let c = b[i];
            if self.block_comment {
                if c == b'*' && b.get(i + 1) == Some(&b'/') {
                    self.block_comment = false;
                    i += 2;
                } else {
                    i += 1;
                }
                continue;
            }
            if let Some(quote) = self.string {
                if c == b'\\' {
                    i += 2;
                    continue;
                }
                if c == quote {
                    self.string = None;
                }
                i += 1;
                continue;
            }
            match c {
                b'/' if b.get(i + 1) == Some(&b'/') => {
                    while i < b.len() && b[i] != b'\n' {
                        i += 1;
                    }
                    continue;
                }
                b'/' if b.get(i + 1) == Some(&b'*') => {
                    self.block_comment = true;
                    i += 2;
                    continue;
                }
                b'\'' | b'"' | b'`' => self.string = Some(c),
                b'(' | b'[' | b'{' => self.depth += 1,
                b')' | b']' | b'}' => {
                    self.depth = self.depth.saturating_sub(1);
                    if self.depth == 0 {
                        return Some(i + 1);
                    }
                }
                _ => {}
            }
            i += 1;
        }
        None
    }
}

/// Lexical state carried from one source line to the next.
#[derive(Debug, Default)]
pub struct LineLexer {
    depth: usize,
    string: Option<char>,
    block_comment: bool,
}

impl LineLexer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next line starts outside any bracket, string or comment.
    pub fn at_top_level(&self) -> bool {
        self.depth == 0 && self.string.is_none() && !self.block_comment
    }

    /// Returns `line` with comments and string contents replaced by spaces.
    ///
    /// Byte offsets are preserved, so positions found in the result index
    /// the original line. Quote characters and line breaks are kept.
    pub fn mask(&mut self, line: &str) -> String {
        let mut out = String::with_capacity(line.len());
        let mut chars = line.chars().peekable();
        while let Some(c) = chars.next() {
            let next = chars.peek().copied();
            if self.block_comment {
                if c == '*' && next == Some('/') {
                    chars.next();
                    out.push_str("  ");
                    self.block_comment = false;
                } else {
                    blank(&mut out, c);
                }
                continue;
            }
            if let Some(quote) = self.string {
                if c == '\\' {
                    blank(&mut out, c);
                    if let Some(escaped) = chars.next() {
                        blank(&mut out, escaped);
                    }
                } else if c == quote {
                    out.push(c);
                    self.string = None;
                } else {
                    blank(&mut out, c);
                }
                continue;
            }
            match c {
                '/' if next == Some('/') => {
                    blank(&mut out, c);
                    for rest in chars.by_ref() {
                        blank(&mut out, rest);
                    }
                }
                '/' if next == Some('*') => {
                    chars.next();
                    out.push_str("  ");
                    self.block_comment = true;
                }
                '\'' | '"' | '`' => {
                    out.push(c);
                    self.string = Some(c);
                }
                '(' | '[' | '{' => {
                    self.depth += 1;
                    out.push(c);
                }
                ')' | ']' | '}' => {
                    self.depth = self.depth.saturating_sub(1);
                    out.push(c);
                }
                _ => out.push(c),
            }
        }
        // Only template literals span lines.
        if matches!(self.string, Some('\'' | '"')) {
            self.string = None;
        }
        out
    }
}

fn blank(out: &mut String, c: char) {
    if c == '\n' || c == '\r' {
        out.push(c);
    } else {
        out.extend(std::iter::repeat_n(' ', c.len_utf8()));
    }
}

/// Skips whitespace and comments in `b[i..end]`.
pub fn skip_trivia(b: &[u8], mut i: usize, end: usize) -> usize {
    while i < end {
        match b[i] {
            b' ' | b'\t' | b'\r' | b'\n' => i += 1,
            b'/' if b.get(i + 1) == Some(&b'/') => {
                while i < end && b[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if b.get(i + 1) == Some(&b'*') => {
                i += 2;
                while i < end && !(b[i] == b'*' && b.get(i + 1) == Some(&b'/')) {
                    i += 1;
                }
                i = (i + 2).min(end);
            }
            _ => break,
        }
    }
    i.min(end)
}

/// Index just past the string literal opening at `b[i]`.
pub fn skip_string(b: &[u8], i: usize) -> usize {
    let quote = b[i];
    let mut j = i + 1;
    while j < b.len() {
        match b[j] {
            b'\\' => j += 2,
            c if c == quote => return j + 1,
            _ => j += 1,
        }
    }
    b.len()
}

/// Index of the bracket closing the one at `b[open]`.
pub fn find_matching(b: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = open;
    while i < b.len() {
        match b[i] {
            b'\'' | b'"' | b'`' => {
                i = skip_string(b, i);
                continue;
            }
            b'/' if matches!(b.get(i + 1), Some(b'/') | Some(b'*')) => {
                i = skip_trivia(b, i, b.len());
                continue;
            }
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Index of the next top-level `,` in `b[start..end]`, or `end`.
pub fn value_end(b: &[u8], start: usize, end: usize) -> usize {
    let mut i = start;
    while i < end {
        match b[i] {
            b',' => return i,
            b'\'' | b'"' | b'`' => {
                i = skip_string(b, i);
                continue;
            }
            b'/' if matches!(b.get(i + 1), Some(b'/') | Some(b'*')) => {
                i = skip_trivia(b, i, end);
                continue;
            }
            b'(' | b'[' | b'{' => match find_matching(b, i) {
                Some(close) if close < end => i = close,
                _ => return end,
            },
            _ => {}
        }
        i += 1;
    }
    end
}

/// Index just past the last non-trivia byte in `b[start..end]`, or `start`.
pub fn significant_end(b: &[u8], start: usize, end: usize) -> usize {
    let mut last = start;
    let mut i = start;
    loop {
        i = skip_trivia(b, i, end);
        if i >= end {
            return last;
        }
        i = match b[i] {
            b'\'' | b'"' | b'`' => skip_string(b, i).min(end),
            b'(' | b'[' | b'{' => find_matching(b, i).map_or(end, |close| (close + 1).min(end)),
            _ => i + 1,
        };
        last = i;
    }
}

/// Skips spaces, tabs and same-line comments following `from`.
///
/// Stops at the first line break or significant byte.
pub fn trailing_line_trivia_end(b: &[u8], from: usize, end: usize) -> usize {
    let mut i = from;
    loop {
        while i < end && (b[i] == b' ' || b[i] == b'\t') {
            i += 1;
        }
        if i + 1 < end && b[i] == b'/' && b[i + 1] == b'/' {
            while i < end && b[i] != b'\n' && b[i] != b'\r' {
                i += 1;
            }
            return i;
        }
        if i + 1 < end && b[i] == b'/' && b[i + 1] == b'*' {
            let mut j = i + 2;
            while j + 1 < end && !(b[j] == b'*' && b[j + 1] == b'/') {
                if b[j] == b'\n' {
                    return i;
                }
                j += 1;
            }
            if j + 1 >= end {
                return i;
            }
            i = j + 2;
            continue;
        }
        return i;
    }
}

pub fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_' || c == b'$'
}

pub fn is_ident_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_' || c == b'$'
}

/// Leading spaces and tabs of the line containing `pos`.
pub fn line_indent(text: &str, pos: usize) -> &str {
    let start = text[..pos].rfind('\n').map_or(0, |i| i + 1);
    let line = &text[start..];
    let width = line
        .bytes()
        .take_while(|c| *c == b' ' || *c == b'\t')
        .count();
    &line[..width]
}

pub fn same_line(text: &str, a: usize, b: usize) -> bool {
    !text[a.min(b)..a.max(b)].contains('\n')
}
