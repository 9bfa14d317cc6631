use crate::agents::syntax::{
    find_matching, is_ident_char, is_ident_start, line_indent, same_line, significant_end,
    skip_string, skip_trivia, trailing_line_trivia_end, value_end,
};
use crate::error::{ModwireError, Result};

/// Entry to add to one registration list of a decorator's configuration object.
#[derive(Debug, Clone, Copy)]
pub struct ListEntry<'a> {
    pub key: &'a str,
    pub class_name: &'a str,
}

/// Formatting used for text the patcher has to invent.
#[derive(Debug, Clone, Copy)]
pub struct PatchStyle<'a> {
    pub eol: &'a str,
    pub indent_unit: &'a str,
}

#[derive(Debug)]
pub struct PatchOutcome {
    pub text: String,
    pub created_list: bool,
}

#[derive(Debug)]
struct Property<'a> {
    key: &'a str,
    key_start: usize,
    value_start: Option<usize>,
}

/// Adds `entry` to the configuration object of the decorator call in `text`.
///
/// `open_paren` is the index of the call's `(` and `close_paren` the index of
/// the matching `)`. Bytes outside the edited list or object are kept as is.
pub fn register_entry(
    text: &str,
    open_paren: usize,
    close_paren: usize,
    entry: ListEntry<'_>,
    style: PatchStyle<'_>,
) -> Result<PatchOutcome> {
    let b = text.as_bytes();
    let arg = skip_trivia(b, open_paren + 1, close_paren);

    if arg == close_paren {
        let base = line_indent(text, open_paren);
        let prop_indent = format!("{}{}", base, style.indent_unit);
        let inner = &text[open_paren + 1..close_paren];

        let mut out = String::with_capacity(text.len() + 64);
        out.push_str(&text[..open_paren + 1]);
        out.push_str(inner.trim_end());
        out.push('{');
        out.push_str(style.eol);
        out.push_str(&list_block(&prop_indent, style.indent_unit, entry, style.eol));
        out.push_str(style.eol);
        out.push_str(base);
        out.push('}');
        out.push_str(&text[close_paren..]);
        return Ok(PatchOutcome {
            text: out,
            created_list: true,
        });
    }

    if b[arg] != b'{' {
        return Err(ModwireError::Transform(
            "decorator argument is not an object literal".to_string(),
        ));
    }

    let obj_close = find_matching(b, arg)
        .filter(|close| *close < close_paren)
        .ok_or_else(|| {
            ModwireError::Transform("configuration object is not terminated".to_string())
        })?;

    let properties = scan_properties(text, arg, obj_close);
    match properties.iter().find(|p| p.key == entry.key) {
        Some(property) => {
            let value_start = property.value_start.ok_or_else(|| {
                ModwireError::Transform(format!("property '{}' has no list value", entry.key))
            })?;
            if b.get(value_start) != Some(&b'[') {
                return Err(ModwireError::Transform(format!(
                    "property '{}' is not a list",
                    entry.key
                )));
            }
            let list_close = find_matching(b, value_start)
                .filter(|close| *close < obj_close)
                .ok_or_else(|| {
                    ModwireError::Transform(format!("list '{}' is not terminated", entry.key))
                })?;
            let unit = observed_unit(text, arg, &properties, style.indent_unit);
            Ok(PatchOutcome {
                text: append_to_list(
                    text,
                    property.key_start,
                    value_start,
                    list_close,
                    entry.class_name,
                    &unit,
                    style.eol,
                ),
                created_list: false,
            })
        }
        None => Ok(PatchOutcome {
            text: insert_property(text, arg, obj_close, &properties, entry, style),
            created_list: true,
        }),
    }
}

fn scan_properties(text: &str, open: usize, close: usize) -> Vec<Property<'_>> {
    let b = text.as_bytes();
    let mut properties = Vec::new();
    let mut i = skip_trivia(b, open + 1, close);

    while i < close {
        let key_start = i;
        let key = if matches!(b[i], b'\'' | b'"') {
            let end = skip_string(b, i).min(close);
            i = end;
            text.get(key_start + 1..end.saturating_sub(1))
        } else if is_ident_start(b[i]) {
            while i < close && is_ident_char(b[i]) {
                i += 1;
            }
            Some(&text[key_start..i])
        } else {
            None
        };

        let mut value_start = None;
        if key.is_some() {
            let colon = skip_trivia(b, i, close);
            if colon < close && b[colon] == b':' {
                value_start = Some(skip_trivia(b, colon + 1, close));
            }
        }

        if let Some(key) = key {
            properties.push(Property {
                key,
                key_start,
                value_start,
            });
        }

        let end = value_end(b, key_start, close);
        i = if end < close {
            skip_trivia(b, end + 1, close)
        } else {
            close
        };
    }

    properties
}

/// Indent step used inside the object, preferring what the file already uses.
fn observed_unit(text: &str, open: usize, properties: &[Property<'_>], fallback: &str) -> String {
    let base = line_indent(text, open);
    properties
        .first()
        .filter(|first| !same_line(text, open, first.key_start))
        .map(|first| line_indent(text, first.key_start))
        .and_then(|indent| indent.strip_prefix(base))
        .filter(|unit| !unit.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

fn list_block(prop_indent: &str, unit: &str, entry: ListEntry<'_>, eol: &str) -> String {
    format!(
        "{prop_indent}{key}: [{eol}{prop_indent}{unit}{class}{eol}{prop_indent}]",
        key = entry.key,
        class = entry.class_name,
    )
}

fn append_to_list(
    text: &str,
    key_start: usize,
    list_open: usize,
    list_close: usize,
    class_name: &str,
    unit: &str,
    eol: &str,
) -> String {
    let b = text.as_bytes();
    let key_indent = line_indent(text, key_start);
    let last = significant_end(b, list_open + 1, list_close);

    if last == list_open + 1 {
        let inner = &text[list_open + 1..list_close];
        return format!(
            "{}{}{eol}{key_indent}{unit}{class_name}{eol}{key_indent}{}",
            &text[..list_open + 1],
            inner.trim_end(),
            &text[list_close..],
        );
    }

    let trailing_comma = b[last - 1] == b',';
    let multiline = text[list_open + 1..list_close].contains('\n');

    if !multiline {
        let insertion = if trailing_comma {
            format!(" {class_name},")
        } else {
            format!(", {class_name}")
        };
        return splice(text, last, None, last, &insertion);
    }

    let item_indent = if same_line(text, list_open, last - 1) {
        format!("{key_indent}{unit}")
    } else {
        line_indent(text, last - 1).to_string()
    };
    let new_item = format!(
        "{eol}{item_indent}{class_name}{}",
        if trailing_comma { "," } else { "" }
    );
    let anchor = line_end_anchor(b, last, list_close);
    let comma = (!trailing_comma).then_some(last);
    splice(text, last, comma, anchor, &new_item)
}

fn insert_property(
    text: &str,
    obj_open: usize,
    obj_close: usize,
    properties: &[Property<'_>],
    entry: ListEntry<'_>,
    style: PatchStyle<'_>,
) -> String {
    let b = text.as_bytes();
    let base = line_indent(text, obj_open);
    let unit = observed_unit(text, obj_open, properties, style.indent_unit);
    let last = significant_end(b, obj_open + 1, obj_close);

    if last == obj_open + 1 {
        let inner = &text[obj_open + 1..obj_close];
        let prop_indent = format!("{base}{unit}");
        return format!(
            "{}{}{eol}{}{eol}{base}{}",
            &text[..obj_open + 1],
            inner.trim_end(),
            list_block(&prop_indent, &unit, entry, style.eol),
            &text[obj_close..],
            eol = style.eol,
        );
    }

    let trailing_comma = b[last - 1] == b',';
    let multiline = text[obj_open + 1..obj_close].contains('\n');

    if !multiline {
        let insertion = format!(
            "{}{}: [{}]{}",
            if trailing_comma { " " } else { ", " },
            entry.key,
            entry.class_name,
            if trailing_comma { "," } else { "" }
        );
        return splice(text, last, None, last, &insertion);
    }

    let prop_indent = properties
        .first()
        .filter(|first| !same_line(text, obj_open, first.key_start))
        .map(|first| line_indent(text, first.key_start).to_string())
        .unwrap_or_else(|| format!("{base}{unit}"));
    let new_property = format!(
        "{}{}{}",
        style.eol,
        list_block(&prop_indent, &unit, entry, style.eol),
        if trailing_comma { "," } else { "" }
    );
    let anchor = line_end_anchor(b, last, obj_close);
    let comma = (!trailing_comma).then_some(last);
    splice(text, last, comma, anchor, &new_property)
}

/// Where a new line-based element goes after the element ending at `last`:
/// past a same-line comment when one follows, otherwise directly at `last`.
fn line_end_anchor(b: &[u8], last: usize, limit: usize) -> usize {
    let end = trailing_line_trivia_end(b, last, limit);
    if end < limit && matches!(b[end], b'\n' | b'\r') {
        end
    } else {
        last
    }
}

/// Rebuilds `text` with an optional comma at `comma` and `insertion` at `anchor`.
fn splice(text: &str, last: usize, comma: Option<usize>, anchor: usize, insertion: &str) -> String {
    let mut out = String::with_capacity(text.len() + insertion.len() + 1);
    out.push_str(&text[..last]);
    if comma.is_some() {
        out.push(',');
    }
    out.push_str(&text[last..anchor]);
    out.push_str(insertion);
    out.push_str(&text[anchor..]);
    out
}
