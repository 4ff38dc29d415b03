//! Plain-text flattening of Pandoc inlines and blocks
//!
//! Inlines arrive as raw JSON values (`{"t": "Str", "c": "word"}`). Only
//! their text matters here, so they are read in place instead of being
//! mapped onto a full inline model.

use serde_json::Value;

/// Tag of a Pandoc element (`t`)
pub fn element_type(value: &Value) -> Option<&str> {
    value.get("t").and_then(Value::as_str)
}

/// Content of a Pandoc element (`c`)
pub fn element_content(value: &Value) -> Option<&Value> {
    value.get("c")
}

/// Literal text of a run of inlines.
///
/// Spaces and soft breaks become a single space, hard line breaks a newline.
/// Formatting wrappers contribute their content; quotes are rendered as
/// typographic quote marks. Notes, images and raw inlines contribute
/// nothing.
pub fn inline_text(inlines: &[Value]) -> String {
    let mut text = String::new();
    push_inlines(inlines, &mut text);
    text
}

fn push_inlines(inlines: &[Value], out: &mut String) {
    for inline in inlines {
        push_inline(inline, out);
    }
}

fn push_inline(inline: &Value, out: &mut String) {
    let content = element_content(inline);
    match element_type(inline) {
        Some("Str") => {
            if let Some(s) = content.and_then(Value::as_str) {
                out.push_str(s);
            }
        }
        Some("Space") | Some("SoftBreak") => out.push(' '),
        Some("LineBreak") => out.push('\n'),
        Some("Emph") | Some("Strong") | Some("Underline") | Some("Strikeout")
        | Some("SmallCaps") | Some("Superscript") | Some("Subscript") => {
            push_inlines(as_list(content), out);
        }
        // [attr, inlines]
        Some("Span") => push_inlines(as_list(nth(content, 1)), out),
        // [attr, inlines, target]
        Some("Link") => push_inlines(as_list(nth(content, 1)), out),
        // [citations, inlines]
        Some("Cite") => push_inlines(as_list(nth(content, 1)), out),
        // [quote type, inlines]
        Some("Quoted") => {
            let (open, close) = match nth(content, 0).and_then(element_type) {
                Some("SingleQuote") => ('\u{2018}', '\u{2019}'),
                _ => ('\u{201C}', '\u{201D}'),
            };
            out.push(open);
            push_inlines(as_list(nth(content, 1)), out);
            out.push(close);
        }
        // [attr, text] / [math type, text]
        Some("Code") | Some("Math") => {
            if let Some(s) = nth(content, 1).and_then(Value::as_str) {
                out.push_str(s);
            }
        }
        _ => {}
    }
}

/// Literal text of a run of blocks: paragraphs and plain blocks, separated
/// by newlines. Nested containers (divs, block quotes, lists) are
/// flattened in order.
pub fn block_text(blocks: &[Value]) -> String {
    let mut paragraphs = Vec::new();
    collect_blocks(blocks, &mut paragraphs);
    paragraphs.join("\n")
}

fn collect_blocks(blocks: &[Value], out: &mut Vec<String>) {
    for block in blocks {
        let content = element_content(block);
        match element_type(block) {
            Some("Para") | Some("Plain") => out.push(inline_text(as_list(content))),
            // [level, attr, inlines]
            Some("Header") => out.push(inline_text(as_list(nth(content, 2)))),
            Some("BlockQuote") => collect_blocks(as_list(content), out),
            // [attr, blocks]
            Some("Div") => collect_blocks(as_list(nth(content, 1)), out),
            Some("BulletList") => {
                for item in as_list(content) {
                    collect_blocks(as_list(Some(item)), out);
                }
            }
            // [list attributes, items]
            Some("OrderedList") => {
                for item in as_list(nth(content, 1)) {
                    collect_blocks(as_list(Some(item)), out);
                }
            }
            _ => {}
        }
    }
}

fn nth(value: Option<&Value>, index: usize) -> Option<&Value> {
    value.and_then(|v| v.get(index))
}

fn as_list(value: Option<&Value>) -> &[Value] {
    value
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}
