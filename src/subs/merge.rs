//! Text merging and line splitting.

use crate::ast::{Element, Line};

/// Concatenates adjacent text elements. Empty text disappears.
pub fn merge(elements: Vec<Element>) -> Vec<Element> {
    let mut result = Vec::with_capacity(elements.len());
    let mut buffer = String::new();
    for element in elements {
        match element {
            Element::Text(s) => buffer.push_str(&s),
            other => {
                if !buffer.is_empty() {
                    result.push(Element::Text(std::mem::take(&mut buffer)));
                }
                result.push(other);
            }
        }
    }
    if !buffer.is_empty() {
        result.push(Element::Text(buffer));
    }
    result
}

/// Splits lines on the newlines embedded in their text elements.
///
/// Empty fragments are dropped but every newline still ends a line, so blank lines and trailing
/// newlines survive as empty lines.
pub fn split_lines(lines: Vec<Line>) -> Vec<Line> {
    let mut result = Vec::with_capacity(lines.len());
    for line in lines {
        let mut pending: Line = Vec::new();
        for element in line {
            match element {
                Element::Text(s) => {
                    let mut fragments = s.split('\n');
                    if let Some(first) = fragments.next() {
                        if !first.is_empty() {
                            pending.push(Element::text(first));
                        }
                    }
                    for fragment in fragments {
                        result.push(std::mem::take(&mut pending));
                        if !fragment.is_empty() {
                            pending.push(Element::text(fragment));
                        }
                    }
                }
                other => pending.push(other),
            }
        }
        result.push(pending);
    }
    result
}
