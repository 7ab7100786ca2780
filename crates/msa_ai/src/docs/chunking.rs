use sha2::{Digest, Sha256};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkDraft {
    pub chunk_id: String,
    pub ordinal: u32,
    pub text: String,
}

pub(crate) fn normalize_text(s: &str) -> String {
    s.replace("\r\n", "\n").replace('\r', "\n")
}

/// Content-derived ID: the same source and text always yield the same chunk ID.
pub(crate) fn chunk_id(source_id: &str, ordinal: u32, text: &str) -> String {
    let payload = format!("source={source_id}\nordinal={ordinal}\ntext={text}");
    hex::encode(Sha256::digest(payload.as_bytes()))
}

/// Trailing context carried into the next chunk, starting at a word boundary when possible.
fn overlap_tail(text: &str, overlap: usize) -> &str {
    let len = text.chars().count();
    if overlap == 0 || len <= overlap {
        return "";
    }
    let start = text.char_indices().nth(len - overlap).map_or(text.len(), |(i, _)| i);
    let tail = &text[start..];
    match tail.find(char::is_whitespace) {
        Some(ws) if !tail[ws..].trim().is_empty() => tail[ws..].trim_start(),
        _ => tail,
    }
}

/// Greedy paragraph packing up to `max_chars`.
///
/// A single oversized paragraph is split hard into windows that share `overlap`
/// characters. When a chunk is closed, up to `overlap` trailing characters open the
/// next one if they still fit, so text straddling a boundary stays retrievable.
pub fn chunk_by_paragraphs(source_id: &str, text: &str, max_chars: usize, overlap: usize) -> Vec<ChunkDraft> {
    let max_chars = max_chars.max(1);
    let step = max_chars.saturating_sub(overlap).max(1);
    let normalized = normalize_text(text);
    // (text, continues a hard-split paragraph)
    let mut pieces: Vec<(String, bool)> = Vec::new();
    for p in normalized.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        let chars: Vec<char> = p.chars().collect();
        if chars.len() <= max_chars {
            pieces.push((p.to_string(), false));
            continue;
        }
        let mut start = 0;
        loop {
            let end = (start + max_chars).min(chars.len());
            pieces.push((chars[start..end].iter().collect(), start > 0));
            if end == chars.len() {
                break;
            }
            start += step;
        }
    }

    let mut texts: Vec<String> = Vec::new();
    let mut buf = String::new();
    for (p, continues) in pieces {
        let p_len = p.chars().count();
        if !buf.is_empty() && buf.chars().count() + 2 + p_len > max_chars {
            let closed = std::mem::take(&mut buf);
            let tail = overlap_tail(&closed, overlap);
            if !continues && !tail.is_empty() && tail.chars().count() + 2 + p_len <= max_chars {
                buf.push_str(tail);
            }
            texts.push(closed);
        }
        if !buf.is_empty() {
            buf.push_str("\n\n");
        }
        buf.push_str(&p);
    }
    if !buf.trim().is_empty() {
        texts.push(buf);
    }

    texts
        .into_iter()
        .enumerate()
        .map(|(i, text)| {
            let ordinal = i as u32;
            ChunkDraft {
                chunk_id: chunk_id(source_id, ordinal, &text),
                ordinal,
                text,
            }
        })
        .collect()
}
