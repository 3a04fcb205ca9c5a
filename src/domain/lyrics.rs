use super::Stanza;

/// Splits raw lyrics into stanzas.
///
/// Line endings are normalized first. Stanzas are separated by one or more
/// whitespace-only lines; each piece is trimmed and empty pieces are dropped.
pub fn segment_lyrics(raw: &str) -> Vec<Stanza> {
    split_stanza_texts(raw).into_iter().map(Stanza::new).collect()
}

pub fn split_stanza_texts(raw: &str) -> Vec<String> {
    let normalized = normalize_line_endings(raw);

    let mut pieces = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in normalized.split('\n') {
        if line.trim().is_empty() {
            flush_piece(&mut current, &mut pieces);
        } else {
            current.push(line);
        }
    }
    flush_piece(&mut current, &mut pieces);

    pieces
}

fn normalize_line_endings(raw: &str) -> String {
    raw.replace("\r\n", "\n").replace('\r', "\n")
}

fn flush_piece(lines: &mut Vec<&str>, pieces: &mut Vec<String>) {
    if lines.is_empty() {
        return;
    }

    let piece = lines.join("\n");
    lines.clear();

    let trimmed = piece.trim();
    if !trimmed.is_empty() {
        pieces.push(trimmed.to_string());
    }
}
