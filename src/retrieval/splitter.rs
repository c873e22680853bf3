use std::collections::VecDeque;

const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// Recursive character splitter: tries paragraph breaks first, then lines,
/// then words, then raw characters, merging pieces back into chunks of at
/// most `chunk_size` characters with `chunk_overlap` characters carried
/// between consecutive chunks.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_overlap = chunk_overlap.min(chunk_size.saturating_sub(1));
        Self {
            chunk_size: chunk_size.max(1),
            chunk_overlap,
        }
    }

    /// Parent-document configuration: large retrieval units.
    pub fn parent() -> Self {
        Self::new(2000, 200)
    }

    /// Child-document configuration: small units indexed for similarity.
    pub fn child() -> Self {
        Self::new(400, 50)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn split(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        self.split_with(text, &SEPARATORS)
    }

    fn split_with(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let idx = separators
            .iter()
            .position(|s| s.is_empty() || text.contains(s))
            .unwrap_or(separators.len().saturating_sub(1));
        let separator = separators[idx];
        let remaining = &separators[idx + 1..];

        if separator.is_empty() {
            return self.split_chars(text);
        }

        let mut pieces: Vec<String> = Vec::new();
        for piece in text.split(separator).filter(|s| !s.is_empty()) {
            if piece.chars().count() <= self.chunk_size {
                pieces.push(piece.to_string());
            } else if remaining.is_empty() {
                pieces.extend(self.split_chars(piece));
            } else {
                pieces.extend(self.split_with(piece, remaining));
            }
        }
        self.merge(pieces, separator)
    }

    fn split_chars(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        if chars.len() <= self.chunk_size {
            return vec![text.to_string()];
        }
        let step = self.chunk_size.saturating_sub(self.chunk_overlap).max(1);
        let mut out = Vec::new();
        let mut start = 0;
        while start < chars.len() {
            let end = (start + self.chunk_size).min(chars.len());
            out.push(chars[start..end].iter().collect());
            if end == chars.len() {
                break;
            }
            start += step;
        }
        out
    }

    fn merge(&self, pieces: Vec<String>, separator: &str) -> Vec<String> {
        let sep_len = separator.chars().count();
        let mut chunks: Vec<String> = Vec::new();
        let mut window: VecDeque<String> = VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            let piece_len = piece.chars().count();
            let extra = if window.is_empty() { 0 } else { sep_len };
            if total + piece_len + extra > self.chunk_size && !window.is_empty() {
                chunks.push(join_window(&window, separator));
                // Shrink from the front until within the overlap budget and
                // the new piece fits.
                while total > self.chunk_overlap
                    || (total + piece_len + if window.is_empty() { 0 } else { sep_len }
                        > self.chunk_size
                        && total > 0)
                {
                    let front = match window.pop_front() {
                        Some(f) => f,
                        None => break,
                    };
                    total = total.saturating_sub(
                        front.chars().count() + if window.is_empty() { 0 } else { sep_len },
                    );
                }
            }
            total += piece_len + if window.is_empty() { 0 } else { sep_len };
            window.push_back(piece);
        }
        if !window.is_empty() {
            chunks.push(join_window(&window, separator));
        }
        chunks
    }
}

fn join_window(window: &VecDeque<String>, separator: &str) -> String {
    window.iter().cloned().collect::<Vec<_>>().join(separator)
}
