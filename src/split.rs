//! Splitting normalized text at a line boundary
//!
//! Used to restrict editing to part of a document: from a given line to the
//! end, or from the start up to a line counted from the end.

/// Split `text` into `(head, tail)` at a signed 1-based line index
///
/// - `0` does not split: everything is head
/// - `n > 0`: line `n` and everything after it is tail; past the last line
///   everything is head
/// - `n < 0`: the `-n`-th line from the end and everything before it is head;
///   counting past the first line everything is tail
///
/// Lines end at `\n`; a final line without one still counts.
pub fn split_at_line(text: &str, line: i64) -> (&str, &str) {
    if line == 0 || text.is_empty() {
        return if line < 0 { ("", text) } else { (text, "") };
    }

    let starts = line_starts(text);
    let count = starts.len();

    let split = if line > 0 {
        let n = line.unsigned_abs() as usize;
        if n > count {
            return (text, "");
        }
        starts[n - 1]
    } else {
        let k = line.unsigned_abs() as usize;
        if k > count {
            return ("", text);
        }
        let target = count - k;
        starts.get(target + 1).copied().unwrap_or(text.len())
    };

    text.split_at(split)
}

/// Byte offsets where each line starts
fn line_starts(text: &str) -> Vec<usize> {
    let mut starts = vec![0];
    starts.extend(
        text.match_indices('\n')
            .map(|(i, _)| i + 1)
            .filter(|&start| start < text.len()),
    );
    starts
}

/// Which part of a document an operation edits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scope {
    /// The whole document
    #[default]
    All,
    /// Line `n` (1-based) to the end
    FromLine(u64),
    /// From the start through the `n`-th line counted from the end
    UntilFromEnd(u64),
}

impl Scope {
    /// Scope from a signed line index as taken on the command line
    pub fn from_line(line: i64) -> Self {
        match line {
            0 => Scope::All,
            n if n > 0 => Scope::FromLine(n.unsigned_abs()),
            n => Scope::UntilFromEnd(n.unsigned_abs()),
        }
    }

    fn line_index(&self) -> i64 {
        match *self {
            Scope::All => 0,
            Scope::FromLine(n) => i64::try_from(n).unwrap_or(i64::MAX),
            Scope::UntilFromEnd(n) => i64::try_from(n).map(|n| -n).unwrap_or(i64::MIN + 1),
        }
    }

    /// Split `text` into `(before, editable, after)`
    pub fn partition<'a>(&self, text: &'a str) -> (&'a str, &'a str, &'a str) {
        let (head, tail) = split_at_line(text, self.line_index());
        match self {
            Scope::All => ("", text, ""),
            Scope::FromLine(_) => (head, tail, ""),
            Scope::UntilFromEnd(_) => ("", head, tail),
        }
    }
}
