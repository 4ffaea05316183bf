//! Output sink for the printer
//!
//! Wraps the caller's byte sink with the bookkeeping the layout engine
//! needs: the first write error is latched and every later write becomes a
//! no-op, completed output lines are counted, and the last byte written is
//! remembered. Lines ending in a trailing comment are buffered so that
//! adjacent ones can have their `#` columns padded to align before they
//! are committed to the sink.

use std::io::{self, Write};

/// A completed line waiting for its alignment group to close.
struct GroupedLine {
    bytes: Vec<u8>,
    /// Byte column where the comment (and its padding) starts
    col: usize,
}

/// Marks the comment starting on the line under construction.
struct Anchor {
    col: usize,
    /// Indent depth the printer was at; groups never span depths
    depth: usize,
}

pub(crate) struct LineWriter<'a> {
    out: &'a mut dyn Write,
    err: Option<io::Error>,
    /// The output line under construction
    cur: Vec<u8>,
    anchor: Option<Anchor>,
    group: Vec<GroupedLine>,
    group_depth: usize,
    lines: usize,
    last: u8,
}

impl<'a> LineWriter<'a> {
    pub fn new(out: &'a mut dyn Write) -> Self {
        LineWriter {
            out,
            err: None,
            cur: Vec::new(),
            anchor: None,
            group: Vec::new(),
            group_depth: 0,
            lines: 0,
            last: 0,
        }
    }

    /// Completed output lines so far, buffered ones included.
    pub fn lines(&self) -> usize {
        self.lines
    }

    pub fn last_byte(&self) -> u8 {
        self.last
    }

    pub fn write_byte(&mut self, b: u8) {
        if self.err.is_some() {
            return;
        }
        self.last = b;
        if b == b'\n' {
            self.end_line();
        } else {
            self.cur.push(b);
        }
    }

    pub fn write_str(&mut self, s: &str) {
        for &b in s.as_bytes() {
            self.write_byte(b);
        }
    }

    /// Note that a trailing comment starts at the current column.
    pub fn mark_comment(&mut self, depth: usize) {
        if self.err.is_some() {
            return;
        }
        self.anchor = Some(Anchor {
            col: self.cur.len(),
            depth,
        });
    }

    fn end_line(&mut self) {
        self.lines += 1;
        let anchor = self.anchor.take();
        let line = std::mem::take(&mut self.cur);
        match anchor {
            // a comment with statement text before it joins a group
            Some(a) if !line[..a.col].iter().all(|b| b.is_ascii_whitespace()) => {
                if !self.group.is_empty() && self.group_depth != a.depth {
                    self.flush_group();
                }
                self.group_depth = a.depth;
                self.group.push(GroupedLine {
                    bytes: line,
                    col: a.col,
                });
            }
            // anything else, a standalone comment included, closes the group
            _ => {
                self.flush_group();
                self.emit(&line);
                self.emit(b"\n");
            }
        }
    }

    fn flush_group(&mut self) {
        if self.group.is_empty() {
            return;
        }
        let width = self.group.iter().map(|l| l.col).max().unwrap_or(0);
        for l in std::mem::take(&mut self.group) {
            self.emit(&l.bytes[..l.col]);
            for _ in l.col..width {
                self.emit(b" ");
            }
            self.emit(&l.bytes[l.col..]);
            self.emit(b"\n");
        }
    }

    fn emit(&mut self, bytes: &[u8]) {
        if self.err.is_none() {
            if let Err(e) = self.out.write_all(bytes) {
                self.err = Some(e);
            }
        }
    }

    /// Commit anything still buffered. A no-op when nothing is pending.
    pub fn finish(&mut self) -> io::Result<()> {
        if !self.cur.is_empty() {
            self.flush_group();
            let line = std::mem::take(&mut self.cur);
            self.emit(&line);
        }
        self.flush_group();
        match self.err.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailWriter;

    impl Write for FailWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_counts_lines() {
        let mut buf = Vec::new();
        let mut w = LineWriter::new(&mut buf);
        w.write_str("a\nb\nc");
        assert_eq!(w.lines(), 2);
        assert_eq!(w.last_byte(), b'c');
        w.finish().unwrap();
        assert_eq!(buf, b"a\nb\nc");
    }

    #[test]
    fn test_aligns_adjacent_comments() {
        let mut buf = Vec::new();
        let mut w = LineWriter::new(&mut buf);
        w.write_str("foo");
        w.mark_comment(0);
        w.write_str(" # 1\n");
        w.write_str("foooo");
        w.mark_comment(0);
        w.write_str(" # 2\n");
        w.finish().unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "foo   # 1\nfoooo # 2\n");
    }

    #[test]
    fn test_plain_line_breaks_group() {
        let mut buf = Vec::new();
        let mut w = LineWriter::new(&mut buf);
        w.write_str("foo");
        w.mark_comment(0);
        w.write_str(" # 1\n");
        w.write_str("plain\n");
        w.write_str("foooo");
        w.mark_comment(0);
        w.write_str(" # 2\n");
        w.finish().unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "foo # 1\nplain\nfoooo # 2\n"
        );
    }

    #[test]
    fn test_standalone_comment_breaks_group() {
        let mut buf = Vec::new();
        let mut w = LineWriter::new(&mut buf);
        w.write_str("foobar");
        w.mark_comment(0);
        w.write_str(" # 1\n");
        w.mark_comment(0);
        w.write_str("#mid\n");
        w.write_str("foo");
        w.mark_comment(0);
        w.write_str(" # 2\n");
        w.finish().unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "foobar # 1\n#mid\nfoo # 2\n"
        );
    }

    #[test]
    fn test_depth_change_breaks_group() {
        let mut buf = Vec::new();
        let mut w = LineWriter::new(&mut buf);
        w.write_str("aa");
        w.mark_comment(0);
        w.write_str(" #c1\n");
        w.write_str("{");
        w.mark_comment(1);
        w.write_str(" #c2\n");
        w.finish().unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "aa #c1\n{ #c2\n");
    }

    #[test]
    fn test_sticky_error() {
        let mut out = FailWriter;
        let mut w = LineWriter::new(&mut out);
        w.write_str("foo\n");
        w.write_str("bar\n");
        let err = w.finish().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn test_finish_on_null_sink_is_noop() {
        let mut sink = io::sink();
        let mut w = LineWriter::new(&mut sink);
        w.finish().unwrap();
    }
}
