//! The streaming parse loop and per-line scanners.

use std::io::BufRead;

use tracing::warn;

use crate::error::ReadError;
use crate::sink::ReportSink;

/// Lines longer than this are logged and discarded whole.
const MAX_LINE: usize = 32 * 1024;

const UTF8_BOM: &[u8] = &[0xef, 0xbb, 0xbf];

/// Drive `sink` with one event per recognized line of `input`.
///
/// Before each block header the previous pending block is finalized via
/// [`ReportSink::add`]; end of input finalizes the last one. Malformed
/// lines (bad quoting, missing separators, over-long lines) are logged
/// with their line number and dropped; the stream continues.
pub fn read_report<R, S>(mut input: R, sink: &mut S) -> Result<(), ReadError<S::Error>>
where
    R: BufRead,
    S: ReportSink,
{
    let mut buf = Vec::new();
    let mut line_no: u64 = 0;
    let mut open = false;

    loop {
        buf.clear();
        if input.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        line_no += 1;
        sink.position(line_no);
        if buf.len() > MAX_LINE {
            warn!(line = line_no, length = buf.len(), "over-long line dropped");
            continue;
        }
        while matches!(buf.last(), Some(b'\n') | Some(b'\r')) {
            buf.pop();
        }
        let mut bytes: &[u8] = &buf;
        if bytes.starts_with(UTF8_BOM) {
            bytes = &bytes[3..];
        }
        let line = String::from_utf8_lossy(bytes);

        match line.as_bytes().first() {
            Some(first) if first.is_ascii_alphabetic() => {
                if open {
                    sink.add().map_err(sink_err(line_no))?;
                }
                let (name, ids) = scan_header(&line);
                sink.create(name, &ids).map_err(sink_err(line_no))?;
                open = true;
            }
            Some(b'-') | Some(b'0'..=b'9') => scan_int_line(&line, line_no, sink)?,
            Some(b'"') => scan_string_line(&line, line_no, sink)?,
            _ => {}
        }
    }
    if open {
        sink.add().map_err(sink_err(line_no))?;
    }
    Ok(())
}

fn sink_err<E>(line: u64) -> impl FnOnce(E) -> ReadError<E> {
    move |source| ReadError::Sink { line, source }
}

/// `NAME id1 id2 ...`: the first whitespace-delimited token is the type
/// name; any signed decimal runs after it become the id tuple. Non-numeric
/// separators between ids are tolerated.
fn scan_header(line: &str) -> (&str, Vec<i32>) {
    let bytes = line.as_bytes();
    let name_end = bytes
        .iter()
        .position(|b| b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let name = &line[..name_end];

    let mut ids = Vec::new();
    let mut pos = name_end;
    while pos < bytes.len() {
        if bytes[pos] == b'-' || bytes[pos].is_ascii_digit() {
            let (value, next) = scan_signed(bytes, pos);
            ids.push(value);
            pos = next;
        } else {
            pos += 1;
        }
    }
    (name, ids)
}

/// `v;tag` or `v1 v2 ... vN;tag`: one or more signed integers, then the
/// attribute name after the first `;`.
fn scan_int_line<S>(line: &str, line_no: u64, sink: &mut S) -> Result<(), ReadError<S::Error>>
where
    S: ReportSink,
{
    let bytes = line.as_bytes();
    let mut values = Vec::new();
    let mut pos = 0;
    while pos < bytes.len() && bytes[pos] != b';' {
        let (value, next) = scan_signed(bytes, pos);
        values.push(value);
        pos = next;
        while pos < bytes.len()
            && bytes[pos] != b';'
            && bytes[pos] != b'-'
            && !bytes[pos].is_ascii_digit()
        {
            pos += 1;
        }
        if pos == bytes.len() {
            warn!(line = line_no, "missing ';' in attribute line");
            return Ok(());
        }
    }
    while pos < bytes.len() && (bytes[pos] == b';' || bytes[pos].is_ascii_whitespace()) {
        pos += 1;
    }
    let tag = line[pos..].trim_end();
    if tag.is_empty() {
        warn!(line = line_no, "missing name for attribute");
        return Ok(());
    }
    if values.len() == 1 {
        sink.set_int(tag, values[0]).map_err(sink_err(line_no))
    } else {
        sink.set_ints(tag, &values).map_err(sink_err(line_no))
    }
}

/// `"value";tag` or, without a trailing tag, an unnamed message entry.
/// The value runs to the next unescaped `"`; escapes are kept verbatim.
fn scan_string_line<S>(line: &str, line_no: u64, sink: &mut S) -> Result<(), ReadError<S::Error>>
where
    S: ReportSink,
{
    let bytes = line.as_bytes();
    let mut end = 1;
    while end < bytes.len() && !(bytes[end] == b'"' && bytes[end - 1] != b'\\') {
        end += 1;
    }
    if end == bytes.len() {
        warn!(line = line_no, "missing closing '\"'");
        return Ok(());
    }
    let value = &line[1..end];
    let mut pos = end + 1;
    while pos < bytes.len() && (bytes[pos] == b';' || bytes[pos].is_ascii_whitespace()) {
        pos += 1;
    }
    let tag = line[pos..].trim_end();
    if tag.is_empty() {
        sink.set_message(value).map_err(sink_err(line_no))
    } else {
        sink.set_string(tag, value).map_err(sink_err(line_no))
    }
}

/// A signed decimal run starting at `pos`. A sign with no digits scans as
/// zero. Overflow wraps, as the format has no width contract.
fn scan_signed(bytes: &[u8], mut pos: usize) -> (i32, usize) {
    let mut negative = false;
    if bytes[pos] == b'-' {
        negative = true;
        pos += 1;
    }
    let mut value: i32 = 0;
    while pos < bytes.len() && bytes[pos].is_ascii_digit() {
        value = value
            .wrapping_mul(10)
            .wrapping_add(i32::from(bytes[pos] - b'0'));
        pos += 1;
    }
    (if negative { value.wrapping_neg() } else { value }, pos)
}
