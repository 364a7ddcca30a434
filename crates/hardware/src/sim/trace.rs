//! Access trace parsing.
//!
//! A trace holds one processor access per line:
//!
//! ```text
//! # cache op address
//! 0 r 0x1000
//! 1 W 4096
//! ```
//!
//! `op` is `r`/`R` for a read and `w`/`W` for a write. Addresses are hexadecimal
//! with a `0x` prefix or decimal. Blank lines and lines starting with `#` are skipped.

use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use crate::common::addr::Addr;
use crate::common::data::AccessType;
use crate::common::error::TraceError;

/// One processor access from a trace.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Access {
    /// Cache performing the access.
    pub cache: usize,
    /// Read or write.
    pub kind: AccessType,
    /// Byte address accessed.
    pub addr: Addr,
}

impl Access {
    /// Creates a read access.
    pub const fn read(cache: usize, addr: u64) -> Self {
        Self {
            cache,
            kind: AccessType::Read,
            addr: Addr(addr),
        }
    }

    /// Creates a write access.
    pub const fn write(cache: usize, addr: u64) -> Self {
        Self {
            cache,
            kind: AccessType::Write,
            addr: Addr(addr),
        }
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self.kind {
            AccessType::Read => 'r',
            AccessType::Write => 'w',
        };
        write!(f, "{} {op} {}", self.cache, self.addr)
    }
}

/// Parses a single trace line.
///
/// # Arguments
///
/// * `line_no` - 1-based line number, used in error messages.
/// * `text` - The raw line.
///
/// # Returns
///
/// `None` for blank and comment lines.
///
/// # Errors
///
/// Returns [`TraceError::Malformed`] if the line is not `<cache> <op> <address>`.
pub fn parse_line(line_no: usize, text: &str) -> Result<Option<Access>, TraceError> {
    let text = text.trim();
    if text.is_empty() || text.starts_with('#') {
        return Ok(None);
    }

    let malformed = |reason: String| TraceError::Malformed {
        line: line_no,
        reason,
    };

    let fields: Vec<&str> = text.split_whitespace().collect();
    let &[cache, op, addr] = fields.as_slice() else {
        return Err(malformed(format!(
            "expected `<cache> <op> <address>`, found {} fields",
            fields.len()
        )));
    };

    let cache = cache
        .parse::<usize>()
        .map_err(|e| malformed(format!("bad cache id `{cache}`: {e}")))?;
    let kind = match op {
        "r" | "R" => AccessType::Read,
        "w" | "W" => AccessType::Write,
        other => return Err(malformed(format!("unknown operation `{other}`"))),
    };
    let addr = parse_addr(addr).map_err(|e| malformed(format!("bad address `{addr}`: {e}")))?;

    Ok(Some(Access { cache, kind, addr }))
}

fn parse_addr(text: &str) -> Result<Addr, std::num::ParseIntError> {
    let value = match text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16)?,
        None => text.parse::<u64>()?,
    };
    Ok(Addr(value))
}

/// Streaming reader yielding the accesses of a trace in order.
#[derive(Debug)]
pub struct TraceReader<R> {
    lines: io::Lines<R>,
    line_no: usize,
}

impl<R: BufRead> TraceReader<R> {
    /// Wraps a buffered reader.
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
        }
    }
}

impl<R: BufRead> Iterator for TraceReader<R> {
    type Item = Result<Access, TraceError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            self.line_no += 1;
            match parse_line(self.line_no, &line) {
                Ok(Some(access)) => return Some(Ok(access)),
                Ok(None) => {}
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

/// Opens a trace file for streaming.
///
/// # Errors
///
/// Returns [`TraceError::Io`] if the file cannot be opened.
pub fn open(path: impl AsRef<Path>) -> Result<TraceReader<BufReader<File>>, TraceError> {
    let file = File::open(path)?;
    Ok(TraceReader::new(BufReader::new(file)))
}

/// Parses a whole in-memory trace.
///
/// # Errors
///
/// Returns the first [`TraceError::Malformed`] encountered.
pub fn parse_str(text: &str) -> Result<Vec<Access>, TraceError> {
    TraceReader::new(text.as_bytes()).collect()
}
