use std::fmt;

use winnow::ascii::space0;
use winnow::combinator::{
    alt, dispatch, empty, fail, opt, preceded, separated_pair, terminated,
};
use winnow::error::{ContextError, ParseError, StrContext, StrContextValue};
use winnow::token::{any, rest, take_while};
use winnow::{ModalResult, Parser};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed trace line {line:?} at column {offset}: {message}")]
pub struct TraceParseError {
    line: String,
    offset: usize,
    message: String,
}

impl TraceParseError {
    fn new(line: &str, error: ParseError<&str, ContextError>) -> Self {
        Self {
            line: line.to_string(),
            offset: error.offset(),
            message: error.inner().to_string(),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Operation {
    Load,
    Store,
    /// A load immediately followed by a store to the same bytes.
    Modify,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Load => f.write_str("L"),
            Operation::Store => f.write_str("S"),
            Operation::Modify => f.write_str("M"),
        }
    }
}

/// A data access of `length` bytes starting at `address`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TraceRecord {
    pub operation: Operation,
    pub address: u64,
    pub length: u64,
}

impl TraceRecord {
    /// Start addresses of every `block_size` block overlapping the record's
    /// bytes, in ascending order. Bytes past the top of the address space are
    /// dropped.
    pub fn blocks(self, block_size: usize) -> Blocks {
        const ADDRESS_SPACE_END: u128 = 1 << u64::BITS;

        let step = block_size as u128;
        let next = u128::from(self.address) / step * step;
        let end = (u128::from(self.address) + u128::from(self.length))
            .next_multiple_of(step)
            .min(ADDRESS_SPACE_END);

        Blocks { next, end, step }
    }

    /// How many times the record walks its blocks.
    pub fn passes(&self) -> usize {
        match self.operation {
            Operation::Load | Operation::Store => 1,
            Operation::Modify => 2,
        }
    }
}

/// Aligned block addresses of a record, produced on demand.
#[derive(Debug, Clone)]
pub struct Blocks {
    next: u128,
    end: u128,
    step: u128,
}

impl Iterator for Blocks {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        if self.next >= self.end {
            return None;
        }
        let address = self.next as u64;
        self.next += self.step;
        Some(address)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end.saturating_sub(self.next).div_ceil(self.step);
        match usize::try_from(remaining) {
            Ok(remaining) => (remaining, Some(remaining)),
            Err(_) => (usize::MAX, None),
        }
    }
}

impl fmt::Display for TraceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:x},{}", self.operation, self.address, self.length)
    }
}

/// One line of a trace, e.g. ` L 7ff000,8` or `I  0400d7d4,8`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TraceLine {
    /// Instruction fetch, never simulated.
    Instruction,
    Data(TraceRecord),
}

impl TraceLine {
    pub fn parse(line: &str) -> Result<Self, TraceParseError> {
        trace_line
            .parse(line)
            .map_err(|e| TraceParseError::new(line, e))
    }
}

// valgrind writes data operations in the second column and instruction fetches in
// the first; anything after the length is ignored
fn trace_line(input: &mut &str) -> ModalResult<TraceLine> {
    let code = alt(('I'.value(None), preceded(any, operation_code))).parse_next(input)?;
    let Some(operation) = code else {
        return rest.value(TraceLine::Instruction).parse_next(input);
    };

    terminated(
        separated_pair(
            preceded(space0, hex_integer),
            ',',
            preceded(space0, decimal_integer),
        ),
        rest,
    )
    .parse_next(input)
    .map(|(address, length)| {
        TraceLine::Data(TraceRecord {
            operation,
            address,
            length,
        })
    })
}

/// `None` for an instruction fetch.
fn operation_code(input: &mut &str) -> ModalResult<Option<Operation>> {
    dispatch! {any;
        'I' => empty.value(None),
        'L' => empty.value(Some(Operation::Load)),
        'S' => empty.value(Some(Operation::Store)),
        'M' => empty.value(Some(Operation::Modify)),
        _ => fail::<_, Option<Operation>, _>,
    }
    .context(StrContext::Label("operation"))
    .context(StrContext::Expected(StrContextValue::Description(
        "'I', 'L', 'S' or 'M' as the second character",
    )))
    .parse_next(input)
}

fn hex_integer(input: &mut &str) -> ModalResult<u64> {
    preceded(
        opt(alt(("0x", "0X"))),
        take_while(1.., ('0'..='9', 'a'..='f', 'A'..='F')),
    )
    .try_map(|s| u64::from_str_radix(s, 16))
    .context(StrContext::Label("address"))
    .context(StrContext::Expected(StrContextValue::Description(
        "a hexadecimal address",
    )))
    .parse_next(input)
}

fn decimal_integer(input: &mut &str) -> ModalResult<u64> {
    take_while(1.., '0'..='9')
        .try_map(str::parse::<u64>)
        .context(StrContext::Label("length"))
        .context(StrContext::Expected(StrContextValue::Description(
            "a decimal length",
        )))
        .parse_next(input)
}
