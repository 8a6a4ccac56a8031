// Virtual Jack Control Parsing
// Integer parsing for control-file writes, with kernel simple_strtol semantics

/// A parsed write to the input device's `test_input` control file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputCommand {
    pub code: u16,
    pub value: i32,
}

/// A parsed write to the switch device's `test_state` control file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateCommand {
    pub state: i32,
}

/// Parse a signed integer the way the kernel's `simple_strtol(s, &end, 0)` does.
///
/// Returns the value and the unconsumed remainder. The radix is picked from
/// the prefix: `0x` followed by a hex digit is hexadecimal, a leading `0` is
/// octal, anything else is decimal. Text that does not start with a digit
/// parses as 0 and consumes nothing. Overflow wraps.
pub fn parse_long(input: &str) -> (i64, &str) {
    if let Some(rest) = input.strip_prefix('-') {
        let (magnitude, remainder) = parse_ulong(rest);
        if remainder.len() == rest.len() {
            // Nothing after the sign was a digit
            return (0, input);
        }
        return ((magnitude as i64).wrapping_neg(), remainder);
    }
    let (magnitude, remainder) = parse_ulong(input);
    (magnitude as i64, remainder)
}

fn parse_ulong(input: &str) -> (u64, &str) {
    let bytes = input.as_bytes();
    let (radix, start) = match bytes {
        [b'0', x, d, ..] if x.eq_ignore_ascii_case(&b'x') && d.is_ascii_hexdigit() => (16, 2),
        [b'0', ..] => (8, 0),
        _ => (10, 0),
    };

    let mut value: u64 = 0;
    let mut end = start;
    while let Some(digit) = bytes.get(end).and_then(|b| (*b as char).to_digit(radix)) {
        value = value
            .wrapping_mul(u64::from(radix))
            .wrapping_add(u64::from(digit));
        end += 1;
    }

    if end == start {
        return (0, input);
    }
    (value, &input[end..])
}

fn skip_blanks(input: &str) -> &str {
    input.trim_start_matches(|c: char| c.is_ascii_whitespace())
}

/// Parse `"<code> <value>"`.
///
/// Anything that fails to parse reads as 0, and text after the value is
/// ignored. The code is truncated to 16 bits and the value to 32 bits, the
/// widths of a Linux `input_event`.
pub fn parse_input_command(buf: &str) -> InputCommand {
    let (code, rest) = parse_long(skip_blanks(buf));
    let (value, _) = parse_long(skip_blanks(rest));
    InputCommand {
        code: code as u16,
        value: value as i32,
    }
}

/// Parse `"<state>"`. Same grammar as [`parse_input_command`].
pub fn parse_state_command(buf: &str) -> StateCommand {
    let (state, _) = parse_long(skip_blanks(buf));
    StateCommand {
        state: state as i32,
    }
}
