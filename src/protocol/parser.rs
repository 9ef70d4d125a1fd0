// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Line framing and command parsing for the console protocol.
//!
//! Bytes are pushed one at a time as they come off the UART. A `\n` ends the line; the line is
//! trimmed, checked for the marker, split at the first `=`, and matched by name. Anything that
//! does not name a known command is dropped without a reply.
//!
//! Numeric arguments are lenient: the longest numeric prefix is used and a missing number reads
//! as zero, so `kp=abc` sets Kp to 0.

use heapless::Vec;

use crate::protocol::messages::*;

enum State {
    Collecting,
    /// The current line outgrew the buffer; skip to the next terminator.
    Discarding,
}

/// Incremental line parser with an `N`-byte line buffer.
pub struct Parser<const N: usize> {
    state: State,
    line: Vec<u8, N>,
    prefix: &'static str,
}

impl<const N: usize> Parser<N> {
    /// Parser for lines starting with `prefix`. An empty prefix accepts bare lines.
    pub fn new(prefix: &'static str) -> Self {
        Self {
            state: State::Collecting,
            line: Vec::new(),
            prefix,
        }
    }

    #[inline]
    pub fn prefix(&self) -> &'static str {
        self.prefix
    }

    /// Process a single incoming byte. Returns `Some(Command)` when it completes a valid line.
    pub fn push(&mut self, byte: u8) -> Option<Command> {
        if byte == b'\n' {
            let command = match self.state {
                State::Collecting => core::str::from_utf8(&self.line)
                    .ok()
                    .and_then(|line| parse_line(line, self.prefix)),
                State::Discarding => None,
            };
            self.line.clear();
            self.state = State::Collecting;
            return command;
        }

        if let State::Collecting = self.state {
            if self.line.push(byte).is_err() {
                self.line.clear();
                self.state = State::Discarding;
            }
        }
        None
    }

    /// Drop the line being assembled, through its terminator. For input known to have lost bytes.
    pub fn discard_line(&mut self) {
        self.line.clear();
        self.state = State::Discarding;
    }
}

/// Parse one complete line (terminator already removed).
pub fn parse_line(line: &str, prefix: &str) -> Option<Command> {
    let body = line.trim().strip_prefix(prefix)?;

    let (name, args) = match body.split_once('=') {
        Some((name, args)) => (name, args),
        None => (body, ""),
    };

    let command = match name {
        CMD_PING => Command::Ping,
        CMD_KP => Command::Kp(parse_f32_lenient(args)),
        CMD_KI => Command::Ki(parse_f32_lenient(args)),
        CMD_KD => Command::Kd(parse_f32_lenient(args)),
        CMD_SETPOINT => Command::Setpoint(parse_f32_lenient(args)),
        CMD_LOG => Command::Log(parse_i32_lenient(args) != 0),
        CMD_RESET => Command::Reset,
        CMD_POSITION_MODE => Command::PositionMode(parse_i32_lenient(args) != 0),
        _ => return None,
    };
    Some(command)
}

/// Length of the run of ASCII digits at the start of `bytes`.
fn digit_run(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}

/// Length of an optional `+`/`-` at the start of `bytes`.
fn sign_len(bytes: &[u8]) -> usize {
    matches!(bytes.first(), Some(b'+' | b'-')) as usize
}

/// Parse the longest leading decimal number of `s`, or `0.0` if there is none.
///
/// Leading whitespace is skipped. `"2.5abc"` gives `2.5`, `"1e3"` gives `1000.0`, `"abc"` and
/// `""` give `0.0`.
pub fn parse_f32_lenient(s: &str) -> f32 {
    let s = s.trim_start();
    let bytes = s.as_bytes();

    let mut end = sign_len(bytes);
    let int_digits = digit_run(&bytes[end..]);
    end += int_digits;

    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = digit_run(&bytes[end + 1..]);
        end += 1 + frac_digits;
    }

    if int_digits + frac_digits == 0 {
        return 0.0;
    }

    // Exponent only counts if it has digits
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let sign = sign_len(&bytes[end + 1..]);
        let exp_digits = digit_run(&bytes[end + 1 + sign..]);
        if exp_digits > 0 {
            end += 1 + sign + exp_digits;
        }
    }

    s[..end].parse().unwrap_or(0.0)
}

/// Parse the longest leading integer of `s`, or `0` if there is none. Saturates on overflow.
pub fn parse_i32_lenient(s: &str) -> i32 {
    let bytes = s.trim_start().as_bytes();
    let negative = bytes.first() == Some(&b'-');
    let start = sign_len(bytes);

    let mut value: i32 = 0;
    for &b in &bytes[start..start + digit_run(&bytes[start..])] {
        let digit = (b - b'0') as i32;
        value = if negative {
            value.saturating_mul(10).saturating_sub(digit)
        } else {
            value.saturating_mul(10).saturating_add(digit)
        };
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(parser: &mut Parser<64>, bytes: &[u8]) -> Option<Command> {
        let mut out = None;
        for &b in bytes {
            if let Some(cmd) = parser.push(b) {
                out = Some(cmd);
            }
        }
        out
    }

    #[test]
    fn parses_every_command() {
        let p = "PR+";
        assert_eq!(parse_line("PR+ping", p), Some(Command::Ping));
        assert_eq!(parse_line("PR+kp=1.5", p), Some(Command::Kp(1.5)));
        assert_eq!(parse_line("PR+ki=850", p), Some(Command::Ki(850.0)));
        assert_eq!(parse_line("PR+kd=-0.5", p), Some(Command::Kd(-0.5)));
        assert_eq!(parse_line("PR+consigne=2.5", p), Some(Command::Setpoint(2.5)));
        assert_eq!(parse_line("PR+log=1", p), Some(Command::Log(true)));
        assert_eq!(parse_line("PR+log=0", p), Some(Command::Log(false)));
        assert_eq!(parse_line("PR+reset", p), Some(Command::Reset));
        assert_eq!(
            parse_line("PR+asservissement_position=1", p),
            Some(Command::PositionMode(true))
        );
    }

    #[test]
    fn unknown_or_unprefixed_lines_are_dropped() {
        assert_eq!(parse_line("PR+foo=1", "PR+"), None);
        assert_eq!(parse_line("kp=1", "PR+"), None);
        assert_eq!(parse_line("PR+", "PR+"), None);
        assert_eq!(parse_line("PR+KP=1", "PR+"), None);
        assert_eq!(parse_line("", "PR+"), None);
    }

    #[test]
    fn empty_prefix_accepts_bare_lines() {
        assert_eq!(parse_line("ping", ""), Some(Command::Ping));
    }

    #[test]
    fn bad_numbers_read_as_zero() {
        assert_eq!(parse_line("PR+kp=abc", "PR+"), Some(Command::Kp(0.0)));
        assert_eq!(parse_line("PR+consigne", "PR+"), Some(Command::Setpoint(0.0)));
        assert_eq!(parse_line("PR+log=yes", "PR+"), Some(Command::Log(false)));
    }

    #[test]
    fn lenient_float_prefixes() {
        assert_eq!(parse_f32_lenient("2.5abc"), 2.5);
        assert_eq!(parse_f32_lenient("  -3"), -3.0);
        assert_eq!(parse_f32_lenient(".5"), 0.5);
        assert_eq!(parse_f32_lenient("7."), 7.0);
        assert_eq!(parse_f32_lenient("1e3"), 1000.0);
        assert_eq!(parse_f32_lenient("1e"), 1.0);
        assert_eq!(parse_f32_lenient("2E-1x"), 0.2);
        assert_eq!(parse_f32_lenient("-"), 0.0);
        assert_eq!(parse_f32_lenient("."), 0.0);
        assert_eq!(parse_f32_lenient(""), 0.0);
    }

    #[test]
    fn lenient_integer_prefixes() {
        assert_eq!(parse_i32_lenient("1"), 1);
        assert_eq!(parse_i32_lenient("0.9"), 0);
        assert_eq!(parse_i32_lenient("-12x"), -12);
        assert_eq!(parse_i32_lenient("+4"), 4);
        assert_eq!(parse_i32_lenient("99999999999"), i32::MAX);
        assert_eq!(parse_i32_lenient("x1"), 0);
    }

    #[test]
    fn framing_trims_crlf_and_whitespace() {
        let mut parser: Parser<64> = Parser::new("PR+");
        assert_eq!(feed(&mut parser, b"  PR+kp=2\r\n"), Some(Command::Kp(2.0)));
        assert_eq!(feed(&mut parser, b"PR+ping\n"), Some(Command::Ping));
    }

    #[test]
    fn command_only_completes_on_newline() {
        let mut parser: Parser<64> = Parser::new("PR+");
        for &b in b"PR+reset" {
            assert_eq!(parser.push(b), None);
        }
        assert_eq!(parser.push(b'\n'), Some(Command::Reset));
    }

    #[test]
    fn overlong_line_is_discarded_whole() {
        let mut parser: Parser<8> = Parser::new("PR+");
        for &b in b"PR+kp=123456789" {
            assert_eq!(parser.push(b), None);
        }
        assert_eq!(parser.push(b'\n'), None);

        // Next line parses normally
        for &b in b"PR+ping" {
            parser.push(b);
        }
        assert_eq!(parser.push(b'\n'), Some(Command::Ping));
    }

    #[test]
    fn invalid_utf8_is_dropped() {
        let mut parser: Parser<64> = Parser::new("PR+");
        assert_eq!(feed(&mut parser, b"PR+p\xffng\n"), None);
    }

    #[test]
    fn line_with_lost_bytes_is_dropped() {
        let mut parser: Parser<64> = Parser::new("PR+");
        // "PR+kp=15" with the '5' lost still reads as a valid command
        assert_eq!(feed(&mut parser, b"PR+kp=1"), None);
        parser.discard_line();
        assert_eq!(feed(&mut parser, b"\r\n"), None);

        assert_eq!(feed(&mut parser, b"PR+kp=15\r\n"), Some(Command::Kp(15.0)));
    }
}
