//! Reply line model.
//!
//! ESP-AT replies are CR/LF separated lines: an optional echo of the command,
//! zero or more `+NAME:field,field` data lines, free text, and finally a bare
//! `OK` or `ERROR`. Matching is always done on whole lines.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// `+NAME:rest` where NAME is upper-case alphanumeric.
static DATA_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+([A-Z0-9_]+):(.*)$").expect("data line pattern is valid"));

/// `ERR CODE:0x01090000`
static ERR_CODE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^ERR CODE:0x([0-9A-Fa-f]{1,8})$").expect("err code pattern is valid"));

/// A structured `+NAME:...` line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataLine {
    pub name: String,
    /// Comma separated values with surrounding quotes removed.
    pub fields: Vec<String>,
}

impl DataLine {
    /// Parse one line; `None` if it is not a data line.
    pub fn parse(line: &str) -> Option<Self> {
        let caps = DATA_LINE.captures(line)?;
        Some(Self {
            name: caps[1].to_string(),
            fields: split_fields(&caps[2]),
        })
    }

    /// Field `index` parsed as an unsigned integer.
    pub fn u64_field(&self, index: usize) -> Option<u64> {
        self.fields.get(index)?.trim().parse().ok()
    }
}

/// One classified line of a reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ReplyLine {
    Ok,
    Error,
    /// Boot banner emitted once the firmware accepts commands.
    Ready,
    /// Diagnostic code printed right before `ERROR`.
    ErrCode(u32),
    Data(DataLine),
    /// The command itself, echoed back (ATE1).
    Echo(String),
    Text(String),
}

impl ReplyLine {
    pub fn classify(line: &str, command: Option<&str>) -> Self {
        match line {
            "OK" => return Self::Ok,
            "ERROR" => return Self::Error,
            "ready" => return Self::Ready,
            _ => {}
        }
        if command.is_some_and(|c| c == line) {
            return Self::Echo(line.to_string());
        }
        if let Some(caps) = ERR_CODE_LINE.captures(line) {
            if let Ok(code) = u32::from_str_radix(&caps[1], 16) {
                return Self::ErrCode(code);
            }
        }
        match DataLine::parse(line) {
            Some(data) => Self::Data(data),
            None => Self::Text(line.to_string()),
        }
    }
}

/// Non-empty lines of `raw`, split on CR and/or LF.
pub fn split_lines(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(['\r', '\n']).filter(|l| !l.is_empty())
}

/// Like [`split_lines`], but drops a trailing line that has no CR or LF yet.
pub fn complete_lines(raw: &str) -> impl Iterator<Item = &str> {
    raw.split_inclusive(['\r', '\n'])
        .filter(|piece| piece.ends_with(['\r', '\n']))
        .map(|piece| piece.trim_end_matches(['\r', '\n']))
        .filter(|line| !line.is_empty())
}

/// Every line of `raw` classified, with the echo recognised if `command` is given.
pub fn parse_lines(raw: &str, command: Option<&str>) -> Vec<ReplyLine> {
    split_lines(raw)
        .map(|line| ReplyLine::classify(line, command))
        .collect()
}

/// Data lines named `name` (without the `+`).
pub fn data_lines(raw: &str, name: &str) -> Vec<DataLine> {
    split_lines(raw)
        .filter_map(|line| DataLine::parse(line.trim()))
        .filter(|d| d.name == name)
        .collect()
}

/// The ESP-AT `ERR CODE` in `raw`, if one was printed.
pub fn error_code(raw: &str) -> Option<u32> {
    parse_lines(raw, None).into_iter().find_map(|l| match l {
        ReplyLine::ErrCode(code) => Some(code),
        _ => None,
    })
}

/// Split on commas that are not inside double quotes, unquoting each field.
fn split_fields(rest: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut quoted = false;

    for c in rest.chars() {
        match c {
            '"' => quoted = !quoted,
            ',' if !quoted => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_data_line_with_quoted_comma() {
        let line = DataLine::parse(r#"+MQTTPUB:0,"fov/test","hello, world",0,0"#).unwrap();
        assert_eq!(line.name, "MQTTPUB");
        assert_eq!(line.fields, vec!["0", "fov/test", "hello, world", "0", "0"]);
    }

    #[test]
    fn test_complete_lines_skip_unfinished_tail() {
        let lines: Vec<&str> = complete_lines("ready\r\n+IPD,4\r\nrea").collect();
        assert_eq!(lines, vec!["ready", "+IPD,4"]);
        assert_eq!(complete_lines("ready").count(), 0);
        assert_eq!(complete_lines("ready\r").collect::<Vec<_>>(), vec!["ready"]);
    }

    #[test]
    fn test_memory_line_fields() {
        let line = DataLine::parse("+FWMEMINFO:PSRAM,1572864,1048576").unwrap();
        assert_eq!(line.fields[0], "PSRAM");
        assert_eq!(line.u64_field(1), Some(1_572_864));
        assert_eq!(line.u64_field(2), Some(1_048_576));
        assert_eq!(line.u64_field(3), None);
    }

    #[test]
    fn test_classify_lines() {
        let raw = "AT+GMR\r\nAT version:4.0.0\r\n+CWMODE:1\r\nOK\r\n";
        let lines = parse_lines(raw, Some("AT+GMR"));
        assert_eq!(lines[0], ReplyLine::Echo("AT+GMR".into()));
        assert_eq!(lines[1], ReplyLine::Text("AT version:4.0.0".into()));
        assert!(matches!(&lines[2], ReplyLine::Data(d) if d.name == "CWMODE"));
        assert_eq!(lines[3], ReplyLine::Ok);
    }

    #[test]
    fn test_terminators_are_exact() {
        assert_eq!(ReplyLine::classify("OK", None), ReplyLine::Ok);
        assert_eq!(ReplyLine::classify("SEND OK", None), ReplyLine::Text("SEND OK".into()));
        assert_eq!(ReplyLine::classify("error", None), ReplyLine::Text("error".into()));
    }

    #[test]
    fn test_error_code() {
        let raw = "AT+FOO\r\nERR CODE:0x01090000\r\nERROR\r\n";
        assert_eq!(error_code(raw), Some(0x0109_0000));
        assert_eq!(error_code("ERROR\r\n"), None);
    }

    #[test]
    fn test_lowercase_name_is_not_data() {
        assert!(DataLine::parse("+cwmode:1").is_none());
    }
}
