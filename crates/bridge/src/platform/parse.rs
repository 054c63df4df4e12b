// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parsers for Windows tool output and command lines. Pure, so they are
//! tested on every OS.

/// PID of the process listening on `port` in `netstat -ano` output.
pub fn parse_netstat_listener(output: &str, port: u16) -> Option<u32> {
    let suffix = format!(":{port}");
    output.lines().find_map(|line| {
        let fields: Vec<&str> = line.split_whitespace().collect();
        match fields.as_slice() {
            [proto, local, _remote, state, pid]
                if proto.eq_ignore_ascii_case("TCP")
                    && local.ends_with(&suffix)
                    && state.eq_ignore_ascii_case("LISTENING") =>
            {
                pid.parse().ok().filter(|pid| *pid > 0)
            }
            _ => None,
        }
    })
}

/// Whether `tasklist /FO CSV /NH` output lists `pid`.
pub fn parse_tasklist_has_pid(output: &str, pid: u32) -> bool {
    let wanted = pid.to_string();
    output.lines().any(|line| {
        line.split(',').nth(1).map(|field| field.trim().trim_matches('"') == wanted).unwrap_or(false)
    })
}

/// Split a command line on whitespace, honouring double quotes.
pub fn tokenize_command_line(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;
    for c in line.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    tokens.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }
    if has_token {
        tokens.push(current);
    }
    tokens
}

#[cfg(test)]
#[path = "parse_tests.rs"]
mod tests;
