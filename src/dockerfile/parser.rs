//! Dockerfile text to instruction sequence
//!
//! The grammar is handled by the `dockerfile-parser` crate; this module converts
//! its instructions into [`Instruction`]s. The crate only knows `\` as the line
//! continuation, so a leading `# escape=` directive is read here and backtick
//! continuations are rewritten before parsing.

use super::instruction::{Command, Instruction};
use dockerfile_parser::{
    Dockerfile as RawDockerfile, Instruction as RawInstruction, ShellOrExecExpr,
};
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

pub const DEFAULT_ESCAPE: char = '\\';

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid ESCAPE '{0}'. Must be ` or \\")]
    InvalidEscape(String),

    #[error("{0}")]
    Syntax(String),

    #[error("{command} requires at least one argument (line {line})")]
    MissingArguments { command: Command, line: usize },
}

/// Parses Dockerfile content into its instruction sequence
pub fn parse(content: &str) -> Result<Vec<Instruction>, ParseError> {
    let escape = escape_directive(content)?;
    let source = if escape == DEFAULT_ESCAPE {
        content.to_string()
    } else {
        rewrite_continuations(content, escape)
    };

    let raw = RawDockerfile::parse(&source).map_err(|e| ParseError::Syntax(e.to_string()))?;

    raw.instructions
        .iter()
        .map(|instruction| convert(instruction, content, escape))
        .collect()
}

/// Escape character from the parser directives at the top of the file
fn escape_directive(content: &str) -> Result<char, ParseError> {
    static DIRECTIVE_REGEX: OnceLock<Regex> = OnceLock::new();
    let re = DIRECTIVE_REGEX.get_or_init(|| {
        Regex::new(r"^#\s*([a-zA-Z][a-zA-Z0-9]*)\s*=\s*(.+?)\s*$")
            .expect("Invalid directive regex")
    });

    for line in content.lines() {
        let Some(caps) = re.captures(line.trim()) else {
            break;
        };
        match caps[1].to_ascii_lowercase().as_str() {
            "escape" => {
                return match &caps[2] {
                    "\\" => Ok('\\'),
                    "`" => Ok('`'),
                    other => Err(ParseError::InvalidEscape(other.to_string())),
                }
            }
            "syntax" | "check" => continue,
            _ => break,
        }
    }
    Ok(DEFAULT_ESCAPE)
}

/// Swaps a trailing escape for `\`; both are one byte so spans stay valid
fn rewrite_continuations(content: &str, escape: char) -> String {
    content
        .split_inclusive('\n')
        .map(|line| {
            let body = line.trim_end();
            match body.strip_suffix(escape) {
                Some(head) => format!("{}\\{}", head, &line[body.len()..]),
                None => line.to_string(),
            }
        })
        .collect()
}

fn convert(raw: &RawInstruction, content: &str, escape: char) -> Result<Instruction, ParseError> {
    let (start, end) = span_of(raw);
    let text = logical_text(content.get(start..end).unwrap_or_default(), escape);
    let line = content.get(..start).unwrap_or(content).matches('\n').count() + 1;

    let (keyword, flags, args) = match raw {
        RawInstruction::From(from) => {
            let flags = from
                .flags
                .iter()
                .map(|f| format!("--{}={}", f.name.content, f.value))
                .collect();
            let mut args = vec![from.image.content.clone()];
            if let Some(alias) = &from.alias {
                args.push("AS".to_string());
                args.push(alias.content.clone());
            }
            (Command::From.as_str().to_string(), flags, args)
        }
        RawInstruction::Arg(arg) => {
            let declaration = match &arg.value {
                Some(value) => format!("{}={}", arg.name, value),
                None => arg.name.to_string(),
            };
            (Command::Arg.as_str().to_string(), Vec::new(), vec![declaration])
        }
        RawInstruction::Copy(copy) => {
            let mut flags: Vec<String> = copy
                .flags
                .iter()
                .map(|f| format!("--{}={}", f.name.content, f.value))
                .collect();
            // the grammar reads bare flags such as --link as paths
            let (bare, paths): (Vec<String>, Vec<String>) = copy
                .sources
                .iter()
                .chain(std::iter::once(&copy.destination))
                .map(|s| s.to_string())
                .partition(|p| p.starts_with("--"));
            flags.extend(bare);

            let args = json_form(&text).unwrap_or(paths);
            (Command::Copy.as_str().to_string(), flags, args)
        }
        RawInstruction::Env(env) => {
            let args = env
                .vars
                .iter()
                .flat_map(|var| [var.key.to_string(), var.value.to_string()])
                .collect();
            (Command::Env.as_str().to_string(), Vec::new(), args)
        }
        RawInstruction::Label(label) => {
            let args = label
                .labels
                .iter()
                .flat_map(|l| [l.name.to_string(), l.value.to_string()])
                .collect();
            (Command::Label.as_str().to_string(), Vec::new(), args)
        }
        RawInstruction::Run(run) => (
            Command::Run.as_str().to_string(),
            Vec::new(),
            command_args(&run.expr),
        ),
        RawInstruction::Cmd(cmd) => (
            Command::Cmd.as_str().to_string(),
            Vec::new(),
            command_args(&cmd.expr),
        ),
        RawInstruction::Entrypoint(ep) => (
            Command::Entrypoint.as_str().to_string(),
            Vec::new(),
            command_args(&ep.expr),
        ),
        RawInstruction::Misc(misc) => {
            let keyword = misc.instruction.content.to_ascii_lowercase();
            let (flags, args) = misc_args(&keyword, &misc.arguments.to_string(), escape);
            (keyword, flags, args)
        }
    };

    if let Some(command) = Command::from_keyword(&keyword) {
        if args.iter().all(|a| a.trim().is_empty()) {
            return Err(ParseError::MissingArguments { command, line });
        }
    }

    Ok(Instruction {
        keyword,
        flags,
        args,
        original: text,
        line,
        escape,
    })
}

/// Byte range of an instruction in the source text
fn span_of(raw: &RawInstruction) -> (usize, usize) {
    let span = match raw {
        RawInstruction::From(i) => &i.span,
        RawInstruction::Arg(i) => &i.span,
        RawInstruction::Label(i) => &i.span,
        RawInstruction::Run(i) => &i.span,
        RawInstruction::Entrypoint(i) => &i.span,
        RawInstruction::Cmd(i) => &i.span,
        RawInstruction::Copy(i) => &i.span,
        RawInstruction::Env(i) => &i.span,
        RawInstruction::Misc(i) => &i.span,
    };
    (span.start, span.end)
}

fn command_args(expr: &ShellOrExecExpr) -> Vec<String> {
    match expr {
        ShellOrExecExpr::Shell(s) => vec![s.to_string().trim().to_string()],
        ShellOrExecExpr::Exec(array) => {
            array.elements.iter().map(|s| s.content.clone()).collect()
        }
    }
}

/// Argument shapes for instructions the crate leaves unstructured
///
/// ADD, VOLUME, WORKDIR, ONBUILD and unknown keywords arrive here as raw text.
fn misc_args(keyword: &str, arguments: &str, escape: char) -> (Vec<String>, Vec<String>) {
    let (flags, rest) = extract_flags(arguments);
    let args = match Command::from_keyword(keyword) {
        Some(Command::Copy | Command::Add | Command::Volume) => {
            parse_json_array(rest).unwrap_or_else(|| split_words(rest, escape))
        }
        Some(Command::Arg | Command::Env | Command::Label) => split_words(rest, escape),
        Some(Command::From | Command::Expose) | None => {
            rest.split_whitespace().map(str::to_string).collect()
        }
        Some(_) => vec![rest.trim().to_string()],
    };
    (flags, args)
}

/// JSON array arguments of an instruction's text, after any flags
fn json_form(text: &str) -> Option<Vec<String>> {
    let (_, rest) = text.split_once(char::is_whitespace)?;
    let (_, rest) = extract_flags(rest);
    parse_json_array(rest)
}

fn extract_flags(rest: &str) -> (Vec<String>, &str) {
    let mut flags = Vec::new();
    let mut rest = rest.trim_start();

    while rest.starts_with("--") {
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let word = &rest[..end];
        rest = rest[end..].trim_start();
        if word == "--" {
            break;
        }
        flags.push(word.to_string());
    }

    (flags, rest)
}

fn parse_json_array(rest: &str) -> Option<Vec<String>> {
    let trimmed = rest.trim();
    if !trimmed.starts_with('[') {
        return None;
    }
    serde_json::from_str(trimmed).ok()
}

/// Instruction text with continuations joined and comment lines dropped
fn logical_text(raw: &str, escape: char) -> String {
    let mut text = String::new();
    for line in raw.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        match trimmed.strip_suffix(escape) {
            Some(head) => text.push_str(head),
            None => text.push_str(trimmed),
        }
        if !text.ends_with(' ') {
            text.push(' ');
        }
    }
    text.trim_end().to_string()
}

/// Splits on unquoted whitespace, keeping quotes and escapes in the words
fn split_words(input: &str, escape: char) -> Vec<String> {
    let mut words = Vec::new();
    let mut word = String::new();
    let mut quote: Option<char> = None;
    let mut chars = input.chars();

    while let Some(ch) = chars.next() {
        match quote {
            Some(q) => {
                word.push(ch);
                if ch == escape && q == '"' {
                    if let Some(next) = chars.next() {
                        word.push(next);
                    }
                } else if ch == q {
                    quote = None;
                }
            }
            None if ch.is_whitespace() => {
                if !word.is_empty() {
                    words.push(std::mem::take(&mut word));
                }
            }
            None => {
                word.push(ch);
                if ch == '"' || ch == '\'' {
                    quote = Some(ch);
                } else if ch == escape {
                    if let Some(next) = chars.next() {
                        word.push(next);
                    }
                }
            }
        }
    }

    if !word.is_empty() {
        words.push(word);
    }
    words
}
