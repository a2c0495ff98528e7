//! Dockerfile instruction model
//!
//! Instructions are kept close to what the reference parser produces: a lowercase
//! keyword, the `--flag=value` words that preceded the arguments, and the argument
//! tokens themselves. Each instruction owns its tokens.

use super::parser::DEFAULT_ESCAPE;
use std::fmt;

/// Instruction keywords recognized by the image builder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Add,
    Arg,
    Cmd,
    Copy,
    Entrypoint,
    Env,
    Expose,
    From,
    Healthcheck,
    Label,
    Maintainer,
    Onbuild,
    Run,
    Shell,
    Stopsignal,
    User,
    Volume,
    Workdir,
}

impl Command {
    pub const ALL: [Command; 18] = [
        Command::Add,
        Command::Arg,
        Command::Cmd,
        Command::Copy,
        Command::Entrypoint,
        Command::Env,
        Command::Expose,
        Command::From,
        Command::Healthcheck,
        Command::Label,
        Command::Maintainer,
        Command::Onbuild,
        Command::Run,
        Command::Shell,
        Command::Stopsignal,
        Command::User,
        Command::Volume,
        Command::Workdir,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Add => "add",
            Command::Arg => "arg",
            Command::Cmd => "cmd",
            Command::Copy => "copy",
            Command::Entrypoint => "entrypoint",
            Command::Env => "env",
            Command::Expose => "expose",
            Command::From => "from",
            Command::Healthcheck => "healthcheck",
            Command::Label => "label",
            Command::Maintainer => "maintainer",
            Command::Onbuild => "onbuild",
            Command::Run => "run",
            Command::Shell => "shell",
            Command::Stopsignal => "stopsignal",
            Command::User => "user",
            Command::Volume => "volume",
            Command::Workdir => "workdir",
        }
    }

    /// Looks up a keyword, ignoring case
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        let keyword = keyword.to_ascii_lowercase();
        Self::ALL.iter().copied().find(|c| c.as_str() == keyword)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_ascii_uppercase())
    }
}

/// One logical Dockerfile line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    /// Lowercase keyword, kept even when it is not a known [`Command`]
    pub keyword: String,
    /// `--name=value` words preceding the arguments
    pub flags: Vec<String>,
    pub args: Vec<String>,
    /// Logical line text after continuation joining
    pub original: String,
    /// 1-based line the instruction starts on
    pub line: usize,
    /// Escape character in effect for the file
    pub escape: char,
}

impl Instruction {
    pub fn new(keyword: impl Into<String>, args: Vec<String>) -> Self {
        let keyword = keyword.into().to_ascii_lowercase();
        let original = std::iter::once(keyword.to_ascii_uppercase())
            .chain(args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ");
        Self {
            keyword,
            flags: Vec::new(),
            args,
            original,
            line: 0,
            escape: DEFAULT_ESCAPE,
        }
    }

    pub fn with_flags(mut self, flags: Vec<String>) -> Self {
        self.flags = flags;
        self
    }

    pub fn command(&self) -> Option<Command> {
        Command::from_keyword(&self.keyword)
    }

    pub fn is(&self, command: Command) -> bool {
        self.command() == Some(command)
    }

    /// Value of `--name=value`, or an empty string for a bare `--name`
    pub fn flag(&self, name: &str) -> Option<&str> {
        self.flags.iter().find_map(|flag| {
            let body = flag.strip_prefix("--")?;
            match body.split_once('=') {
                Some((key, value)) if key == name => Some(value),
                None if body == name => Some(""),
                _ => None,
            }
        })
    }

    pub fn has_flag(&self, name: &str) -> bool {
        self.flag(name).is_some()
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

/// Base image and optional alias named by a FROM instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageRef {
    /// Image name as written; registries treat it case-sensitively
    pub image: String,
    /// Lowercase stage alias
    pub alias: Option<String>,
}

impl StageRef {
    pub const SCRATCH: &'static str = "scratch";

    /// Extracts `image [AS alias]` from a FROM instruction
    pub fn from_instruction(instruction: &Instruction) -> Option<Self> {
        if !instruction.is(Command::From) {
            return None;
        }
        let image = instruction.args.first()?.clone();
        let alias = match instruction.args.get(1..3) {
            Some([keyword, alias]) if keyword.eq_ignore_ascii_case("as") => {
                Some(alias.to_ascii_lowercase())
            }
            _ => None,
        };
        Some(Self { image, alias })
    }

    pub fn is_scratch(&self) -> bool {
        self.image.eq_ignore_ascii_case(Self::SCRATCH)
    }

    /// Key under which this stage's image is cached
    pub fn image_key(&self) -> String {
        self.image.to_ascii_lowercase()
    }
}
