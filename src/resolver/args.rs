//! ARG substitution
//!
//! Each ARG declaration substitutes its value into the arguments and flags of
//! the instructions that follow it, up to the next ARG that declares the same
//! name again. A value supplied by the caller wins over the declared default.

use crate::dockerfile::{Command, Instruction};
use std::collections::HashMap;
use tracing::trace;

/// Caller-supplied build arguments; `None` keeps the declared default
pub type BuildArgs = HashMap<String, Option<String>>;

pub fn expand_build_args(instructions: &mut [Instruction], build_args: &BuildArgs) {
    for index in 0..instructions.len() {
        if !instructions[index].is(Command::Arg) {
            continue;
        }

        let declarations: Vec<(String, String)> = instructions[index]
            .args
            .iter()
            .filter_map(|declaration| resolve_declaration(declaration, build_args))
            .collect();

        for (key, value) in declarations {
            trace!(key = %key, value = %value, "Substituting build arg");
            for later in instructions[index + 1..].iter_mut() {
                if later.is(Command::Arg) && declares(later, &key) {
                    break;
                }
                for token in later.args.iter_mut().chain(later.flags.iter_mut()) {
                    *token = substitute(token, &key, &value);
                }
            }
        }
    }
}

fn resolve_declaration(declaration: &str, build_args: &BuildArgs) -> Option<(String, String)> {
    let (key, default) = match declaration.split_once('=') {
        Some((key, default)) => (key, Some(default)),
        None => (declaration, None),
    };
    if key.is_empty() {
        return None;
    }

    let value = match build_args.get(key) {
        Some(Some(value)) => value.clone(),
        _ => default.map(unquote).unwrap_or_default(),
    };
    Some((key.to_string(), value))
}

fn declares(instruction: &Instruction, key: &str) -> bool {
    instruction
        .args
        .iter()
        .any(|declaration| declaration.split('=').next() == Some(key))
}

fn unquote(value: &str) -> String {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return value[1..value.len() - 1].to_string();
        }
    }
    value.to_string()
}

/// Replaces `${key}` everywhere and `$key` where no identifier character follows
fn substitute(text: &str, key: &str, value: &str) -> String {
    let text = text.replace(&format!("${{{}}}", key), value);
    let bare = format!("${}", key);

    let mut out = String::with_capacity(text.len());
    let mut rest = text.as_str();
    while let Some(start) = rest.find(&bare) {
        let end = start + bare.len();
        let at_boundary = rest[end..]
            .chars()
            .next()
            .map_or(true, |c| !(c.is_ascii_alphanumeric() || c == '_'));

        out.push_str(&rest[..start]);
        out.push_str(if at_boundary { value } else { bare.as_str() });
        rest = &rest[end..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dockerfile::parse;

    fn args(pairs: &[(&str, Option<&str>)]) -> BuildArgs {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.map(str::to_string)))
            .collect()
    }

    fn copy_args(instructions: &[Instruction]) -> Vec<Vec<String>> {
        instructions
            .iter()
            .filter(|i| i.is(Command::Copy))
            .map(|i| i.args.clone())
            .collect()
    }

    #[test]
    fn test_default_value_is_substituted() {
        let mut instructions =
            parse("FROM alpine\nARG VERSION=1.0\nCOPY app-${VERSION}.jar /app/\n").unwrap();
        expand_build_args(&mut instructions, &BuildArgs::new());

        assert_eq!(copy_args(&instructions), vec![vec!["app-1.0.jar", "/app/"]]);
    }

    #[test]
    fn test_supplied_value_overrides_default() {
        let mut instructions = parse("ARG VERSION=1.0\nCOPY app-$VERSION.jar /app/\n").unwrap();
        expand_build_args(&mut instructions, &args(&[("VERSION", Some("2.0"))]));

        assert_eq!(copy_args(&instructions), vec![vec!["app-2.0.jar", "/app/"]]);
    }

    #[test]
    fn test_absent_supplied_value_keeps_default() {
        let mut instructions = parse("ARG VERSION=1.0\nCOPY app-$VERSION.jar /app/\n").unwrap();
        expand_build_args(&mut instructions, &args(&[("VERSION", None)]));

        assert_eq!(copy_args(&instructions), vec![vec!["app-1.0.jar", "/app/"]]);
    }

    #[test]
    fn test_quoted_default_is_unquoted() {
        let mut instructions = parse("ARG NAME=\"my app\"\nCOPY ${NAME} /app/\n").unwrap();
        expand_build_args(&mut instructions, &BuildArgs::new());

        assert_eq!(instructions[1].args[0], "my app");
    }

    #[test]
    fn test_bare_reference_needs_identifier_boundary() {
        let mut instructions = parse("ARG A=x\nCOPY $A $AB ${A}B /dst/\n").unwrap();
        expand_build_args(&mut instructions, &BuildArgs::new());

        assert_eq!(copy_args(&instructions), vec![vec!["x", "$AB", "xB", "/dst/"]]);
    }

    #[test]
    fn test_substitution_stops_at_redeclaration() {
        let content = "ARG V=1\nCOPY a-$V /x/\nARG V=2\nCOPY b-$V /y/\n";
        let mut instructions = parse(content).unwrap();
        expand_build_args(&mut instructions, &BuildArgs::new());

        assert_eq!(
            copy_args(&instructions),
            vec![vec!["a-1", "/x/"], vec!["b-2", "/y/"]]
        );
    }

    #[test]
    fn test_declaration_without_default_takes_supplied_value() {
        let mut instructions = parse("ARG A=1\nARG B\nCOPY $A-$B /dst/\n").unwrap();
        expand_build_args(&mut instructions, &args(&[("B", Some("two"))]));

        assert_eq!(instructions[2].args[0], "1-two");
    }

    #[test]
    fn test_flags_are_substituted() {
        let mut instructions = parse("ARG STAGE=builder\nCOPY --from=$STAGE /out /app\n").unwrap();
        expand_build_args(&mut instructions, &BuildArgs::new());

        assert_eq!(instructions[1].flag("from"), Some("builder"));
    }

    #[test]
    fn test_undeclared_references_are_untouched() {
        let mut instructions = parse("COPY $MISSING /dst/\n").unwrap();
        expand_build_args(&mut instructions, &args(&[("MISSING", Some("x"))]));

        assert_eq!(instructions[0].args[0], "$MISSING");
    }
}
