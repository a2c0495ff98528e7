//! COPY and ADD source discovery
//!
//! Walks the expanded instruction sequence tracking the working directory and
//! the ENV values seen so far, and records which context sources each COPY or
//! ADD reads and where they land.

use super::lookup::ImageLookup;
use super::ResolveError;
use crate::dockerfile::{process_word, Command, Environment, Instruction, StageRef};
use crate::util::path;
use std::collections::HashMap;
use tracing::debug;

/// Sources of one COPY/ADD and the resolved destination in the image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyAssociation {
    pub destination: String,
    pub sources: Vec<String>,
}

pub(crate) async fn copied_files(
    instructions: &[Instruction],
    lookup: &mut ImageLookup<'_>,
) -> Result<Vec<CopyAssociation>, ResolveError> {
    let mut copied = Vec::new();
    let mut env = Environment::new();
    let mut workdir = "/".to_string();
    let mut stage_workdirs: HashMap<String, String> = HashMap::new();
    let mut current_alias: Option<String> = None;

    for instruction in instructions {
        match instruction.command() {
            Some(Command::From) => {
                if let Some(alias) = current_alias.take() {
                    stage_workdirs.insert(alias, workdir.clone());
                }
                let Some(stage) = StageRef::from_instruction(instruction) else {
                    continue;
                };
                workdir = base_working_dir(&stage, &stage_workdirs, lookup).await?;
                current_alias = stage.alias;
            }
            Some(Command::Workdir) => {
                if let Some(value) = instruction.args.first() {
                    let value = expand_word(value, &env, instruction.escape)?;
                    workdir = change_working_dir(&workdir, &value);
                }
            }
            Some(Command::Env) => {
                for pair in instruction.args.chunks_exact(2) {
                    let value = expand_word(&pair[1], &env, instruction.escape)?;
                    env.set(pair[0].clone(), value);
                }
            }
            Some(Command::Copy | Command::Add) => {
                if let Some(association) = process_copy(instruction, &env, &workdir)? {
                    copied.push(association);
                }
            }
            _ => {}
        }
    }

    Ok(copied)
}

async fn base_working_dir(
    stage: &StageRef,
    stage_workdirs: &HashMap<String, String>,
    lookup: &mut ImageLookup<'_>,
) -> Result<String, ResolveError> {
    if stage.is_scratch() {
        return Ok("/".to_string());
    }
    if let Some(workdir) = stage_workdirs.get(&stage.image_key()) {
        return Ok(workdir.clone());
    }

    let metadata = lookup
        .metadata(&stage.image)
        .await
        .map_err(|source| ResolveError::WorkingDir {
            image: stage.image.clone(),
            source,
        })?;
    debug!(image = %stage.image, workdir = %metadata.working_dir, "Base image working directory");
    Ok(metadata.working_dir)
}

fn process_copy(
    instruction: &Instruction,
    env: &Environment,
    workdir: &str,
) -> Result<Option<CopyAssociation>, ResolveError> {
    // copies between stages read nothing from the context
    if instruction.has_flag("from") {
        return Ok(None);
    }

    let args = &instruction.args;
    let mut sources = Vec::new();
    let mut destination = None;

    for (i, token) in args.iter().enumerate() {
        let is_last = args.get(i + 1).map_or(true, |next| next.starts_with('#'));
        if is_last {
            destination = Some(token);
            break;
        }

        let source = expand_word(token, env, instruction.escape)?;
        if is_remote(&source) {
            debug!(source = %source, "Skipping watch on remote dependency");
            continue;
        }
        sources.push(source);
    }

    let Some(destination) = destination else {
        return Ok(None);
    };
    if sources.is_empty() {
        return Ok(None);
    }

    let destination = expand_word(destination, env, instruction.escape)?;
    Ok(Some(CopyAssociation {
        destination: change_working_dir(workdir, &destination),
        sources,
    }))
}

fn expand_word(word: &str, env: &Environment, escape: char) -> Result<String, ResolveError> {
    process_word(word, env, escape).map_err(|source| ResolveError::ProcessWord {
        word: word.to_string(),
        source,
    })
}

fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://") || source.starts_with("git@")
}

/// Applies a WORKDIR value or COPY destination to the current directory
pub fn change_working_dir(current: &str, to: &str) -> String {
    if path::is_abs(to) {
        path::clean(to)
    } else {
        path::join(current, to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dockerfile::parse;
    use crate::image::{ImageMetadata, MetadataError, MockImageProvider};
    use std::time::Duration;
    use yare::parameterized;

    async fn copies(
        content: &str,
        mock: &MockImageProvider,
    ) -> Result<Vec<CopyAssociation>, ResolveError> {
        let mut lookup = ImageLookup::new(mock, Duration::from_secs(5));
        copied_files(&parse(content).unwrap(), &mut lookup).await
    }

    fn association(destination: &str, sources: &[&str]) -> CopyAssociation {
        CopyAssociation {
            destination: destination.to_string(),
            sources: sources.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[parameterized(
        absolute = { "/app", "/etc", "/etc" },
        relative = { "/app", "sub", "/app/sub" },
        parent = { "/app/sub", "..", "/app" },
        dot = { "/app", ".", "/app" },
        trailing_slash = { "/", "dst/", "/dst" }
    )]
    fn test_change_working_dir(current: &str, to: &str, expected: &str) {
        assert_eq!(change_working_dir(current, to), expected);
    }

    #[tokio::test]
    async fn test_destination_relative_to_image_workdir() {
        let mock = MockImageProvider::new()
            .with_image("node", ImageMetadata::new("/usr/src/app", vec![]));

        let result = copies("FROM node\nCOPY package.json ./\n", &mock).await.unwrap();
        assert_eq!(result, vec![association("/usr/src/app", &["package.json"])]);
    }

    #[tokio::test]
    async fn test_workdir_and_env_are_applied() {
        let mock = MockImageProvider::new().with_image("alpine", ImageMetadata::new("/", vec![]));
        let content = concat!(
            "FROM alpine\nENV DIR=/opt SRC=lib\n",
            "WORKDIR $DIR\nWORKDIR app\nCOPY ${SRC}/*.so bin/\n",
        );

        let result = copies(content, &mock).await.unwrap();
        assert_eq!(result, vec![association("/opt/app/bin", &["lib/*.so"])]);
    }

    #[tokio::test]
    async fn test_from_flag_and_remote_sources_are_skipped() {
        let mock = MockImageProvider::new().with_image("alpine", ImageMetadata::default());
        let content = "FROM alpine\n\
                       COPY --from=builder /out /app\n\
                       ADD https://example.com/x.tgz /tmp/\n\
                       ADD https://example.com/y.tgz local.txt /tmp/\n";

        let result = copies(content, &mock).await.unwrap();
        assert_eq!(result, vec![association("/tmp", &["local.txt"])]);
    }

    #[tokio::test]
    async fn test_trailing_comment_ends_arguments() {
        let mock = MockImageProvider::new().with_image("alpine", ImageMetadata::default());

        let result = copies("FROM alpine\nCOPY a b /dst #copy them\n", &mock).await.unwrap();
        assert_eq!(result, vec![association("/dst", &["a", "b"])]);
    }

    #[tokio::test]
    async fn test_json_form_sources() {
        let mock = MockImageProvider::new().with_image("alpine", ImageMetadata::default());

        let result = copies("FROM alpine\nCOPY [\"my file.txt\", \"/data/\"]\n", &mock)
            .await
            .unwrap();
        assert_eq!(result, vec![association("/data", &["my file.txt"])]);
    }

    #[tokio::test]
    async fn test_scratch_and_stage_workdirs() {
        let mock = MockImageProvider::new();
        let content = concat!(
            "FROM scratch AS base\nWORKDIR /build\nFROM base\nCOPY a .\n",
            "FROM scratch\nCOPY b .\n",
        );

        let result = copies(content, &mock).await.unwrap();
        assert_eq!(result, vec![association("/build", &["a"]), association("/", &["b"])]);
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_repeated_sources_keep_every_destination() {
        let mock = MockImageProvider::new().with_image("alpine", ImageMetadata::default());

        let result = copies("FROM alpine\nCOPY a /one/\nCOPY a /two/\n", &mock).await.unwrap();
        assert_eq!(result, vec![association("/one", &["a"]), association("/two", &["a"])]);
    }

    #[tokio::test]
    async fn test_working_dir_lookup_failure_is_fatal() {
        let mock = MockImageProvider::new().with_error(
            "private/img",
            MetadataError::Registry {
                image: "private/img".into(),
                message: "unauthorized".into(),
            },
        );

        let err = copies("FROM private/img\nCOPY a /\n", &mock).await.unwrap_err();
        assert!(matches!(err, ResolveError::WorkingDir { .. }));
    }

    #[tokio::test]
    async fn test_each_image_is_looked_up_once() {
        let mock = MockImageProvider::new().with_image("alpine", ImageMetadata::default());

        copies("FROM alpine\nCOPY a /\nFROM alpine\nCOPY b /\n", &mock).await.unwrap();
        assert_eq!(mock.call_count("alpine"), 1);
    }
}
