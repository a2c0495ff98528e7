//! ONBUILD trigger expansion
//!
//! Triggers declared by a base image run right after the FROM that names it, so
//! they are spliced in at that point and take part in COPY discovery like any
//! other instruction.

use super::lookup::ImageLookup;
use super::ResolveError;
use crate::dockerfile::{parse, Instruction, StageRef};
use std::collections::HashMap;
use tracing::{debug, warn};

pub(crate) async fn expand_onbuild_instructions(
    instructions: Vec<Instruction>,
    lookup: &mut ImageLookup<'_>,
) -> Result<Vec<Instruction>, ResolveError> {
    // keyed by lowercase image name and by stage alias
    let mut triggers: HashMap<String, Vec<Instruction>> = HashMap::new();
    let mut expanded = Vec::with_capacity(instructions.len());

    for instruction in instructions {
        let stage = StageRef::from_instruction(&instruction);
        expanded.push(instruction);

        let Some(stage) = stage else {
            continue;
        };

        let inherited = if stage.is_scratch() {
            Vec::new()
        } else if let Some(cached) = triggers.get(&stage.image_key()) {
            cached.clone()
        } else {
            let parsed = image_triggers(&stage.image, lookup).await?;
            triggers.insert(stage.image_key(), parsed.clone());
            parsed
        };

        if let Some(alias) = &stage.alias {
            triggers.insert(alias.clone(), inherited.clone());
        }
        expanded.extend(inherited);
    }

    Ok(expanded)
}

/// Parsed ONBUILD triggers of a base image
///
/// A failed lookup only costs the triggers; the caller is warned that the
/// result may be incomplete.
async fn image_triggers(
    image: &str,
    lookup: &mut ImageLookup<'_>,
) -> Result<Vec<Instruction>, ResolveError> {
    debug!(image, "Checking base image for ONBUILD triggers");

    let metadata = match lookup.metadata(image).await {
        Ok(metadata) => metadata,
        Err(e) => {
            warn!(
                image,
                error = %e,
                "Error processing base image for ONBUILD triggers. Dependencies may be incomplete."
            );
            return Ok(Vec::new());
        }
    };

    if metadata.on_build.is_empty() {
        return Ok(Vec::new());
    }

    debug!(image, triggers = ?metadata.on_build, "Found ONBUILD triggers");
    parse(&metadata.on_build.join("\n")).map_err(|source| ResolveError::ExpandOnbuild {
        image: image.to_string(),
        source,
    })
}
