pub mod live;
pub mod transcode;

use std::collections::HashSet;

use serde_json::Value;

use super::builders::BuildContext;
use super::classifier::ClassifiedLadder;
use super::{GenerateError, GenerateResult, ProfileRun, SchemaFamily, TargetSchema};

/// Output destination placeholder referenced by every output group.
pub const DESTINATION_REF_ID: &str = "media-destination";

pub fn assemble(run: &ProfileRun<'_>, classified: &ClassifiedLadder<'_>) -> GenerateResult<Value> {
    let ctx = BuildContext {
        common: &run.ladder().common,
        schema: run.schema(),
    };
    match run.schema().family() {
        SchemaFamily::Transcode => transcode::assemble(&ctx, classified, run.trickplay()),
        SchemaFamily::Live => live::assemble(&ctx, classified),
    }
}

fn ensure_unique<'n>(
    names: impl IntoIterator<Item = &'n str>,
    schema: TargetSchema,
) -> GenerateResult<()> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(GenerateError::DuplicateDescriptionName {
                name: name.to_string(),
                schema: schema.to_string(),
            });
        }
    }
    Ok(())
}
