use serde::Serialize;
use tracing::warn;

use crate::ladder::{Codec, LadderConfig, MediaKind, RenditionConfig};

use super::builders;
use super::trickplay::TrickplayCache;
use super::{FrameCaptureHandling, GenerateError, GenerateResult, TargetSchema};

/// A rendition a target schema cannot carry; generation continues without it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRendition {
    pub name: String,
    pub codec: Codec,
    pub schema: TargetSchema,
    pub reason: String,
}

/// Renditions retained for one schema, in ladder order.
#[derive(Debug, Clone, Default)]
pub struct ClassifiedLadder<'a> {
    pub ordered: Vec<&'a RenditionConfig>,
    pub video: Vec<&'a RenditionConfig>,
    pub audio: Vec<&'a RenditionConfig>,
    pub caption: Vec<&'a RenditionConfig>,
}

impl<'a> ClassifiedLadder<'a> {
    fn retain(&mut self, rendition: &'a RenditionConfig) {
        self.ordered.push(rendition);
        match rendition.media_kind() {
            MediaKind::Video => self.video.push(rendition),
            MediaKind::Audio => self.audio.push(rendition),
            MediaKind::Caption => self.caption.push(rendition),
        }
    }
}

pub fn classify<'a>(
    ladder: &'a LadderConfig,
    schema: TargetSchema,
    trickplay: &mut TrickplayCache,
    skipped: &mut Vec<SkippedRendition>,
) -> GenerateResult<ClassifiedLadder<'a>> {
    let capabilities = schema.capabilities();
    let mut classified = ClassifiedLadder::default();

    for rendition in &ladder.outputs {
        if rendition.codec == Codec::FrameCapture {
            match capabilities.frame_capture {
                FrameCaptureHandling::Trickplay => {
                    trickplay.capture(rendition)?;
                    continue;
                }
                FrameCaptureHandling::Unsupported => {
                    skip(
                        skipped,
                        rendition,
                        schema,
                        "frame capture outputs are not supported by this output group",
                    );
                    continue;
                }
                FrameCaptureHandling::VideoOutput => {}
            }
        }
        if rendition.codec == Codec::Captions && capabilities.captions.is_none() {
            skip(
                skipped,
                rendition,
                schema,
                "caption tracks are not supported by this profile type",
            );
            continue;
        }
        if builders::lookup(schema.family(), rendition.codec).is_none() {
            return Err(GenerateError::UnsupportedCodec {
                rendition: rendition.name.clone(),
                codec: rendition.codec.to_string(),
                schema: schema.to_string(),
            });
        }
        classified.retain(rendition);
    }

    Ok(classified)
}

fn skip(
    skipped: &mut Vec<SkippedRendition>,
    rendition: &RenditionConfig,
    schema: TargetSchema,
    reason: &str,
) {
    warn!(
        target: "profilegen.classifier",
        rendition = %rendition.name,
        codec = %rendition.codec,
        schema = %schema,
        "skipping rendition: {reason}"
    );
    skipped.push(SkippedRendition {
        name: rendition.name.clone(),
        codec: rendition.codec,
        schema,
        reason: reason.to_string(),
    });
}
