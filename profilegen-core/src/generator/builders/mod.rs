//! Per-codec settings builders.
//!
//! Each builder is a pure function from a rendition plus ladder-wide settings
//! to the codec block of one schema family. Dispatch goes through [`BUILDERS`].

pub mod live;
pub mod transcode;

use serde_json::Value;

use crate::ladder::{Codec, CommonConfig, RenditionConfig};

use super::{GenerateError, GenerateResult, SchemaFamily, TargetSchema};

#[derive(Debug, Clone, Copy)]
pub struct BuildContext<'a> {
    pub common: &'a CommonConfig,
    pub schema: TargetSchema,
}

pub type BuildFn = fn(&RenditionConfig, &BuildContext<'_>) -> GenerateResult<Value>;

pub struct BuilderEntry {
    pub family: SchemaFamily,
    pub codec: Codec,
    pub build: BuildFn,
}

/// Frame capture has no transcode builder; that family turns it into a
/// trickplay block instead.
pub static BUILDERS: &[BuilderEntry] = &[
    BuilderEntry {
        family: SchemaFamily::Transcode,
        codec: Codec::H264,
        build: transcode::h264_video_description,
    },
    BuilderEntry {
        family: SchemaFamily::Transcode,
        codec: Codec::H265,
        build: transcode::h265_video_description,
    },
    BuilderEntry {
        family: SchemaFamily::Transcode,
        codec: Codec::Aac,
        build: transcode::aac_audio_description,
    },
    BuilderEntry {
        family: SchemaFamily::Transcode,
        codec: Codec::Ac3,
        build: transcode::ac3_audio_description,
    },
    BuilderEntry {
        family: SchemaFamily::Transcode,
        codec: Codec::Eac3,
        build: transcode::eac3_audio_description,
    },
    BuilderEntry {
        family: SchemaFamily::Transcode,
        codec: Codec::Captions,
        build: transcode::caption_description,
    },
    BuilderEntry {
        family: SchemaFamily::Live,
        codec: Codec::H264,
        build: live::h264_video_description,
    },
    BuilderEntry {
        family: SchemaFamily::Live,
        codec: Codec::H265,
        build: live::h265_video_description,
    },
    BuilderEntry {
        family: SchemaFamily::Live,
        codec: Codec::FrameCapture,
        build: live::frame_capture_video_description,
    },
    BuilderEntry {
        family: SchemaFamily::Live,
        codec: Codec::Aac,
        build: live::aac_audio_description,
    },
    BuilderEntry {
        family: SchemaFamily::Live,
        codec: Codec::Ac3,
        build: live::ac3_audio_description,
    },
    BuilderEntry {
        family: SchemaFamily::Live,
        codec: Codec::Eac3,
        build: live::eac3_audio_description,
    },
    BuilderEntry {
        family: SchemaFamily::Live,
        codec: Codec::Captions,
        build: live::caption_description,
    },
];

pub fn lookup(family: SchemaFamily, codec: Codec) -> Option<BuildFn> {
    BUILDERS
        .iter()
        .find(|entry| entry.family == family && entry.codec == codec)
        .map(|entry| entry.build)
}

pub fn build(rendition: &RenditionConfig, ctx: &BuildContext<'_>) -> GenerateResult<Value> {
    let build = lookup(ctx.schema.family(), rendition.codec).ok_or_else(|| {
        GenerateError::UnsupportedCodec {
            rendition: rendition.name.clone(),
            codec: rendition.codec.to_string(),
            schema: ctx.schema.to_string(),
        }
    })?;
    build(rendition, ctx)
}

fn wrong_kind(rendition: &RenditionConfig, ctx: &BuildContext<'_>) -> GenerateError {
    GenerateError::UnsupportedCodec {
        rendition: rendition.name.clone(),
        codec: rendition.codec.to_string(),
        schema: ctx.schema.to_string(),
    }
}

fn missing(rendition: &RenditionConfig, field: &'static str) -> GenerateError {
    GenerateError::MissingRequiredField {
        rendition: rendition.name.clone(),
        field,
    }
}
