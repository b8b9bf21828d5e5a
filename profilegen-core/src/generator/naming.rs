//! Description names shared between descriptions and output-group entries.

use crate::ladder::Codec;

pub fn codec_token(codec: Codec) -> String {
    codec.as_str().to_ascii_lowercase().replace('-', "")
}

pub fn video_description_name(codec: Codec, max_bitrate: u64) -> String {
    format!("video_{}_{max_bitrate}", codec_token(codec))
}

pub fn frame_capture_description_name(height: u32) -> String {
    format!("framecapture_{height}")
}

pub fn audio_description_name(codec: Codec, bitrate: u64, language: &str) -> String {
    format!("audio_{}_{bitrate}_{language}", codec_token(codec))
}

pub fn caption_description_name(language: &str) -> String {
    format!("captions_{language}")
}

/// HLS alternate-audio group for a codec; one group per distinct codec.
pub fn audio_group_id(codec: Codec) -> &'static str {
    match codec {
        Codec::Ac3 => "ac3",
        Codec::Eac3 => "eac3",
        _ => "aac",
    }
}

pub fn timecode_burnin_font_size(height: u32) -> &'static str {
    match height {
        0..=270 => "EXTRA_SMALL_10",
        271..=360 => "SMALL_16",
        361..=720 => "MEDIUM_32",
        _ => "LARGE_48",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn font_size_steps_at_boundaries() {
        let cases = [
            (270, "EXTRA_SMALL_10"),
            (271, "SMALL_16"),
            (360, "SMALL_16"),
            (361, "MEDIUM_32"),
            (720, "MEDIUM_32"),
            (721, "LARGE_48"),
            (2160, "LARGE_48"),
        ];
        for (height, expected) in cases {
            assert_eq!(timecode_burnin_font_size(height), expected, "height {height}");
        }
    }

    #[test]
    fn names_are_derived_from_codec_and_parameters() {
        assert_eq!(
            video_description_name(Codec::H264, 8_000_000),
            "video_h_264_8000000"
        );
        assert_eq!(frame_capture_description_name(180), "framecapture_180");
        assert_eq!(
            audio_description_name(Codec::Eac3, 192_000, "eng"),
            "audio_eac3_192000_eng"
        );
        assert_eq!(caption_description_name("fra"), "captions_fra");
    }
}
