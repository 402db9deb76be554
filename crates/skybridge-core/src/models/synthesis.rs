use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::resolution::VendorOverride;
use crate::vendor::Vendor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AudioFormat {
    Mp3,
    Pcm,
    OggVorbis,
    OggOpus,
    Mulaw,
    Alaw,
    Webm,
}

impl AudioFormat {
    pub fn supported_by(&self, vendor: Vendor) -> bool {
        match vendor {
            Vendor::Aws => matches!(
                self,
                AudioFormat::Mp3 | AudioFormat::Pcm | AudioFormat::OggVorbis
            ),
            Vendor::Gcp => matches!(
                self,
                AudioFormat::Mp3
                    | AudioFormat::Pcm
                    | AudioFormat::OggOpus
                    | AudioFormat::Mulaw
                    | AudioFormat::Alaw
            ),
            Vendor::Azure => matches!(
                self,
                AudioFormat::Mp3 | AudioFormat::Pcm | AudioFormat::Webm
            ),
        }
    }

    /// Vendors able to produce this format, in `Vendor` order.
    pub fn vendors(&self) -> Vec<Vendor> {
        Vendor::ALL
            .into_iter()
            .filter(|v| self.supported_by(*v))
            .collect()
    }

    /// The vendor this format pins, when exactly one vendor produces it.
    pub fn exclusive_vendor(&self) -> Option<Vendor> {
        match self.vendors().as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }

    pub fn file_extension(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Pcm => "pcm",
            AudioFormat::OggVorbis | AudioFormat::OggOpus => "ogg",
            AudioFormat::Mulaw | AudioFormat::Alaw => "wav",
            AudioFormat::Webm => "webm",
        }
    }
}

impl FromStr for AudioFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "mp3" => Ok(AudioFormat::Mp3),
            "pcm" => Ok(AudioFormat::Pcm),
            "ogg_vorbis" => Ok(AudioFormat::OggVorbis),
            "ogg_opus" => Ok(AudioFormat::OggOpus),
            "mulaw" => Ok(AudioFormat::Mulaw),
            "alaw" => Ok(AudioFormat::Alaw),
            "webm" => Ok(AudioFormat::Webm),
            _ => Err(anyhow::anyhow!("Invalid audio format: {}", s)),
        }
    }
}

impl Display for AudioFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let name = match self {
            AudioFormat::Mp3 => "MP3",
            AudioFormat::Pcm => "PCM",
            AudioFormat::OggVorbis => "OGG_VORBIS",
            AudioFormat::OggOpus => "OGG_OPUS",
            AudioFormat::Mulaw => "MULAW",
            AudioFormat::Alaw => "ALAW",
            AudioFormat::Webm => "WEBM",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextType {
    #[default]
    PlainText,
    Ssml,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoiceGender {
    #[default]
    Female,
    Male,
}

#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    /// Location of the text (or SSML) to speak.
    pub input_location: String,
    pub language_code: String,
    pub text_type: TextType,
    pub voice_gender: VoiceGender,
    pub audio_format: AudioFormat,
    /// When set, the audio is also written here.
    pub output_location: Option<String>,
    pub overrides: VendorOverride,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesizedAudio {
    #[serde(skip)]
    pub audio: bytes::Bytes,
    pub format: AudioFormat,
}
