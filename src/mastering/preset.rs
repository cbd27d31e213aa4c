use crate::error::AudioError;
use std::fmt;
use std::str::FromStr;

/// Target material for the mastering chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Preset {
    /// Gentle glue compression, wide tone shaping
    #[default]
    Music,
    /// Presence boost and firm leveling for spoken content
    Podcast,
    /// Warm low end and firm leveling for voice-over
    Narration,
}

/// Tone EQ mapping for one preset; gains are multiples of the enhance boost in dB
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneProfile {
    /// Low shelf corner in Hz
    pub low_shelf_hz: f32,
    /// Low shelf gain per dB of boost
    pub low_shelf_factor: f32,
    /// High shelf corner in Hz
    pub high_shelf_hz: f32,
    /// High shelf gain per dB of boost
    pub high_shelf_factor: f32,
    /// Mid bell center in Hz
    pub mid_hz: f32,
    /// Mid bell Q
    pub mid_q: f32,
    /// Mid bell gain per dB of boost
    pub mid_factor: f32,
}

/// Compressor mapping for one preset
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DynamicsProfile {
    /// Threshold in dBFS
    pub threshold_db: f32,
    /// Knee width in dB
    pub knee_db: f32,
    /// Ratio at enhance = 0
    pub base_ratio: f32,
    /// Ratio added per unit of enhance
    pub ratio_per_enhance: f32,
    /// Attack in seconds
    pub attack: f32,
    /// Release in seconds
    pub release: f32,
}

impl Preset {
    /// All presets
    pub const ALL: [Preset; 3] = [Preset::Music, Preset::Podcast, Preset::Narration];

    /// Lowercase name
    pub fn name(&self) -> &'static str {
        match self {
            Preset::Music => "music",
            Preset::Podcast => "podcast",
            Preset::Narration => "narration",
        }
    }

    /// Tone EQ mapping
    pub fn tone(&self) -> ToneProfile {
        match self {
            Preset::Music => ToneProfile {
                low_shelf_hz: 60.0,
                low_shelf_factor: 0.6,
                high_shelf_hz: 12000.0,
                high_shelf_factor: 0.6,
                mid_hz: 300.0,
                mid_q: 0.8,
                mid_factor: -0.2,
            },
            Preset::Podcast => ToneProfile {
                low_shelf_hz: 100.0,
                low_shelf_factor: 0.5,
                high_shelf_hz: 8000.0,
                high_shelf_factor: 0.5,
                mid_hz: 2500.0,
                mid_q: 1.0,
                mid_factor: 0.5,
            },
            Preset::Narration => ToneProfile {
                low_shelf_hz: 120.0,
                low_shelf_factor: 1.6,
                high_shelf_hz: 8000.0,
                high_shelf_factor: 0.1,
                mid_hz: 2000.0,
                mid_q: 1.0,
                mid_factor: 0.6,
            },
        }
    }

    /// Compressor mapping
    pub fn dynamics(&self) -> DynamicsProfile {
        match self {
            Preset::Music => DynamicsProfile {
                threshold_db: -14.0,
                knee_db: 15.0,
                base_ratio: 1.5,
                ratio_per_enhance: 1.5,
                attack: 0.050,
                release: 0.200,
            },
            Preset::Podcast | Preset::Narration => DynamicsProfile {
                threshold_db: -18.0,
                knee_db: 10.0,
                base_ratio: 4.0,
                ratio_per_enhance: 12.0,
                attack: 0.002,
                release: 0.150,
            },
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Preset {
    type Err = AudioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Preset::ALL
            .into_iter()
            .find(|preset| preset.name() == lower)
            .ok_or_else(|| {
                AudioError::ConfigError(format!(
                    "Unknown preset '{}', expected music, podcast or narration",
                    s
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_presets() {
        assert_eq!("music".parse::<Preset>().unwrap(), Preset::Music);
        assert_eq!("Podcast".parse::<Preset>().unwrap(), Preset::Podcast);
        assert_eq!(" NARRATION ".parse::<Preset>().unwrap(), Preset::Narration);
        assert!("jazz".parse::<Preset>().is_err());
    }

    #[test]
    fn test_display_round_trips() {
        for preset in Preset::ALL {
            assert_eq!(preset.to_string().parse::<Preset>().unwrap(), preset);
        }
    }

    #[test]
    fn test_music_dynamics_are_gentle() {
        let music = Preset::Music.dynamics();
        let podcast = Preset::Podcast.dynamics();
        assert!(music.base_ratio < podcast.base_ratio);
        assert!(music.attack > podcast.attack);
        assert_eq!(podcast, Preset::Narration.dynamics());
    }
}
