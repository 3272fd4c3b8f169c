use serde::{Deserialize, Serialize};

use crate::config::{ChannelsConfig, SideChannelConfig};

/// One of the two mirrored endpoints. Everything side-specific (channel id,
/// language codes, failure notice) lives in the [`ChannelDirectory`]; the
/// enum itself only names the role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    A,
    B,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }

    /// Stable identifier used in the database and in log lines.
    pub fn as_str(self) -> &'static str {
        match self {
            Side::A => "side_a",
            Side::B => "side_b",
        }
    }

    pub fn parse(value: &str) -> Option<Side> {
        match value {
            "side_a" => Some(Side::A),
            "side_b" => Some(Side::B),
            _ => None,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static lookup from channel id to side role and back. Built once from
/// config at startup; channels outside the configured pair classify as None
/// and their events are ignored.
#[derive(Debug, Clone)]
pub struct ChannelDirectory {
    side_a: SideChannelConfig,
    side_b: SideChannelConfig,
}

impl ChannelDirectory {
    pub fn new(channels: &ChannelsConfig) -> Self {
        Self {
            side_a: channels.side_a.clone(),
            side_b: channels.side_b.clone(),
        }
    }

    pub fn classify(&self, channel_id: &str) -> Option<Side> {
        if channel_id == self.side_a.id {
            Some(Side::A)
        } else if channel_id == self.side_b.id {
            Some(Side::B)
        } else {
            None
        }
    }

    pub fn channel_id(&self, side: Side) -> &str {
        &self.side(side).id
    }

    pub fn opposite_channel_id(&self, side: Side) -> &str {
        self.channel_id(side.opposite())
    }

    /// DeepL source code for text authored on `side`.
    pub fn source_lang(&self, side: Side) -> &str {
        &self.side(side).source_lang
    }

    /// DeepL target code for text mirrored into `side`.
    pub fn target_lang(&self, side: Side) -> &str {
        &self.side(side).target_lang
    }

    pub fn failure_notice(&self, side: Side) -> &str {
        &self.side(side).failure_notice
    }

    fn side(&self, side: Side) -> &SideChannelConfig {
        match side {
            Side::A => &self.side_a,
            Side::B => &self.side_b,
        }
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::{ChannelDirectory, Side};
    use crate::config::{ChannelsConfig, SideChannelConfig};

    fn directory() -> ChannelDirectory {
        ChannelDirectory::new(&ChannelsConfig {
            side_a: SideChannelConfig {
                id: "111".to_string(),
                source_lang: "JA".to_string(),
                target_lang: "JA".to_string(),
                failure_notice: "notice-a".to_string(),
            },
            side_b: SideChannelConfig {
                id: "222".to_string(),
                source_lang: "EN".to_string(),
                target_lang: "EN-US".to_string(),
                failure_notice: "notice-b".to_string(),
            },
        })
    }

    #[test_case("111", Some(Side::A); "side a channel")]
    #[test_case("222", Some(Side::B); "side b channel")]
    #[test_case("333", None; "unconfigured channel")]
    #[test_case("", None; "empty channel id")]
    fn classify_maps_channel_ids(channel_id: &str, expected: Option<Side>) {
        assert_eq!(directory().classify(channel_id), expected);
    }

    #[test]
    fn opposite_channel_id_crosses_sides() {
        let directory = directory();
        assert_eq!(directory.opposite_channel_id(Side::A), "222");
        assert_eq!(directory.opposite_channel_id(Side::B), "111");
    }

    #[test]
    fn language_codes_follow_direction() {
        let directory = directory();
        // Side A text is translated from A's source code into B's target code.
        assert_eq!(directory.source_lang(Side::A), "JA");
        assert_eq!(directory.target_lang(Side::A.opposite()), "EN-US");
    }

    #[test]
    fn side_round_trips_through_db_string() {
        for side in [Side::A, Side::B] {
            assert_eq!(Side::parse(side.as_str()), Some(side));
        }
        assert_eq!(Side::parse("side_c"), None);
    }

    #[test]
    fn opposite_is_an_involution() {
        assert_eq!(Side::A.opposite().opposite(), Side::A);
        assert_eq!(Side::A.opposite(), Side::B);
    }
}
