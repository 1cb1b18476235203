//! Post Game Carnage Report types.
//!
//! Field names follow the Bungie API's camelCase JSON names. Every record rejects unknown fields
//! on decode, so a payload written for a different field list fails loudly instead of quietly
//! dropping data.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One completed activity instance.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PostGameCarnageReport {
    /// When the activity started. Carried as-is.
    pub period: String,
    pub starting_phase_index: i32,
    pub activity_was_started_from_beginning: bool,
    pub activity_details: ActivityDetails,
    /// One entry per character, in the order the API returned them.
    pub entries: Vec<PostGameCarnageReportEntry>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ActivityDetails {
    pub reference_id: u32,
    pub director_activity_hash: u32,
    pub instance_id: String,
    pub mode: ActivityMode,
    pub modes: Vec<ActivityMode>,
    pub is_private: bool,
    pub membership_type: i32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PostGameCarnageReportEntry {
    pub standing: i32,
    pub player: PlayerInformation,
    pub character_id: String,
    /// Metric name (e.g. "kills") to its value.
    pub values: HashMap<String, Metric>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PlayerInformation {
    pub destiny_user_info: DestinyUserInfo,
    pub character_class: String,
    pub class_hash: u32,
    pub race_hash: u32,
    pub gender_hash: u32,
    pub character_level: i32,
    pub light_level: i32,
    pub emblem_hash: u32,
    pub clan_name: Option<String>,
    pub clan_tag: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DestinyUserInfo {
    pub icon_path: String,
    pub is_public: bool,
    pub membership_type: i32,
    pub membership_id: String,
    pub display_name: String,
    pub bungie_global_display_name: String,
    /// Absent for accounts that never picked a Bungie Name.
    pub bungie_global_display_name_code: Option<u16>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Metric {
    pub basic: MetricValue,
    /// Per-game average, only present on a few metrics.
    pub pga: Option<MetricValue>,
}

impl Metric {
    pub fn new(value: f64, display_value: impl Into<String>) -> Self {
        Self {
            basic: MetricValue {
                value,
                display_value: display_value.into(),
            },
            pga: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MetricValue {
    pub value: f64,
    /// Pre-formatted by the API. Never recomputed from `value`.
    pub display_value: String,
}

/// Activity mode, encoded as its numeric API value.
///
/// Modes this crate doesn't name are kept in `Unknown`. Equality and hashing go through the
/// numeric value, so `Unknown(4)` and `Raid` are the same mode.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum ActivityMode {
    #[default]
    None,
    Story,
    Strike,
    Raid,
    AllPvP,
    Patrol,
    AllPvE,
    Control,
    Clash,
    Nightfall,
    AllStrikes,
    IronBanner,
    Survival,
    Gambit,
    Dungeon,
    TrialsOfOsiris,
    Unknown(i32),
}

impl From<i32> for ActivityMode {
    fn from(v: i32) -> Self {
        use self::ActivityMode::*;
        match v {
            0 => None,
            2 => Story,
            3 => Strike,
            4 => Raid,
            5 => AllPvP,
            6 => Patrol,
            7 => AllPvE,
            10 => Control,
            12 => Clash,
            16 => Nightfall,
            18 => AllStrikes,
            19 => IronBanner,
            37 => Survival,
            63 => Gambit,
            82 => Dungeon,
            84 => TrialsOfOsiris,
            v => Unknown(v),
        }
    }
}

impl From<ActivityMode> for i32 {
    fn from(v: ActivityMode) -> i32 {
        use self::ActivityMode::*;
        match v {
            None => 0,
            Story => 2,
            Strike => 3,
            Raid => 4,
            AllPvP => 5,
            Patrol => 6,
            AllPvE => 7,
            Control => 10,
            Clash => 12,
            Nightfall => 16,
            AllStrikes => 18,
            IronBanner => 19,
            Survival => 37,
            Gambit => 63,
            Dungeon => 82,
            TrialsOfOsiris => 84,
            Unknown(v) => v,
        }
    }
}

impl PartialEq for ActivityMode {
    fn eq(&self, other: &Self) -> bool {
        i32::from(*self) == i32::from(*other)
    }
}

impl Eq for ActivityMode {}

impl std::hash::Hash for ActivityMode {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        i32::from(*self).hash(state)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// A raid clear with a single player, as returned by the API.
    pub fn raid_report() -> PostGameCarnageReport {
        let mut values = HashMap::new();
        for (name, value, display) in [
            ("kills", 125.0, "125"),
            ("assists", 5.0, "5"),
            ("completed", 1.0, "Yes"),
            ("deaths", 6.0, "6"),
            ("killsDeathsRatio", 2.5, "2.50"),
            ("killsDeathsAssists", 2.66666666666, "2.66"),
            ("activityDurationSeconds", 953.0, "15m 53s"),
            ("timePlayedSeconds", 832.0, "13m 52s"),
            ("playerCount", 8.0, "8"),
        ] {
            values.insert(name.to_string(), Metric::new(value, display));
        }
        PostGameCarnageReport {
            period: "2024-06-01T18:32:11Z".into(),
            starting_phase_index: 0,
            activity_was_started_from_beginning: true,
            activity_details: ActivityDetails {
                reference_id: 128041231,
                director_activity_hash: 128041231,
                instance_id: "177721245".into(),
                mode: ActivityMode::Raid,
                modes: vec![ActivityMode::Story, ActivityMode::Raid],
                is_private: false,
                membership_type: 0,
            },
            entries: vec![PostGameCarnageReportEntry {
                standing: 0,
                player: PlayerInformation {
                    destiny_user_info: DestinyUserInfo {
                        icon_path:
                            "/common/destiny2_content/icons/e63b0d3618767f1fefed5e860b58da5c.png"
                                .into(),
                        is_public: true,
                        membership_type: 2,
                        membership_id: "4611686018428741183".into(),
                        display_name: "GonzoKnight".into(),
                        bungie_global_display_name: "GonzoKnight".into(),
                        bungie_global_display_name_code: Some(4236),
                    },
                    character_class: "Hunter".into(),
                    class_hash: 671679327,
                    race_hash: 3887404748,
                    gender_hash: 3111576190,
                    character_level: 50,
                    light_level: 1810,
                    emblem_hash: 908153542,
                    clan_name: None,
                    clan_tag: None,
                },
                character_id: "2305843009261769284".into(),
                values,
            }],
        }
    }
}
