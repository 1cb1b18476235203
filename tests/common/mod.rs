#![allow(dead_code)]

use std::collections::HashMap;

use pgcr_pack::*;

pub fn setup() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn metric(value: f64, display: &str) -> Metric {
    Metric::new(value, display)
}

pub fn player(name: &str, code: Option<u16>) -> PlayerInformation {
    PlayerInformation {
        destiny_user_info: DestinyUserInfo {
            icon_path: "/common/destiny2_content/icons/93844c8b76ea80683a880479e3506980.jpg"
                .into(),
            is_public: true,
            membership_type: 3,
            membership_id: "4611686018467284386".into(),
            display_name: name.into(),
            bungie_global_display_name: name.into(),
            bungie_global_display_name_code: code,
        },
        character_class: "Warlock".into(),
        class_hash: 2271682572,
        race_hash: 2803282938,
        gender_hash: 2204441813,
        character_level: 50,
        light_level: 1995,
        emblem_hash: 1661191197,
        clan_name: Some("Riven's Wishes".into()),
        clan_tag: Some("RVN".into()),
    }
}

pub fn entry(name: &str, values: &[(&str, f64, &str)]) -> PostGameCarnageReportEntry {
    PostGameCarnageReportEntry {
        standing: 0,
        player: player(name, Some(1042)),
        character_id: "2305843009301448127".into(),
        values: values
            .iter()
            .map(|(k, v, d)| (k.to_string(), metric(*v, d)))
            .collect::<HashMap<_, _>>(),
    }
}

/// A single-entry raid report: 125 kills, 6 deaths.
pub fn single_entry_report() -> PostGameCarnageReport {
    PostGameCarnageReport {
        period: "2024-09-14T02:11:45Z".into(),
        starting_phase_index: 0,
        activity_was_started_from_beginning: true,
        activity_details: ActivityDetails {
            reference_id: 1374392663,
            director_activity_hash: 1374392663,
            instance_id: "14753219875".into(),
            mode: ActivityMode::Raid,
            modes: vec![ActivityMode::AllPvE, ActivityMode::Raid],
            is_private: false,
            membership_type: 3,
        },
        entries: vec![entry(
            "Saint",
            &[("kills", 125.0, "125"), ("deaths", 6.0, "6")],
        )],
    }
}

/// A six-player report with a spread of metrics, some carrying per-game averages.
pub fn fireteam_report() -> PostGameCarnageReport {
    let mut report = single_entry_report();
    report.entries = (0..6)
        .map(|i| {
            let kills = 40.0 + i as f64 * 17.0;
            let kills_display = format!("{}", kills);
            let deaths_display = format!("{}", i);
            let mut e = entry(
                &format!("Guardian{}", i),
                &[
                    ("kills", kills, kills_display.as_str()),
                    ("deaths", i as f64, deaths_display.as_str()),
                    ("assists", 12.0, "12"),
                    ("completed", 1.0, "Yes"),
                    ("killsDeathsRatio", kills / (i as f64).max(1.0), "-"),
                    ("activityDurationSeconds", 2874.0, "47m 54s"),
                    ("fireteamId", 8.35e18, "8350000000000000000"),
                ],
            );
            e.standing = i;
            e.player.clan_name = if i % 2 == 0 { None } else { Some(String::new()) };
            e.player.destiny_user_info.bungie_global_display_name_code =
                if i == 3 { None } else { Some(i as u16) };
            if let Some(m) = e.values.get_mut("kills") {
                m.pga = Some(MetricValue {
                    value: 38.5,
                    display_value: "38.50".into(),
                });
            }
            e
        })
        .collect();
    report
}
