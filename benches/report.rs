use std::collections::HashMap;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pgcr_pack::*;

/// A full 12-player report, roughly the size of a crucible match.
fn make_report() -> PostGameCarnageReport {
    let entries = (0..12)
        .map(|i| {
            let values: HashMap<String, Metric> = [
                "kills",
                "deaths",
                "assists",
                "score",
                "opponentsDefeated",
                "efficiency",
                "killsDeathsRatio",
                "killsDeathsAssists",
                "activityDurationSeconds",
                "timePlayedSeconds",
                "completed",
                "standing",
                "team",
                "teamScore",
            ]
            .iter()
            .enumerate()
            .map(|(n, name)| {
                let v = (i * 31 + n * 7) as f64 / 3.0;
                (name.to_string(), Metric::new(v, format!("{:.2}", v)))
            })
            .collect();
            PostGameCarnageReportEntry {
                standing: (i % 2) as i32,
                player: PlayerInformation {
                    destiny_user_info: DestinyUserInfo {
                        icon_path: "/common/destiny2_content/icons/bd7a1fc995a87be96b4c8d6b8cd5fb23.jpg"
                            .into(),
                        is_public: true,
                        membership_type: 3,
                        membership_id: format!("46116860184{:08}", i),
                        display_name: format!("Player{}", i),
                        bungie_global_display_name: format!("Player{}", i),
                        bungie_global_display_name_code: Some(i as u16 * 97),
                    },
                    character_class: "Titan".into(),
                    class_hash: 3655393761,
                    race_hash: 898834093,
                    gender_hash: 3111576190,
                    character_level: 50,
                    light_level: 2010,
                    emblem_hash: 4052831236,
                    clan_name: None,
                    clan_tag: None,
                },
                character_id: format!("23058430093{:08}", i),
                values,
            }
        })
        .collect();
    PostGameCarnageReport {
        period: "2024-10-01T20:05:33Z".into(),
        starting_phase_index: 0,
        activity_was_started_from_beginning: true,
        activity_details: ActivityDetails {
            reference_id: 2591737171,
            director_activity_hash: 2259621230,
            instance_id: "15139872310".into(),
            mode: ActivityMode::Control,
            modes: vec![ActivityMode::AllPvP, ActivityMode::Control],
            is_private: false,
            membership_type: 3,
        },
        entries,
    }
}

fn bench_encode(c: &mut Criterion) {
    let report = make_report();
    c.bench_function("encode_report", |b| {
        b.iter(|| black_box(encode(black_box(&report)).unwrap()))
    });
}

fn bench_compress(c: &mut Criterion) {
    let report = make_report();
    c.bench_function("compress_report", |b| {
        b.iter(|| black_box(compress(black_box(&report)).unwrap()))
    });
}

fn bench_decompress(c: &mut Criterion) {
    let compressed = compress(&make_report()).unwrap();
    c.bench_function("decompress_report", |b| {
        b.iter(|| black_box(decompress(black_box(&compressed)).unwrap()))
    });
}

criterion_group!(benches, bench_encode, bench_compress, bench_decompress);
criterion_main!(benches);
