#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(report) = pgcr_pack::decompress(data) {
        // Compared as bytes, since NaN metrics never compare equal
        let first = pgcr_pack::encode(&report).expect("accepted report must re-encode");
        let again = pgcr_pack::compress(&report).expect("accepted report must compress");
        let back = pgcr_pack::decompress(&again).expect("own output must decompress");
        assert_eq!(pgcr_pack::encode(&back).ok(), Some(first));
    }
});
