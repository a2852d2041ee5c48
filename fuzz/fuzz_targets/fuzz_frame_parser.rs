//! Fuzz target: `parse_frame`
//!
//! Feeds arbitrary bytes (lossily decoded, as the serial adapter does) to
//! the frame parser for both facilities and commits every accepted frame
//! to a window store. Nothing may panic, accepted values must be finite,
//! and sibling windows must stay aligned.
//!
//! cargo fuzz run fuzz_frame_parser

#![no_main]

use chrono::NaiveDateTime;
use healthmon::protocol::frame::parse_frame;
use healthmon::sensors::Facility;
use healthmon::sensors::store::FacilityState;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let line = String::from_utf8_lossy(data);

    for facility in Facility::ALL {
        let Ok(frame) = parse_frame(&line, facility, NaiveDateTime::default()) else {
            continue;
        };
        assert_eq!(frame.facility, facility, "accepted a frame from the wrong facility");
        assert!(frame.readings().all(|(_, v)| v.is_finite()));

        let mut state = FacilityState::new(facility);
        state.record(&frame);
        let thermal = state.thermal.sibling_lengths();
        let mechanical = state.mechanical.sibling_lengths();
        assert!(thermal.iter().all(|l| *l == state.thermal.len()));
        assert!(mechanical.iter().all(|l| *l == state.mechanical.len()));
    }
});
