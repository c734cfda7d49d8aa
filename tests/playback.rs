use std::time::Duration;

use tidesong::output::SinkEntry;
use tidesong::{
    CancelToken, Config, Event, MemorySink, Player, PlayerState, Source, build_library,
    ingest,
};

const WEATHER: &str = "\
STATION,DATE,AWND,PRCP,TMAX
USW00023174,2023-01-01,10,0.1,68
USW00023174,2023-01-02,10,0.1,68
USW00023174,2023-01-03,6,3.0,75
USW00014739,2023-01-01,15,0.4,35
";

const TIDES: &str = "\
STATION,DATE,WATER_LEVEL
9410660,2023-01-01 00:00,2.0
9410660,2023-01-01 01:00,4.0
8443970,2023-01-01 00:00,9.1
";

fn library() -> tidesong::TrackLibrary {
    let inputs = vec![
        (Source::Weather, ingest::read_rows(WEATHER.as_bytes()).unwrap()),
        (Source::Tides, ingest::read_rows(TIDES.as_bytes()).unwrap()),
    ];
    build_library(&Config::default(), &inputs).unwrap()
}

fn cc(channel: u8, controller: u8, value: u8) -> Event {
    Event::Control {
        channel,
        controller,
        value,
    }
}

fn on(channel: u8, pitch: u8) -> Event {
    Event::NoteOn {
        channel,
        pitch,
        velocity: 64,
    }
}

fn off(channel: u8, pitch: u8) -> Event {
    Event::NoteOff {
        channel,
        pitch,
        velocity: 64,
    }
}

#[test]
fn lax_first_ticks_end_to_end() {
    let library = library();
    let lax = library.city("LAX").unwrap();
    let sink = MemorySink::new();

    let report = Player::new(Duration::ZERO)
        .with_max_steps(2)
        .play(lax, sink.clone(), &CancelToken::new())
        .unwrap();
    assert_eq!(report.state, PlayerState::Stopped);
    assert_eq!(report.ticks, 2);

    // tide mean is 3.0: deviations -1 and +1
    assert_eq!(
        sink.entries(),
        vec![
            // step 0: weather then tides
            SinkEntry::Sent(cc(0, 22, 5)),
            SinkEntry::Sent(on(0, 79)),
            SinkEntry::Sent(cc(0, 21, 42)),
            SinkEntry::Sent(on(1, 60)),
            SinkEntry::Sent(cc(1, 23, 56)),
            SinkEntry::Sent(off(0, 79)),
            SinkEntry::Sent(off(1, 60)),
            // step 1: same pitch, so no note-off inside the events
            SinkEntry::Sent(cc(0, 22, 5)),
            SinkEntry::Sent(on(0, 79)),
            SinkEntry::Sent(cc(0, 21, 42)),
            SinkEntry::Sent(on(1, 60)),
            SinkEntry::Sent(cc(1, 23, 72)),
            SinkEntry::Sent(off(0, 79)),
            SinkEntry::Sent(off(1, 60)),
            SinkEntry::Closed,
        ]
    );
}

#[test]
fn shorter_track_loops_first() {
    let library = library();
    let lax = library.city("LAX").unwrap();
    assert_eq!(lax.cycle_length(), 6);

    // weather step 2 is the hot, wet day; tides are back at their first reading
    let tick = lax.merged_tick(2).unwrap();
    assert_eq!(
        tick.events,
        vec![
            cc(0, 22, 127),
            on(0, 88),
            off(0, 79),
            cc(0, 21, 25),
            on(1, 60),
            cc(1, 23, 56),
        ]
    );
    assert_eq!(lax.merged_tick(6), lax.merged_tick(0));
}

#[test]
fn cancellation_from_another_thread() {
    let library = library();
    let bos = library.city("BOS").unwrap().clone();
    let memory = MemorySink::new();
    let cancel = CancelToken::new();

    let sink = memory.clone();
    let token = cancel.clone();
    let handle = std::thread::spawn(move || {
        Player::new(Duration::from_millis(20)).play(&bos, sink, &token)
    });

    std::thread::sleep(Duration::from_millis(70));
    cancel.cancel();
    let report = handle.join().unwrap().unwrap();

    assert_eq!(report.state, PlayerState::Cancelled);
    assert!(report.ticks >= 1);
    assert_eq!(memory.close_count(), 1);

    // every note that was started has been released before close
    let entries = memory.entries();
    assert_eq!(entries.last(), Some(&SinkEntry::Closed));
    let events = memory.events();
    let ons = events.iter().filter(|e| matches!(e, Event::NoteOn { .. })).count();
    let offs = events.iter().filter(|e| e.is_note_off()).count();
    assert_eq!(ons, offs);
}

#[test]
fn unknown_city_is_reported() {
    let library = library();
    assert!(matches!(
        library.city("SFO"),
        Err(tidesong::Error::UnknownCity(_))
    ));
}
