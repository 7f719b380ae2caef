//! Completion chime playback.
//!
//! rodio's output objects are not Send, so each chime runs on its own short
//! lived thread. Playback failure is never worth interrupting the app for;
//! errors are logged and dropped.

use std::thread;
use std::time::Duration;

use log::warn;
use rodio::{
    source::{SineWave, Source, Zero},
    OutputStream, Sink,
};

/// (frequency Hz, tone ms, gap ms) triplets making up the chime: two short
/// pips and a longer one at 800 Hz, repeated a third higher.
const CHIME_PATTERN: [(f32, u64, u64); 6] = [
    (800.0, 120, 80),
    (800.0, 120, 80),
    (800.0, 120, 250),
    (1000.0, 120, 80),
    (1000.0, 120, 80),
    (1000.0, 120, 0),
];

const CHIME_VOLUME: f32 = 0.25;

pub fn play_completion_chime() {
    let spawned = thread::Builder::new()
        .name("chime".to_string())
        .spawn(|| {
            if let Err(err) = play_pattern() {
                warn!("chime playback failed: {err}");
            }
        });
    if let Err(err) = spawned {
        warn!("could not spawn chime thread: {err}");
    }
}

fn play_pattern() -> Result<(), String> {
    let (_stream, handle) = OutputStream::try_default().map_err(|e| e.to_string())?;
    let sink = Sink::try_new(&handle).map_err(|e| e.to_string())?;
    for (freq, tone_ms, gap_ms) in CHIME_PATTERN {
        let tone = SineWave::new(freq)
            .take_duration(Duration::from_millis(tone_ms))
            .amplify(CHIME_VOLUME);
        sink.append(tone);
        if gap_ms > 0 {
            let silence =
                Zero::<f32>::new(1, 44_100).take_duration(Duration::from_millis(gap_ms));
            sink.append(silence);
        }
    }
    sink.sleep_until_end();
    Ok(())
}
