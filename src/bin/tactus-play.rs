//! Play a Standard MIDI File and print each dispatched event.
//!
//! Usage: `tactus-play <file.mid> [tempo-ratio]`

use std::env;
use tactus::prelude::*;
use tactus::Error;

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let mut args = env::args().skip(1);
    let path = args.next().ok_or_else(|| {
        Error::Core(tactus::core::Error::InvalidArgument(
            "usage: tactus-play <file.mid> [tempo-ratio]".into(),
        ))
    })?;
    let ratio = match args.next() {
        Some(arg) => arg.parse::<f64>().map_err(|e| {
            Error::Core(tactus::core::Error::InvalidArgument(format!(
                "tempo ratio {arg:?}: {e}"
            )))
        })?,
        None => 1.0,
    };

    let player = AsyncPlayer::builder()
        .score(Score::load(&path)?)
        .tempo_ratio(ratio)
        .build()?;

    println!(
        "{}: {} events, {:.1} s",
        path,
        player.score().len(),
        player.total_play_time_millis()? / 1000.0
    );

    player.on_event(|event: &Event| match event.as_channel() {
        Some(msg) => println!("{:02X?}", msg.to_bytes()),
        None => println!("{event:?}"),
    });

    let notifications = player.subscribe();
    player.play()?;

    match notifications.recv() {
        Ok(PlayerNotification::Failed(e)) => Err(e.into()),
        _ => Ok(()),
    }
}
