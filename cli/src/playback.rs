use anyhow::{Context, Result};
use rodio::{Decoder, OutputStream, Sink};
use std::{fs::File, io::BufReader, path::Path};

/// Plays a downloaded file to completion on the default output device.
pub fn play_blocking(path: &Path) -> Result<()> {
    let (_stream, handle) = OutputStream::try_default().context("failed to open audio output")?;
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let decoder = Decoder::new(BufReader::new(file)).context("failed to decode audio")?;
    let sink = Sink::try_new(&handle).context("failed to create audio sink")?;
    sink.append(decoder);
    sink.sleep_until_end();
    Ok(())
}
