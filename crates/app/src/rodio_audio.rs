use std::{
    cell::Cell,
    collections::HashMap,
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, PoisonError,
    },
    time::{Duration, Instant},
};

use rodio::{source::EmptyCallback, Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use tardis_core::{
    AssetKind, AudioBackend, AudioTrack, BackendState, EndHook, Result, TardisError,
};

type Length = Arc<Mutex<Option<Duration>>>;

/// Audio output through the default `rodio` device.
///
/// Formats that do not report their length up front are measured on a worker
/// thread. The track reports `Starting` until the length is known, so the wait
/// counts against the player's start timeout. Measured lengths are cached per
/// path.
pub struct RodioAudio {
    // must stay alive for as long as anything plays
    _stream: OutputStream,
    handle: OutputStreamHandle,
    lengths: Arc<Mutex<HashMap<PathBuf, Duration>>>,
}

impl RodioAudio {
    pub fn new() -> Result<Self> {
        let (stream, handle) = OutputStream::try_default()
            .map_err(|err| TardisError::msg(format!("audio output unavailable: {err}")))?;
        Ok(Self {
            _stream: stream,
            handle,
            lengths: Arc::default(),
        })
    }
}

fn open_decoder(path: &Path) -> Result<Decoder<BufReader<File>>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(TardisError::not_found(AssetKind::Audio, path));
        }
        Err(err) => return Err(err.into()),
    };
    Decoder::new(BufReader::new(file)).map_err(|err| TardisError::decode(path, err))
}

/// Counts the samples of a whole file.
fn measure(path: &Path) -> Result<Duration> {
    let decoder = open_decoder(path)?;
    let channels = u64::from(decoder.channels().max(1));
    let rate = u64::from(decoder.sample_rate().max(1));
    let samples = decoder.count() as u64;
    Ok(Duration::from_millis(samples * 1000 / (channels * rate)))
}

/// Resolves the length of `path` without blocking: reported or cached lengths
/// are filled in at once, anything else by a measuring thread.
fn track_length(
    path: &Path,
    reported: Option<Duration>,
    cache: &Arc<Mutex<HashMap<PathBuf, Duration>>>,
) -> Result<Length> {
    let known = reported.or_else(|| {
        cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .copied()
    });
    let length: Length = Arc::new(Mutex::new(known));
    if known.is_some() {
        return Ok(length);
    }

    let (slot, cache, path) = (length.clone(), cache.clone(), path.to_path_buf());
    std::thread::Builder::new()
        .name("audio-length".into())
        .spawn(move || match measure(&path) {
            Ok(duration) => {
                tracing::debug!(path = %path.display(), duration_ms = duration.as_millis() as u64, "measured");
                cache
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(path, duration);
                *slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(duration);
            }
            Err(err) => tracing::warn!(path = %path.display(), %err, "audio length unknown"),
        })?;
    Ok(length)
}

impl AudioBackend for RodioAudio {
    fn open(&mut self, path: &Path) -> Result<Box<dyn AudioTrack>> {
        let source = open_decoder(path)?;
        let length = track_length(path, source.total_duration(), &self.lengths)?;

        let sink = Sink::try_new(&self.handle)
            .map_err(|err| TardisError::msg(format!("audio sink unavailable: {err}")))?;
        sink.pause();
        sink.append(source);

        let ended = Arc::new(AtomicBool::new(false));
        let hook: Arc<Mutex<Option<EndHook>>> = Arc::new(Mutex::new(None));
        let (ended_flag, end_hook) = (ended.clone(), hook.clone());
        // runs on rodio's output thread once the track has drained
        sink.append(EmptyCallback::<i16>::new(Box::new(move || {
            ended_flag.store(true, Ordering::SeqCst);
            let hook = end_hook.lock().unwrap_or_else(PoisonError::into_inner).take();
            if let Some(hook) = hook {
                hook();
            }
        })));

        Ok(Box::new(RodioTrack {
            sink,
            length,
            requested: false,
            started: Cell::new(None),
            stopped: false,
            ended,
            hook,
        }))
    }
}

struct RodioTrack {
    sink: Sink,
    length: Length,
    requested: bool,
    started: Cell<Option<Instant>>,
    stopped: bool,
    ended: Arc<AtomicBool>,
    hook: Arc<Mutex<Option<EndHook>>>,
}

impl RodioTrack {
    fn length(&self) -> Option<Duration> {
        *self.length.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Unpauses the sink once play was requested and the length is known.
    fn resume(&self) {
        if self.requested && !self.stopped && self.started.get().is_none() && self.length().is_some() {
            self.sink.play();
            self.started.set(Some(Instant::now()));
        }
    }
}

impl AudioTrack for RodioTrack {
    fn play(&mut self) -> Result<()> {
        self.requested = true;
        self.resume();
        Ok(())
    }

    fn state(&self) -> BackendState {
        if self.stopped || self.ended.load(Ordering::SeqCst) {
            return BackendState::Stopped;
        }
        if !self.requested {
            return BackendState::Idle;
        }
        self.resume();
        match self.started.get() {
            None => BackendState::Starting,
            Some(_) if self.sink.empty() => BackendState::Stopped,
            Some(_) => BackendState::Playing,
        }
    }

    fn duration_ms(&self) -> u64 {
        match (self.started.get(), self.length()) {
            (Some(_), Some(length)) => length.as_millis() as u64,
            _ => 0,
        }
    }

    fn elapsed_ms(&self) -> u64 {
        self.started
            .get()
            .map(|started| started.elapsed().as_millis() as u64)
            .unwrap_or(0)
    }

    fn stop(&mut self) {
        self.hook.lock().unwrap_or_else(PoisonError::into_inner).take();
        self.sink.stop();
        self.stopped = true;
    }

    fn set_volume(&mut self, percent: u8) {
        self.sink.set_volume(f32::from(percent.min(100)) / 100.0);
    }

    fn on_ended(&mut self, hook: EndHook) {
        *self.hook.lock().unwrap_or_else(PoisonError::into_inner) = Some(hook);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Mono 16-bit PCM WAV of `samples` silent samples at `rate` Hz.
    fn write_wav(path: &Path, rate: u32, samples: u32) {
        let data_len = samples * 2;
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
        bytes.extend_from_slice(b"WAVEfmt ");
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&rate.to_le_bytes());
        bytes.extend_from_slice(&(rate * 2).to_le_bytes());
        bytes.extend_from_slice(&2u16.to_le_bytes());
        bytes.extend_from_slice(&16u16.to_le_bytes());
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&data_len.to_le_bytes());
        bytes.resize(bytes.len() + data_len as usize, 0);
        std::fs::write(path, bytes).unwrap();
    }

    fn wait_for(length: &Length) -> Option<Duration> {
        for _ in 0..500 {
            if let Some(duration) = *length.lock().unwrap() {
                return Some(duration);
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        None
    }

    #[test]
    fn unknown_length_is_measured_off_thread_and_cached() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("001_bell.wav");
        write_wav(&path, 8_000, 800);
        let cache = Arc::default();

        let length = track_length(&path, None, &cache).unwrap();
        assert_eq!(wait_for(&length), Some(Duration::from_millis(100)));
        assert_eq!(cache.lock().unwrap().get(&path), Some(&Duration::from_millis(100)));

        // a second open is answered from the cache
        std::fs::remove_file(&path).unwrap();
        let again = track_length(&path, None, &cache).unwrap();
        assert_eq!(*again.lock().unwrap(), Some(Duration::from_millis(100)));
    }

    #[test]
    fn reported_length_needs_no_measurement() {
        let cache = Arc::default();
        let length = track_length(
            Path::new("/not/there.mp3"),
            Some(Duration::from_secs(3)),
            &cache,
        )
        .unwrap();
        assert_eq!(*length.lock().unwrap(), Some(Duration::from_secs(3)));
        assert!(cache.lock().unwrap().is_empty());
    }

    #[test]
    fn unreadable_file_leaves_the_length_unknown() {
        let cache = Arc::default();
        let length = track_length(Path::new("/not/there.mp3"), None, &cache).unwrap();
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(*length.lock().unwrap(), None);
    }
}
