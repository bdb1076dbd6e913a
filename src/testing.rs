//! Recording sinks for tests

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::sink::{AudioSink, BinarySink, Dimensions, TextureSink, TextureSinkFormat, TextureSinkMode};
use crate::transport::Timecode;

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[derive(Default)]
struct AudioState {
    channels: u32,
    sample_rate: u32,
    initializations: Vec<(u32, u32)>,
    played: Vec<(Vec<u8>, Timecode)>,
}

/// Audio sink that records every call
pub struct RecordingAudioSink {
    state: Mutex<AudioState>,
    reject_init: AtomicBool,
    pub resumes: AtomicUsize,
    pub pauses: AtomicUsize,
    pub flushes: AtomicUsize,
    pub shutdowns: AtomicUsize,
}

impl RecordingAudioSink {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(AudioState::default()),
            reject_init: AtomicBool::new(false),
            resumes: AtomicUsize::new(0),
            pauses: AtomicUsize::new(0),
            flushes: AtomicUsize::new(0),
            shutdowns: AtomicUsize::new(0),
        }
    }

    /// Make initialization fail (or succeed again)
    pub fn reject_init(&self, reject: bool) {
        self.reject_init.store(reject, Ordering::SeqCst);
    }

    pub fn initializations(&self) -> Vec<(u32, u32)> {
        lock(&self.state).initializations.clone()
    }

    pub fn played(&self) -> Vec<(Vec<u8>, Timecode)> {
        lock(&self.state).played.clone()
    }
}

impl AudioSink for RecordingAudioSink {
    fn initialize_audio_sink(&self, channels: u32, sample_rate: u32) -> bool {
        let mut state = lock(&self.state);
        state.initializations.push((channels, sample_rate));
        if self.reject_init.load(Ordering::SeqCst) {
            return false;
        }
        state.channels = channels;
        state.sample_rate = sample_rate;
        true
    }

    fn play_audio_sink(&self, buffer: &[u8], timecode: Timecode) {
        lock(&self.state).played.push((buffer.to_vec(), timecode));
    }

    fn resume_audio_sink(&self) {
        self.resumes.fetch_add(1, Ordering::SeqCst);
    }

    fn pause_audio_sink(&self) {
        self.pauses.fetch_add(1, Ordering::SeqCst);
    }

    fn flush_audio_sink(&self) {
        self.flushes.fetch_add(1, Ordering::SeqCst);
    }

    fn shutdown_audio_sink(&self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }

    fn audio_sink_channels(&self) -> u32 {
        lock(&self.state).channels
    }

    fn audio_sink_sample_rate(&self) -> u32 {
        lock(&self.state).sample_rate
    }
}

/// Arguments of one texture sink initialization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureInit {
    pub dimensions: Dimensions,
    pub buffer_dimensions: Dimensions,
    pub format: TextureSinkFormat,
    pub mode: TextureSinkMode,
}

/// One call made on a texture sink, in call order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureCall {
    Init(TextureInit),
    /// `(byte length, stride)` of the pushed buffer
    Update(usize, u32),
    Display(Timecode),
}

#[derive(Default)]
struct TextureState {
    dimensions: Dimensions,
    format: TextureSinkFormat,
    calls: Vec<TextureCall>,
}

/// Texture sink that records every call
pub struct RecordingTextureSink {
    state: Mutex<TextureState>,
    reject_init: AtomicBool,
    pub shutdowns: AtomicUsize,
}

impl RecordingTextureSink {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(TextureState::default()),
            reject_init: AtomicBool::new(false),
            shutdowns: AtomicUsize::new(0),
        }
    }

    pub fn reject_init(&self, reject: bool) {
        self.reject_init.store(reject, Ordering::SeqCst);
    }

    /// Every call in the order it was made
    pub fn calls(&self) -> Vec<TextureCall> {
        lock(&self.state).calls.clone()
    }

    pub fn initializations(&self) -> Vec<TextureInit> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                TextureCall::Init(init) => Some(init),
                _ => None,
            })
            .collect()
    }

    /// `(byte length, stride)` of every pushed buffer
    pub fn updates(&self) -> Vec<(usize, u32)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                TextureCall::Update(len, stride) => Some((len, stride)),
                _ => None,
            })
            .collect()
    }

    pub fn displayed(&self) -> Vec<Timecode> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                TextureCall::Display(timecode) => Some(timecode),
                _ => None,
            })
            .collect()
    }
}

impl TextureSink for RecordingTextureSink {
    fn initialize_texture_sink(
        &self,
        dimensions: Dimensions,
        buffer_dimensions: Dimensions,
        format: TextureSinkFormat,
        mode: TextureSinkMode,
    ) -> bool {
        let mut state = lock(&self.state);
        state.calls.push(TextureCall::Init(TextureInit {
            dimensions,
            buffer_dimensions,
            format,
            mode,
        }));
        if self.reject_init.load(Ordering::SeqCst) {
            return false;
        }
        state.dimensions = dimensions;
        state.format = format;
        true
    }

    fn update_texture_sink_buffer(&self, data: &[u8], stride: u32) {
        lock(&self.state).calls.push(TextureCall::Update(data.len(), stride));
    }

    fn display_texture_sink_buffer(&self, timecode: Timecode) {
        lock(&self.state).calls.push(TextureCall::Display(timecode));
    }

    fn shutdown_texture_sink(&self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }

    fn texture_sink_format(&self) -> TextureSinkFormat {
        lock(&self.state).format
    }

    fn texture_sink_dimensions(&self) -> Dimensions {
        lock(&self.state).dimensions
    }
}

/// Binary sink that records every payload
pub struct RecordingBinarySink {
    data: Mutex<Vec<(Vec<u8>, Timecode, Duration)>>,
    pub initializations: AtomicUsize,
    pub shutdowns: AtomicUsize,
}

impl RecordingBinarySink {
    pub fn new() -> Self {
        Self {
            data: Mutex::new(Vec::new()),
            initializations: AtomicUsize::new(0),
            shutdowns: AtomicUsize::new(0),
        }
    }

    pub fn received(&self) -> Vec<(Vec<u8>, Timecode, Duration)> {
        lock(&self.data).clone()
    }
}

impl BinarySink for RecordingBinarySink {
    fn initialize_binary_sink(&self) -> bool {
        self.initializations.fetch_add(1, Ordering::SeqCst);
        true
    }

    fn process_binary_sink_data(&self, data: &[u8], timecode: Timecode, duration: Duration) {
        lock(&self.data).push((data.to_vec(), timecode, duration));
    }

    fn shutdown_binary_sink(&self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}
