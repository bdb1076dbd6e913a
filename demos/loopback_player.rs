//! Loopback player demo
//!
//! Publishes a synthetic source on the in-process transport and plays it
//! through logging sinks for a few seconds.
//!
//! Run with: cargo run --example loopback_player [SECONDS]
//!
//! Examples:
//!   cargo run --example loopback_player        # plays for 3 seconds
//!   cargo run --example loopback_player 10     # plays for 10 seconds
//!
//! Set `RUST_LOG=ndi_media_rs=trace` to see every frame.

use std::f32::consts::TAU;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use ndi_media_rs::transport::{AudioFrame, FourCc, FrameFormat, MetadataFrame, Timecode, VideoFrame};
use ndi_media_rs::{
    AudioSink, BinarySink, Dimensions, MediaOptions, MediaPlayer, MemoryTransport, PlayerConfig,
    TextureSink, TextureSinkFormat, TextureSinkMode, TrackType,
};

const WIDTH: u32 = 640;
const HEIGHT: u32 = 360;
const SAMPLE_RATE: u32 = 48000;
const FRAME_RATE: u32 = 30;

/// Audio sink that counts bytes
#[derive(Default)]
struct MeterSink {
    format: Mutex<(u32, u32)>,
    bytes: AtomicU64,
}

impl AudioSink for MeterSink {
    fn initialize_audio_sink(&self, channels: u32, sample_rate: u32) -> bool {
        tracing::info!(channels, sample_rate, "Audio sink initialized");
        *self.format.lock().unwrap() = (channels, sample_rate);
        true
    }

    fn play_audio_sink(&self, buffer: &[u8], _timecode: Timecode) {
        self.bytes.fetch_add(buffer.len() as u64, Ordering::Relaxed);
    }

    fn resume_audio_sink(&self) {
        tracing::info!("Audio resumed");
    }

    fn pause_audio_sink(&self) {
        tracing::info!("Audio paused");
    }

    fn flush_audio_sink(&self) {}

    fn shutdown_audio_sink(&self) {}

    fn audio_sink_channels(&self) -> u32 {
        self.format.lock().unwrap().0
    }

    fn audio_sink_sample_rate(&self) -> u32 {
        self.format.lock().unwrap().1
    }
}

/// Texture sink that counts displayed frames
struct FrameCounterSink {
    layout: Mutex<(Dimensions, TextureSinkFormat)>,
    frames: AtomicU64,
}

impl TextureSink for FrameCounterSink {
    fn initialize_texture_sink(
        &self,
        dimensions: Dimensions,
        buffer_dimensions: Dimensions,
        format: TextureSinkFormat,
        _mode: TextureSinkMode,
    ) -> bool {
        tracing::info!(%dimensions, %buffer_dimensions, format = format.name(), "Texture sink initialized");
        *self.layout.lock().unwrap() = (dimensions, format);
        true
    }

    fn update_texture_sink_buffer(&self, _data: &[u8], _stride: u32) {}

    fn display_texture_sink_buffer(&self, _timecode: Timecode) {
        self.frames.fetch_add(1, Ordering::Relaxed);
    }

    fn shutdown_texture_sink(&self) {}

    fn texture_sink_format(&self) -> TextureSinkFormat {
        self.layout.lock().unwrap().1
    }

    fn texture_sink_dimensions(&self) -> Dimensions {
        self.layout.lock().unwrap().0
    }
}

/// Metadata sink that logs payloads
struct LogSink;

impl BinarySink for LogSink {
    fn initialize_binary_sink(&self) -> bool {
        true
    }

    fn process_binary_sink_data(&self, data: &[u8], timecode: Timecode, _duration: Duration) {
        tracing::info!(ticks = timecode.ticks(), payload = %String::from_utf8_lossy(data), "Metadata");
    }

    fn shutdown_binary_sink(&self) {}
}

fn video_frame(index: u64) -> VideoFrame {
    let stride = WIDTH * FourCc::Uyvy.bytes_per_pixel();
    let shade = (index % 256) as u8;
    VideoFrame {
        xres: WIDTH,
        yres: HEIGHT,
        fourcc: FourCc::Uyvy,
        frame_rate_n: FRAME_RATE,
        frame_rate_d: 1,
        frame_format: FrameFormat::Progressive,
        line_stride: stride,
        timecode: Timecode::from(Duration::from_secs(index) / FRAME_RATE),
        data: Bytes::from(vec![shade; (stride * HEIGHT) as usize]),
    }
}

fn audio_frame(index: u64) -> AudioFrame {
    let samples = (SAMPLE_RATE / FRAME_RATE) as usize;
    let offset = index as usize * samples;
    let tone: Vec<f32> = (0..samples)
        .map(|i| (TAU * 440.0 * (offset + i) as f32 / SAMPLE_RATE as f32).sin() * 0.5)
        .collect();
    AudioFrame::from_planes(
        SAMPLE_RATE,
        &[tone.clone(), tone],
        Timecode::from(Duration::from_secs(index) / FRAME_RATE),
    )
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let seconds: u64 = std::env::args()
        .nth(1)
        .map(|s| s.parse::<u64>())
        .transpose()?
        .unwrap_or(3);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ndi_media_rs=debug".parse()?)
                .add_directive("loopback_player=info".parse()?),
        )
        .init();

    let transport = MemoryTransport::new();
    let source = transport.publish("DEMO (Test Pattern)");

    let config = PlayerConfig::default()
        .computer_name("DEMO")
        .session_name("loopback");
    let player = MediaPlayer::new(config, Arc::new(transport.clone()));
    player.subscribe(|event| tracing::info!(%event, "Player event"));

    let audio = Arc::new(MeterSink::default());
    let video = Arc::new(FrameCounterSink {
        layout: Mutex::new((Dimensions::ZERO, TextureSinkFormat::default())),
        frames: AtomicU64::new(0),
    });
    player.set_audio_sink(Some(audio.clone()));
    player.set_video_sink(Some(video.clone()));
    player.set_metadata_sink(Some(Arc::new(LogSink)));

    player.open("ndi://localhost (Test Pattern)", &MediaOptions::new())?;
    player.select_track(TrackType::Audio, Some(0))?;
    player.spawn_audio_sampler();

    let frame_interval = Duration::from_secs(1) / FRAME_RATE;
    let mut ticker = tokio::time::interval(frame_interval);
    let total = seconds * FRAME_RATE as u64;

    for index in 0..total {
        ticker.tick().await;

        source.send_video(video_frame(index));
        source.send_audio(audio_frame(index));
        if index % FRAME_RATE as u64 == 0 {
            source.send_metadata(MetadataFrame::text(
                format!("<tally on_program=\"true\" second=\"{}\"/>", index / FRAME_RATE as u64),
                Timecode::from(Duration::from_secs(index) / FRAME_RATE),
            ));
        }

        player.tick_audio_and_metadata(frame_interval);
        player.tick_video(frame_interval);
    }

    println!("{}", player.info());
    if let Some(stats) = player.stats() {
        println!("{}", stats);
    }
    println!(
        "Displayed {} video frames, played {} bytes of audio",
        video.frames.load(Ordering::Relaxed),
        audio.bytes.load(Ordering::Relaxed)
    );

    player.close();
    Ok(())
}
