mod capture;
mod config;
mod detection;
mod error;
mod keyboard;
mod output;
mod pipeline;
mod pose;

use anyhow::{bail, Context, Result};
use capture::{FrameSource, ImageSequence};
use clap::Parser;
use config::{PipelineConfig, Strategy};
use keyboard::PitchMap;
use output::{LogSink, NoteSink};
use pipeline::Pipeline;
use pose::HandPoseEstimator;
use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input webcam device index
    #[arg(short, long, default_value_t = 0)]
    input_device: u32,

    /// Play a directory of image files instead of the webcam
    #[arg(long)]
    frames: Option<String>,

    /// Capture resolution width
    #[arg(long, default_value_t = 640)]
    capture_width: u32,

    /// Capture resolution height
    #[arg(long, default_value_t = 480)]
    capture_height: u32,

    /// Target frames per second
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Stop after this many frames
    #[arg(long)]
    max_frames: Option<u64>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// How key presses are detected
    #[arg(long, value_enum, default_value_t = Strategy::Motion)]
    strategy: Strategy,

    /// Path to hand landmark model (ONNX file), used by the landmark strategy
    #[arg(long)]
    model: Option<String>,

    /// Number of keys across the frame
    #[arg(long, default_value_t = 10)]
    keys: usize,

    /// MIDI pitch of each key, comma separated
    #[arg(long, value_delimiter = ',', default_values_t = [60u8, 62, 64, 65, 67, 69, 71, 72, 74, 76])]
    notes: Vec<u8>,

    /// Height of the key strip as a fraction of the frame height
    #[arg(long, default_value_t = 0.25)]
    key_height: f32,

    /// Grayscale difference that counts as motion
    #[arg(long, default_value_t = 25)]
    threshold: u8,

    /// Fraction of skin pixels a key strip must exceed
    #[arg(long, default_value_t = 0.02)]
    skin_fraction: f32,

    /// Blur kernel size as a fraction of the analysis width
    #[arg(long, default_value_t = 0.02)]
    kernel_fraction: f32,

    /// Seconds between checks whether the background candidate went stale
    #[arg(long, default_value_t = 1.0)]
    save_check_time: f64,

    /// Seconds after which the background is forcibly replaced
    #[arg(long, default_value_t = 5.0)]
    reset_time: f64,

    /// Keep the first frame as the background for the whole session
    #[arg(long)]
    freeze_background: bool,

    /// Do not mirror frames horizontally
    #[arg(long)]
    no_flip: bool,

    /// Width frames are scaled to for motion analysis
    #[arg(long)]
    analysis_width: Option<u32>,

    /// Width of the image the skin check looks at
    #[arg(long)]
    display_width: Option<u32>,

    /// Majority vote over this many frames before a key changes (1 = off)
    #[arg(long, default_value_t = 1)]
    debounce: usize,

    /// Send notes to a MIDI output port instead of logging them
    #[arg(long)]
    midi: bool,

    /// Part of the MIDI port name to connect to
    #[arg(long)]
    midi_port: Option<String>,

    /// MIDI channel (0-15)
    #[arg(long, default_value_t = 0)]
    channel: u8,

    /// MIDI note-on velocity
    #[arg(long, default_value_t = 100)]
    velocity: u8,
}

impl Args {
    fn pipeline_config(&self) -> Result<PipelineConfig> {
        let seconds = |name: &str, value: f64| {
            Duration::try_from_secs_f64(value)
                .with_context(|| format!("Invalid {}: {}", name, value))
        };

        Ok(PipelineConfig {
            num_keys: self.keys,
            notes: self.notes.clone(),
            key_height: self.key_height,
            motion_threshold: self.threshold,
            skin_fraction: self.skin_fraction,
            kernel_fraction: self.kernel_fraction,
            save_check_time: seconds("save check time", self.save_check_time)?,
            reset_time: seconds("reset time", self.reset_time)?,
            recalibrate: !self.freeze_background,
            flip: !self.no_flip,
            analysis_width: self.analysis_width,
            display_width: self.display_width,
            debounce_frames: self.debounce,
            strategy: self.strategy,
        })
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    tracing::info!("air-keys starting");

    let config = args.pipeline_config()?;
    config.validate().context("Invalid configuration")?;

    // Initialize capture
    let mut source = open_source(&args).context("Failed to initialize frame source")?;
    let capture_size = source.resolution();
    tracing::info!("Capture: {}x{}", capture_size.0, capture_size.1);

    // Initialize note output
    let mut sink = open_sink(&args, PitchMap::new(config.notes.clone()))
        .context("Failed to initialize note output")?;

    let estimator = match config.strategy {
        Strategy::Landmarks => Some(open_estimator(&args)?),
        Strategy::Motion => None,
    };
    let detector = detection::create_detector(&config, capture_size, estimator)?;
    let mut pipeline = Pipeline::new(&config, detector)?;

    let controls = Arc::new(Controls::default());
    install_interrupt_handler(Arc::clone(&controls))?;
    spawn_console(Arc::clone(&controls));

    // Main loop
    let result = run_pipeline(
        source.as_mut(),
        &mut pipeline,
        sink.as_mut(),
        args.fps,
        args.max_frames,
        &controls,
    );

    // Sink before source: the final note-offs must go out first
    drop(sink);
    drop(source);
    tracing::info!("air-keys stopped");
    result
}

fn open_source(args: &Args) -> Result<Box<dyn FrameSource>> {
    if let Some(dir) = &args.frames {
        let sequence = ImageSequence::new(dir, args.fps)?;
        tracing::info!("Playing {} frames from {}", sequence.len(), dir);
        return Ok(Box::new(sequence));
    }

    #[cfg(feature = "webcam")]
    {
        let camera =
            capture::WebcamCapture::new(args.input_device, args.capture_width, args.capture_height)?;
        Ok(Box::new(camera))
    }
    #[cfg(not(feature = "webcam"))]
    {
        bail!(
            "Built without webcam support (device {}, {}x{} requested); pass --frames <DIR> or rebuild with --features webcam",
            args.input_device,
            args.capture_width,
            args.capture_height
        )
    }
}

fn open_sink(args: &Args, pitches: PitchMap) -> Result<Box<dyn NoteSink>> {
    if !args.midi {
        return Ok(Box::new(LogSink::new(pitches)));
    }

    #[cfg(feature = "midi")]
    {
        let sink = output::MidiSink::new(
            pitches,
            args.midi_port.as_deref(),
            args.channel,
            args.velocity.min(127),
        )?;
        Ok(Box::new(sink))
    }
    #[cfg(not(feature = "midi"))]
    {
        bail!(
            "Built without MIDI support (port {:?}, channel {}, velocity {}); rebuild with --features midi",
            args.midi_port,
            args.channel,
            args.velocity
        )
    }
}

fn open_estimator(args: &Args) -> Result<Box<dyn HandPoseEstimator>> {
    let Some(model_path) = &args.model else {
        bail!("The landmark strategy needs --model <ONNX file>");
    };

    #[cfg(feature = "onnx")]
    {
        tracing::info!("Loading hand landmark model from {}", model_path);
        pose::create_default_estimator(model_path).context("Failed to load hand landmark model")
    }
    #[cfg(not(feature = "onnx"))]
    {
        bail!(
            "Built without ONNX support, cannot load {}; rebuild with --features onnx",
            model_path
        )
    }
}

/// Requests raised from the console thread or Ctrl+C, polled once per frame
#[derive(Default)]
struct Controls {
    stop: AtomicBool,
    recalibrate: AtomicBool,
}

/// Ctrl+C stops the loop like Enter does, so held notes still get released
fn install_interrupt_handler(controls: Arc<Controls>) -> Result<()> {
    ctrlc::set_handler(move || controls.stop.store(true, Ordering::Relaxed))
        .context("Failed to install Ctrl+C handler")?;
    tracing::info!("Press Ctrl+C to stop");
    Ok(())
}

/// `r` + Enter relearns the background, a bare Enter stops
fn spawn_console(controls: Arc<Controls>) {
    tracing::info!("Press Enter to stop, r + Enter to recalibrate");
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        let mut line = String::new();
        loop {
            line.clear();
            // EOF (e.g. stdin not attached) must not stop the loop
            match stdin.lock().read_line(&mut line) {
                Ok(0) | Err(_) => return,
                Ok(_) if line.trim().eq_ignore_ascii_case("r") => {
                    controls.recalibrate.store(true, Ordering::Relaxed);
                }
                Ok(_) => {
                    controls.stop.store(true, Ordering::Relaxed);
                    return;
                }
            }
        }
    });
}

/// Run frames through the pipeline until the stream ends, the frame limit is
/// hit, a stop is requested or an error occurs. The shutdown sweep runs in every
/// case before returning.
fn run_pipeline<C, O>(
    source: &mut C,
    pipeline: &mut Pipeline,
    sink: &mut O,
    target_fps: u32,
    max_frames: Option<u64>,
    controls: &Controls,
) -> Result<()>
where
    C: FrameSource + ?Sized,
    O: NoteSink + ?Sized,
{
    let result = drive(source, pipeline, sink, target_fps, max_frames, controls);
    if let Err(e) = &result {
        tracing::error!("Pipeline stopped: {:#}", e);
    }

    for event in pipeline.shutdown() {
        sink.dispatch(&event);
    }
    result
}

fn drive<C, O>(
    source: &mut C,
    pipeline: &mut Pipeline,
    sink: &mut O,
    target_fps: u32,
    max_frames: Option<u64>,
    controls: &Controls,
) -> Result<()>
where
    C: FrameSource + ?Sized,
    O: NoteSink + ?Sized,
{
    let frame_duration = Duration::from_secs_f32(1.0 / target_fps.max(1) as f32);
    let mut frame_count = 0u64;
    let mut total_capture_time = Duration::ZERO;
    let mut total_detect_time = Duration::ZERO;
    let mut total_dispatch_time = Duration::ZERO;

    tracing::info!(
        "Starting main pipeline loop, detector={}",
        pipeline.detector_name()
    );

    loop {
        if controls.stop.load(Ordering::Relaxed) {
            tracing::info!("Stop requested");
            return Ok(());
        }
        if controls.recalibrate.swap(false, Ordering::Relaxed) {
            for event in pipeline.recalibrate() {
                sink.dispatch(&event);
            }
        }
        if max_frames.is_some_and(|max| frame_count >= max) {
            tracing::info!("Reached {} frames", frame_count);
            return Ok(());
        }

        let loop_start = Instant::now();

        // Capture frame
        let capture_start = Instant::now();
        let Some(frame) = source.next_frame().context("Failed to capture frame")? else {
            tracing::info!("End of stream after {} frames", frame_count);
            return Ok(());
        };
        total_capture_time += capture_start.elapsed();

        // Detection
        let detect_start = Instant::now();
        let events = pipeline.step(frame).context("Failed to process frame")?;
        total_detect_time += detect_start.elapsed();

        // Dispatch
        let dispatch_start = Instant::now();
        let dispatch_span = tracing::debug_span!("dispatch", events = events.len()).entered();
        for event in &events {
            sink.dispatch(event);
        }
        drop(dispatch_span);
        total_dispatch_time += dispatch_start.elapsed();

        frame_count += 1;

        // Log stats every 30 frames
        if frame_count % 30 == 0 {
            let avg_capture_ms = total_capture_time.as_secs_f64() * 1000.0 / frame_count as f64;
            let avg_detect_ms = total_detect_time.as_secs_f64() * 1000.0 / frame_count as f64;
            let avg_dispatch_ms = total_dispatch_time.as_secs_f64() * 1000.0 / frame_count as f64;
            let total_ms = avg_capture_ms + avg_detect_ms + avg_dispatch_ms;
            let actual_fps = if total_ms > 0.0 { 1000.0 / total_ms } else { 0.0 };

            tracing::info!(
                "Frame {}: capture={:.1}ms, detect={:.1}ms, dispatch={:.1}ms, total={:.1}ms, fps={:.1}",
                frame_count,
                avg_capture_ms,
                avg_detect_ms,
                avg_dispatch_ms,
                total_ms,
                actual_fps
            );
        }

        // Frame rate limiting
        let elapsed = loop_start.elapsed();
        if elapsed < frame_duration {
            std::thread::sleep(frame_duration - elapsed);
        }
    }
}
