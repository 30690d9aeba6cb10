use super::{decode_frames, SoundBackend, FRAME_BYTES};
use crate::error::{PluginError, Result};
use crate::flags;
use rodio::{OutputStream, Sink, Source};
use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, Sender, SyncSender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

// Latency `update(true)` lets the FIFO build up before it blocks.
const TARGET_LATENCY_DIV: usize = 10;
// A stalled sink must not hang the emulation thread.
const MAX_UPDATE_WAIT: Duration = Duration::from_millis(500);

/// Decoded AI frames waiting for the output thread. Overflow discards the
/// oldest frames so latency stays bounded when the sink falls behind.
struct FrameFifo {
    frames: VecDeque<(i16, i16)>,
    capacity: usize,
}

impl FrameFifo {
    fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            frames: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    fn queued(&self) -> usize {
        self.frames.len()
    }

    fn flush(&mut self) {
        self.frames.clear();
    }

    fn push_frames(&mut self, incoming: &[(i16, i16)]) {
        let incoming = &incoming[incoming.len().saturating_sub(self.capacity)..];
        let overflow = (self.frames.len() + incoming.len()).saturating_sub(self.capacity);
        if overflow > 0 {
            self.frames.drain(..overflow);
        }
        self.frames.extend(incoming);
    }

    fn take_into(&mut self, out: &mut Vec<(i16, i16)>, max: usize) -> usize {
        out.clear();
        let count = self.frames.len().min(max);
        out.extend(self.frames.drain(..count));
        count
    }
}

/// rodio source pulling fixed-size chunks from the FIFO.
struct FifoSource {
    fifo: Arc<Mutex<FrameFifo>>,
    sample_rate: u32,
    chunk: Vec<(i16, i16)>,
    chunk_frames: usize,
    // Interleaved position (L,R,L,R...) within `chunk`.
    position: usize,
}

impl FifoSource {
    fn new(fifo: Arc<Mutex<FrameFifo>>, sample_rate: u32, chunk_frames: usize) -> Self {
        let chunk_frames = chunk_frames.max(1);
        Self {
            fifo,
            sample_rate,
            chunk: Vec::with_capacity(chunk_frames),
            chunk_frames,
            position: 0,
        }
    }

    fn refill(&mut self) {
        let taken = match self.fifo.lock() {
            Ok(mut fifo) => fifo.take_into(&mut self.chunk, self.chunk_frames),
            Err(_) => 0,
        };
        // underrun
        if taken < self.chunk_frames {
            self.chunk.resize(self.chunk_frames, (0, 0));
        }
        self.position = 0;
    }
}

impl Iterator for FifoSource {
    type Item = i16;

    fn next(&mut self) -> Option<i16> {
        if self.position >= self.chunk.len() * 2 {
            self.refill();
        }
        let (left, right) = self.chunk[self.position / 2];
        let sample = if self.position % 2 == 0 { left } else { right };
        self.position += 1;
        Some(sample)
    }
}

impl Source for FifoSource {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        2
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}

enum Command {
    Play(u32),
    Stop,
    Shutdown,
}

/// Output through the default host device via rodio.
///
/// The output stream is not `Send`, so it lives on a dedicated thread that
/// owns the sink; this side only feeds the shared frame FIFO.
pub struct RodioBackend {
    fifo: Arc<Mutex<FrameFifo>>,
    commands: Sender<Command>,
    worker: Option<JoinHandle<()>>,
    frequency: u32,
    playing: bool,
    last_buffer_len: u32,
    chunk_frames: usize,
}

impl RodioBackend {
    pub fn new() -> Result<Self> {
        let chunk_frames = flags::audio_chunk_frames();
        let capacity = flags::audio_buffer_frames();
        let fifo = Arc::new(Mutex::new(FrameFifo::with_capacity(capacity)));
        let (commands, rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::sync_channel(1);
        let worker_fifo = fifo.clone();
        let worker = std::thread::Builder::new()
            .name("ai-rodio-output".into())
            .spawn(move || run_output(rx, worker_fifo, chunk_frames, ready_tx))
            .map_err(|e| PluginError::Device(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                fifo,
                commands,
                worker: Some(worker),
                frequency: 0,
                playing: false,
                last_buffer_len: 0,
                chunk_frames,
            }),
            Ok(Err(msg)) => {
                let _ = worker.join();
                Err(PluginError::Device(msg))
            }
            Err(_) => {
                let _ = worker.join();
                Err(PluginError::Device("output thread exited early".into()))
            }
        }
    }

    fn queued_frames(&self) -> usize {
        self.fifo.lock().map(|r| r.queued()).unwrap_or(0)
    }

    fn restart(&mut self) {
        if self.frequency == 0 {
            return;
        }
        let _ = self.commands.send(Command::Play(self.frequency));
        self.playing = true;
    }
}

impl SoundBackend for RodioBackend {
    fn startup(&mut self) {
        self.restart();
    }

    fn shutdown(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("rodio output thread panicked");
            }
        }
        self.playing = false;
        if let Ok(mut fifo) = self.fifo.lock() {
            fifo.flush();
        }
    }

    fn reset(&mut self) {
        if let Ok(mut fifo) = self.fifo.lock() {
            fifo.flush();
        }
        self.last_buffer_len = 0;
        if self.playing {
            let _ = self.commands.send(Command::Stop);
            self.playing = false;
        }
    }

    fn set_frequency(&mut self, hz: u32) {
        if hz == self.frequency {
            return;
        }
        self.frequency = hz;
        self.restart();
    }

    fn accept_buffer(&mut self, buffer: &[u8]) {
        let frames = decode_frames(buffer);
        if let Ok(mut fifo) = self.fifo.lock() {
            fifo.push_frames(&frames);
        }
        self.last_buffer_len = buffer.queued() as u32;
        if !self.playing {
            self.restart();
        }
    }

    fn query_remaining_length(&mut self) -> u32 {
        let queued = (self.queued_frames() * FRAME_BYTES).min(u32::MAX as usize) as u32;
        queued.min(self.last_buffer_len)
    }

    fn update(&mut self, wait: bool) {
        if !wait || !self.playing || self.worker.is_none() {
            return;
        }
        let target = (self.frequency as usize / TARGET_LATENCY_DIV).max(self.chunk_frames * 2);
        let deadline = Instant::now() + MAX_UPDATE_WAIT;
        while self.queued_frames() > target && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(1));
        }
    }
}

impl Drop for RodioBackend {
    fn drop(&mut self) {
        if self.worker.is_some() {
            self.shutdown();
        }
    }
}

fn run_output(
    rx: Receiver<Command>,
    fifo: Arc<Mutex<FrameFifo>>,
    chunk_frames: usize,
    ready: SyncSender<std::result::Result<(), String>>,
) {
    let (_stream, handle) = match OutputStream::try_default() {
        Ok(v) => v,
        Err(e) => {
            let _ = ready.send(Err(format!("failed to open output stream: {}", e)));
            return;
        }
    };
    let _ = ready.send(Ok(()));

    let mut sink: Option<Sink> = None;
    while let Ok(cmd) = rx.recv() {
        match cmd {
            Command::Play(rate) => {
                if let Some(s) = sink.take() {
                    s.stop();
                }
                match Sink::try_new(&handle) {
                    Ok(s) => {
                        s.append(FifoSource::new(fifo.clone(), rate, chunk_frames));
                        s.play();
                        log::debug!("rodio sink running at {} Hz", rate);
                        sink = Some(s);
                    }
                    Err(e) => log::error!("failed to create audio sink: {}", e),
                }
            }
            Command::Stop => {
                if let Some(s) = sink.take() {
                    s.stop();
                }
            }
            Command::Shutdown => break,
        }
    }
    if let Some(s) = sink.take() {
        s.stop();
    }
}
