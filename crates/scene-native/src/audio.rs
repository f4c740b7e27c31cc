// ---------------- Native audio (cpal) ----------------
//
// The score player renders the note timeline as enveloped sine tones, panned
// against the listener pose the session writes. Its sample counter is the
// transport clock the animators follow.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::anyhow;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use glam::{Mat4, Vec3};
use instant::Instant;
use scene_core::{
    tap_positions, AudioTransport, EchoConfig, ScoreData, POINT_FADE_DURATION_SEC,
    SCORE_LEAD_IN_SEC,
};

const SCORE_TAIL_SEC: f64 = 1.0; // silence after the last tone before the score ends
const ECHO_TAP_DECAY: f32 = 0.6; // gain of each tap relative to the previous one
const ECHO_GAIN: f32 = 0.25;
const POINT_GAIN: f32 = 0.15;
const ENVELOPE_SEC: f32 = 0.02;
const REFERENCE_DISTANCE: f32 = 50.0; // no attenuation closer than this

#[derive(Clone, Copy, Debug)]
struct Tone {
    start: f64,
    duration: f64,
    frequency_hz: f32,
    amplitude: f32,
    position: Vec3,
}

/// Every tone the score will play, sorted by start time.
#[derive(Clone, Debug)]
pub struct ToneSchedule {
    tones: Vec<Tone>,
    end_time: f64,
}

impl ToneSchedule {
    /// Echo notes sound once per delay tap at the tap's position; point notes
    /// sound once at their own position.
    pub fn from_score(score: &ScoreData, echo: &EchoConfig) -> Self {
        let real_echo = || score.echo.iter().filter(|n| !n.is_preallocation());
        let lowest =
            real_echo().map(|n| n.note_number).min().unwrap_or(0) - echo.lowest_note_offset;

        let mut tones = Vec::new();
        for note in real_echo() {
            let velocity = note.velocity as f32 / 127.0;
            for tap in 0..echo.delay_count.max(1) {
                tones.push(Tone {
                    start: note.time + tap as f64 * echo.delay_time_sec,
                    duration: echo.note_duration_sec,
                    frequency_hz: midi_to_hz(note.note_number),
                    amplitude: velocity * ECHO_GAIN * ECHO_TAP_DECAY.powi(tap as i32),
                    position: tap_positions(echo, lowest, note.note_number, tap)[0],
                });
            }
        }
        for note in score.points.iter().filter(|n| !n.is_preallocation()) {
            tones.push(Tone {
                start: note.time,
                duration: POINT_FADE_DURATION_SEC,
                frequency_hz: midi_to_hz(note.note_number),
                amplitude: note.velocity as f32 / 127.0 * POINT_GAIN,
                position: note.extra.position,
            });
        }
        tones.sort_by(|a, b| a.start.total_cmp(&b.start));

        let last = tones
            .iter()
            .map(|t| t.start + t.duration)
            .fold(score.last_onset(), f64::max);
        Self {
            tones,
            end_time: last + SCORE_TAIL_SEC,
        }
    }

    pub fn len(&self) -> usize {
        self.tones.len()
    }

    /// Transport time at which the score reports it has ended.
    pub fn end_time(&self) -> f64 {
        self.end_time
    }
}

fn midi_to_hz(note_number: i32) -> f32 {
    440.0 * 2f32.powf((note_number - 69) as f32 / 12.0)
}

/// Emits the player's lifecycle lines as the transport clock passes the
/// lead-in and the end of the score.
///
/// `csd:started` carries the playback time it was emitted at, so a late
/// poll does not shift the session's start time.
#[derive(Clone, Debug)]
struct Lifecycle {
    end_time: f64,
    started: bool,
    ended: bool,
}

impl Lifecycle {
    fn new(end_time: f64) -> Self {
        Self {
            end_time,
            started: false,
            ended: false,
        }
    }

    fn poll(&mut self, now: f64) -> Vec<String> {
        let mut lines = Vec::new();
        if !self.started && now >= SCORE_LEAD_IN_SEC {
            self.started = true;
            lines.push(format!("csd:started at {now}"));
        }
        if self.started && !self.ended && now >= self.end_time {
            self.ended = true;
            lines.push("csd:ended".to_string());
        }
        lines
    }

    fn rewind(&mut self) {
        self.started = false;
        self.ended = false;
    }
}

#[derive(Clone)]
struct Oscillator {
    amplitude: f32,
    phase: f32,     // radians
    phase_inc: f32, // radians per sample
    total_samples: u32,
    samples_emitted: u32,
    attack_samples: u32,
    release_samples: u32,
    left_gain: f32,
    right_gain: f32,
}

impl Oscillator {
    fn new(tone: &Tone, sample_rate: f32, listener_inverse: &Mat4) -> Self {
        let total = ((tone.duration as f32 * sample_rate) as u32).max(1);
        let envelope = (ENVELOPE_SEC * sample_rate) as u32;
        // Equal-power pan and distance falloff relative to the listener.
        let local = listener_inverse.transform_point3(tone.position);
        let distance = local.length().max(1.0);
        let pan = (local.x / distance).clamp(-1.0, 1.0);
        let angle = (pan + 1.0) * std::f32::consts::FRAC_PI_4;
        let attenuation = (REFERENCE_DISTANCE / distance).min(1.0);
        Self {
            amplitude: tone.amplitude * attenuation,
            phase: 0.0,
            phase_inc: std::f32::consts::TAU * tone.frequency_hz / sample_rate,
            total_samples: total,
            samples_emitted: 0,
            attack_samples: envelope.min(total),
            release_samples: envelope.min(total),
            left_gain: angle.cos(),
            right_gain: angle.sin(),
        }
    }
}

fn mix_sample_stereo(oscillators: &mut Vec<Oscillator>) -> (f32, f32) {
    let mut left = 0.0f32;
    let mut right = 0.0f32;
    let mut i = 0usize;
    while i < oscillators.len() {
        let osc = &mut oscillators[i];
        let n = osc.samples_emitted;
        let release_from = osc.total_samples.saturating_sub(osc.release_samples);
        let envelope = if n < osc.attack_samples {
            n as f32 / osc.attack_samples.max(1) as f32
        } else if n > release_from {
            1.0 - (n - release_from) as f32 / osc.release_samples.max(1) as f32
        } else {
            1.0
        };
        let raw = osc.phase.sin() * osc.amplitude * envelope;
        left += raw * osc.left_gain;
        right += raw * osc.right_gain;
        osc.phase = (osc.phase + osc.phase_inc) % std::f32::consts::TAU;
        osc.samples_emitted += 1;
        if osc.samples_emitted >= osc.total_samples {
            oscillators.swap_remove(i);
            continue;
        }
        i += 1;
    }
    (left.tanh(), right.tanh())
}

/// Everything the output callback touches.
struct PlayerState {
    sample_rate: f32,
    frames_played: u64,
    buffer_frames: usize,
    paused: bool,
    next_tone: usize,
    oscillators: Vec<Oscillator>,
    listener_inverse: Mat4,
}

impl PlayerState {
    fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            frames_played: 0,
            buffer_frames: 0,
            paused: false,
            next_tone: 0,
            oscillators: Vec::new(),
            listener_inverse: Mat4::IDENTITY,
        }
    }

    fn time(&self) -> f64 {
        self.frames_played as f64 / self.sample_rate as f64
    }

    fn fill<T: SizedSample + FromSample<f32>>(
        &mut self,
        data: &mut [T],
        channels: usize,
        schedule: &ToneSchedule,
    ) {
        let channels = channels.max(1);
        self.buffer_frames = data.len() / channels;
        if self.paused {
            data.fill(T::EQUILIBRIUM);
            return;
        }
        for frame in data.chunks_mut(channels) {
            let now = self.time();
            while let Some(tone) = schedule.tones.get(self.next_tone) {
                if tone.start > now {
                    break;
                }
                self.oscillators
                    .push(Oscillator::new(tone, self.sample_rate, &self.listener_inverse));
                self.next_tone += 1;
            }
            let (l, r) = mix_sample_stereo(&mut self.oscillators);
            match frame {
                [mono] => *mono = T::from_sample(0.5 * (l + r)),
                [left, right, rest @ ..] => {
                    *left = T::from_sample(l);
                    *right = T::from_sample(r);
                    rest.fill(T::EQUILIBRIUM);
                }
                [] => {}
            }
            self.frames_played += 1;
        }
    }

    fn rewind(&mut self) {
        self.frames_played = 0;
        self.next_tone = 0;
        self.oscillators.clear();
    }
}

/// Plays the tone schedule on the default output device.
pub struct ScorePlayer {
    state: Arc<Mutex<PlayerState>>,
    lifecycle: Lifecycle,
    _stream: cpal::Stream,
}

impl ScorePlayer {
    pub fn start(schedule: ToneSchedule) -> anyhow::Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| anyhow!("No audio output device"))?;
        let supported = device.default_output_config()?;
        let sample_format = supported.sample_format();
        let config: cpal::StreamConfig = supported.into();
        let channels = config.channels as usize;
        let sample_rate = config.sample_rate.0 as f32;

        let lifecycle = Lifecycle::new(schedule.end_time());
        log::info!(
            "[audio] {} tones over {:.1}s, {} Hz, {} channels",
            schedule.len(),
            schedule.end_time(),
            sample_rate,
            channels
        );
        let state = Arc::new(Mutex::new(PlayerState::new(sample_rate)));
        let schedule = Arc::new(schedule);
        let stream = match sample_format {
            cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config, &state, &schedule)?,
            cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config, &state, &schedule)?,
            cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config, &state, &schedule)?,
            other => return Err(anyhow!("Unsupported sample format {other:?}")),
        };
        stream.play()?;

        Ok(Self {
            state,
            lifecycle,
            _stream: stream,
        })
    }

    fn lock(&self) -> MutexGuard<'_, PlayerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn build_stream<T: SizedSample + FromSample<f32>>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    state: &Arc<Mutex<PlayerState>>,
    schedule: &Arc<ToneSchedule>,
) -> Result<cpal::Stream, cpal::BuildStreamError> {
    let channels = config.channels as usize;
    let state = Arc::clone(state);
    let schedule = Arc::clone(schedule);
    device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            let mut guard = state.lock().unwrap_or_else(PoisonError::into_inner);
            guard.fill(data, channels, &schedule);
        },
        |err| log::error!("[audio] stream error: {err}"),
        None,
    )
}

impl AudioTransport for ScorePlayer {
    fn current_time(&self) -> f64 {
        self.lock().time()
    }

    fn latency(&self) -> f64 {
        let state = self.lock();
        state.buffer_frames as f64 / state.sample_rate as f64
    }

    fn write_listener_pose(&mut self, pose: &[f32; 16]) {
        self.lock().listener_inverse = Mat4::from_cols_array(pose).inverse();
    }

    fn rewind(&mut self) {
        self.lock().rewind();
        self.lifecycle.rewind();
        log::debug!("[audio] score rewound");
    }

    fn set_paused(&mut self, paused: bool) {
        self.lock().paused = paused;
    }

    fn poll_messages(&mut self) -> Vec<String> {
        let now = self.current_time();
        self.lifecycle.poll(now)
    }
}

/// Silent transport driven by the wall clock, for machines without audio output.
pub struct WallClockTransport {
    offset: f64,
    resumed_at: Option<Instant>,
    lifecycle: Lifecycle,
}

impl WallClockTransport {
    pub fn new(end_time: f64) -> Self {
        Self {
            offset: 0.0,
            resumed_at: Some(Instant::now()),
            lifecycle: Lifecycle::new(end_time),
        }
    }
}

impl AudioTransport for WallClockTransport {
    fn current_time(&self) -> f64 {
        self.offset
            + self
                .resumed_at
                .map(|t| t.elapsed().as_secs_f64())
                .unwrap_or(0.0)
    }

    fn write_listener_pose(&mut self, _pose: &[f32; 16]) {}

    fn rewind(&mut self) {
        self.offset = 0.0;
        if self.resumed_at.is_some() {
            self.resumed_at = Some(Instant::now());
        }
        self.lifecycle.rewind();
    }

    fn set_paused(&mut self, paused: bool) {
        if paused == self.resumed_at.is_none() {
            return;
        }
        if paused {
            self.offset = self.current_time();
            self.resumed_at = None;
        } else {
            self.resumed_at = Some(Instant::now());
        }
    }

    fn poll_messages(&mut self) -> Vec<String> {
        let now = self.current_time();
        self.lifecycle.poll(now)
    }
}
