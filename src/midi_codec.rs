use crate::error::{HumanizeError, Result};
use crate::model::performance::*;
use log::{debug, warn};
use midly::num::{u4, u7, u15, u28};
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

const DEFAULT_MPQN: u32 = 500_000;
const DEFAULT_TICKS_PER_QUARTER: u16 = 480;
const MICROSECONDS_PER_SECOND: f64 = 1_000_000.0;
const DRUM_CHANNEL: u8 = 9;
const MAX_DELTA_TICKS: u64 = (1 << 28) - 1;

// Sort order for events sharing a tick: everything else, then releases, then onsets,
// then releases of notes that start on that same tick.
const ORDER_OTHER: u8 = 0;
const ORDER_NOTE_OFF: u8 = 1;
const ORDER_NOTE_ON: u8 = 2;
const ORDER_INSTANT_NOTE_OFF: u8 = 3;

#[derive(Debug, Clone)]
struct TempoSegment {
    pub mpqn: u32,
    pub start_tick: u64,
    pub seconds_at_start: f64,
}

#[derive(Debug, Clone)]
enum TimeBase {
    Metrical { ticks_per_quarter: f64 },
    Timecode { ticks_per_second: f64 },
}

/// Bidirectional tick <-> seconds conversion for one file.
#[derive(Debug, Clone)]
pub(crate) struct TimeMap {
    base: TimeBase,
    segments: Vec<TempoSegment>,
}

impl Default for TimeMap {
    fn default() -> Self {
        TimeMap::new(
            Timing::Metrical(u15::new(DEFAULT_TICKS_PER_QUARTER)),
            Vec::new(),
        )
    }
}

impl TimeMap {
    fn new(timing: Timing, mut tempo_changes: Vec<(u64, u32)>) -> Self {
        let base = match timing {
            Timing::Metrical(t) => TimeBase::Metrical {
                ticks_per_quarter: t.as_int().max(1) as f64,
            },
            Timing::Timecode(fps, subframe) => TimeBase::Timecode {
                ticks_per_second: (fps.as_f32() as f64 * subframe as f64).max(1.0),
            },
        };

        // default tempo of 120bpm until a tempo meta appears; the stable sort keeps it
        // ahead of any real tempo at tick 0 so the real one wins lookups
        tempo_changes.insert(0, (0, DEFAULT_MPQN));
        tempo_changes.sort_by_key(|(tick, _)| *tick);

        let mut segments: Vec<TempoSegment> = Vec::new();
        let mut last_tick: u64 = 0;
        let mut last_mpqn: u32 = DEFAULT_MPQN;
        let mut seconds: f64 = 0.0;

        for (tick, mpqn) in tempo_changes.into_iter() {
            if tick > last_tick {
                seconds += (tick - last_tick) as f64 * last_mpqn as f64
                    / Self::quarter_ticks_for(&base)
                    / MICROSECONDS_PER_SECOND;
            }

            segments.push(TempoSegment {
                mpqn,
                start_tick: tick,
                seconds_at_start: seconds,
            });

            last_tick = tick;
            last_mpqn = mpqn;
        }

        Self { base, segments }
    }

    fn quarter_ticks_for(base: &TimeBase) -> f64 {
        match base {
            TimeBase::Metrical { ticks_per_quarter } => *ticks_per_quarter,
            // tempo has no effect on timecode files; treat a quarter as half a second
            TimeBase::Timecode { ticks_per_second } => ticks_per_second / 2.0,
        }
    }

    pub fn quarter_ticks(&self) -> u64 {
        Self::quarter_ticks_for(&self.base).round() as u64
    }

    pub fn ticks_to_seconds(&self, tick: u64) -> f64 {
        match self.base {
            TimeBase::Timecode { ticks_per_second } => tick as f64 / ticks_per_second,
            TimeBase::Metrical { ticks_per_quarter } => {
                let segment = match self.segments.iter().rfind(|seg| seg.start_tick <= tick) {
                    Some(s) => s,
                    None => &self.segments[0],
                };

                let delta_ticks = (tick - segment.start_tick) as f64;
                segment.seconds_at_start
                    + delta_ticks * segment.mpqn as f64 / ticks_per_quarter / MICROSECONDS_PER_SECOND
            }
        }
    }

    pub fn seconds_to_ticks(&self, seconds: f64) -> u64 {
        let seconds = seconds.max(0.0);

        match self.base {
            TimeBase::Timecode { ticks_per_second } => (seconds * ticks_per_second).round() as u64,
            TimeBase::Metrical { ticks_per_quarter } => {
                let segment = match self
                    .segments
                    .iter()
                    .rfind(|seg| seg.seconds_at_start <= seconds)
                {
                    Some(s) => s,
                    None => &self.segments[0],
                };

                let delta_seconds = seconds - segment.seconds_at_start;
                let delta_ticks = delta_seconds * MICROSECONDS_PER_SECOND / segment.mpqn as f64
                    * ticks_per_quarter;
                segment.start_tick + delta_ticks.round() as u64
            }
        }
    }
}

/// Everything about the source file that humanization never touches.
#[derive(Debug, Clone, Default)]
pub(crate) struct FileLayout {
    /// The original file; its non-note events are replayed verbatim on encode.
    pub source: Vec<u8>,
    pub time_map: TimeMap,
}

struct NoteInterval {
    pub key: u8,
    pub start_tick: u64,
    pub end_tick: u64,
    pub velocity: u8,
}

struct ChannelNotes {
    program: u8,
    intervals: Vec<NoteInterval>,
}

pub fn import_midi_file<P: AsRef<Path>>(path: P) -> Result<Performance> {
    let bytes = fs::read(path.as_ref())?;
    decode_performance(&bytes)
}

/// Decode a Standard MIDI File into one [`Track`] per (track chunk, channel) carrying notes.
pub fn decode_performance(bytes: &[u8]) -> Result<Performance> {
    let smf = Smf::parse(bytes).map_err(|e| HumanizeError::Decode(e.to_string()))?;

    debug!(
        "MIDI format: {:?}, timing: {:?}, tracks: {}",
        smf.header.format,
        smf.header.timing,
        smf.tracks.len()
    );

    let mut tempo_changes: Vec<(u64, u32)> = Vec::new();
    for track in smf.tracks.iter() {
        let mut abs_tick: u64 = 0;
        for event in track.iter() {
            abs_tick = abs_tick.saturating_add(event.delta.as_int() as u64);
            if let TrackEventKind::Meta(MetaMessage::Tempo(micro)) = event.kind {
                tempo_changes.push((abs_tick, micro.as_int()));
            }
        }
    }

    let time_map = TimeMap::new(smf.header.timing, tempo_changes);
    let mut tracks: Vec<Track> = Vec::new();

    for (track_idx, smf_track) in smf.tracks.iter().enumerate() {
        let mut abs_tick: u64 = 0;
        let mut track_name = String::new();
        let mut programs = [0u8; 16];
        let mut channels: BTreeMap<u8, ChannelNotes> = BTreeMap::new();
        let mut open_notes: HashMap<(u8, u8), Vec<(u64, u8)>> = HashMap::new();

        for event in smf_track.iter() {
            abs_tick = abs_tick.saturating_add(event.delta.as_int() as u64);

            match &event.kind {
                TrackEventKind::Midi { channel, message } => {
                    let ch: u8 = channel.as_int();

                    match message {
                        MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                            channels.entry(ch).or_insert_with(|| ChannelNotes {
                                program: programs[ch as usize],
                                intervals: Vec::new(),
                            });
                            open_notes
                                .entry((ch, key.as_int()))
                                .or_default()
                                .push((abs_tick, vel.as_int()));
                        }
                        MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                            close_note(&mut open_notes, &mut channels, ch, key.as_int(), abs_tick);
                        }
                        MidiMessage::ProgramChange { program } => {
                            programs[ch as usize] = program.as_int();
                        }
                        _ => {}
                    }
                }
                TrackEventKind::Meta(MetaMessage::TrackName(bytes)) => {
                    if track_name.is_empty() {
                        track_name = String::from_utf8_lossy(bytes).trim().to_string();
                        debug!("Track {} name: {}", track_idx, track_name);
                    }
                }
                _ => {}
            }
        }

        for ((ch, key), stack) in open_notes.into_iter() {
            for (start_tick, velocity) in stack {
                let end_tick = if abs_tick > start_tick {
                    abs_tick
                } else {
                    start_tick + time_map.quarter_ticks()
                };

                warn!(
                    "Unclosed NoteOn for {}, channel: {} at tick: {} auto-closing at: {}..!",
                    key, ch, start_tick, end_tick
                );

                if let Some(notes) = channels.get_mut(&ch) {
                    notes.intervals.push(NoteInterval {
                        key,
                        start_tick,
                        end_tick,
                        velocity,
                    });
                }
            }
        }

        for (ch, mut channel_notes) in channels.into_iter() {
            channel_notes
                .intervals
                .sort_by_key(|interval| interval.start_tick);

            let notes: Vec<Note> = channel_notes
                .intervals
                .iter()
                .map(|interval| {
                    if interval.end_tick <= interval.start_tick {
                        debug!(
                            "Zero length note {} at tick {} in track {}..!",
                            interval.key, interval.start_tick, track_idx
                        );
                    }

                    Note::new(
                        interval.key,
                        interval.velocity,
                        time_map.ticks_to_seconds(interval.start_tick),
                        time_map.ticks_to_seconds(interval.end_tick),
                    )
                })
                .collect();

            tracks.push(Track {
                name: track_name.clone(),
                program: channel_notes.program,
                channel: ch,
                is_drum: ch == DRUM_CHANNEL,
                source_track: track_idx,
                notes,
            });
        }
    }

    debug!("Decoded {} note tracks..!", tracks.len());

    Ok(Performance {
        tracks,
        layout: FileLayout {
            source: bytes.to_vec(),
            time_map,
        },
    })
}

fn close_note(
    open_notes: &mut HashMap<(u8, u8), Vec<(u64, u8)>>,
    channels: &mut BTreeMap<u8, ChannelNotes>,
    ch: u8,
    key: u8,
    abs_tick: u64,
) {
    let opened = open_notes.get_mut(&(ch, key)).and_then(|stack| stack.pop());

    match (opened, channels.get_mut(&ch)) {
        (Some((start_tick, velocity)), Some(notes)) => notes.intervals.push(NoteInterval {
            key,
            start_tick,
            end_tick: abs_tick,
            velocity,
        }),
        _ => debug!("Orphaned NoteOff for {} ch{} at tick {}..!", key, ch, abs_tick),
    }
}

/// Non-note events of one track chunk at absolute ticks, plus the tick of its end.
fn passthrough_events<'a>(track: &[TrackEvent<'a>]) -> (Vec<(u64, u8, TrackEventKind<'a>)>, u64) {
    let mut abs_tick: u64 = 0;
    let mut events = Vec::with_capacity(track.len());

    for event in track.iter() {
        abs_tick = abs_tick.saturating_add(event.delta.as_int() as u64);

        match event.kind {
            TrackEventKind::Midi {
                message: MidiMessage::NoteOn { .. } | MidiMessage::NoteOff { .. },
                ..
            } => {}
            TrackEventKind::Meta(MetaMessage::EndOfTrack) => {}
            kind => events.push((abs_tick, ORDER_OTHER, kind)),
        }
    }

    (events, abs_tick)
}

/// Write a performance back to Standard MIDI File bytes.
///
/// Every non-note event is written at its original tick; only note events are regenerated.
pub fn encode_performance(performance: &Performance) -> Result<Vec<u8>> {
    let layout = &performance.layout;

    let (header, mut timed) = if layout.source.is_empty() {
        let header = Header::new(
            Format::Parallel,
            Timing::Metrical(u15::new(DEFAULT_TICKS_PER_QUARTER)),
        );
        (header, Vec::new())
    } else {
        let source =
            Smf::parse(&layout.source).map_err(|e| HumanizeError::Encode(e.to_string()))?;
        let timed: Vec<_> = source
            .tracks
            .iter()
            .map(|track| passthrough_events(track))
            .collect();
        (source.header, timed)
    };

    let track_count = performance
        .tracks
        .iter()
        .map(|track| track.source_track + 1)
        .max()
        .unwrap_or(0);
    while timed.len() < track_count {
        timed.push((Vec::new(), 0));
    }

    for track in performance.tracks.iter() {
        let channel = u4::new(track.channel & 0x0F);
        let (events, _) = &mut timed[track.source_track];

        let mut spans: Vec<NoteSpan> = track
            .notes
            .iter()
            .map(|note| {
                let on_tick = layout.time_map.seconds_to_ticks(note.start);
                NoteSpan {
                    key: note.pitch & 0x7F,
                    velocity: note.velocity.clamp(1, 127),
                    on_tick,
                    off_tick: layout.time_map.seconds_to_ticks(note.end).max(on_tick),
                }
            })
            .collect();
        release_crossed_notes(&mut spans);

        for span in spans {
            let key = u7::new(span.key);
            let off_order = if span.off_tick == span.on_tick {
                ORDER_INSTANT_NOTE_OFF
            } else {
                ORDER_NOTE_OFF
            };

            events.push((
                span.on_tick,
                ORDER_NOTE_ON,
                TrackEventKind::Midi {
                    channel,
                    message: MidiMessage::NoteOn {
                        key,
                        vel: u7::new(span.velocity),
                    },
                },
            ));
            events.push((
                span.off_tick,
                off_order,
                TrackEventKind::Midi {
                    channel,
                    message: MidiMessage::NoteOff {
                        key,
                        vel: u7::new(0),
                    },
                },
            ));
        }
    }

    let mut tracks: Vec<Vec<TrackEvent>> = Vec::with_capacity(timed.len());
    for (mut events, source_end) in timed.into_iter() {
        events.sort_by_key(|(tick, order, _)| (*tick, *order));

        let mut track_events: Vec<TrackEvent> = Vec::with_capacity(events.len() + 1);
        let mut last_tick: u64 = 0;

        for (tick, _, kind) in events {
            track_events.push(TrackEvent {
                delta: delta_ticks(tick - last_tick),
                kind,
            });
            last_tick = tick;
        }

        let end_tick = source_end.max(last_tick);
        track_events.push(TrackEvent {
            delta: delta_ticks(end_tick - last_tick),
            kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
        });

        tracks.push(track_events);
    }

    let smf = Smf { header, tracks };

    let mut buffer = Vec::new();
    smf.write_std(&mut buffer)?;

    Ok(buffer)
}

/// One note of a track, in ticks, ready to be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NoteSpan {
    key: u8,
    velocity: u8,
    on_tick: u64,
    off_tick: u64,
}

/// End a note where the next note of the same key begins if it would otherwise release inside it.
///
/// Receivers release a key on its first NoteOff, so a crossed pair would cut the later note short.
/// Notes that fully contain the next one, or start on the same tick, are left alone; decoding yields those shapes.
fn release_crossed_notes(spans: &mut [NoteSpan]) {
    let mut by_key: Vec<usize> = (0..spans.len()).collect();
    by_key.sort_by_key(|&i| (spans[i].key, spans[i].on_tick, i));

    for pair in by_key.windows(2) {
        let (current, next) = (spans[pair[0]], spans[pair[1]]);
        if current.key != next.key {
            continue;
        }

        let crossed = current.on_tick < next.on_tick
            && current.off_tick > next.on_tick
            && current.off_tick <= next.off_tick;
        if crossed {
            debug!(
                "Releasing key {} at tick {} instead of {}..!",
                current.key, next.on_tick, current.off_tick
            );
            spans[pair[0]].off_tick = next.on_tick;
        }
    }
}

fn delta_ticks(delta: u64) -> u28 {
    if delta > MAX_DELTA_TICKS {
        warn!("Clamping an oversized delta of {} ticks..!", delta);
    }
    u28::new(delta.min(MAX_DELTA_TICKS) as u32)
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use midly::num::u24;

    pub(crate) const TPQ: u16 = 480;

    fn ev(delta: u32, kind: TrackEventKind<'static>) -> TrackEvent<'static> {
        TrackEvent {
            delta: u28::new(delta),
            kind,
        }
    }

    fn note_on(channel: u8, key: u8, vel: u8) -> TrackEventKind<'static> {
        TrackEventKind::Midi {
            channel: u4::new(channel),
            message: MidiMessage::NoteOn {
                key: u7::new(key),
                vel: u7::new(vel),
            },
        }
    }

    fn note_off(channel: u8, key: u8) -> TrackEventKind<'static> {
        TrackEventKind::Midi {
            channel: u4::new(channel),
            message: MidiMessage::NoteOff {
                key: u7::new(key),
                vel: u7::new(0),
            },
        }
    }

    fn end() -> TrackEvent<'static> {
        ev(0, TrackEventKind::Meta(MetaMessage::EndOfTrack))
    }

    /// A simple sequential line of quarter notes on one channel.
    pub(crate) fn line(name: &'static str, channel: u8, pitches: &[u8], velocity: u8) -> Vec<TrackEvent<'static>> {
        let mut events = vec![
            ev(0, TrackEventKind::Meta(MetaMessage::TrackName(name.as_bytes()))),
            ev(
                0,
                TrackEventKind::Midi {
                    channel: u4::new(channel),
                    message: MidiMessage::ProgramChange {
                        program: u7::new(0),
                    },
                },
            ),
        ];

        for &pitch in pitches {
            events.push(ev(0, note_on(channel, pitch, velocity)));
            events.push(ev(TPQ as u32, note_off(channel, pitch)));
        }

        events.push(end());
        events
    }

    pub(crate) fn build_file(tracks: Vec<Vec<TrackEvent<'static>>>) -> Vec<u8> {
        let mut conductor = vec![
            ev(0, TrackEventKind::Meta(MetaMessage::Tempo(u24::new(500_000)))),
            ev(
                0,
                TrackEventKind::Meta(MetaMessage::TimeSignature(4, 2, 24, 8)),
            ),
        ];
        conductor.push(end());

        let mut all = vec![conductor];
        all.extend(tracks);

        let smf = Smf {
            header: Header::new(Format::Parallel, Timing::Metrical(u15::new(TPQ))),
            tracks: all,
        };

        let mut bytes = Vec::new();
        smf.write_std(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn decode_splits_tracks_and_flags_drums() {
        env_logger::try_init().unwrap_or(());

        let bytes = build_file(vec![
            line("Drums", 9, &[36, 38, 36, 38], 100),
            line("Piano", 0, &[60, 64, 67], 90),
        ]);

        let performance = decode_performance(&bytes).unwrap();
        assert_eq!(performance.tracks.len(), 2);

        let drums = &performance.tracks[0];
        assert!(drums.is_drum);
        assert_eq!(drums.name, "Drums");
        assert_eq!(drums.notes.len(), 4);

        let piano = &performance.tracks[1];
        assert!(!piano.is_drum);
        assert_eq!(piano.source_track, 2);
        assert_eq!(piano.notes.len(), 3);
        assert_eq!(piano.notes[1].pitch, 64);
        assert_eq!(piano.notes[1].velocity, 90);
        assert!((piano.notes[1].start - 0.5).abs() < 1e-9);
        assert!((piano.notes[1].end - 1.0).abs() < 1e-9);
    }

    #[test]
    fn decode_rejects_garbage() {
        let result = decode_performance(b"definitely not a midi file");
        assert!(matches!(result, Err(HumanizeError::Decode(_))));
    }

    #[test]
    fn unclosed_notes_are_closed_at_track_end() {
        env_logger::try_init().unwrap_or(());

        let track = vec![
            ev(0, note_on(0, 60, 80)),
            ev(0, note_on(0, 62, 80)),
            ev(TPQ as u32, note_off(0, 62)),
            ev(TPQ as u32, TrackEventKind::Meta(MetaMessage::EndOfTrack)),
        ];

        let performance = decode_performance(&build_file(vec![track])).unwrap();
        let notes = &performance.tracks[0].notes;
        assert_eq!(notes.len(), 2);

        let held = notes.iter().find(|n| n.pitch == 60).unwrap();
        assert!((held.end - 1.0).abs() < 1e-9);
    }

    #[test]
    fn note_on_zero_velocity_closes_note() {
        let track = vec![
            ev(0, note_on(0, 60, 80)),
            ev(TPQ as u32, note_on(0, 60, 0)),
            end(),
        ];

        let performance = decode_performance(&build_file(vec![track])).unwrap();
        let notes = &performance.tracks[0].notes;
        assert_eq!(notes.len(), 1);
        assert!((notes[0].duration() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn tempo_changes_affect_seconds_both_ways() {
        let map = TimeMap::new(
            Timing::Metrical(u15::new(TPQ)),
            vec![(0, 500_000), (960, 1_000_000)],
        );

        assert!((map.ticks_to_seconds(960) - 1.0).abs() < 1e-9);
        assert!((map.ticks_to_seconds(1440) - 2.0).abs() < 1e-9);
        assert_eq!(map.seconds_to_ticks(2.0), 1440);
        assert_eq!(map.seconds_to_ticks(0.5), 480);
        assert_eq!(map.seconds_to_ticks(-1.0), 0);
    }

    #[test]
    fn encode_preserves_everything_but_notes() {
        env_logger::try_init().unwrap_or(());

        let bytes = build_file(vec![line("Piano", 0, &[60, 62, 64], 70)]);
        let mut performance = decode_performance(&bytes).unwrap();
        performance.tracks[0].notes[1].velocity = 110;

        let encoded = encode_performance(&performance).unwrap();
        let smf = Smf::parse(&encoded).unwrap();
        assert_eq!(smf.tracks.len(), 2);

        let conductor = &smf.tracks[0];
        assert!(conductor
            .iter()
            .any(|e| matches!(e.kind, TrackEventKind::Meta(MetaMessage::Tempo(t)) if t.as_int() == 500_000)));

        let piano = &smf.tracks[1];
        assert!(piano.iter().any(
            |e| matches!(e.kind, TrackEventKind::Meta(MetaMessage::TrackName(name)) if name == b"Piano")
        ));
        assert!(piano.iter().any(|e| matches!(
            e.kind,
            TrackEventKind::Midi {
                message: MidiMessage::ProgramChange { .. },
                ..
            }
        )));

        let decoded = decode_performance(&encoded).unwrap();
        let original = decode_performance(&bytes).unwrap();
        assert_eq!(decoded.tracks.len(), 1);
        assert_eq!(decoded.tracks[0].name, "Piano");

        for (i, (after, before)) in decoded.tracks[0]
            .notes
            .iter()
            .zip(original.tracks[0].notes.iter())
            .enumerate()
        {
            assert_eq!(after.pitch, before.pitch);
            assert!((after.start - before.start).abs() < 1e-6);
            assert!((after.end - before.end).abs() < 1e-6);
            assert_eq!(after.velocity, if i == 1 { 110 } else { 70 });
        }
    }

    #[test]
    fn zero_length_notes_are_released_after_their_onset() {
        let track = vec![
            ev(0, note_on(9, 36, 100)),
            ev(0, note_off(9, 36)),
            ev(TPQ as u32, note_on(9, 38, 100)),
            ev(TPQ as u32 / 2, note_off(9, 38)),
            end(),
        ];
        let bytes = build_file(vec![track]);

        let performance = decode_performance(&bytes).unwrap();
        assert_eq!(performance.tracks[0].notes[0].duration(), 0.0);

        let encoded = encode_performance(&performance).unwrap();
        let (before, after) = (Smf::parse(&bytes).unwrap(), Smf::parse(&encoded).unwrap());
        assert_eq!(after.tracks[1], before.tracks[1]);
    }

    #[test]
    fn crossed_same_key_notes_release_at_the_next_onset() {
        let bytes = build_file(vec![line("Lead", 0, &[60, 60], 80)]);
        let mut performance = decode_performance(&bytes).unwrap();

        // Second note pulled earlier so it starts while the first is still held.
        let second = &mut performance.tracks[0].notes[1];
        second.start = 0.3;
        second.end = 0.8;

        let encoded = encode_performance(&performance).unwrap();
        let notes = decode_performance(&encoded).unwrap().tracks[0].notes.clone();

        assert_eq!(notes.len(), 2);
        assert!((notes[0].start - 0.0).abs() < 1e-6);
        assert!((notes[0].end - 0.3).abs() < 1e-6);
        assert!((notes[1].start - 0.3).abs() < 1e-6);
        assert!((notes[1].end - 0.8).abs() < 1e-6);
    }

    #[test]
    fn nested_or_unison_same_key_notes_are_left_alone() {
        let mut spans = vec![
            NoteSpan { key: 60, velocity: 80, on_tick: 0, off_tick: 960 },
            NoteSpan { key: 60, velocity: 80, on_tick: 240, off_tick: 480 },
            NoteSpan { key: 62, velocity: 80, on_tick: 100, off_tick: 300 },
            NoteSpan { key: 64, velocity: 80, on_tick: 500, off_tick: 600 },
            NoteSpan { key: 64, velocity: 80, on_tick: 500, off_tick: 700 },
        ];
        let expected = spans.clone();

        release_crossed_notes(&mut spans);
        assert_eq!(spans, expected);
    }

    #[test]
    fn encode_without_source_layout() {
        let performance = Performance::new(vec![Track {
            name: String::new(),
            program: 0,
            channel: 0,
            is_drum: false,
            source_track: 0,
            notes: vec![Note::new(60, 64, 0.0, 0.5), Note::new(67, 64, 0.5, 1.0)],
        }]);

        let encoded = encode_performance(&performance).unwrap();
        let decoded = decode_performance(&encoded).unwrap();
        assert_eq!(decoded.tracks.len(), 1);
        assert_eq!(decoded.tracks[0].notes.len(), 2);
        assert!((decoded.tracks[0].notes[1].start - 0.5).abs() < 1e-6);
    }
}
