use crate::model::programs::instrument_name;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Shortest note we will ever emit after moving a note around, in seconds.
pub const MIN_NOTE_DURATION: f64 = 0.1;

/// Substrings that mark a track as a likely humanization target.
const SUGGESTED_KEYWORDS: &[&str] = &["Piano", "Keyboard", "Lead"];

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Note {
    pub pitch: u8,
    pub velocity: u8,
    /// Onset in seconds from the start of the file.
    pub start: f64,
    /// Release in seconds from the start of the file.
    pub end: f64,
}

impl Note {
    pub fn new(pitch: u8, velocity: u8, start: f64, end: f64) -> Self {
        Self {
            pitch,
            velocity,
            start,
            end,
        }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Stable handle for a track: its position in [`Performance::tracks`].
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TrackId(pub usize);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Track {
    pub name: String,
    pub program: u8,
    pub channel: u8,
    pub is_drum: bool,
    /// Index of the SMF track chunk these notes were read from.
    pub source_track: usize,
    pub notes: Vec<Note>,
}

impl Track {
    /// The explicit track name, or a label synthesized from its position and program.
    pub fn label(&self, id: TrackId) -> String {
        if self.name.trim().is_empty() {
            format!("Track {} ({})", id.0 + 1, instrument_name(self.program))
        } else {
            self.name.clone()
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Performance {
    pub tracks: Vec<Track>,
    /// Everything needed to write the file back out, untouched by humanizers.
    #[serde(skip)]
    pub(crate) layout: crate::midi_codec::FileLayout,
}

impl Performance {
    pub fn new(tracks: Vec<Track>) -> Self {
        Self {
            tracks,
            layout: Default::default(),
        }
    }

    pub fn track_ids(&self) -> impl Iterator<Item = TrackId> + '_ {
        (0..self.tracks.len()).map(TrackId)
    }

    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.tracks.get(id.0)
    }

    /// Tracks eligible for humanization under `selection`, in file order.
    pub fn targets(&self, selection: &TrackSelection) -> Vec<TrackId> {
        self.track_ids()
            .filter(|id| !self.tracks[id.0].is_drum && selection.includes(*id))
            .collect()
    }

    pub fn note_count(&self, ids: &[TrackId]) -> usize {
        ids.iter()
            .filter_map(|id| self.track(*id))
            .map(|track| track.notes.len())
            .sum()
    }
}

/// Which tracks a run should touch. Drum tracks are never touched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TrackSelection {
    #[default]
    All,
    Only(BTreeSet<TrackId>),
}

impl TrackSelection {
    pub fn only<I: IntoIterator<Item = TrackId>>(ids: I) -> Self {
        TrackSelection::Only(ids.into_iter().collect())
    }

    pub fn includes(&self, id: TrackId) -> bool {
        match self {
            TrackSelection::All => true,
            TrackSelection::Only(ids) => ids.contains(&id),
        }
    }
}

/// Non-drum tracks whose label looks like a keyboard or lead part.
pub fn suggested_tracks(performance: &Performance) -> Vec<TrackId> {
    performance
        .track_ids()
        .filter(|id| {
            let track = &performance.tracks[id.0];
            let label = track.label(*id);
            !track.is_drum && SUGGESTED_KEYWORDS.iter().any(|kw| label.contains(kw))
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    fn track(name: &str, program: u8, is_drum: bool) -> Track {
        Track {
            name: name.to_string(),
            program,
            channel: if is_drum { 9 } else { 0 },
            is_drum,
            source_track: 0,
            notes: vec![Note::new(60, 80, 0.0, 0.5)],
        }
    }

    #[test]
    fn label_falls_back_to_program_name() {
        let named = track("Melody", 0, false);
        let unnamed = track("", 0, false);

        assert_eq!(named.label(TrackId(0)), "Melody");
        assert_eq!(unnamed.label(TrackId(2)), "Track 3 (Acoustic Grand Piano)");
    }

    #[test]
    fn targets_skip_drums_and_unselected() {
        let performance = Performance::new(vec![
            track("Drums", 0, true),
            track("Bass", 33, false),
            track("Lead", 80, false),
        ]);

        assert_eq!(
            performance.targets(&TrackSelection::All),
            vec![TrackId(1), TrackId(2)]
        );
        assert_eq!(
            performance.targets(&TrackSelection::only([TrackId(0), TrackId(2)])),
            vec![TrackId(2)]
        );
        assert_eq!(performance.note_count(&[TrackId(1), TrackId(2)]), 2);
    }

    #[test]
    fn suggestions_match_keyboard_labels() {
        let performance = Performance::new(vec![
            track("", 0, false),
            track("Strings", 48, false),
            track("Lead Synth", 80, false),
            track("Piano Drums?", 0, true),
        ]);

        assert_eq!(suggested_tracks(&performance), vec![TrackId(0), TrackId(2)]);
    }
}
