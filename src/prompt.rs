use crate::model::performance::Note;

/// How the model is told who is playing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PerformerStyle {
    /// Name the track's instrument (or its synthesized label).
    #[default]
    Instrument,

    /// Always "a professional pianist", whatever the track is.
    Pianist,
}

impl PerformerStyle {
    pub fn describe(&self, instrument_label: &str) -> String {
        match self {
            PerformerStyle::Instrument => format!(
                "a professional musician playing the instrument: {}",
                instrument_label
            ),
            PerformerStyle::Pianist => "a professional pianist".to_string(),
        }
    }
}

/// Render the request for one chunk of notes.
pub fn build_prompt(performer: &str, chunk: &[Note]) -> String {
    let notes = chunk
        .iter()
        .map(|note| format!("({},{:.2})", note.pitch, note.duration()))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "You are {performer}.
Please determine the velocity (1-127) for each note in the following sequence to create a human-like, expressive performance.
Consider phrasing and dynamics naturally for this instrument.

Input Format: (Pitch, Duration), (Pitch, Duration)...
Input Data: [{notes}]

Requirement:
- Return ONLY a list of integer velocities separated by commas.
- Do not include any other text or brackets.
- The number of velocities MUST match the number of input notes exactly ({count} notes).
",
        count = chunk.len()
    )
}

/// Pull the comma separated velocities out of a model reply.
///
/// Tokens that are not plain non-negative integers are dropped rather than rejected, and
/// the count is not checked against anything.
pub fn parse_response(text: &str) -> Vec<u32> {
    text.trim()
        .replace(['[', ']'], "")
        .replace(['\r', '\n'], " ")
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()))
        .filter_map(|token| token.parse::<u32>().ok())
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_clean_and_noisy_replies() {
        assert_eq!(parse_response("64, 70, 80"), vec![64, 70, 80]);
        assert_eq!(parse_response("[64, 70]\n"), vec![64, 70]);
        assert_eq!(parse_response("sixty-four, 70"), vec![70]);
        assert_eq!(parse_response("  [\n12,\n 7 ,-3, 4.5, 200]  "), vec![12, 7, 200]);
        assert!(parse_response("I'm sorry, I can't help with that.").is_empty());
        assert!(parse_response("").is_empty());
    }

    #[test]
    fn oversized_numbers_are_dropped() {
        assert_eq!(parse_response("99999999999999999999, 5"), vec![5]);
    }

    #[test]
    fn prompt_lists_pitch_and_duration() {
        let chunk = vec![
            Note::new(60, 80, 0.0, 0.5),
            Note::new(64, 80, 0.5, 0.8333),
        ];

        let prompt = build_prompt(&PerformerStyle::Pianist.describe("ignored"), &chunk);
        assert!(prompt.starts_with("You are a professional pianist."));
        assert!(prompt.contains("Input Data: [(60,0.50), (64,0.33)]"));
        assert!(prompt.contains("exactly (2 notes)"));
    }

    #[test]
    fn instrument_style_names_the_track() {
        let described = PerformerStyle::Instrument.describe("Track 2 (Violin)");
        assert_eq!(
            described,
            "a professional musician playing the instrument: Track 2 (Violin)"
        );
    }
}
