// colorize.rs: pure text-to-colored-pieces segmentation

use crate::settings::{Algorithm, Color, Settings};
use unicode_segmentation::UnicodeSegmentation;

/// One piece of a colorized text run. `Plain` pieces carry delimiter text
/// byte-for-byte so restoration and display both see the exact original.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Piece {
    Colored { text: String, color: Color },
    Plain { text: String },
}

impl Piece {
    pub fn text(&self) -> &str {
        match self {
            Piece::Colored { text, .. } | Piece::Plain { text } => text,
        }
    }
}

/// Split `text` into alternately colored pieces according to the settings.
/// The concatenation of the pieces' text always equals the input.
pub fn colorize(text: &str, settings: &Settings) -> Vec<Piece> {
    match settings.algorithm {
        Algorithm::Char => by_grapheme(text, settings),
        Algorithm::Word => by_word(text, settings),
    }
}

fn pick(index: usize, settings: &Settings) -> Color {
    if index % 2 == 0 {
        settings.color_a.clone()
    } else {
        settings.color_b.clone()
    }
}

/// A "character" is an extended grapheme cluster, so combining sequences and
/// emoji count once.
fn by_grapheme(text: &str, settings: &Settings) -> Vec<Piece> {
    UnicodeSegmentation::graphemes(text, true)
        .enumerate()
        .map(|(index, grapheme)| Piece::Colored {
            text: grapheme.to_string(),
            color: pick(index, settings),
        })
        .collect()
}

/// Words alternate by occurrence; whitespace runs (including leading and
/// trailing ones) pass through uncolored.
fn by_word(text: &str, settings: &Settings) -> Vec<Piece> {
    let mut pieces = Vec::new();
    let mut word_index = 0usize;
    for (is_space, run) in split_runs(text) {
        if is_space {
            pieces.push(Piece::Plain {
                text: run.to_string(),
            });
        } else {
            pieces.push(Piece::Colored {
                text: run.to_string(),
                color: pick(word_index, settings),
            });
            word_index += 1;
        }
    }
    pieces
}

/// Runs of whitespace / non-whitespace, in order, covering the whole input.
fn split_runs(text: &str) -> Vec<(bool, &str)> {
    let mut runs = Vec::new();
    let mut start = 0usize;
    let mut current: Option<bool> = None;
    for (offset, ch) in text.char_indices() {
        let is_space = ch.is_whitespace();
        match current {
            Some(kind) if kind == is_space => {}
            Some(kind) => {
                runs.push((kind, &text[start..offset]));
                start = offset;
                current = Some(is_space);
            }
            None => current = Some(is_space),
        }
    }
    if let Some(kind) = current {
        runs.push((kind, &text[start..]));
    }
    runs
}
