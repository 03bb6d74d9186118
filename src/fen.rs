//! FEN validation and conversion helpers.

use std::collections::{BTreeMap, HashMap, HashSet};

use thiserror::Error;

pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

const FILES: &[u8; 8] = b"abcdefgh";
const VALID_PIECES: &str = "KQRBNPkqrbnp";

/// Upper bounds that account for promotions.
const MAX_PIECE_COUNTS: [(char, usize); 12] = [
    ('K', 1),
    ('k', 1),
    ('Q', 9),
    ('q', 9),
    ('R', 10),
    ('r', 10),
    ('B', 10),
    ('b', 10),
    ('N', 10),
    ('n', 10),
    ('P', 8),
    ('p', 8),
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FenError {
    #[error("FEN must be a non-empty string")]
    Empty,
    #[error("FEN must have 6 fields, got {0}")]
    FieldCount(usize),
    #[error("Piece placement must have 8 ranks, got {0}")]
    RankCount(usize),
    #[error("Invalid character '{character}' in rank {rank}")]
    InvalidCharacter { character: char, rank: usize },
    #[error("Rank {rank} has {squares} squares, expected 8")]
    RankWidth { rank: usize, squares: usize },
    #[error("Must have exactly 1 {color} king, got {count}")]
    KingCount { color: &'static str, count: usize },
    #[error("Too many {piece} pieces: {count} > {max}")]
    TooManyPieces { piece: char, count: usize, max: usize },
    #[error("Pawns cannot be on the 1st or 8th rank")]
    PawnOnBackRank,
    #[error("Side to move must be 'w' or 'b', got '{0}'")]
    SideToMove(String),
    #[error("Invalid castling field: '{0}'")]
    Castling(String),
    #[error("Invalid en passant square: '{0}'")]
    EnPassant(String),
    #[error("Halfmove clock must be a non-negative integer, got '{0}'")]
    Halfmove(String),
    #[error("Fullmove number must be an integer of at least 1, got '{0}'")]
    Fullmove(String),
}

/// Validates `fen`. Non-strict mode checks the piece placement only.
pub fn validate_fen(fen: &str, strict: bool) -> Result<(), FenError> {
    let parts: Vec<&str> = fen.split_whitespace().collect();
    let Some(placement) = parts.first() else {
        return Err(FenError::Empty);
    };

    if strict && parts.len() != 6 {
        return Err(FenError::FieldCount(parts.len()));
    }

    validate_piece_placement(placement)?;

    if !strict {
        return Ok(());
    }

    let side = parts[1];
    if side != "w" && side != "b" {
        return Err(FenError::SideToMove(side.to_string()));
    }
    validate_castling(parts[2])?;
    validate_en_passant(parts[3], side)?;

    if parts[4].parse::<u32>().is_err() {
        return Err(FenError::Halfmove(parts[4].to_string()));
    }
    match parts[5].parse::<u32>() {
        Ok(fullmove) if fullmove >= 1 => {}
        _ => return Err(FenError::Fullmove(parts[5].to_string())),
    }

    Ok(())
}

fn validate_piece_placement(placement: &str) -> Result<(), FenError> {
    let ranks: Vec<&str> = placement.split('/').collect();
    if ranks.len() != 8 {
        return Err(FenError::RankCount(ranks.len()));
    }

    let mut counts: HashMap<char, usize> = HashMap::new();

    for (index, rank) in ranks.iter().enumerate() {
        let rank_number = 8 - index;
        let mut squares = 0;
        for character in rank.chars() {
            if let Some(empty) = character.to_digit(10) {
                squares += empty as usize;
            } else if VALID_PIECES.contains(character) {
                squares += 1;
                *counts.entry(character).or_insert(0) += 1;
            } else {
                return Err(FenError::InvalidCharacter {
                    character,
                    rank: rank_number,
                });
            }
        }
        if squares != 8 {
            return Err(FenError::RankWidth {
                rank: rank_number,
                squares,
            });
        }
    }

    for (piece, color) in [('K', "white"), ('k', "black")] {
        let count = counts.get(&piece).copied().unwrap_or(0);
        if count != 1 {
            return Err(FenError::KingCount { color, count });
        }
    }

    for (piece, max) in MAX_PIECE_COUNTS {
        let count = counts.get(&piece).copied().unwrap_or(0);
        if count > max {
            return Err(FenError::TooManyPieces { piece, count, max });
        }
    }

    if ranks[0].contains(['P', 'p']) || ranks[7].contains(['P', 'p']) {
        return Err(FenError::PawnOnBackRank);
    }

    Ok(())
}

fn validate_castling(castling: &str) -> Result<(), FenError> {
    if castling == "-" {
        return Ok(());
    }

    let mut seen = HashSet::new();
    for character in castling.chars() {
        if !"KQkq".contains(character) || !seen.insert(character) {
            return Err(FenError::Castling(castling.to_string()));
        }
    }
    Ok(())
}

fn validate_en_passant(square: &str, side_to_move: &str) -> Result<(), FenError> {
    if square == "-" {
        return Ok(());
    }

    let bytes = square.as_bytes();
    let expected_rank = if side_to_move == "w" { b'6' } else { b'3' };
    if bytes.len() != 2 || !FILES.contains(&bytes[0]) || bytes[1] != expected_rank {
        return Err(FenError::EnPassant(square.to_string()));
    }
    Ok(())
}

/// The piece-placement field, or the empty string for blank input.
pub fn piece_placement(fen: &str) -> &str {
    fen.split_whitespace().next().unwrap_or("")
}

/// Compares piece placement only, ignoring side to move, castling, en passant and clocks.
pub fn positions_equal(a: &str, b: &str) -> bool {
    piece_placement(a) == piece_placement(b)
}

/// Fills missing trailing fields with `w - - 0 1` defaults. Does not validate.
pub fn normalize_fen(fen: &str) -> String {
    const DEFAULTS: [&str; 6] = ["", "w", "-", "-", "0", "1"];

    let mut parts: Vec<&str> = fen.split_whitespace().collect();
    if parts.is_empty() {
        return String::new();
    }
    let present = parts.len();
    parts.extend(DEFAULTS.iter().skip(present));
    parts.join(" ")
}

pub fn fen_to_piece_map(fen: &str) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();

    for (index, rank) in piece_placement(fen).split('/').take(8).enumerate() {
        let rank_number = 8 - index;
        let mut file = 0usize;
        for character in rank.chars() {
            if let Some(empty) = character.to_digit(10) {
                file += empty as usize;
            } else if file < 8 {
                let square = format!("{}{}", FILES[file] as char, rank_number);
                map.insert(square, character.to_string());
                file += 1;
            }
        }
    }

    map
}

/// Builds a full FEN with no castling or en passant rights and fresh clocks.
pub fn piece_map_to_fen(map: &BTreeMap<String, String>, side_to_move: &str) -> String {
    let mut ranks = Vec::with_capacity(8);

    for rank_number in (1..=8).rev() {
        let mut rank = String::new();
        let mut empty = 0;
        for file in FILES {
            let square = format!("{}{}", *file as char, rank_number);
            match map.get(&square) {
                Some(piece) => {
                    if empty > 0 {
                        rank.push_str(&empty.to_string());
                        empty = 0;
                    }
                    rank.push_str(piece);
                }
                None => empty += 1,
            }
        }
        if empty > 0 {
            rank.push_str(&empty.to_string());
        }
        ranks.push(rank);
    }

    format!("{} {side_to_move} - - 0 1", ranks.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const KINGS_ONLY: &str = "4k3/8/8/8/8/8/8/4K3 w - - 0 1";

    #[test]
    fn starting_position_is_valid() {
        assert_eq!(validate_fen(STARTING_FEN, true), Ok(()));
        assert_eq!(validate_fen(KINGS_ONLY, true), Ok(()));
    }

    #[test]
    fn non_strict_accepts_bare_placement() {
        assert_eq!(validate_fen("4k3/8/8/8/8/8/8/4K3", false), Ok(()));
        assert_eq!(
            validate_fen("4k3/8/8/8/8/8/8/4K3", true),
            Err(FenError::FieldCount(1))
        );
    }

    #[test]
    fn placement_errors() {
        assert_eq!(validate_fen("", false), Err(FenError::Empty));
        assert_eq!(
            validate_fen("4k3/8/8/8/8/8/4K3", false),
            Err(FenError::RankCount(7))
        );
        assert_eq!(
            validate_fen("4k3/8/8/8/8/8/8/4K2", false),
            Err(FenError::RankWidth { rank: 1, squares: 7 })
        );
        assert_eq!(
            validate_fen("4k3/8/8/8/3x4/8/8/4K3", false),
            Err(FenError::InvalidCharacter {
                character: 'x',
                rank: 4
            })
        );
        assert_eq!(
            validate_fen("8/8/8/8/8/8/8/4K3", false),
            Err(FenError::KingCount {
                color: "black",
                count: 0
            })
        );
        assert_eq!(
            validate_fen("P3k3/8/8/8/8/8/8/4K3", false),
            Err(FenError::PawnOnBackRank)
        );
        assert_eq!(
            validate_fen("4k3/pppppppp/p7/8/8/8/8/4K3", false),
            Err(FenError::TooManyPieces {
                piece: 'p',
                count: 9,
                max: 8
            })
        );
    }

    #[test]
    fn strict_field_errors() {
        assert!(matches!(
            validate_fen("4k3/8/8/8/8/8/8/4K3 x - - 0 1", true),
            Err(FenError::SideToMove(_))
        ));
        assert!(matches!(
            validate_fen("4k3/8/8/8/8/8/8/4K3 w KK - 0 1", true),
            Err(FenError::Castling(_))
        ));
        assert!(matches!(
            validate_fen("4k3/8/8/8/8/8/8/4K3 w - e3 0 1", true),
            Err(FenError::EnPassant(_))
        ));
        assert_eq!(
            validate_fen("4k3/8/8/8/8/8/8/4K3 b - e3 0 1", true),
            Ok(())
        );
        assert!(matches!(
            validate_fen("4k3/8/8/8/8/8/8/4K3 w - - -1 1", true),
            Err(FenError::Halfmove(_))
        ));
        assert!(matches!(
            validate_fen("4k3/8/8/8/8/8/8/4K3 w - - 0 0", true),
            Err(FenError::Fullmove(_))
        ));
    }

    #[test]
    fn positions_equal_ignores_game_state() {
        assert!(positions_equal(
            "4k3/8/8/8/8/8/8/4K3 w - - 0 1",
            "4k3/8/8/8/8/8/8/4K3 b - - 12 40"
        ));
        assert!(positions_equal(STARTING_FEN, "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR"));
        assert!(!positions_equal(STARTING_FEN, KINGS_ONLY));
    }

    #[test]
    fn normalize_fills_defaults() {
        assert_eq!(normalize_fen("4k3/8/8/8/8/8/8/4K3"), KINGS_ONLY);
        assert_eq!(
            normalize_fen("4k3/8/8/8/8/8/8/4K3   b"),
            "4k3/8/8/8/8/8/8/4K3 b - - 0 1"
        );
        assert_eq!(normalize_fen(STARTING_FEN), STARTING_FEN);
    }

    #[test]
    fn piece_map_conversion() {
        let map = fen_to_piece_map(STARTING_FEN);
        assert_eq!(map.len(), 32);
        assert_eq!(map.get("e1").map(String::as_str), Some("K"));
        assert_eq!(map.get("d8").map(String::as_str), Some("q"));
        assert!(map.get("e4").is_none());

        let rebuilt = piece_map_to_fen(&map, "w");
        assert!(positions_equal(&rebuilt, STARTING_FEN));
        assert_eq!(rebuilt, "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w - - 0 1");
    }
}
