//! Binary frame formats exchanged with clients.
//!
//! Server frames are flat sequences of little-endian `u16` words. Client
//! frames are raw bytes told apart by their shape alone: an empty frame, a
//! two-byte chat prefix, or exactly eight bytes for a move.

use crate::board::{BoardSnapshot, CellUpdate};

/// Two-byte prefix of an inbound chat frame.
pub const CHAT_PREFIX: [u8; 2] = [247, 183];
/// Prefix a verification text must start with (after trimming).
pub const VERIFICATION_PREFIX: &str = "0.";

pub const CHAT_MARKER: u16 = 47095;
pub const LEADERBOARD_MARKER: u16 = 48027;
pub const DEPARTURE_MARKER: u16 = 64535;
pub const DEPARTURE_TAG: u16 = 12345;
/// Trailing filler word of a move frame. Clients expect it, nothing reads it.
pub const MOVE_FILLER: u16 = 300;

const MOVE_FRAME_LEN: usize = 8;

/// Decoded shape of an inbound frame from a verified team.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientFrame {
    /// Zero-length frame: the client reports its king died.
    DisconnectIntent,
    Chat(String),
    Move {
        sx: u16,
        sy: u16,
        nx: u16,
        ny: u16,
    },
    Unknown,
}

impl ClientFrame {
    pub fn decode(data: &[u8]) -> Self {
        if data.is_empty() {
            return ClientFrame::DisconnectIntent;
        }

        if data.starts_with(&CHAT_PREFIX) {
            let text = String::from_utf8_lossy(&data[CHAT_PREFIX.len()..]);
            return ClientFrame::Chat(text.into_owned());
        }

        if data.len() == MOVE_FRAME_LEN {
            let word = |i: usize| u16::from_le_bytes([data[i], data[i + 1]]);
            return ClientFrame::Move {
                sx: word(0),
                sy: word(2),
                nx: word(4),
                ny: word(6),
            };
        }

        ClientFrame::Unknown
    }

    /// Encodes the frame as a client would send it.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            ClientFrame::DisconnectIntent | ClientFrame::Unknown => Vec::new(),
            ClientFrame::Chat(text) => {
                let mut data = CHAT_PREFIX.to_vec();
                data.extend_from_slice(text.as_bytes());
                data
            }
            ClientFrame::Move { sx, sy, nx, ny } => [*sx, *sy, *nx, *ny]
                .iter()
                .flat_map(|w| w.to_le_bytes())
                .collect(),
        }
    }
}

/// True if an unverified team's frame completes the verification handshake.
pub fn is_verification(data: &[u8]) -> bool {
    String::from_utf8_lossy(data)
        .trim()
        .starts_with(VERIFICATION_PREFIX)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub team_id: u16,
    pub kills: u32,
    pub label: String,
}

/// Outbound frames, one variant per wire format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerFrame {
    Welcome {
        team_id: u16,
        pieces: Vec<u16>,
        teams: Vec<u16>,
    },
    CellUpdate {
        x: u16,
        y: u16,
        piece: u16,
        team: u16,
    },
    Move {
        sx: u16,
        sy: u16,
        nx: u16,
        ny: u16,
    },
    Chat {
        sender: u16,
        units: Vec<u16>,
    },
    Departure {
        team_id: u16,
    },
    Leaderboard(Vec<LeaderboardEntry>),
}

impl ServerFrame {
    pub fn welcome(team_id: u16, snapshot: &BoardSnapshot) -> Self {
        ServerFrame::Welcome {
            team_id,
            pieces: snapshot.pieces().iter().map(|p| p.as_u16()).collect(),
            teams: snapshot.teams().to_vec(),
        }
    }

    /// Builds a chat frame holding at most `max_units` UTF-16 units.
    /// Truncation never splits a character.
    pub fn chat(sender: u16, text: &str, max_units: usize) -> Self {
        let mut units = Vec::new();
        let mut buf = [0u16; 2];
        for c in text.chars() {
            if units.len() + c.len_utf16() > max_units {
                break;
            }
            units.extend_from_slice(c.encode_utf16(&mut buf));
        }
        ServerFrame::Chat { sender, units }
    }

    pub fn to_words(&self) -> Vec<u16> {
        match self {
            ServerFrame::Welcome {
                team_id,
                pieces,
                teams,
            } => {
                let mut words = Vec::with_capacity(1 + pieces.len() + teams.len());
                words.push(*team_id);
                words.extend_from_slice(pieces);
                words.extend_from_slice(teams);
                words
            }
            ServerFrame::CellUpdate { x, y, piece, team } => vec![*x, *y, *piece, *team],
            ServerFrame::Move { sx, sy, nx, ny } => vec![*sx, *sy, *nx, *ny, MOVE_FILLER],
            ServerFrame::Chat { sender, units } => {
                let mut words = vec![CHAT_MARKER, *sender];
                words.extend_from_slice(units);
                words
            }
            ServerFrame::Departure { team_id } => vec![DEPARTURE_MARKER, DEPARTURE_TAG, *team_id],
            ServerFrame::Leaderboard(entries) => {
                let mut words = vec![LEADERBOARD_MARKER];
                for entry in entries {
                    let label: Vec<u16> = entry.label.encode_utf16().collect();
                    words.push(entry.team_id);
                    words.push(entry.kills.min(u16::MAX as u32) as u16);
                    words.push((label.len() * 2) as u16);
                    words.extend(label);
                }
                words
            }
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        encode_words(&self.to_words())
    }

    /// Best-effort decoding of a server frame, as a client does it.
    ///
    /// `cell_count` is the number of board squares, needed to recognize the
    /// welcome frame. Returns `None` for shapes no server frame has.
    pub fn decode(data: &[u8], cell_count: usize) -> Option<Self> {
        let words = decode_words(data)?;

        if words.len() == 1 + 2 * cell_count {
            return Some(ServerFrame::Welcome {
                team_id: words[0],
                pieces: words[1..1 + cell_count].to_vec(),
                teams: words[1 + cell_count..].to_vec(),
            });
        }

        match words.as_slice() {
            [CHAT_MARKER, sender, units @ ..] => Some(ServerFrame::Chat {
                sender: *sender,
                units: units.to_vec(),
            }),
            [LEADERBOARD_MARKER, rest @ ..] => {
                decode_leaderboard(rest).map(ServerFrame::Leaderboard)
            }
            [DEPARTURE_MARKER, DEPARTURE_TAG, team_id] => Some(ServerFrame::Departure {
                team_id: *team_id,
            }),
            [sx, sy, nx, ny, MOVE_FILLER] => Some(ServerFrame::Move {
                sx: *sx,
                sy: *sy,
                nx: *nx,
                ny: *ny,
            }),
            [x, y, piece, team] => Some(ServerFrame::CellUpdate {
                x: *x,
                y: *y,
                piece: *piece,
                team: *team,
            }),
            _ => None,
        }
    }
}

impl From<CellUpdate> for ServerFrame {
    fn from(update: CellUpdate) -> Self {
        ServerFrame::CellUpdate {
            x: update.x as u16,
            y: update.y as u16,
            piece: update.piece.as_u16(),
            team: update.team,
        }
    }
}

fn decode_leaderboard(mut words: &[u16]) -> Option<Vec<LeaderboardEntry>> {
    let mut entries = Vec::new();
    while !words.is_empty() {
        let [team_id, kills, byte_len, rest @ ..] = words else {
            return None;
        };
        let units = (*byte_len as usize) / 2;
        if rest.len() < units {
            return None;
        }
        entries.push(LeaderboardEntry {
            team_id: *team_id,
            kills: *kills as u32,
            label: String::from_utf16_lossy(&rest[..units]),
        });
        words = &rest[units..];
    }
    Some(entries)
}

pub fn encode_words(words: &[u16]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_le_bytes()).collect()
}

/// Splits bytes into little-endian words. Odd lengths are rejected.
pub fn decode_words(data: &[u8]) -> Option<Vec<u16>> {
    if data.len() % 2 != 0 {
        return None;
    }
    Some(
        data.chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;
    use crate::piece::Piece;

    #[test]
    fn test_decode_empty_is_disconnect_intent() {
        assert_eq!(ClientFrame::decode(&[]), ClientFrame::DisconnectIntent);
    }

    #[test]
    fn test_decode_chat() {
        let mut data = vec![247, 183];
        data.extend_from_slice("héllo".as_bytes());
        assert_eq!(ClientFrame::decode(&data), ClientFrame::Chat("héllo".to_string()));
    }

    #[test]
    fn test_chat_prefix_wins_over_move_shape() {
        let data = [247, 183, b'a', b'b', b'c', b'd', b'e', b'f'];
        assert_eq!(ClientFrame::decode(&data), ClientFrame::Chat("abcdef".to_string()));
    }

    #[test]
    fn test_decode_move_little_endian() {
        let data = [5, 0, 6, 0, 0x01, 0x01, 63, 0];
        assert_eq!(
            ClientFrame::decode(&data),
            ClientFrame::Move {
                sx: 5,
                sy: 6,
                nx: 257,
                ny: 63
            }
        );
    }

    #[test]
    fn test_decode_other_shapes_unknown() {
        assert_eq!(ClientFrame::decode(&[1]), ClientFrame::Unknown);
        assert_eq!(ClientFrame::decode(&[1, 2, 3, 4, 5, 6, 7]), ClientFrame::Unknown);
        assert_eq!(ClientFrame::decode(&[0; 9]), ClientFrame::Unknown);
    }

    #[test]
    fn test_client_move_encoding() {
        let frame = ClientFrame::Move {
            sx: 1,
            sy: 2,
            nx: 3,
            ny: 4,
        };
        assert_eq!(frame.encode(), vec![1, 0, 2, 0, 3, 0, 4, 0]);
    }

    #[test]
    fn test_verification_prefix() {
        assert!(is_verification(b"0.123abc"));
        assert!(is_verification(b"  0.5\n"));
        assert!(!is_verification(b"1.0"));
        assert!(!is_verification(b"0"));
        assert!(!is_verification(&[]));
    }

    #[test]
    fn test_cell_update_words() {
        let frame = ServerFrame::CellUpdate {
            x: 3,
            y: 4,
            piece: 6,
            team: 77,
        };
        assert_eq!(frame.encode(), vec![3, 0, 4, 0, 6, 0, 77, 0]);
    }

    #[test]
    fn test_move_has_filler() {
        let frame = ServerFrame::Move {
            sx: 1,
            sy: 2,
            nx: 3,
            ny: 4,
        };
        assert_eq!(frame.to_words(), vec![1, 2, 3, 4, 300]);
    }

    #[test]
    fn test_departure_words() {
        let frame = ServerFrame::Departure { team_id: 42 };
        assert_eq!(frame.to_words(), vec![64535, 12345, 42]);
    }

    #[test]
    fn test_chat_words_are_utf16_units() {
        let frame = ServerFrame::chat(9, "hi😀", 256);
        assert_eq!(frame.to_words(), vec![47095, 9, 104, 105, 0xD83D, 0xDE00]);
    }

    #[test]
    fn test_chat_truncated() {
        let frame = ServerFrame::chat(9, "abcdef", 3);
        assert_eq!(frame.to_words(), vec![47095, 9, 97, 98, 99]);
    }

    #[test]
    fn test_chat_truncation_keeps_surrogate_pairs() {
        let cut = ServerFrame::chat(9, "a\u{1F600}", 2).to_words();
        assert_eq!(cut, vec![47095, 9, 97]);

        let whole = ServerFrame::chat(9, "a\u{1F600}b", 3).to_words();
        assert_eq!(String::from_utf16(&whole[2..]).unwrap(), "a\u{1F600}");
    }

    #[test]
    fn test_leaderboard_words() {
        let frame = ServerFrame::Leaderboard(vec![
            LeaderboardEntry {
                team_id: 12,
                kills: 3,
                label: "12".to_string(),
            },
            LeaderboardEntry {
                team_id: 503,
                kills: 0,
                label: "503".to_string(),
            },
        ]);
        assert_eq!(
            frame.to_words(),
            vec![48027, 12, 3, 4, 49, 50, 503, 0, 6, 53, 48, 51]
        );
    }

    #[test]
    fn test_welcome_layout() {
        let mut board = Board::with_dimensions(2, 2);
        board.set_cell(8, Piece::King, 1, 0);
        let frame = ServerFrame::welcome(8, &board.snapshot());

        // x-major: (0,0) (0,1) (1,0) (1,1)
        assert_eq!(frame.to_words(), vec![8, 0, 0, 6, 0, 0, 0, 8, 0]);
    }

    #[test]
    fn test_decode_server_frames() {
        let frames = vec![
            ServerFrame::CellUpdate {
                x: 1,
                y: 2,
                piece: 3,
                team: 4,
            },
            ServerFrame::Move {
                sx: 1,
                sy: 2,
                nx: 3,
                ny: 4,
            },
            ServerFrame::chat(5, "gg", 256),
            ServerFrame::Departure { team_id: 5 },
            ServerFrame::Leaderboard(vec![LeaderboardEntry {
                team_id: 5,
                kills: 1,
                label: "5".to_string(),
            }]),
            ServerFrame::Leaderboard(Vec::new()),
        ];

        for frame in frames {
            assert_eq!(ServerFrame::decode(&frame.encode(), 16), Some(frame));
        }
    }

    #[test]
    fn test_decode_rejects_odd_length() {
        assert_eq!(ServerFrame::decode(&[1, 2, 3], 16), None);
    }
}
