/* Butterfly LCD: 14-segment glyphs for the six character positions */

// first character in SEGMENT_TABLE
const FIRST: char = '*';

// segment bit pattern per character, starting at '*'; 0 = no glyph
const SEGMENT_TABLE: [u16; 54] = [
	0xeaa8, // '*'
	0x2a80, // '+'
	0x4000, // ','
	0x0a00, // '-'
	0x0a51, // '.' shown as degree sign
	0x4008, // '/'
	0x5559, // '0'
	0x0118, // '1'
	0x1e11, // '2'
	0x1b11, // '3'
	0x0b50, // '4'
	0x1b41, // '5'
	0x1f41, // '6'
	0x0111, // '7'
	0x1f51, // '8'
	0x1b51, // '9'
	0x0000, // ':'
	0x0000, // ';'
	0x8008, // '<'
	0x1a00, // '='
	0x4020, // '>'
	0x0000, // '?'
	0x0000, // '@'
	0x0f51, // 'A'
	0x3991, // 'B'
	0x1441, // 'C'
	0x3191, // 'D'
	0x1e41, // 'E'
	0x0e41, // 'F'
	0x1d41, // 'G'
	0x0f50, // 'H'
	0x2080, // 'I'
	0x1510, // 'J'
	0x8648, // 'K'
	0x1440, // 'L'
	0x0578, // 'M'
	0x8570, // 'N'
	0x1551, // 'O'
	0x0e51, // 'P'
	0x9551, // 'Q'
	0x8e51, // 'R'
	0x9021, // 'S'
	0x2081, // 'T'
	0x1550, // 'U'
	0x4448, // 'V'
	0xc550, // 'W'
	0xc028, // 'X'
	0x2028, // 'Y'
	0x5009, // 'Z'
	0x1441, // '['
	0x8020, // '\'
	0x1111, // ']'
	0x0000, // '^'
	0x1000, // '_'
];

/// Segment pattern for `c`; lowercase letters use the uppercase glyph.
/// `None` if the display can't show the character.
pub fn segments(c: char) -> Option<u16> {
	let c = c.to_ascii_uppercase();
	if c < FIRST {
		return None;
	}
	let index = c as usize - FIRST as usize;
	match SEGMENT_TABLE.get(index) {
		Some(&0) | None => None,
		Some(&pattern) => Some(pattern),
	}
}

/// Patterns for a whole string; characters without glyph show blank.
pub fn encode(text: &str) -> Vec<u16> {
	text.chars().map(|c| segments(c).unwrap_or(0)).collect()
}
