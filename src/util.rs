//! Diagnostic formatting of raw bytes.

use itertools::Itertools;

/// Hex and ASCII rendering of a byte sequence.
///
/// Bytes are printed as lowercase hex in groups of two, each group followed
/// by a space. An odd trailing byte is padded so that the ASCII column keeps
/// its separation. Non-printable bytes show as `.` in the ASCII column.
///
/// ```
/// use portalsim::util::HexDump;
/// assert_eq!(HexDump(b"AUU").to_string(), "4155 55   AUU");
/// ```
pub struct HexDump<'b>(pub &'b [u8]);

impl std::fmt::Display for HexDump<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let hex = self.0
            .chunks(2)
            .map(|group| {
                let digits = group.iter().map(|b| format!("{b:02x}")).join("");
                match group.len() {
                    2 => format!("{digits} "),
                    _ => format!("{digits}  "),
                }
            })
            .join("");
        let text: String = self.0
            .iter()
            .map(|&b| match b {
                0x20..=0x7E => b as char,
                _ => '.',
            })
            .collect();
        write!(f, "{hex} {text}")
    }
}

pub fn fmt_hex(bytes: &[u8]) -> String {
    HexDump(bytes).to_string()
}

/// Space separated hex bytes, without the ASCII column.
pub fn fmt_bytes(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).join(" ")
}
