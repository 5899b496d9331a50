use encoding_rs::{Encoding, UTF_8, UTF_16BE, UTF_16LE, WINDOWS_1252};

/// Encoding labels offered by the encoding menu. CHM archives predate
/// Unicode adoption, so the single-byte and East Asian legacy families
/// matter as much as UTF-8 here.
pub const AVAILABLE_LABELS: &[&str] = &[
	"UTF-8",
	"windows-1250",
	"windows-1251",
	"windows-1252",
	"windows-1256",
	"ISO-8859-2",
	"ISO-8859-7",
	"KOI8-R",
	"Shift_JIS",
	"EUC-JP",
	"GBK",
	"Big5",
	"EUC-KR",
	"UTF-16LE",
	"UTF-16BE",
];

/// A user-selectable text encoding for page content.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextEncoding(&'static Encoding);

impl TextEncoding {
	/// Looks an encoding up by any WHATWG label ("latin1", "windows-1252",
	/// "cp1251", ...). Returns `None` for labels no codec answers to.
	#[must_use]
	pub fn from_label(label: &str) -> Option<Self> {
		Encoding::for_label(label.trim().as_bytes()).map(Self)
	}

	#[must_use]
	pub fn label(self) -> &'static str {
		self.0.name()
	}

	/// Decodes raw page bytes. A byte-order mark always wins over the
	/// chosen codec; without one, the codec decodes with replacement.
	/// Input that is invalid under UTF-8 is retried as windows-1252,
	/// the usual reality of unlabeled legacy help content.
	#[must_use]
	pub fn decode(self, input: &[u8]) -> String {
		if let Some(decoded) = decode_with_bom(input) {
			return decoded;
		}
		let (decoded, _, had_errors) = self.0.decode(input);
		if had_errors && self.0 == UTF_8 {
			let (fallback, _, _) = WINDOWS_1252.decode(input);
			return fallback.into_owned();
		}
		decoded.into_owned()
	}
}

impl Default for TextEncoding {
	fn default() -> Self {
		Self(UTF_8)
	}
}

fn decode_with_bom(input: &[u8]) -> Option<String> {
	if input.len() >= 3 && input[0] == 0xEF && input[1] == 0xBB && input[2] == 0xBF {
		return Some(String::from_utf8_lossy(&input[3..]).to_string());
	}
	if input.len() >= 2 {
		if input[0] == 0xFF && input[1] == 0xFE {
			let (decoded, _, _) = UTF_16LE.decode(&input[2..]);
			return Some(decoded.to_string());
		}
		if input[0] == 0xFE && input[1] == 0xFF {
			let (decoded, _, _) = UTF_16BE.decode(&input[2..]);
			return Some(decoded.to_string());
		}
	}
	None
}
