//! Content-type inference for served assets.

use std::path::Path;

/// Content type used when neither the extension nor the bytes say otherwise.
pub const DEFAULT_CONTENT_TYPE: &str = "text/html";

/// Infers the content type of the asset at `path` with body `data`.
///
/// The extension wins; otherwise the leading bytes are sniffed; otherwise
/// [`DEFAULT_CONTENT_TYPE`].
pub fn content_type_for(path: &str, data: &[u8]) -> &'static str {
	mime_from_extension(Path::new(path))
		.or_else(|| mime_from_magic(data))
		.unwrap_or(DEFAULT_CONTENT_TYPE)
}

fn mime_from_extension(path: &Path) -> Option<&'static str> {
	let extension = path.extension()?.to_str()?.to_ascii_lowercase();
	let mime = match extension.as_str() {
		"html" | "htm" => "text/html",
		"css" => "text/css",
		"js" | "mjs" => "application/javascript",
		"json" => "application/json",
		"map" => "application/json",
		"png" => "image/png",
		"jpg" | "jpeg" => "image/jpeg",
		"gif" => "image/gif",
		"svg" => "image/svg+xml",
		"wasm" => "application/wasm",
		"ico" => "image/x-icon",
		"woff" => "font/woff",
		"woff2" => "font/woff2",
		"ttf" => "font/ttf",
		"otf" => "font/otf",
		"mp3" => "audio/mpeg",
		"ogg" => "audio/ogg",
		"wav" => "audio/wav",
		"mp4" => "video/mp4",
		"webm" => "video/webm",
		"webp" => "image/webp",
		"pdf" => "application/pdf",
		"txt" => "text/plain",
		"xml" => "application/xml",
		_ => return None,
	};
	Some(mime)
}

fn mime_from_magic(data: &[u8]) -> Option<&'static str> {
	const SIGNATURES: &[(&[u8], &str)] = &[
		(b"\x89PNG\r\n\x1a\n", "image/png"),
		(b"\xff\xd8\xff", "image/jpeg"),
		(b"GIF87a", "image/gif"),
		(b"GIF89a", "image/gif"),
		(b"%PDF-", "application/pdf"),
		(b"\0asm", "application/wasm"),
		(b"wOFF", "font/woff"),
		(b"wOF2", "font/woff2"),
		(b"OggS", "audio/ogg"),
		(b"ID3", "audio/mpeg"),
		(b"\x1a\x45\xdf\xa3", "video/webm"),
	];

	if let Some((_, mime)) = SIGNATURES.iter().find(|(magic, _)| data.starts_with(magic)) {
		return Some(*mime);
	}
	// RIFF containers carry their format at offset 8
	if data.len() >= 12 && data.starts_with(b"RIFF") {
		return match &data[8..12] {
			b"WEBP" => Some("image/webp"),
			b"WAVE" => Some("audio/wav"),
			_ => None,
		};
	}
	if data.len() >= 12 && &data[4..8] == b"ftyp" {
		return Some("video/mp4");
	}
	None
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn extension_decides_first() {
		assert_eq!(content_type_for("style.css", b""), "text/css");
		assert_eq!(content_type_for("app/main.JS", b""), "application/javascript");
		// a .txt file full of PNG bytes is still text
		assert_eq!(content_type_for("notes.txt", b"\x89PNG\r\n\x1a\n"), "text/plain");
	}

	#[test]
	fn magic_bytes_when_extension_unknown() {
		assert_eq!(content_type_for("logo", b"\x89PNG\r\n\x1a\n...."), "image/png");
		assert_eq!(content_type_for("blob.bin", b"GIF89a...."), "image/gif");
		assert_eq!(content_type_for("photo", b"RIFF\0\0\0\0WEBPVP8 "), "image/webp");
		assert_eq!(content_type_for("clip", b"\0\0\0\x18ftypmp42"), "video/mp4");
	}

	#[test]
	fn unknown_falls_back_to_html() {
		assert_eq!(content_type_for("README", b"plain words"), "text/html");
		assert_eq!(content_type_for("empty", b""), "text/html");
	}
}
