use std::io::{IsTerminal, Write};

use clap::ValueEnum;

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Pretty
        } else {
            Self::Raw
        }
    }
}

pub fn print_payload(data: &[u8], format: OutputFormat) {
    match format {
        OutputFormat::Pretty => {
            println!("size={} payload={}", data.len(), payload_preview(data));
        }
        OutputFormat::Raw => print_raw(data),
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn payload_preview(data: &[u8]) -> String {
    const PREVIEW_LIMIT: usize = 256;
    match std::str::from_utf8(data) {
        Ok(text) if text.len() <= PREVIEW_LIMIT => text.to_string(),
        Ok(text) => {
            let mut cut = PREVIEW_LIMIT;
            while !text.is_char_boundary(cut) {
                cut -= 1;
            }
            format!("{}... ({} bytes)", &text[..cut], data.len())
        }
        Err(_) => format!("<{} bytes of binary data>", data.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_passes_short_text_through() {
        assert_eq!(payload_preview(b"hello"), "hello");
    }

    #[test]
    fn preview_summarizes_binary() {
        let preview = payload_preview(&[0xff, 0xfe, 0x00]);
        assert!(preview.contains("3 bytes"));
    }
}
