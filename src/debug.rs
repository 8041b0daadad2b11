use std::fs::OpenOptions;
use std::io::Write;
use std::sync::Mutex;

use once_cell::sync::OnceCell;

pub const DEBUG_ENV: &str = "FEEDCARD_DEBUG";
pub const DEBUG_LOG_ENV: &str = "FEEDCARD_DEBUG_LOG";

pub fn debug_enabled() -> bool {
    static FLAG: OnceCell<bool> = OnceCell::new();
    *FLAG.get_or_init(|| {
        std::env::var(DEBUG_ENV)
            .map(|val| is_truthy(&val))
            .unwrap_or(false)
    })
}

fn is_truthy(value: &str) -> bool {
    let trimmed = value.trim();
    !(trimmed.is_empty()
        || trimmed.eq_ignore_ascii_case("0")
        || trimmed.eq_ignore_ascii_case("false")
        || trimmed.eq_ignore_ascii_case("no")
        || trimmed.eq_ignore_ascii_case("off"))
}

fn debug_writer() -> Option<&'static Mutex<std::fs::File>> {
    static WRITER: OnceCell<Option<Mutex<std::fs::File>>> = OnceCell::new();
    WRITER
        .get_or_init(|| {
            std::env::var(DEBUG_LOG_ENV).ok().and_then(|path| {
                OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map(Mutex::new)
                    .ok()
            })
        })
        .as_ref()
}

/// Writes one line when `FEEDCARD_DEBUG` is set. The terminal demo owns
/// stderr while running, so point `FEEDCARD_DEBUG_LOG` at a file there.
pub fn debug_log(message: impl AsRef<str>) {
    if !debug_enabled() {
        return;
    }
    if let Some(writer) = debug_writer() {
        if let Ok(mut file) = writer.lock() {
            let _ = writeln!(file, "{}", message.as_ref());
            return;
        }
    }
    eprintln!("{}", message.as_ref());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthy_values() {
        for value in ["1", "true", "yes", "on", "anything"] {
            assert!(is_truthy(value), "{value}");
        }
        for value in ["", " ", "0", "false", "FALSE", "no", "off"] {
            assert!(!is_truthy(value), "{value}");
        }
    }
}
