use regex::Regex;
use std::sync::OnceLock;

/// a macro to declare simple Vec<String>
#[macro_export]
macro_rules! string_vec {
    ($($x:expr),*) => {
        vec![$($x.into()),*]
    };
}

/// info! that drops ANSI styling when colors are disabled
#[macro_export]
macro_rules! cinfo {
    ($colorful:expr, $($arg:tt)+) => {
        log::info!("{}", $crate::utils::strip_ansi_if_needed(&format!($($arg)+), $colorful))
    };
}

fn ansi_regex() -> &'static Regex {
    static ANSI: OnceLock<Regex> = OnceLock::new();
    ANSI.get_or_init(|| Regex::new(r"\x1b\[[0-9;]*m").unwrap())
}

pub fn strip_ansi_if_needed(text: &str, colorful: bool) -> String {
    if colorful {
        text.to_string()
    } else {
        ansi_regex().replace_all(text, "").into_owned()
    }
}

/// Width-limited cell for terminal tables
pub fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() > width {
        format!("{}...", text.chars().take(width.saturating_sub(3)).collect::<String>())
    } else {
        text.to_string()
    }
}
