//! Title rendering for the ordinal-day family of templates.

pub const DEFAULT_TITLE_STYLE: &str = "font-family:Calibri;font-size:18.0pt";
pub const ORDINAL_FONT_FAMILY: &str = "Lucida Handwriting";
pub const ORDINAL_FONT_SIZE_PT: f32 = 20.0;
pub const ORDINAL_TITLE_STYLE: &str = "font-family:'Lucida Handwriting';font-size:20.0pt";

const ORDINAL_SUFFIXES: [&str; 4] = ["st", "nd", "rd", "th"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TitleParts<'a> {
    pub base: &'a str,
    pub superscript: Option<&'a str>,
}

/// Splits "March 15th" into `{"March 15", "th"}`.
///
/// A title splits only when it starts with a non-digit and ends with an
/// ordinal suffix directly after a digit; anything else stays whole, so
/// numeric dates ("2024-03-15") and bare days ("15") are never split.
pub fn split_title(title: &str) -> TitleParts<'_> {
    let whole = TitleParts {
        base: title,
        superscript: None,
    };

    let Some(first) = title.chars().next() else {
        return whole;
    };
    if first.is_ascii_digit() {
        return whole;
    }

    let Some(split_at) = title.len().checked_sub(2) else {
        return whole;
    };
    if !title.is_char_boundary(split_at) {
        return whole;
    }

    let (base, suffix) = title.split_at(split_at);
    let ends_with_digit = base.chars().last().is_some_and(|c| c.is_ascii_digit());
    if !ORDINAL_SUFFIXES.contains(&suffix) || !ends_with_digit {
        return whole;
    }

    TitleParts {
        base,
        superscript: Some(suffix),
    }
}

/// Title markup and font style for the ordinal templates. Titles that do not
/// split keep the default style.
pub fn stylize_title(title: &str) -> (String, &'static str) {
    let parts = split_title(title);
    match parts.superscript {
        Some(suffix) => {
            tracing::trace!(title = parts.base, superscript = suffix, "stylized ordinal title");
            (
                format!(
                    "{}<span style='vertical-align:super'>{}</span>",
                    parts.base, suffix
                ),
                ORDINAL_TITLE_STYLE,
            )
        }
        None => (title.to_string(), DEFAULT_TITLE_STYLE),
    }
}
