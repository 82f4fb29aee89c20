use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown {kind} style '{value}'. Available: {available}")]
pub struct UnknownStyle {
    pub kind: &'static str,
    pub value: String,
    pub available: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SuitStyle {
    #[default]
    ModernBlack,
    NavyBlue,
    FormalGray,
    CasualWhite,
}

impl SuitStyle {
    pub const ALL: [SuitStyle; 4] = [
        SuitStyle::ModernBlack,
        SuitStyle::NavyBlue,
        SuitStyle::FormalGray,
        SuitStyle::CasualWhite,
    ];

    pub fn key(self) -> &'static str {
        match self {
            SuitStyle::ModernBlack => "modern-black",
            SuitStyle::NavyBlue => "navy-blue",
            SuitStyle::FormalGray => "formal-gray",
            SuitStyle::CasualWhite => "casual-white",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SuitStyle::ModernBlack => "Modern black",
            SuitStyle::NavyBlue => "Navy blue",
            SuitStyle::FormalGray => "Charcoal gray",
            SuitStyle::CasualWhite => "Casual white",
        }
    }

    /// Phrase interpolated into the headshot prompt.
    pub fn description(self) -> &'static str {
        match self {
            SuitStyle::ModernBlack => "a modern black formal suit with a crisp white shirt",
            SuitStyle::NavyBlue => {
                "a professional navy blue tailored suit with a light blue shirt"
            }
            SuitStyle::FormalGray => "a sophisticated charcoal gray suit with a white shirt",
            SuitStyle::CasualWhite => "a neat white professional blazer or shirt for a clean look",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BackgroundStyle {
    #[default]
    LightGray,
    SoftBlue,
    ClassicWhite,
    OfficeBlur,
}

impl BackgroundStyle {
    pub const ALL: [BackgroundStyle; 4] = [
        BackgroundStyle::LightGray,
        BackgroundStyle::SoftBlue,
        BackgroundStyle::ClassicWhite,
        BackgroundStyle::OfficeBlur,
    ];

    pub fn key(self) -> &'static str {
        match self {
            BackgroundStyle::LightGray => "light-gray",
            BackgroundStyle::SoftBlue => "soft-blue",
            BackgroundStyle::ClassicWhite => "classic-white",
            BackgroundStyle::OfficeBlur => "office-blur",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            BackgroundStyle::LightGray => "Light gray",
            BackgroundStyle::SoftBlue => "Soft blue",
            BackgroundStyle::ClassicWhite => "Classic white",
            BackgroundStyle::OfficeBlur => "Office blur",
        }
    }

    /// Phrase interpolated into the headshot prompt.
    pub fn description(self) -> &'static str {
        match self {
            BackgroundStyle::LightGray => {
                "a clean, minimal light gray professional studio background"
            }
            BackgroundStyle::SoftBlue => {
                "a soft corporate blue studio background with gentle lighting"
            }
            BackgroundStyle::ClassicWhite => "a bright and clean classic white studio background",
            BackgroundStyle::OfficeBlur => {
                "a modern office interior background with professional depth-of-field blur"
            }
        }
    }
}

fn available_keys<'a>(keys: impl Iterator<Item = &'a str>) -> String {
    keys.collect::<Vec<_>>().join(", ")
}

impl FromStr for SuitStyle {
    type Err = UnknownStyle;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        SuitStyle::ALL
            .into_iter()
            .find(|style| style.key() == normalized)
            .ok_or_else(|| UnknownStyle {
                kind: "suit",
                value: value.trim().to_string(),
                available: available_keys(SuitStyle::ALL.iter().map(|style| style.key())),
            })
    }
}

impl FromStr for BackgroundStyle {
    type Err = UnknownStyle;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        BackgroundStyle::ALL
            .into_iter()
            .find(|style| style.key() == normalized)
            .ok_or_else(|| UnknownStyle {
                kind: "background",
                value: value.trim().to_string(),
                available: available_keys(BackgroundStyle::ALL.iter().map(|style| style.key())),
            })
    }
}

impl fmt::Display for SuitStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl fmt::Display for BackgroundStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn defaults_match_initial_selection() {
        assert_eq!(SuitStyle::default(), SuitStyle::ModernBlack);
        assert_eq!(BackgroundStyle::default(), BackgroundStyle::LightGray);
    }

    #[test]
    fn parses_every_key_back_to_its_variant() {
        for style in SuitStyle::ALL {
            assert_eq!(style.key().parse::<SuitStyle>(), Ok(style));
        }
        for style in BackgroundStyle::ALL {
            assert_eq!(style.key().parse::<BackgroundStyle>(), Ok(style));
        }
    }

    #[test]
    fn parsing_ignores_case_and_surrounding_whitespace() {
        assert_eq!(" Navy-Blue ".parse::<SuitStyle>(), Ok(SuitStyle::NavyBlue));
        assert_eq!(
            "OFFICE-BLUR".parse::<BackgroundStyle>(),
            Ok(BackgroundStyle::OfficeBlur)
        );
    }

    #[test]
    fn unknown_key_lists_available_options() {
        let err = "tuxedo".parse::<SuitStyle>().unwrap_err();
        assert_eq!(err.value, "tuxedo");
        assert_eq!(
            err.to_string(),
            "Unknown suit style 'tuxedo'. Available: modern-black, navy-blue, formal-gray, casual-white"
        );
    }

    #[test]
    fn descriptions_are_distinct() {
        let suits: HashSet<_> = SuitStyle::ALL.iter().map(|s| s.description()).collect();
        assert_eq!(suits.len(), SuitStyle::ALL.len());
        let backgrounds: HashSet<_> = BackgroundStyle::ALL
            .iter()
            .map(|s| s.description())
            .collect();
        assert_eq!(backgrounds.len(), BackgroundStyle::ALL.len());
    }
}
