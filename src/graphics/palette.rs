use serde::{Deserialize, Serialize};

use super::surface::Color;

/// Named palettes selectable from config or at runtime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ColorScheme {
    #[default]
    Aurora,
    Sunset,
    Ocean,
    Neon,
    Mono,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Palette {
    pub name: &'static str,
    pub base: Color,
    pub background: Color,
}

const PALETTES: [Palette; 5] = [
    Palette {
        name: "Aurora",
        base: Color::rgb(0.27, 0.93, 0.71),
        background: Color::rgb(0.02, 0.03, 0.06),
    },
    Palette {
        name: "Sunset",
        base: Color::rgb(1.0, 0.45, 0.25),
        background: Color::rgb(0.07, 0.02, 0.04),
    },
    Palette {
        name: "Ocean",
        base: Color::rgb(0.2, 0.55, 1.0),
        background: Color::rgb(0.01, 0.03, 0.08),
    },
    Palette {
        name: "Neon",
        base: Color::rgb(0.95, 0.2, 0.95),
        background: Color::rgb(0.03, 0.0, 0.05),
    },
    Palette {
        name: "Mono",
        base: Color::rgb(0.9, 0.9, 0.9),
        background: Color::rgb(0.0, 0.0, 0.0),
    },
];

impl ColorScheme {
    pub const ALL: [ColorScheme; 5] = [
        ColorScheme::Aurora,
        ColorScheme::Sunset,
        ColorScheme::Ocean,
        ColorScheme::Neon,
        ColorScheme::Mono,
    ];

    pub fn palette(self) -> Palette {
        PALETTES[self as usize]
    }

    pub fn next(self) -> Self {
        Self::ALL[(self as usize + 1) % Self::ALL.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palettes_line_up_with_schemes() {
        assert_eq!(ColorScheme::Aurora.palette().name, "Aurora");
        assert_eq!(ColorScheme::Mono.palette().name, "Mono");
    }

    #[test]
    fn cycling_wraps_around() {
        let mut scheme = ColorScheme::default();
        for _ in 0..ColorScheme::ALL.len() {
            scheme = scheme.next();
        }
        assert_eq!(scheme, ColorScheme::Aurora);
    }

    #[test]
    fn schemes_parse_from_kebab_case() {
        let scheme: ColorScheme = serde_json::from_str("\"ocean\"").unwrap();
        assert_eq!(scheme, ColorScheme::Ocean);
    }
}
