//! ANSI foreground colors and text styles for colored canvases.
use derive_more::Display;
use std::fmt;
use std::str::FromStr;

/// A color a cell can be painted with, either one of the 8-color named
/// palette or a 24-bit value parsed from a `#rrggbb` hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnsiColor {
    Named(NamedColor),
    Rgb(RgbColor),
}

impl AnsiColor {
    /// The SGR foreground sequence selecting this color.
    pub fn sgr(&self) -> String {
        match self {
            AnsiColor::Named(named) => format!("\x1b[{}m", named.foreground_code()),
            AnsiColor::Rgb(rgb) => {
                format!("\x1b[38;2;{};{};{}m", rgb.red, rgb.green, rgb.blue)
            }
        }
    }
}

impl fmt::Display for AnsiColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnsiColor::Named(named) => write!(f, "{}", named),
            AnsiColor::Rgb(rgb) => write!(f, "{}", rgb),
        }
    }
}

impl FromStr for AnsiColor {
    type Err = ();

    /// Accepts the named palette and `#rrggbb`. Unknown names are an error;
    /// the caller treats that as "no color hint".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(hex) = s.strip_prefix('#') {
            if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(());
            }

            let red = u8::from_str_radix(&hex[0..2], 16).map_err(|_| ())?;
            let green = u8::from_str_radix(&hex[2..4], 16).map_err(|_| ())?;
            let blue = u8::from_str_radix(&hex[4..6], 16).map_err(|_| ())?;

            return Ok(AnsiColor::Rgb(RgbColor::new(red, green, blue)));
        }

        let named = match s {
            "red" => NamedColor::Red,
            "green" => NamedColor::Green,
            "yellow" => NamedColor::Yellow,
            "blue" => NamedColor::Blue,
            "magenta" => NamedColor::Magenta,
            "cyan" => NamedColor::Cyan,
            "white" => NamedColor::White,
            _ => return Err(()),
        };

        Ok(AnsiColor::Named(named))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display)]
#[display(fmt = "#{:02X}{:02X}{:02X}", red, green, blue)]
pub struct RgbColor {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl RgbColor {
    pub fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum NamedColor {
    #[display(fmt = "red")]
    Red,
    #[display(fmt = "green")]
    Green,
    #[display(fmt = "yellow")]
    Yellow,
    #[display(fmt = "blue")]
    Blue,
    #[display(fmt = "magenta")]
    Magenta,
    #[display(fmt = "cyan")]
    Cyan,
    #[display(fmt = "white")]
    White,
}

impl NamedColor {
    fn foreground_code(&self) -> u8 {
        match self {
            NamedColor::Red => 31,
            NamedColor::Green => 32,
            NamedColor::Yellow => 33,
            NamedColor::Blue => 34,
            NamedColor::Magenta => 35,
            NamedColor::Cyan => 36,
            NamedColor::White => 37,
        }
    }
}

/// Per-cell text attributes. Both attributes may be set at once; the SGR
/// sequence then carries both parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TextStyle {
    pub bold: bool,
    pub italic: bool,
}

impl TextStyle {
    pub fn new(bold: bool, italic: bool) -> Self {
        Self { bold, italic }
    }

    pub fn is_plain(&self) -> bool {
        !self.bold && !self.italic
    }

    /// The SGR sequence enabling these attributes, empty when plain.
    pub fn sgr(&self) -> String {
        match (self.bold, self.italic) {
            (false, false) => String::new(),
            (true, false) => "\x1b[1m".to_string(),
            (false, true) => "\x1b[3m".to_string(),
            (true, true) => "\x1b[1;3m".to_string(),
        }
    }
}

/// The SGR sequence resetting color and style.
pub const SGR_RESET: &str = "\x1b[0m";
