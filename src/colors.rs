use crate::inits::read_tokens;

/// The sixteen console colors, in the order the game lists them.
pub const COLOR_NAMES: [&str; 16] = [
    "BLACK", "BLUE", "GREEN", "CYAN", "RED", "MAGENTA", "BROWN", "LGRAY", "DGRAY", "LBLUE",
    "LGREEN", "LCYAN", "LRED", "LMAGENTA", "YELLOW", "WHITE",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ColorScheme {
    pub colors: [Rgb; 16],
}

impl ColorScheme {
    /// Reads `[NAME_R:n]`, `[NAME_G:n]` and `[NAME_B:n]` for every color.
    /// Missing or out of range components read as 0.
    pub fn parse(text: &str) -> Self {
        let tokens = read_tokens(text);
        let component = |name: &str, channel: char| {
            tokens
                .get(&format!("{name}_{channel}"))
                .and_then(|raw| raw.trim().parse::<u8>().ok())
                .unwrap_or(0)
        };
        let mut scheme = ColorScheme::default();
        for (slot, name) in scheme.colors.iter_mut().zip(COLOR_NAMES) {
            *slot = Rgb {
                r: component(name, 'R'),
                g: component(name, 'G'),
                b: component(name, 'B'),
            };
        }
        scheme
    }
}
