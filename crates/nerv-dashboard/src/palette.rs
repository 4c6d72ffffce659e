//! The seven inks of the panel and the theme roles mapped onto them.

use embedded_graphics::pixelcolor::Rgb888;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InkColor {
    Black,
    White,
    Green,
    Blue,
    Red,
    Yellow,
    Orange,
}

impl InkColor {
    /// In panel index order.
    pub const ALL: [Self; 7] = [
        Self::Black,
        Self::White,
        Self::Green,
        Self::Blue,
        Self::Red,
        Self::Yellow,
        Self::Orange,
    ];

    pub const fn components(self) -> [u8; 3] {
        match self {
            Self::Black => [0, 0, 0],
            Self::White => [255, 255, 255],
            Self::Green => [0, 255, 0],
            Self::Blue => [0, 0, 255],
            Self::Red => [255, 0, 0],
            Self::Yellow => [255, 255, 0],
            Self::Orange => [255, 128, 0],
        }
    }

    pub const fn rgb(self) -> Rgb888 {
        let [r, g, b] = self.components();
        Rgb888::new(r, g, b)
    }

    /// Palette index understood by the panel controller.
    pub const fn index(self) -> u8 {
        match self {
            Self::Black => 0,
            Self::White => 1,
            Self::Green => 2,
            Self::Blue => 3,
            Self::Red => 4,
            Self::Yellow => 5,
            Self::Orange => 6,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Black => "black",
            Self::White => "white",
            Self::Green => "green",
            Self::Blue => "blue",
            Self::Red => "red",
            Self::Yellow => "yellow",
            Self::Orange => "orange",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(name))
    }

    /// Closest ink by squared RGB distance. Takes signed components so
    /// diffusion error can push a value outside 0..=255.
    pub fn nearest(r: i32, g: i32, b: i32) -> Self {
        Self::ALL
            .into_iter()
            .min_by_key(|c| {
                let [cr, cg, cb] = c.components();
                let (dr, dg, db) = (r - cr as i32, g - cg as i32, b - cb as i32);
                dr * dr + dg * dg + db * db
            })
            .unwrap_or(Self::Black)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Background,
    Primary,
    Secondary,
    Accent,
    Warning,
    Success,
}

impl Role {
    pub const ALL: [Self; 6] = [
        Self::Background,
        Self::Primary,
        Self::Secondary,
        Self::Accent,
        Self::Warning,
        Self::Success,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Background => "background",
            Self::Primary => "primary",
            Self::Secondary => "secondary",
            Self::Accent => "accent",
            Self::Warning => "warning",
            Self::Success => "success",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|r| r.name().eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub background: InkColor,
    pub primary: InkColor,
    pub secondary: InkColor,
    pub accent: InkColor,
    pub warning: InkColor,
    pub success: InkColor,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            background: InkColor::Black,
            primary: InkColor::Orange,
            secondary: InkColor::Green,
            accent: InkColor::Red,
            warning: InkColor::Yellow,
            success: InkColor::Green,
        }
    }
}

impl Theme {
    pub fn role(&self, role: Role) -> InkColor {
        match role {
            Role::Background => self.background,
            Role::Primary => self.primary,
            Role::Secondary => self.secondary,
            Role::Accent => self.accent,
            Role::Warning => self.warning,
            Role::Success => self.success,
        }
    }

    pub fn set(&mut self, role: Role, color: InkColor) {
        match role {
            Role::Background => self.background = color,
            Role::Primary => self.primary = color,
            Role::Secondary => self.secondary = color,
            Role::Accent => self.accent = color,
            Role::Warning => self.warning = color,
            Role::Success => self.success = color,
        }
    }

    /// Accepts a role (`primary`) or an ink name (`blue`); anything else is white.
    pub fn resolve(&self, name: &str) -> InkColor {
        Role::from_name(name)
            .map(|role| self.role(role))
            .or_else(|| InkColor::from_name(name))
            .unwrap_or(InkColor::White)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_follow_panel_order() {
        for (i, color) in InkColor::ALL.iter().enumerate() {
            assert_eq!(color.index() as usize, i);
        }
    }

    #[test]
    fn names_are_case_insensitive() {
        assert_eq!(InkColor::from_name("ORANGE"), Some(InkColor::Orange));
        assert_eq!(InkColor::from_name(" blue "), Some(InkColor::Blue));
        assert_eq!(InkColor::from_name("purple"), None);
    }

    #[test]
    fn nearest_snaps_to_palette() {
        assert_eq!(InkColor::nearest(250, 120, 10), InkColor::Orange);
        assert_eq!(InkColor::nearest(10, 10, 30), InkColor::Black);
        assert_eq!(InkColor::nearest(-40, 300, -5), InkColor::Green);
        for color in InkColor::ALL {
            let [r, g, b] = color.components();
            assert_eq!(InkColor::nearest(r as i32, g as i32, b as i32), color);
        }
    }

    #[test]
    fn theme_resolution() {
        let theme = Theme::default();
        assert_eq!(theme.resolve("primary"), InkColor::Orange);
        assert_eq!(theme.resolve("Accent"), InkColor::Red);
        assert_eq!(theme.resolve("blue"), InkColor::Blue);
        assert_eq!(theme.resolve("chartreuse"), InkColor::White);
    }
}
