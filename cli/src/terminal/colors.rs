use colored::Color;

pub const PRIMARY: Color = Color::BrightGreen;
pub const SECONDARY: Color = Color::Green;
pub const ACCENT: Color = Color::BrightYellow;
pub const SEPARATOR: Color = Color::BrightBlack;
pub const TEXT_DEFAULT: Color = Color::White;

pub const IPV4_ADDR: Color = Color::BrightBlue;
pub const IPV6_ADDR: Color = Color::Blue;
pub const MAC_ADDR: Color = Color::Yellow;

pub const ONLINE: Color = Color::BrightGreen;
pub const OFFLINE: Color = Color::Red;
pub const UNKNOWN: Color = Color::Magenta;
