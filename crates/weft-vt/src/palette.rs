//! Conversion from alacritty's cell representation to [`Cell`].

use alacritty_terminal::term::cell::{Cell as AlacCell, Flags};
use alacritty_terminal::term::color::Colors;
use alacritty_terminal::vte::ansi::{Color, CursorShape as AlacCursorShape, NamedColor};

use crate::cell::{Cell, CellFlags, Rgb};
use crate::screen::CursorShape;

/// xterm default palette for the 16 named colors.
const ANSI: [Rgb; 16] = [
    Rgb::new(0, 0, 0),
    Rgb::new(205, 0, 0),
    Rgb::new(0, 205, 0),
    Rgb::new(205, 205, 0),
    Rgb::new(0, 0, 238),
    Rgb::new(205, 0, 205),
    Rgb::new(0, 205, 205),
    Rgb::new(229, 229, 229),
    Rgb::new(127, 127, 127),
    Rgb::new(255, 0, 0),
    Rgb::new(0, 255, 0),
    Rgb::new(255, 255, 0),
    Rgb::new(92, 92, 255),
    Rgb::new(255, 0, 255),
    Rgb::new(0, 255, 255),
    Rgb::new(255, 255, 255),
];

/// Dim variants, roughly two thirds of the normal intensity.
fn dim(named: NamedColor) -> Option<Rgb> {
    let rgb = match named {
        NamedColor::DimBlack => Rgb::new(0, 0, 0),
        NamedColor::DimRed => Rgb::new(154, 0, 0),
        NamedColor::DimGreen => Rgb::new(0, 154, 0),
        NamedColor::DimYellow => Rgb::new(154, 154, 0),
        NamedColor::DimBlue => Rgb::new(0, 0, 178),
        NamedColor::DimMagenta => Rgb::new(154, 0, 154),
        NamedColor::DimCyan => Rgb::new(0, 154, 154),
        NamedColor::DimWhite | NamedColor::DimForeground => Rgb::new(178, 178, 178),
        _ => return None,
    };
    Some(rgb)
}

/// Index into the 256-color table: 16 named, a 6x6x6 cube, then a gray ramp.
fn indexed(idx: usize) -> Rgb {
    if idx < 16 {
        return ANSI[idx];
    }
    if idx < 232 {
        let n = idx - 16;
        let level = |v: usize| if v == 0 { 0 } else { (55 + 40 * v) as u8 };
        return Rgb::new(level(n / 36), level((n / 6) % 6), level(n % 6));
    }
    let v = (8 + 10 * (idx.min(255) - 232)) as u8;
    Rgb::new(v, v, v)
}

pub(crate) fn resolve(color: &Color, colors: &Colors, is_fg: bool) -> Rgb {
    let fallback = if is_fg { Rgb::WHITE } else { Rgb::BLACK };
    match color {
        Color::Spec(rgb) => Rgb::new(rgb.r, rgb.g, rgb.b),
        Color::Indexed(idx) => match colors[*idx as usize] {
            Some(rgb) => Rgb::new(rgb.r, rgb.g, rgb.b),
            None => indexed(*idx as usize),
        },
        Color::Named(named) => {
            if let Some(rgb) = colors[*named] {
                return Rgb::new(rgb.r, rgb.g, rgb.b);
            }
            match named {
                NamedColor::Foreground | NamedColor::BrightForeground | NamedColor::Cursor => {
                    Rgb::WHITE
                }
                NamedColor::Background => Rgb::BLACK,
                other if (*other as usize) < 16 => ANSI[*other as usize],
                other => dim(*other).unwrap_or(fallback),
            }
        }
    }
}

const FLAG_MAP: [(Flags, CellFlags); 7] = [
    (Flags::BOLD, CellFlags::BOLD),
    (Flags::ITALIC, CellFlags::ITALIC),
    (Flags::UNDERLINE, CellFlags::UNDERLINE),
    (Flags::STRIKEOUT, CellFlags::STRIKETHROUGH),
    (Flags::INVERSE, CellFlags::INVERSE),
    (Flags::DIM, CellFlags::DIM),
    (Flags::HIDDEN, CellFlags::HIDDEN),
];

pub(crate) fn convert_cell(cell: &AlacCell, colors: &Colors) -> Cell {
    let flags = FLAG_MAP
        .iter()
        .filter(|(alac, _)| cell.flags.contains(*alac))
        .fold(CellFlags::empty(), |acc, (_, ours)| acc | *ours);

    let width = if cell.flags.contains(Flags::WIDE_CHAR) {
        2
    } else if cell.flags.contains(Flags::WIDE_CHAR_SPACER) {
        0
    } else {
        1
    };

    Cell {
        ch: cell.c,
        fg: resolve(&cell.fg, colors, true),
        bg: resolve(&cell.bg, colors, false),
        flags,
        width,
    }
}

pub(crate) fn convert_cursor_shape(shape: AlacCursorShape) -> CursorShape {
    match shape {
        AlacCursorShape::Block | AlacCursorShape::HollowBlock => CursorShape::Block,
        AlacCursorShape::Underline => CursorShape::Underline,
        AlacCursorShape::Beam => CursorShape::Bar,
        AlacCursorShape::Hidden => CursorShape::Hidden,
    }
}
