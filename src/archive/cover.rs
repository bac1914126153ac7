use std::io::Cursor;

use chrono::{DateTime, Local};
use image::{ImageFormat, Rgb, RgbImage};

use crate::{
    error::{Error, Result},
    types::PlaylistMetadata,
    utils,
};

pub const COVER_SIZE: u32 = 512;

const GREEN: [f32; 3] = [29.0, 185.0, 84.0];
const DARK: [f32; 3] = [25.0, 20.0, 20.0];
const TEXT: Rgb<u8> = Rgb([245, 245, 245]);

const GLYPH_WIDTH: u32 = 5;
const GLYPH_HEIGHT: u32 = 7;
const MARGIN: u32 = 16;

const TITLE_SCALE: u32 = 6;
const NAME_SCALE: u32 = 4;
const DATE_SCALE: u32 = 3;

pub const TITLE_TOP: u32 = 24;
pub const NAME_TOP: u32 = 436;
pub const DATE_TOP: u32 = 478;

/// Renders the playlist cover, encoded as PNG: a diagonal green-to-dark
/// gradient with a record-like disc in the middle, the app name above it and
/// the playlist name and download time below.
pub fn render(playlist: &PlaylistMetadata, generated_at: DateTime<Local>) -> Result<Vec<u8>> {
    let center = COVER_SIZE as f32 / 2.0;
    let outer = COVER_SIZE as f32 * 0.32;
    let label = COVER_SIZE as f32 * 0.11;
    let hole = COVER_SIZE as f32 * 0.015;

    let mut img = RgbImage::from_fn(COVER_SIZE, COVER_SIZE, |x, y| {
        let t = (x + y) as f32 / (2 * (COVER_SIZE - 1)) as f32;
        let base = blend(GREEN, DARK, t);

        let dist = ((x as f32 - center).powi(2) + (y as f32 - center).powi(2)).sqrt();
        let px = if dist <= hole {
            DARK
        } else if dist <= label {
            GREEN
        } else if dist <= outer {
            // faint grooves
            let groove = if (dist as u32 / 6) % 2 == 0 { 0.0 } else { 8.0 };
            [DARK[0] + groove, DARK[1] + groove, DARK[2] + groove]
        } else {
            base
        };

        Rgb([px[0] as u8, px[1] as u8, px[2] as u8])
    });

    draw_text(
        &mut img,
        &env!("CARGO_PKG_NAME").to_uppercase(),
        TITLE_TOP,
        TITLE_SCALE,
    );
    draw_text(&mut img, &cover_name(&playlist.name), NAME_TOP, NAME_SCALE);
    draw_text(
        &mut img,
        &generated_at.format("%Y-%m-%d %H:%M").to_string(),
        DATE_TOP,
        DATE_SCALE,
    );

    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(|e| Error::Archive(format!("cannot encode cover image: {}", e)))?;
    Ok(buf)
}

/// Playlist name as it fits on one cover line: folded to the font's
/// characters and cut to the line width.
fn cover_name(name: &str) -> String {
    let max_chars = ((COVER_SIZE - 2 * MARGIN) / ((GLYPH_WIDTH + 1) * NAME_SCALE)) as usize;
    let folded = utils::normalize_text(name).to_uppercase();
    let folded = if folded.is_empty() {
        "PLAYLIST".to_string()
    } else {
        folded
    };
    folded.chars().take(max_chars).collect::<String>().trim_end().to_string()
}

/// Draws `text` horizontally centred with its top edge at `top`.
/// Characters without a glyph are left blank.
fn draw_text(img: &mut RgbImage, text: &str, top: u32, scale: u32) {
    let advance = (GLYPH_WIDTH + 1) * scale;
    let chars: Vec<char> = text.chars().collect();
    let width = (chars.len() as u32 * advance).saturating_sub(scale);
    let left = img.width().saturating_sub(width) / 2;

    for (i, c) in chars.iter().enumerate() {
        let Some(rows) = glyph(*c) else {
            continue;
        };
        let x0 = left + i as u32 * advance;
        for (row, bits) in rows.iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if bits & (1 << (GLYPH_WIDTH - 1 - col)) == 0 {
                    continue;
                }
                for dy in 0..scale {
                    for dx in 0..scale {
                        let x = x0 + col * scale + dx;
                        let y = top + row as u32 * scale + dy;
                        if x < img.width() && y < img.height() {
                            img.put_pixel(x, y, TEXT);
                        }
                    }
                }
            }
        }
    }
}

/// 5x7 bitmap rows, most significant of the low five bits on the left.
fn glyph(c: char) -> Option<[u8; GLYPH_HEIGHT as usize]> {
    let rows = match c {
        'A' => [0x0E, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'B' => [0x1E, 0x11, 0x11, 0x1E, 0x11, 0x11, 0x1E],
        'C' => [0x0E, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0E],
        'D' => [0x1E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x1E],
        'E' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x1F],
        'F' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x10],
        'G' => [0x0E, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0F],
        'H' => [0x11, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'I' => [0x0E, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E],
        'J' => [0x07, 0x02, 0x02, 0x02, 0x02, 0x12, 0x0C],
        'K' => [0x11, 0x12, 0x14, 0x18, 0x14, 0x12, 0x11],
        'L' => [0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1F],
        'M' => [0x11, 0x1B, 0x15, 0x15, 0x11, 0x11, 0x11],
        'N' => [0x11, 0x11, 0x19, 0x15, 0x13, 0x11, 0x11],
        'O' => [0x0E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'P' => [0x1E, 0x11, 0x11, 0x1E, 0x10, 0x10, 0x10],
        'Q' => [0x0E, 0x11, 0x11, 0x11, 0x15, 0x12, 0x0D],
        'R' => [0x1E, 0x11, 0x11, 0x1E, 0x14, 0x12, 0x11],
        'S' => [0x0F, 0x10, 0x10, 0x0E, 0x01, 0x01, 0x1E],
        'T' => [0x1F, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04],
        'U' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'V' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x0A, 0x04],
        'W' => [0x11, 0x11, 0x11, 0x15, 0x15, 0x15, 0x0A],
        'X' => [0x11, 0x11, 0x0A, 0x04, 0x0A, 0x11, 0x11],
        'Y' => [0x11, 0x11, 0x11, 0x0A, 0x04, 0x04, 0x04],
        'Z' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x10, 0x1F],
        '0' => [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
        '1' => [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
        '2' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
        '3' => [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
        '4' => [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
        '5' => [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
        '6' => [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
        '7' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
        '9' => [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
        '-' => [0x00, 0x00, 0x00, 0x1F, 0x00, 0x00, 0x00],
        ':' => [0x00, 0x0C, 0x0C, 0x00, 0x0C, 0x0C, 0x00],
        '.' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x0C, 0x0C],
        _ => return None,
    };
    Some(rows)
}

fn blend(a: [f32; 3], b: [f32; 3], t: f32) -> [f32; 3] {
    [
        a[0] + (b[0] - a[0]) * t,
        a[1] + (b[1] - a[1]) * t,
        a[2] + (b[2] - a[2]) * t,
    ]
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn playlist(name: &str) -> PlaylistMetadata {
        PlaylistMetadata {
            id: "pl".into(),
            name: name.into(),
            description: None,
            tracks: Vec::new(),
            unavailable: 0,
        }
    }

    fn decode(png: &[u8]) -> RgbImage {
        image::load_from_memory_with_format(png, ImageFormat::Png)
            .unwrap()
            .to_rgb8()
    }

    fn has_text(img: &RgbImage, top: u32, scale: u32) -> bool {
        (top..top + GLYPH_HEIGHT * scale)
            .any(|y| (0..img.width()).any(|x| *img.get_pixel(x, y) == TEXT))
    }

    #[test]
    fn renders_square_png() {
        let at = Local.with_ymd_and_hms(2026, 10, 18, 14, 5, 0).unwrap();
        let png = render(&playlist("Road Trip"), at).unwrap();
        assert!(png.starts_with(b"\x89PNG"));

        let decoded = decode(&png);
        assert_eq!(decoded.width(), COVER_SIZE);
        assert_eq!(decoded.height(), COVER_SIZE);
    }

    #[test]
    fn brands_cover_with_name_and_date() {
        let at = Local.with_ymd_and_hms(2026, 10, 18, 14, 5, 0).unwrap();
        let img = decode(&render(&playlist("Road Trip"), at).unwrap());

        assert!(has_text(&img, TITLE_TOP, TITLE_SCALE));
        assert!(has_text(&img, NAME_TOP, NAME_SCALE));
        assert!(has_text(&img, DATE_TOP, DATE_SCALE));
        // nothing drawn between the title and the disc
        assert!(!has_text(&img, TITLE_TOP + GLYPH_HEIGHT * TITLE_SCALE, 1));
    }

    #[test]
    fn cover_differs_per_playlist_and_date() {
        let at = Local.with_ymd_and_hms(2026, 10, 18, 14, 5, 0).unwrap();
        let later = Local.with_ymd_and_hms(2026, 10, 19, 9, 30, 0).unwrap();

        let road_trip = render(&playlist("Road Trip"), at).unwrap();
        assert_ne!(road_trip, render(&playlist("Night Drive"), at).unwrap());
        assert_ne!(road_trip, render(&playlist("Road Trip"), later).unwrap());
    }

    #[test]
    fn cover_name_is_folded_and_cut_to_one_line() {
        assert_eq!(cover_name("Beyoncé – Halo (Live!)"), "BEYONCE HALO LIVE");
        assert_eq!(cover_name("!!!"), "PLAYLIST");
        let long = cover_name("a very long playlist name that cannot fit");
        assert_eq!(long, "A VERY LONG PLAYLIST");
    }
}
