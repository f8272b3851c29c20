use cube_core::{Color, Cube, Facelet};
use itertools::Itertools;
use owo_colors::OwoColorize;

fn sticker(facelet: Facelet) -> String {
    let label = format!(" {} ", facelet.color().letter());

    match facelet.color() {
        Color::Orange => label.black().on_truecolor(255, 140, 0).to_string(),
        Color::Red => label.white().on_red().to_string(),
        Color::White => label.black().on_bright_white().to_string(),
        Color::Yellow => label.black().on_bright_yellow().to_string(),
        Color::Blue => label.white().on_blue().to_string(),
        Color::Green => label.black().on_green().to_string(),
    }
}

fn face_row(cube: &Cube, face: Facelet, row: usize) -> String {
    cube.face(face).row(row).into_iter().map(sticker).join("")
}

/// The standard net drawn with coloured stickers
pub fn net(cube: &Cube) -> String {
    let n = cube.size();
    let pad = " ".repeat(3 * n + 1);
    let mut lines = Vec::with_capacity(3 * n);

    for row in 0..n {
        lines.push(format!("{pad}{}", face_row(cube, Facelet::Up, row)));
    }

    for row in 0..n {
        lines.push(
            [Facelet::Left, Facelet::Front, Facelet::Right, Facelet::Back]
                .into_iter()
                .map(|face| face_row(cube, face, row))
                .join(" "),
        );
    }

    for row in 0..n {
        lines.push(format!("{pad}{}", face_row(cube, Facelet::Down, row)));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn every_sticker_is_drawn() {
        let net = net(&Cube::solved(2).unwrap());

        assert_eq!(net.lines().count(), 6);
        for letter in ['O', 'R', 'W', 'Y', 'B', 'G'] {
            assert_eq!(net.matches(&format!(" {letter} ")).count(), 4);
        }
    }
}
