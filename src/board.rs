use std::fmt;

use crate::constants::Slot;
use crate::state::{GameState, Player};

/// Checkers drawn per point before the rest is shown as a number.
const STACK: u8 = 5;

fn symbol(player: Player) -> char {
    match player {
        Player::One => 'X',
        Player::Two => 'O',
    }
}

/// Three characters for `slot` on the given row, row 0 nearest the edge.
fn cell(state: &GameState, slot: Slot, row: u8) -> String {
    let n = state.count(slot);
    let Some(owner) = state.owner(slot) else {
        return "   ".to_string();
    };
    if row == STACK - 1 && n > STACK {
        format!("{n:^3}")
    } else if row < n {
        format!(" {} ", symbol(owner))
    } else {
        "   ".to_string()
    }
}

fn write_row(f: &mut fmt::Formatter<'_>, state: &GameState, points: [Slot; 12], bar: Slot, row: u8) -> fmt::Result {
    let left: String = points[..6].iter().map(|&p| cell(state, p, row)).collect();
    let right: String = points[6..].iter().map(|&p| cell(state, p, row)).collect();
    writeln!(f, "|{left}|{}|{right}|", cell(state, bar, row))
}

fn write_labels(f: &mut fmt::Formatter<'_>, points: [Slot; 12]) -> fmt::Result {
    let label = |ps: &[Slot]| ps.iter().map(|p| format!("{p:^3}")).collect::<String>();
    writeln!(f, " {}     {} ", label(&points[..6]), label(&points[6..]))
}

/// Player one (`X`) moves along the bottom from right to left, then along the
/// top from left to right. The bar column holds player two's bar above and
/// player one's below.
impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let top: [Slot; 12] = std::array::from_fn(|i| 13 + i as Slot);
        let bottom: [Slot; 12] = std::array::from_fn(|i| 12 - i as Slot);
        let edge = format!("+{}+---+{}+", "-".repeat(18), "-".repeat(18));

        write_labels(f, top)?;
        writeln!(f, "{edge}")?;
        for row in 0..STACK {
            write_row(f, self, top, Player::Two.bar(), row)?;
        }
        writeln!(f, "|{}|   |{}|", " ".repeat(18), " ".repeat(18))?;
        for row in (0..STACK).rev() {
            write_row(f, self, bottom, Player::One.bar(), row)?;
        }
        writeln!(f, "{edge}")?;
        write_labels(f, bottom)?;

        let mut dice = self.remaining().to_vec();
        dice.sort_unstable();
        write!(
            f,
            "turn: {}, dice: {:?}, off: {} / {}",
            self.turn(),
            dice,
            self.borne_off(Player::One),
            self.borne_off(Player::Two)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dice::Dice;

    #[test]
    fn test_initial_board() {
        let mut state = GameState::initial(Player::One);
        state.set_dice(Dice::new(5, 2));
        let text = state.to_string();
        assert_eq!(text.chars().filter(|&c| c == 'X').count(), 15);
        assert_eq!(text.chars().filter(|&c| c == 'O').count(), 15);
        assert!(text.starts_with(" 13 14 15 16 17 18 "));
        assert!(text.ends_with("turn: player 1, dice: [2, 5], off: 0 / 0"));
    }

    #[test]
    fn test_tall_stack_shows_count() {
        let state = GameState::from_layout(Player::Two, &[(19, 7)], &[(6, 1)]);
        let text = state.to_string();
        let rows: Vec<&str> = text.lines().collect();
        assert!(rows[6].contains(" 7 "));
        assert_eq!(text.chars().filter(|&c| c == 'X').count(), 4);
    }

    #[test]
    fn test_bar_is_drawn() {
        let state = GameState::from_layout(Player::One, &[(0, 1), (5, 1)], &[(25, 2)]);
        let text = state.to_string();
        let rows: Vec<&str> = text.lines().collect();
        // first board row holds player two's bar, last one player one's
        assert_eq!(&rows[2][19..24], "| O |");
        assert_eq!(&rows[12][19..24], "| X |");
    }
}
