use super::{SCORE_BONUS, ZERO_DECLARE_MULTIPLIER};

/// Per-seat scoring for a completed round. If a seat's captured piles equal
/// its declaration, it scores `+(declaration + bonus)`; otherwise it scores
/// `-|declaration - captured|`, doubled when the seat declared zero and
/// still captured piles.
pub fn score_round(declared_by_seat: [i32; 4], captured_by_seat: [i32; 4]) -> [i32; 4] {
    let mut delta = [0i32; 4];
    for seat in 0..4 {
        let declared = declared_by_seat[seat];
        let captured = captured_by_seat[seat];
        delta[seat] = if captured == declared {
            declared + SCORE_BONUS
        } else {
            let penalty = (declared - captured).abs();
            let penalty = if declared == 0 {
                penalty * ZERO_DECLARE_MULTIPLIER
            } else {
                penalty
            };
            -penalty
        };
    }
    delta
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_declaration_scores_bonus() {
        let delta = score_round([3, 0, 0, 0], [3, 0, 0, 0]);
        assert_eq!(delta[0], 3 + SCORE_BONUS);
    }

    #[test]
    fn missed_zero_declaration_is_doubled() {
        let delta = score_round([0, 0, 0, 0], [2, 0, 0, 0]);
        assert_eq!(delta[0], -(2 * ZERO_DECLARE_MULTIPLIER));
    }

    #[test]
    fn missed_nonzero_declaration_is_not_doubled() {
        let delta = score_round([4, 0, 0, 0], [2, 0, 0, 0]);
        assert_eq!(delta[0], -2);
    }

    #[test]
    fn exact_zero_declaration_still_scores_bonus() {
        let delta = score_round([0, 0, 0, 0], [0, 0, 0, 0]);
        assert_eq!(delta[0], SCORE_BONUS);
    }
}
