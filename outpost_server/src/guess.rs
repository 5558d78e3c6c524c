// Guess scoring for the number-baseball variant.
//
// Pure functions, no I/O: `parse_number` is the single validator for both
// secrets and guesses (exactly three ASCII digits, all distinct — the
// distinctness is a hard precondition of `score`, not a hint), and `score`
// produces the deterministic (strikes, balls) outcome. The session layer owns
// everything stateful.

/// Digits in a secret or guess.
pub const NUMBER_LENGTH: usize = 3;

/// A validated number: exactly `NUMBER_LENGTH` digits, all distinct.
pub type Digits = [u8; NUMBER_LENGTH];

/// Scoring outcome of one guess against one secret.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GuessScore {
    /// Digits correct in both value and position.
    pub strikes: u8,
    /// Digits present in the secret but at a different position.
    pub balls: u8,
}

impl GuessScore {
    /// A guess is correct iff every position is a strike.
    pub fn is_correct(self) -> bool {
        usize::from(self.strikes) == NUMBER_LENGTH
    }
}

/// Parse and validate a client-supplied number string.
///
/// Returns `None` unless the string is exactly three ASCII digits with no
/// repeats.
pub fn parse_number(s: &str) -> Option<Digits> {
    let bytes = s.as_bytes();
    if bytes.len() != NUMBER_LENGTH {
        return None;
    }
    let mut digits = [0u8; NUMBER_LENGTH];
    for (slot, &b) in digits.iter_mut().zip(bytes) {
        if !b.is_ascii_digit() {
            return None;
        }
        *slot = b - b'0';
    }
    for i in 0..NUMBER_LENGTH {
        for j in i + 1..NUMBER_LENGTH {
            if digits[i] == digits[j] {
                return None;
            }
        }
    }
    Some(digits)
}

/// Render validated digits back into their canonical wire string.
pub fn number_string(digits: Digits) -> String {
    digits.iter().map(|d| char::from(b'0' + d)).collect()
}

/// Score a guess against a secret. Both inputs must already have passed
/// [`parse_number`].
///
/// Strikes count exact-position matches. Balls count secret digits present
/// in the guess at a different position, consuming each secret digit at most
/// once — the inner loop breaks on the first match so a digit can never be
/// counted twice even if the distinctness precondition were relaxed.
pub fn score(secret: Digits, guess: Digits) -> GuessScore {
    let mut strikes = 0u8;
    for i in 0..NUMBER_LENGTH {
        if secret[i] == guess[i] {
            strikes += 1;
        }
    }

    let mut balls = 0u8;
    for i in 0..NUMBER_LENGTH {
        if secret[i] == guess[i] {
            continue;
        }
        for j in 0..NUMBER_LENGTH {
            if i != j && secret[i] == guess[j] && secret[j] != guess[j] {
                balls += 1;
                break;
            }
        }
    }

    GuessScore { strikes, balls }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// All 720 valid distinct-digit triples.
    fn all_valid_numbers() -> Vec<Digits> {
        let mut out = Vec::new();
        for a in 0..10u8 {
            for b in 0..10u8 {
                for c in 0..10u8 {
                    if a != b && b != c && a != c {
                        out.push([a, b, c]);
                    }
                }
            }
        }
        out
    }

    #[test]
    fn parse_accepts_valid_numbers() {
        assert_eq!(parse_number("123"), Some([1, 2, 3]));
        assert_eq!(parse_number("045"), Some([0, 4, 5]));
        assert_eq!(parse_number("907"), Some([9, 0, 7]));
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("12"), None);
        assert_eq!(parse_number("1234"), None);
        assert_eq!(parse_number("12a"), None);
        assert_eq!(parse_number("112"), None);
        assert_eq!(parse_number("233"), None);
        assert_eq!(parse_number("999"), None);
        assert_eq!(parse_number("+12"), None);
        // Multi-byte characters must not slip past the length check.
        assert_eq!(parse_number("１２３"), None);
    }

    #[test]
    fn number_string_roundtrips() {
        assert_eq!(number_string([0, 4, 5]), "045");
        assert_eq!(parse_number(&number_string([9, 8, 7])), Some([9, 8, 7]));
    }

    #[test]
    fn self_match_is_always_three_strikes() {
        for n in all_valid_numbers() {
            let s = score(n, n);
            assert_eq!(s, GuessScore { strikes: 3, balls: 0 });
            assert!(s.is_correct());
        }
    }

    #[test]
    fn strikes_plus_balls_never_exceed_three() {
        let numbers = all_valid_numbers();
        for &secret in &numbers {
            for &guess in &numbers {
                let s = score(secret, guess);
                assert!(s.strikes + s.balls <= 3, "{secret:?} vs {guess:?}: {s:?}");
                if s.strikes == 3 {
                    assert_eq!(s.balls, 0);
                }
            }
        }
    }

    #[test]
    fn misplaced_digits_score_as_balls() {
        // '4' and '5' appear but misplaced, '6' is absent.
        let s = score([0, 4, 5], [4, 5, 6]);
        assert_eq!(s, GuessScore { strikes: 0, balls: 2 });
        assert!(!s.is_correct());
    }

    #[test]
    fn mixed_strikes_and_balls() {
        // '1' is exact, '3' and '2' are swapped.
        let s = score([1, 2, 3], [1, 3, 2]);
        assert_eq!(s, GuessScore { strikes: 1, balls: 2 });
    }

    #[test]
    fn disjoint_numbers_score_zero() {
        let s = score([1, 2, 3], [4, 5, 6]);
        assert_eq!(s, GuessScore { strikes: 0, balls: 0 });
    }
}
