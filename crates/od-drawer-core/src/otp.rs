pub const OTP_LENGTH: usize = 6;

/// Where keyboard focus should go after a state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusTarget {
    PhoneInput,
    OtpCell(usize),
    ContinueButton,
    Blur,
}

/// Fixed row of single-digit OTP cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OtpCells {
    cells: [Option<char>; OTP_LENGTH],
}

impl OtpCells {
    /// Apply the raw value of cell `index` after an input event.
    ///
    /// A pasted full code fills every cell. Otherwise the last typed digit is
    /// kept and focus advances; anything that is not a digit clears the cell.
    pub fn input(&mut self, index: usize, raw: &str) -> Option<FocusTarget> {
        if index >= OTP_LENGTH {
            return None;
        }

        let digits: Vec<char> = raw.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.len() == OTP_LENGTH {
            for (cell, digit) in self.cells.iter_mut().zip(digits) {
                *cell = Some(digit);
            }
            return Some(FocusTarget::Blur);
        }

        match raw.chars().last().filter(|c| c.is_ascii_digit()) {
            Some(digit) => {
                self.cells[index] = Some(digit);
                if index + 1 < OTP_LENGTH {
                    Some(FocusTarget::OtpCell(index + 1))
                } else {
                    Some(FocusTarget::Blur)
                }
            }
            None => {
                self.cells[index] = None;
                None
            }
        }
    }

    /// Backspace on an empty cell moves to the previous one.
    pub fn backspace(&mut self, index: usize) -> Option<FocusTarget> {
        if index >= OTP_LENGTH {
            return None;
        }
        if self.cells[index].is_none() && index > 0 {
            Some(FocusTarget::OtpCell(index - 1))
        } else {
            None
        }
    }

    pub fn cell(&self, index: usize) -> Option<char> {
        self.cells.get(index).copied().flatten()
    }

    pub fn filled(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    pub fn first_empty(&self) -> Option<usize> {
        self.cells.iter().position(|c| c.is_none())
    }

    /// The full code, only when all cells hold a digit.
    pub fn code(&self) -> Option<String> {
        self.cells.iter().copied().collect()
    }

    pub fn clear(&mut self) {
        self.cells = [None; OTP_LENGTH];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typing_advances_and_blurs_on_last_cell() {
        let mut otp = OtpCells::default();
        for (index, digit) in "12345".chars().enumerate() {
            assert_eq!(
                otp.input(index, &digit.to_string()),
                Some(FocusTarget::OtpCell(index + 1))
            );
        }
        assert_eq!(otp.code(), None);
        assert_eq!(otp.input(5, "6"), Some(FocusTarget::Blur));
        assert_eq!(otp.code().as_deref(), Some("123456"));
    }

    #[test]
    fn non_digit_clears_cell() {
        let mut otp = OtpCells::default();
        otp.input(0, "4");
        assert_eq!(otp.input(0, "a"), None);
        assert_eq!(otp.cell(0), None);
    }

    #[test]
    fn overtyping_keeps_last_digit() {
        let mut otp = OtpCells::default();
        otp.input(2, "1");
        otp.input(2, "17");
        assert_eq!(otp.cell(2), Some('7'));
    }

    #[test]
    fn paste_fills_every_cell() {
        let mut otp = OtpCells::default();
        assert_eq!(otp.input(3, " 654 321 "), Some(FocusTarget::Blur));
        assert_eq!(otp.code().as_deref(), Some("654321"));
    }

    #[test]
    fn backspace_on_empty_cell_moves_back() {
        let mut otp = OtpCells::default();
        otp.input(0, "9");
        assert_eq!(otp.backspace(1), Some(FocusTarget::OtpCell(0)));
        assert_eq!(otp.backspace(0), None);
        otp.input(1, "8");
        assert_eq!(otp.backspace(1), None);
    }

    #[test]
    fn clear_empties_all_cells() {
        let mut otp = OtpCells::default();
        otp.input(0, "123456");
        assert_eq!(otp.filled(), 6);
        otp.clear();
        assert_eq!(otp.filled(), 0);
        assert_eq!(otp.first_empty(), Some(0));
    }
}
