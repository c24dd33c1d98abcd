use crate::app::SPINNER_FRAME_COUNT;

const BRAILLE_FRAMES: [char; SPINNER_FRAME_COUNT] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

pub fn frame(idx: usize) -> char {
    BRAILLE_FRAMES[idx % SPINNER_FRAME_COUNT]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_are_braille() {
        for ch in BRAILLE_FRAMES {
            assert!(('\u{2800}'..='\u{28FF}').contains(&ch), "{ch:?} is not braille");
        }
    }

    #[test]
    fn wraps_around() {
        assert_eq!(frame(0), frame(SPINNER_FRAME_COUNT));
        let _ = frame(usize::MAX);
    }
}
