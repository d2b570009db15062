use aptcore::prelude::sync_a_template;

pub const WORDS_PER_LINE: usize = 2080;
pub const WORD_RATE_HZ: u64 = 4160;

const SYNC_WORDS: usize = 39;
const SPACE_WORDS: usize = 47;
const IMAGE_WORDS: usize = 909;
const TELEMETRY_WORDS: usize = 45;

/// Word values of one APT scan line for a synthetic pass.
///
/// Channel A carries a horizontal ramp, channel B a vertical band pattern, so
/// both halves of the decoded raster are recognisable.
pub fn line_words(line: usize) -> Vec<f32> {
    let mut words = Vec::with_capacity(WORDS_PER_LINE);

    let mut sync_a = sync_a_template();
    sync_a.resize(SYNC_WORDS, 0.0);
    words.extend(sync_a);
    words.extend(std::iter::repeat(0.0).take(SPACE_WORDS));
    words.extend((0..IMAGE_WORDS).map(|col| 40.0 + 180.0 * col as f32 / IMAGE_WORDS as f32));
    words.extend(std::iter::repeat(wedge_level(line)).take(TELEMETRY_WORDS));

    words.extend(sync_b());
    words.extend(std::iter::repeat(255.0).take(SPACE_WORDS));
    let band = if (line / 16) % 2 == 0 { 200.0 } else { 90.0 };
    words.extend(std::iter::repeat(band).take(IMAGE_WORDS));
    words.extend(std::iter::repeat(wedge_level(line)).take(TELEMETRY_WORDS));

    words
}

/// Seven 832 Hz pulses: five words per cycle at the word rate.
fn sync_b() -> Vec<f32> {
    let mut words = Vec::with_capacity(SYNC_WORDS);
    for _ in 0..7 {
        words.extend_from_slice(&[255.0, 255.0, 0.0, 0.0, 0.0]);
    }
    words.resize(SYNC_WORDS, 0.0);
    words
}

/// Telemetry wedges step through eight grey levels, eight lines each.
fn wedge_level(line: usize) -> f32 {
    ((line / 8) % 8) as f32 * 255.0 / 7.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_has_standard_word_count() {
        assert_eq!(line_words(0).len(), WORDS_PER_LINE);
        assert_eq!(line_words(123).len(), WORDS_PER_LINE);
    }

    #[test]
    fn line_starts_with_sync_a() {
        let words = line_words(3);
        assert_eq!(&words[..35], sync_a_template().as_slice());
    }

    #[test]
    fn channel_b_starts_at_half_line() {
        let words = line_words(0);
        assert_eq!(&words[1040..1045], &[255.0, 255.0, 0.0, 0.0, 0.0]);
    }
}
