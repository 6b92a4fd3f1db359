use rand::seq::SliceRandom;
use rand::Rng;

use crate::metadata::FieldValue;

/// Texts at least this long get the fixed marker instead of a variant tag.
const SHORT_TEXT_LIMIT: usize = 20;
const VARIANT_TAGS: [&str; 6] = ["Pro", "Lite", "HD", "Max", "Plus", "v2"];
const LONG_TEXT_MARKER: &str = "_alt";
const ATTEMPTS_PER_DISTRACTOR: usize = 25;

/// Generates up to `count` wrong answers that look like `value`.
///
/// Every returned string differs from the rendered `value` and from the
/// others. Generation is bounded: if the shape of the value leaves too little
/// room for variation (e.g. long texts, which only have one alternative),
/// fewer than `count` distractors are returned.
pub fn generate_distractors<R: Rng>(
    value: &FieldValue,
    count: usize,
    rng: &mut R,
) -> Vec<String> {
    let correct = value.to_string();
    let mut distractors: Vec<String> = Vec::with_capacity(count);

    for _ in 0..count * ATTEMPTS_PER_DISTRACTOR {
        if distractors.len() == count {
            break;
        }
        let candidate = jitter(value, rng);
        if candidate != correct && !distractors.contains(&candidate) {
            distractors.push(candidate);
        }
    }

    distractors
}

fn jitter<R: Rng>(value: &FieldValue, rng: &mut R) -> String {
    match value {
        FieldValue::Integer(n) => {
            let spread = (n / 4).clamp(5, 30_000);
            offset_integer(*n, spread, rng).to_string()
        }
        FieldValue::Dimensions { width, height } => {
            let width = offset_integer(u64::from(*width), 0, rng);
            let height = offset_integer(u64::from(*height), 0, rng);
            format!("{}x{}", width, height)
        }
        FieldValue::Decimal(d) => {
            let spread = (d.abs() / 4.0).max(0.5);
            let noisy = d + rng.gen_range(-spread..=spread);
            let rounded = (noisy * 100.0).round() / 100.0;
            format!("{:.2}", rounded.max(0.01))
        }
        FieldValue::Text(s) if s.chars().count() < SHORT_TEXT_LIMIT => {
            let tag = VARIANT_TAGS.choose(rng).copied().unwrap_or("v2");
            format!("{} {}", s, tag)
        }
        FieldValue::Text(s) => format!("{}{}", s, LONG_TEXT_MARKER),
    }
}

/// Moves `n` by a random non-zero offset, never going below 1.
/// A `spread` of 0 means the fixed 20..=100 range used for frame dimensions.
fn offset_integer<R: Rng>(n: u64, spread: u64, rng: &mut R) -> u64 {
    let offset = if spread == 0 {
        rng.gen_range(20..=100)
    } else {
        rng.gen_range(1..=spread)
    };
    if rng.gen_bool(0.5) {
        n.saturating_add(offset)
    } else {
        n.saturating_sub(offset).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn distinct(values: &[String]) -> bool {
        values.iter().collect::<HashSet<_>>().len() == values.len()
    }

    #[test]
    fn dimensions_stay_dimensions() {
        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            let value = FieldValue::infer("1920x1080");
            let distractors = generate_distractors(&value, 3, &mut rng);

            assert_eq!(distractors.len(), 3);
            assert!(distinct(&distractors));
            for d in &distractors {
                assert_ne!(d, "1920x1080");
                let (w, h) = d.split_once('x').unwrap();
                assert!(w.parse::<u32>().unwrap() >= 1);
                assert!(h.parse::<u32>().unwrap() >= 1);
            }
        }
    }

    #[test]
    fn tiny_dimensions_are_clamped() {
        let mut rng = StdRng::seed_from_u64(7);
        let value = FieldValue::Dimensions {
            width: 1,
            height: 1,
        };
        for d in generate_distractors(&value, 3, &mut rng) {
            let (w, h) = d.split_once('x').unwrap();
            assert!(w.parse::<u32>().unwrap() >= 1);
            assert!(h.parse::<u32>().unwrap() >= 1);
            assert_ne!(d, "1x1");
        }
    }

    #[test]
    fn integers_stay_positive_numbers() {
        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            let distractors = generate_distractors(&FieldValue::infer("42"), 3, &mut rng);

            assert_eq!(distractors.len(), 3);
            assert!(distinct(&distractors));
            for d in &distractors {
                assert_ne!(d, "42");
                assert!(d.parse::<u64>().unwrap() >= 1);
            }
        }
    }

    #[test]
    fn decimals_keep_two_places() {
        let mut rng = StdRng::seed_from_u64(3);
        let distractors = generate_distractors(&FieldValue::Decimal(29.97), 3, &mut rng);

        assert_eq!(distractors.len(), 3);
        assert!(distinct(&distractors));
        for d in &distractors {
            assert_ne!(d, "29.97");
            let (_, fraction) = d.split_once('.').unwrap();
            assert_eq!(fraction.len(), 2);
            assert!(d.parse::<f64>().unwrap() >= 0.01);
        }
    }

    #[test]
    fn short_text_gets_variant_tag() {
        let mut rng = StdRng::seed_from_u64(11);
        let distractors = generate_distractors(&FieldValue::Text("h264".into()), 3, &mut rng);

        assert_eq!(distractors.len(), 3);
        assert!(distinct(&distractors));
        for d in &distractors {
            let tag = d.strip_prefix("h264 ").unwrap();
            assert!(VARIANT_TAGS.contains(&tag));
        }
    }

    #[test]
    fn long_text_degrades_to_single_marker() {
        let mut rng = StdRng::seed_from_u64(5);
        let value = FieldValue::Text("QuickTime / MOV container".into());
        let distractors = generate_distractors(&value, 3, &mut rng);

        assert_eq!(distractors, vec!["QuickTime / MOV container_alt".to_string()]);
    }

    #[test]
    fn zero_count_returns_nothing() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(generate_distractors(&FieldValue::Integer(10), 0, &mut rng).is_empty());
    }
}
