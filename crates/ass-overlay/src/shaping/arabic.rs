//! Arabic contextual forms and bracket mirroring for the simple shaper

/// How a letter connects to its neighbours
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Joining {
    /// Does not join
    None,
    /// Joins to the preceding letter only
    Right,
    /// Joins on both sides
    Dual,
    /// Tatweel: joins on both sides and has no forms
    Causing,
}

/// Isolated presentation form and joining type of U+0621..=U+064A.
/// Forms follow each other as isolated, final, initial, medial.
const FORMS: [(u16, Joining); 42] = [
    (0xFE80, Joining::None),   // hamza
    (0xFE81, Joining::Right),  // alef with madda above
    (0xFE83, Joining::Right),  // alef with hamza above
    (0xFE85, Joining::Right),  // waw with hamza above
    (0xFE87, Joining::Right),  // alef with hamza below
    (0xFE89, Joining::Dual),   // yeh with hamza above
    (0xFE8D, Joining::Right),  // alef
    (0xFE8F, Joining::Dual),   // beh
    (0xFE93, Joining::Right),  // teh marbuta
    (0xFE95, Joining::Dual),   // teh
    (0xFE99, Joining::Dual),   // theh
    (0xFE9D, Joining::Dual),   // jeem
    (0xFEA1, Joining::Dual),   // hah
    (0xFEA5, Joining::Dual),   // khah
    (0xFEA9, Joining::Right),  // dal
    (0xFEAB, Joining::Right),  // thal
    (0xFEAD, Joining::Right),  // reh
    (0xFEAF, Joining::Right),  // zain
    (0xFEB1, Joining::Dual),   // seen
    (0xFEB5, Joining::Dual),   // sheen
    (0xFEB9, Joining::Dual),   // sad
    (0xFEBD, Joining::Dual),   // dad
    (0xFEC1, Joining::Dual),   // tah
    (0xFEC5, Joining::Dual),   // zah
    (0xFEC9, Joining::Dual),   // ain
    (0xFECD, Joining::Dual),   // ghain
    (0, Joining::None),
    (0, Joining::None),
    (0, Joining::None),
    (0, Joining::None),
    (0, Joining::None),
    (0x0640, Joining::Causing), // tatweel
    (0xFED1, Joining::Dual),   // feh
    (0xFED5, Joining::Dual),   // qaf
    (0xFED9, Joining::Dual),   // kaf
    (0xFEDD, Joining::Dual),   // lam
    (0xFEE1, Joining::Dual),   // meem
    (0xFEE5, Joining::Dual),   // noon
    (0xFEE9, Joining::Dual),   // heh
    (0xFEED, Joining::Right),  // waw
    (0xFEEF, Joining::Right),  // alef maksura
    (0xFEF1, Joining::Dual),   // yeh
];

fn entry(ch: char) -> Option<(u16, Joining)> {
    let index = (ch as u32).checked_sub(0x0621)?;
    FORMS.get(index as usize).copied()
}

fn joining(ch: char) -> Joining {
    entry(ch).map_or(Joining::None, |(_, j)| j)
}

/// Combining marks that do not interrupt joining
pub fn is_transparent(ch: char) -> bool {
    matches!(ch as u32, 0x064B..=0x065F | 0x0670)
}

fn joins_forward(j: Joining) -> bool {
    matches!(j, Joining::Dual | Joining::Causing)
}

fn joins_backward(j: Joining) -> bool {
    j != Joining::None
}

/// Replace Arabic letters in a logical-order run with their contextual
/// presentation forms. Other characters pass through unchanged.
pub fn shape_joining(chars: &[char]) -> Vec<char> {
    let neighbour = |from: usize, step: isize| -> Joining {
        let mut i = from as isize + step;
        while i >= 0 && (i as usize) < chars.len() {
            let ch = chars[i as usize];
            if !is_transparent(ch) {
                return joining(ch);
            }
            i += step;
        }
        Joining::None
    };

    chars
        .iter()
        .enumerate()
        .map(|(i, &ch)| {
            let Some((base, j)) = entry(ch) else {
                return ch;
            };
            if base == 0 || j == Joining::Causing || j == Joining::None {
                return ch;
            }
            let prev = joins_backward(j) && joins_forward(neighbour(i, -1));
            let next = joins_forward(j) && joins_backward(neighbour(i, 1));
            let form = match (prev, next) {
                (false, false) => 0,
                (true, false) => 1,
                (false, true) => 2,
                (true, true) => 3,
            };
            char::from_u32(u32::from(base) + form).unwrap_or(ch)
        })
        .collect()
}

/// Mirrored counterpart of a paired punctuation character, used for
/// right-to-left runs
pub fn mirror(ch: char) -> char {
    match ch {
        '(' => ')',
        ')' => '(',
        '[' => ']',
        ']' => '[',
        '{' => '}',
        '}' => '{',
        '<' => '>',
        '>' => '<',
        '«' => '»',
        '»' => '«',
        '‹' => '›',
        '›' => '‹',
        '⁅' => '⁆',
        '⁆' => '⁅',
        '≤' => '≥',
        '≥' => '≤',
        '「' => '」',
        '」' => '「',
        _ => ch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shaped(s: &str) -> Vec<u32> {
        let chars: Vec<char> = s.chars().collect();
        shape_joining(&chars).into_iter().map(|c| c as u32).collect()
    }

    #[test]
    fn test_dual_joining_pair() {
        // beh beh: initial then final
        assert_eq!(shaped("\u{0628}\u{0628}"), vec![0xFE91, 0xFE90]);
        // beh beh beh: the middle one is medial
        assert_eq!(shaped("\u{0628}\u{0628}\u{0628}"), vec![0xFE91, 0xFE92, 0xFE90]);
    }

    #[test]
    fn test_right_joining_breaks_chain() {
        // alef never joins forward, so the following beh is isolated
        assert_eq!(shaped("\u{0627}\u{0628}"), vec![0xFE8D, 0xFE8F]);
        // beh alef: beh initial, alef final
        assert_eq!(shaped("\u{0628}\u{0627}"), vec![0xFE91, 0xFE8E]);
    }

    #[test]
    fn test_marks_are_transparent() {
        // beh + fatha + beh still joins across the mark
        assert_eq!(shaped("\u{0628}\u{064E}\u{0628}"), vec![0xFE91, 0x064E, 0xFE90]);
    }

    #[test]
    fn test_latin_untouched() {
        assert_eq!(shaped("ab"), vec![0x61, 0x62]);
        assert_eq!(mirror('('), ')');
        assert_eq!(mirror('a'), 'a');
    }
}
